// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Seed data shared across the integration tests.

use parb_bus::MemoryBackend;
use parb_core::codec::TypedValue;

/// Seeds a small but representative device tree.
pub fn seed_device_tree(backend: &MemoryBackend) {
    backend.seed(
        "Device.DeviceInfo.SerialNumber",
        TypedValue::Str("ABC123456".into()),
    );
    backend.seed(
        "Device.DeviceInfo.SoftwareVersion",
        TypedValue::Str("4.2.0".into()),
    );
    backend.seed("Device.DeviceInfo.Uptime", TypedValue::Uint(86_400));
    backend.seed("Device.WiFi.Radio.1.Enable", TypedValue::Bool(true));
    backend.seed("Device.WiFi.Radio.1.Channel", TypedValue::Int(36));
    backend.seed("Device.WiFi.Radio.2.Enable", TypedValue::Bool(false));
    backend.seed("Device.NAT.Enable", TypedValue::Bool(true));
}
