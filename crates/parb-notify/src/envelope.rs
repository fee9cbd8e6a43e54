// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Notification envelopes.
//!
//! The wire layout is `{type, source, destination, timestamp, data}` with a
//! per-type `data` payload. The numeric type codes and the camelCase data
//! field names are part of the upstream contract and must not drift.

use chrono::Utc;
use serde_json::{json, Value};

use parb_core::types::WireType;

// =============================================================================
// Kind
// =============================================================================

/// Notification type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Parameter value change (code 1).
    ParamChange,
    /// Factory reset (code 2).
    FactoryReset,
    /// Firmware upgrade (code 3).
    FirmwareUpgrade,
    /// Client joined or left a hosts table (code 4).
    ConnectedClient,
    /// Transaction completion (code 5).
    TransactionStatus,
    /// Device status change (code 6).
    DeviceStatus,
    /// Component status change (code 7).
    ComponentStatus,
}

impl NotifyKind {
    /// Returns the numeric type code.
    pub fn code(&self) -> u8 {
        match self {
            NotifyKind::ParamChange => 1,
            NotifyKind::FactoryReset => 2,
            NotifyKind::FirmwareUpgrade => 3,
            NotifyKind::ConnectedClient => 4,
            NotifyKind::TransactionStatus => 5,
            NotifyKind::DeviceStatus => 6,
            NotifyKind::ComponentStatus => 7,
        }
    }
}

// =============================================================================
// Data
// =============================================================================

/// Per-type notification payload.
#[derive(Debug, Clone)]
pub enum NotifyData {
    /// A parameter changed value.
    ParamChange {
        /// Fully qualified parameter name.
        param_name: String,
        /// Previous rendering; `"unknown"` when unavailable.
        old_value: String,
        /// New rendering.
        new_value: String,
        /// Wire type of the new value.
        data_type: WireType,
        /// Id of the write that caused the change.
        write_id: String,
    },
    /// A client appeared or disappeared under a hosts table.
    ConnectedClient {
        /// Client MAC address.
        mac_id: String,
        /// `"Online"` or `"Offline"`.
        status: String,
        /// Interface the client sits on.
        interface: String,
        /// Client hostname.
        hostname: String,
        /// Client IP address.
        ip_address: String,
    },
    /// A configuration transaction completed.
    TransactionStatus {
        /// The transaction id.
        transaction_id: String,
        /// Status name (`"Success"`, `"Failure"`, ...).
        status: String,
        /// Failure detail, empty on success.
        error_message: String,
    },
    /// Device-level status; also carries factory reset and firmware
    /// upgrade payloads.
    DeviceStatus {
        /// Status code.
        status: i32,
        /// Human-readable reason.
        reason: String,
        /// Device identifier.
        device_id: String,
    },
}

impl NotifyData {
    fn to_json(&self) -> Value {
        match self {
            NotifyData::ParamChange {
                param_name,
                old_value,
                new_value,
                data_type,
                write_id,
            } => json!({
                "paramName": param_name,
                "oldValue": old_value,
                "newValue": new_value,
                "dataType": data_type.code(),
                "writeID": write_id,
            }),
            NotifyData::ConnectedClient {
                mac_id,
                status,
                interface,
                hostname,
                ip_address,
            } => json!({
                "macId": mac_id,
                "status": status,
                "interface": interface,
                "hostname": hostname,
                "ipAddress": ip_address,
            }),
            NotifyData::TransactionStatus {
                transaction_id,
                status,
                error_message,
            } => json!({
                "transactionId": transaction_id,
                "status": status,
                "errorMessage": error_message,
            }),
            NotifyData::DeviceStatus {
                status,
                reason,
                device_id,
            } => json!({
                "status": status,
                "reason": reason,
                "deviceId": device_id,
            }),
        }
    }
}

// =============================================================================
// Notification
// =============================================================================

/// A notification envelope ready for uplink emission.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Type of notification.
    pub kind: NotifyKind,
    /// Emitting service name.
    pub source: String,
    /// Uplink destination, usually the events endpoint.
    pub destination: String,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Per-type payload.
    pub data: NotifyData,
}

impl Notification {
    /// Creates an envelope stamped with the current time.
    pub fn new(
        kind: NotifyKind,
        source: impl Into<String>,
        destination: impl Into<String>,
        data: NotifyData,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            destination: destination.into(),
            timestamp_ms: Utc::now().timestamp_millis() as u64,
            data,
        }
    }

    /// A parameter-change notification.
    pub fn param_change(
        source: impl Into<String>,
        destination: impl Into<String>,
        param_name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        data_type: WireType,
        write_id: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::ParamChange,
            source,
            destination,
            NotifyData::ParamChange {
                param_name: param_name.into(),
                old_value: old_value.into(),
                new_value: new_value.into(),
                data_type,
                write_id: write_id.into(),
            },
        )
    }

    /// A connected-client notification.
    pub fn connected_client(
        source: impl Into<String>,
        destination: impl Into<String>,
        mac_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::ConnectedClient,
            source,
            destination,
            NotifyData::ConnectedClient {
                mac_id: mac_id.into(),
                status: status.into(),
                interface: "unknown".to_string(),
                hostname: "unknown".to_string(),
                ip_address: "unknown".to_string(),
            },
        )
    }

    /// A transaction-status notification.
    pub fn transaction_status(
        source: impl Into<String>,
        destination: impl Into<String>,
        transaction_id: impl Into<String>,
        status: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::TransactionStatus,
            source,
            destination,
            NotifyData::TransactionStatus {
                transaction_id: transaction_id.into(),
                status: status.into(),
                error_message: error_message.into(),
            },
        )
    }

    /// A device-status notification.
    pub fn device_status(
        source: impl Into<String>,
        destination: impl Into<String>,
        status: i32,
        reason: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::DeviceStatus,
            source,
            destination,
            NotifyData::DeviceStatus {
                status,
                reason: reason.into(),
                device_id: device_id.into(),
            },
        )
    }

    /// A factory-reset notification.
    pub fn factory_reset(
        source: impl Into<String>,
        destination: impl Into<String>,
        reason: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::FactoryReset,
            source,
            destination,
            NotifyData::DeviceStatus {
                status: 1,
                reason: reason.into(),
                device_id: device_id.into(),
            },
        )
    }

    /// A firmware-upgrade notification.
    pub fn firmware_upgrade(
        source: impl Into<String>,
        destination: impl Into<String>,
        old_version: Option<&str>,
        new_version: &str,
        device_id: impl Into<String>,
    ) -> Self {
        Self::new(
            NotifyKind::FirmwareUpgrade,
            source,
            destination,
            NotifyData::DeviceStatus {
                status: 1,
                reason: format!(
                    "Firmware upgrade: {} -> {}",
                    old_version.unwrap_or("unknown"),
                    new_version
                ),
                device_id: device_id.into(),
            },
        )
    }

    /// Serializes the envelope.
    pub fn to_json(&self) -> Value {
        json!({
            "type": self.kind.code(),
            "source": self.source,
            "destination": self.destination,
            "timestamp": self.timestamp_ms,
            "data": self.data.to_json(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
