// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-notify
//!
//! The notification surface of PARB.
//!
//! Parambus push events (value changes, table row lifecycle) are enveloped
//! as JSON notifications and republished to the uplink's events endpoint.
//! The same envelope model carries transaction-status, device-status,
//! factory-reset and firmware-upgrade notifications originated by other
//! components through the uniform [`EventPipeline::emit`] entry point.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod envelope;
mod pipeline;

pub use envelope::{Notification, NotifyData, NotifyKind};
pub use pipeline::{EventPipeline, NotificationSink, NotifyConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
