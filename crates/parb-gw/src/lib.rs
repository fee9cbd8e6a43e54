// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-gw
//!
//! The PARB gateway binary crate.
//!
//! Wires every component into one process-wide [`runtime::Service`]:
//! configuration loading, tracing initialization, signal-driven shutdown,
//! the parambus adapter with its cache, the protocol translator, the
//! transaction engine, the event pipeline and the uplink session.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use config::{GatewayConfig, Mode};
pub use runtime::{Service, ServiceBuilder};
pub use shutdown::ShutdownCoordinator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
