// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-bus
//!
//! The parameter-bus boundary of PARB.
//!
//! This crate separates the bus into two layers:
//!
//! - **Backend** ([`ParamBackend`]): the raw bus surface: native typed
//!   get/set, partial-path expansion, table row allocation, event
//!   subscription. A production deployment binds the platform bus library
//!   here; [`MemoryBackend`] serves mock mode and tests.
//! - **Adapter** ([`ParamBusAdapter`]): the contract the translator and the
//!   transaction engine program against: string/typed get and set with the
//!   cache as a read-through and write-invalidating proxy, wildcard
//!   enumeration, table CRUD, attribute emulation, refcounted
//!   subscriptions, and compare-and-set.
//!
//! ## Example
//!
//! ```rust,ignore
//! use parb_bus::{MemoryBackend, ParamBusAdapter};
//!
//! let backend = Arc::new(MemoryBackend::new("parodus2rbus.client"));
//! let adapter = ParamBusAdapter::new(backend, cache, perf, event_tx);
//! let (value, wire_type) = adapter.get_typed("Device.DeviceInfo.SerialNumber").await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod adapter;
mod backend;
mod memory;
mod subscription;

pub use adapter::{ParamBusAdapter, RowAddOutcome};
pub use backend::{BusEvent, BusEventKind, ParamBackend};
pub use memory::MemoryBackend;
pub use subscription::SubscriptionRegistry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
