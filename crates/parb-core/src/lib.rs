// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-core
//!
//! Core abstractions and shared types for PARB, a bridge between a
//! WebPA-style framed-message uplink and a local hierarchical parameter bus.
//!
//! This crate provides the foundational types used across all PARB
//! components:
//!
//! - **Types**: Wire-type and native-type tables, parameter-name wildcard
//!   helpers, attribute metadata
//! - **Codec**: Lossless projection between wire string renderings and typed
//!   values
//! - **Envelope**: The internal-dialect request/response model shared by the
//!   translator and the uplink session
//! - **Error**: Unified error hierarchy with HTTP status mapping
//! - **Hooks**: Performance hook points (no-op by default)
//!
//! ## Example
//!
//! ```rust
//! use parb_core::codec::TypedValue;
//! use parb_core::types::WireType;
//!
//! let v = TypedValue::decode("true", WireType::Bool).unwrap();
//! assert_eq!(v.encode(), ("true".to_string(), WireType::Bool));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod types;

pub use codec::{CodecError, CodecResult, TypedValue};
pub use envelope::{GetEntry, Request, Response, RowField, TableRow};
pub use error::{
    AuthError, BusError, BusResult, ConfigError, ParbError, ParbResult, RequestError,
    RequestResult, TxnError, UplinkError,
};
pub use hooks::{NoopPerfSink, PerfSink};
pub use types::{
    has_table_wildcard, is_group_wildcard, AccessMode, Attribute, NativeType, NotifyMode,
    WireType,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
