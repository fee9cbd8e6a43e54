// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-proto
//!
//! The protocol translator of PARB.
//!
//! Inbound uplink payloads arrive in one of two dialects: the internal
//! `op`-discriminated schema or the WebPA `command` schema. This crate
//! normalizes both into one tagged request type, authorizes the touched
//! resources against a pattern ACL, dispatches each operation through the
//! parambus adapter, and shapes the outgoing payload back into the inbound
//! dialect:
//!
//! ```text
//! payload ──▶ normalize ──▶ authorize ──▶ dispatch ──▶ shape ──▶ reply
//!              (dialect)      (ACL)       (adapter)    (flat/grouped)
//! ```
//!
//! Internal-dialect responses pass through unchanged; WebPA responses are
//! re-shaped flat or grouped depending on whether the original request
//! carried wildcards.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod normalize;
pub mod shape;
pub mod translator;

pub use auth::{AclRule, AclSet, AuthContext, Permission, Role};
pub use normalize::{normalize, Dialect, NormalizedRequest};
pub use shape::{shape_flat, shape_grouped};
pub use translator::Translator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
