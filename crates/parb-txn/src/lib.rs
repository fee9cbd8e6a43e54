// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-txn
//!
//! The transactional configuration engine of PARB.
//!
//! Bulk multi-parameter changes run through a fixed lifecycle:
//!
//! ```text
//! validate ─▶ snapshot ─▶ apply ─▶ classify ─▶ rollback? ─▶ publish
//!  (size,     (atomic     (per     (Success/    (atomic,     (callback
//!   fields)    only)       param)   Failure/     on fail)     + stats)
//!                                   Partial)
//! ```
//!
//! Atomic transactions stop at the first failure and restore the snapshot;
//! they terminate in exactly Success or Failure, never Partial.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod engine;
mod model;

pub use engine::{TxnConfig, TxnEngine, TxnNotifyCallback, TxnStats};
pub use model::{ParamResult, Transaction, TxnOp, TxnParam, TxnResult, TxnStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
