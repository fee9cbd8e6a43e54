// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # parb-cache
//!
//! Read-through parameter cache for PARB.
//!
//! The cache sits between the protocol translator and the parameter bus:
//! successful typed reads populate it, successful writes invalidate it, and
//! repeated reads within the TTL never touch the bus. Entries expire on
//! access, a lazy sweep removes stale entries in bulk, and inserting at
//! capacity evicts a tenth of the store by a deterministic LRU priority.
//!
//! # Concurrency
//!
//! A single coarse `parking_lot::Mutex` guards the store. Bus event
//! callbacks and the request path both mutate it, so every operation,
//! stat-updating reads included, takes the lock. Critical sections are
//! bounded by one lookup plus one allocation; no I/O happens under the lock.
//!
//! # Example
//!
//! ```
//! use parb_cache::{CacheConfig, ParamCache};
//! use parb_core::types::WireType;
//!
//! let cache = ParamCache::new(CacheConfig::default());
//! cache.set("Device.X", "1", WireType::Int, None);
//! assert_eq!(cache.get("Device.X"), Some(("1".to_string(), WireType::Int)));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod store;

pub use store::{CacheConfig, CacheStats, ParamCache};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
