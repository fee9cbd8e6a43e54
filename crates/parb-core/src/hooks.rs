// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Performance hook points.
//!
//! Metric collection itself is out of scope; the adapter, cache and
//! transaction engine report timings through this trait so a deployment can
//! plug in a real sink without touching the hot path. The default sink
//! drops everything.

use std::fmt;
use std::time::Duration;

// =============================================================================
// PerfSink
// =============================================================================

/// Sink for operation timings.
///
/// Implementations must be cheap: these are called on the hot path with the
/// measured latency of every bus, cache and transaction operation.
pub trait PerfSink: Send + Sync {
    /// Records a parameter-bus operation.
    fn bus_op(&self, op: &str, name: &str, latency: Duration, success: bool);

    /// Records a cache lookup.
    fn cache_op(&self, op: &str, hit: bool);

    /// Records a completed transaction.
    fn transaction(&self, transaction_id: &str, param_count: usize, latency: Duration, success: bool);
}

/// A sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPerfSink;

impl PerfSink for NoopPerfSink {
    fn bus_op(&self, _op: &str, _name: &str, _latency: Duration, _success: bool) {}

    fn cache_op(&self, _op: &str, _hit: bool) {}

    fn transaction(&self, _id: &str, _count: usize, _latency: Duration, _success: bool) {}
}

/// A sink that emits trace-level log lines, useful during bring-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPerfSink;

impl PerfSink for TracingPerfSink {
    fn bus_op(&self, op: &str, name: &str, latency: Duration, success: bool) {
        tracing::trace!(op, name, ?latency, success, "bus op");
    }

    fn cache_op(&self, op: &str, hit: bool) {
        tracing::trace!(op, hit, "cache op");
    }

    fn transaction(&self, transaction_id: &str, param_count: usize, latency: Duration, success: bool) {
        tracing::trace!(transaction_id, param_count, ?latency, success, "transaction");
    }
}

impl fmt::Display for NoopPerfSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "noop")
    }
}

// =============================================================================
// Tests
// =============================================================================
