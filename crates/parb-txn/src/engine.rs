// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The transaction engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{info, warn};

use parb_bus::ParamBusAdapter;
use parb_core::error::{BusError, TxnError};
use parb_core::hooks::PerfSink;
use parb_core::types::WireType;

use crate::model::{ParamResult, Transaction, TxnOp, TxnParam, TxnResult, TxnStatus};

// =============================================================================
// Configuration & Statistics
// =============================================================================

/// Transaction engine configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TxnConfig {
    /// Maximum parameters per transaction.
    pub max_transaction_size: usize,
    /// Wall-clock budget for the apply phase, in seconds.
    pub transaction_timeout_seconds: u64,
    /// Whether atomic transactions snapshot and restore on failure.
    pub enable_rollback: bool,
    /// Whether transactions are validated before execution.
    pub enable_validation: bool,
}

impl Default for TxnConfig {
    fn default() -> Self {
        Self {
            max_transaction_size: 100,
            transaction_timeout_seconds: 300,
            enable_rollback: true,
            enable_validation: true,
        }
    }
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct TxnStats {
    /// Transactions executed.
    pub total: u64,
    /// Transactions that fully succeeded.
    pub successful: u64,
    /// Transactions that fully failed or aborted.
    pub failed: u64,
    /// Non-atomic transactions with a mixed outcome.
    pub partial: u64,
    /// Atomic transactions rolled back.
    pub rolled_back: u64,
    /// Parameters processed across all transactions.
    pub total_parameters: u64,
    /// Mean transaction latency in milliseconds.
    pub avg_transaction_ms: f64,
}

/// Callback invoked once per completed transaction.
pub type TxnNotifyCallback = Arc<dyn Fn(&str, TxnStatus, &str) + Send + Sync>;

// =============================================================================
// Snapshot
// =============================================================================

/// Pre-image of one target parameter: its rendering and wire type, or
/// `None` when the parameter had no value before the transaction.
type Snapshot = Vec<(String, Option<(String, WireType)>)>;

// =============================================================================
// TxnEngine
// =============================================================================

/// Drives multi-parameter configuration changes.
pub struct TxnEngine {
    adapter: Arc<ParamBusAdapter>,
    config: TxnConfig,
    stats: Mutex<TxnStats>,
    snapshots: Mutex<HashMap<String, Snapshot>>,
    callback: Mutex<Option<TxnNotifyCallback>>,
    perf: Arc<dyn PerfSink>,
}

impl TxnEngine {
    /// Creates an engine over the adapter.
    pub fn new(adapter: Arc<ParamBusAdapter>, config: TxnConfig, perf: Arc<dyn PerfSink>) -> Self {
        Self {
            adapter,
            config,
            stats: Mutex::new(TxnStats::default()),
            snapshots: Mutex::new(HashMap::new()),
            callback: Mutex::new(None),
            perf,
        }
    }

    /// Registers the completion callback; replaces any previous one.
    pub fn set_notify_callback(&self, callback: TxnNotifyCallback) {
        *self.callback.lock() = Some(callback);
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> TxnStats {
        *self.stats.lock()
    }

    /// Executes a transaction through its whole lifecycle.
    ///
    /// # Errors
    ///
    /// Validation failures return [`TxnError`] without touching the bus.
    /// Bus-level failures during apply are captured per parameter in the
    /// returned [`TxnResult`], not as an `Err`.
    pub async fn execute(&self, txn: &Transaction) -> Result<TxnResult, TxnError> {
        let started = Instant::now();

        if self.config.enable_validation {
            self.validate(txn)?;
        }

        let snapshot_taken = if txn.atomic && self.config.enable_rollback {
            let snapshot = self.take_snapshot(txn).await;
            self.snapshots
                .lock()
                .insert(txn.transaction_id.clone(), snapshot);
            true
        } else {
            false
        };

        let budget = Duration::from_secs(self.config.transaction_timeout_seconds);
        let apply = self.apply(txn);
        let (mut results, timed_out) = match tokio::time::timeout(budget, apply).await {
            Ok(results) => (results, false),
            Err(_) => {
                warn!(transaction_id = %txn.transaction_id, "transaction timed out");
                (Vec::new(), true)
            }
        };

        let successes = results.iter().filter(|r| r.is_success()).count();
        let failures = results.len() - successes;

        let mut status = if timed_out {
            TxnStatus::Timeout
        } else if failures == 0 {
            TxnStatus::Success
        } else if successes == 0 {
            TxnStatus::Failure
        } else {
            TxnStatus::Partial
        };

        let mut rollback_error = None;
        let failed = timed_out || failures > 0;
        if txn.atomic && failed {
            // Atomic never reports Partial: the apply loop stopped at the
            // first failure and the snapshot undoes what did land.
            status = if timed_out { TxnStatus::Timeout } else { TxnStatus::Failure };
            if snapshot_taken {
                if let Err(message) = self.rollback(&txn.transaction_id).await {
                    rollback_error = Some(message.clone());
                    for result in &mut results {
                        if result.is_success() {
                            result.error_message = Some("rolled back".to_string());
                        }
                    }
                    warn!(transaction_id = %txn.transaction_id, message = %message, "rollback failed");
                } else {
                    for result in &mut results {
                        if result.is_success() {
                            result.error_message = Some("rolled back".to_string());
                        }
                    }
                }
                self.stats.lock().rolled_back += 1;
            }
        }
        self.snapshots.lock().remove(&txn.transaction_id);

        let result = TxnResult {
            transaction_id: txn.transaction_id.clone(),
            status,
            results,
            completion_time_ms: unix_millis(),
            rollback_error,
        };

        self.finish(txn, &result, started.elapsed());
        Ok(result)
    }

    /// Convenience: runs a list of SET entries as one transaction.
    pub async fn bulk_set(
        &self,
        params: Vec<TxnParam>,
        atomic: bool,
    ) -> Result<TxnResult, TxnError> {
        let txn = Transaction::new(params, atomic)
            .with_user("bulk")
            .with_source("bulk_api");
        self.execute(&txn).await
    }

    /// Convenience: typed reads of many parameters; failures are skipped.
    pub async fn bulk_get(&self, names: &[String]) -> Vec<(String, String, WireType)> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            if let Ok((value, wire_type)) = self.adapter.get_typed(name).await {
                results.push((name.clone(), value, wire_type));
            }
        }
        results
    }

    // =========================================================================
    // Lifecycle Phases
    // =========================================================================

    fn validate(&self, txn: &Transaction) -> Result<(), TxnError> {
        if txn.parameters.len() > self.config.max_transaction_size {
            return Err(TxnError::TooLarge {
                size: txn.parameters.len(),
                max: self.config.max_transaction_size,
            });
        }
        for (index, param) in txn.parameters.iter().enumerate() {
            if param.name.is_empty() {
                return Err(TxnError::EmptyName { index });
            }
            if param.op.needs_value() && param.value.is_none() {
                return Err(TxnError::MissingValue {
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Records the pre-image of every target parameter.
    async fn take_snapshot(&self, txn: &Transaction) -> Snapshot {
        let mut snapshot: Snapshot = Vec::with_capacity(txn.parameters.len());
        for param in &txn.parameters {
            if snapshot.iter().any(|(name, _)| name == &param.name) {
                continue;
            }
            let previous = self.adapter.get_typed(&param.name).await.ok();
            snapshot.push((param.name.clone(), previous));
        }
        snapshot
    }

    async fn apply(&self, txn: &Transaction) -> Vec<ParamResult> {
        let mut results = Vec::with_capacity(txn.parameters.len());
        for param in &txn.parameters {
            let result = self.apply_one(param).await;
            let failed = !result.is_success();
            results.push(result);
            if txn.atomic && failed {
                break;
            }
        }
        results
    }

    async fn apply_one(&self, param: &TxnParam) -> ParamResult {
        match param.op {
            TxnOp::Set | TxnOp::Replace => {
                let value = param.value.as_deref().unwrap_or_default();
                match self.adapter.set_wire(&param.name, value, param.data_type).await {
                    Ok(()) => ParamResult::success(&param.name, 200),
                    Err(e) => bus_failure(&param.name, &e),
                }
            }
            TxnOp::Get => match self.adapter.get(&param.name).await {
                Ok(_) => ParamResult::success(&param.name, 200),
                Err(e) => bus_failure(&param.name, &e),
            },
            TxnOp::Delete => match self.adapter.set(&param.name, "").await {
                Ok(()) => ParamResult::success(&param.name, 200),
                Err(e) => bus_failure(&param.name, &e),
            },
            TxnOp::Add => {
                // ADD requires the slot to be empty or absent; an existing
                // value is a conflict and the set is skipped.
                match self.adapter.get(&param.name).await {
                    Ok(existing) if !existing.is_empty() => ParamResult::failure(
                        &param.name,
                        409,
                        "parameter already exists",
                    ),
                    Ok(_) | Err(BusError::NotFound { .. }) => {
                        let value = param.value.as_deref().unwrap_or_default();
                        match self
                            .adapter
                            .set_wire(&param.name, value, param.data_type)
                            .await
                        {
                            Ok(()) => ParamResult::success(&param.name, 201),
                            Err(e) => bus_failure(&param.name, &e),
                        }
                    }
                    Err(e) => bus_failure(&param.name, &e),
                }
            }
        }
    }

    /// Restores the snapshot of an aborted atomic transaction.
    async fn rollback(&self, transaction_id: &str) -> Result<(), String> {
        let snapshot = self
            .snapshots
            .lock()
            .remove(transaction_id)
            .ok_or_else(|| "no snapshot recorded".to_string())?;

        let mut first_error = None;
        for (name, previous) in snapshot {
            let restore = match previous {
                Some((value, wire_type)) => self.adapter.set_wire(&name, &value, wire_type).await,
                None => self.adapter.set(&name, "").await,
            };
            if let Err(e) = restore {
                warn!(name = %name, error = %e, "snapshot restore failed");
                first_error.get_or_insert_with(|| format!("restore of '{}' failed: {}", name, e));
            }
        }

        match first_error {
            None => Ok(()),
            Some(message) => Err(message),
        }
    }

    fn finish(&self, txn: &Transaction, result: &TxnResult, elapsed: Duration) {
        {
            let mut stats = self.stats.lock();
            stats.total += 1;
            stats.total_parameters += txn.parameters.len() as u64;
            match result.status {
                TxnStatus::Success => stats.successful += 1,
                TxnStatus::Partial => stats.partial += 1,
                _ => stats.failed += 1,
            }
            let total = stats.total as f64;
            stats.avg_transaction_ms =
                (stats.avg_transaction_ms * (total - 1.0) + elapsed.as_secs_f64() * 1000.0) / total;
        }

        if let Some(callback) = self.callback.lock().clone() {
            callback(
                &result.transaction_id,
                result.status,
                result.status.as_str(),
            );
        }

        self.perf.transaction(
            &result.transaction_id,
            txn.parameters.len(),
            elapsed,
            result.status == TxnStatus::Success,
        );

        info!(
            transaction_id = %result.transaction_id,
            status = result.status.as_str(),
            params = txn.parameters.len(),
            user = %txn.user_id,
            source = %txn.source,
            "transaction finished"
        );
    }
}

fn bus_failure(name: &str, error: &BusError) -> ParamResult {
    ParamResult::failure(name, error.status_code(), error.to_string())
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl std::fmt::Debug for TxnEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnEngine")
            .field("config", &self.config)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
