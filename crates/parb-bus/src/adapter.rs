// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The typed parambus adapter.
//!
//! [`ParamBusAdapter`] is the single boundary the translator and the
//! transaction engine program against. It layers on top of a raw
//! [`ParamBackend`]:
//!
//! - the parameter cache as a read-through, write-invalidating proxy
//! - native ↔ wire type projection through the value codec
//! - table row composition (`<table><instance>.`)
//! - attribute emulation for buses that expose no attribute metadata
//! - refcounted event subscriptions
//! - an adapter-level atomic compare-and-set
//!
//! # Ordering guarantees
//!
//! A successful `set` invalidates the cached entry *before* returning, so a
//! get issued after a set never observes the overwritten value from cache.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use parb_cache::ParamCache;
use parb_core::codec::TypedValue;
use parb_core::envelope::TableRow;
use parb_core::error::{BusError, BusResult};
use parb_core::hooks::PerfSink;
use parb_core::types::{
    is_group_wildcard, AccessMode, Attribute, NotifyMode, WireType,
};

use crate::backend::{BusEvent, ParamBackend};
use crate::subscription::SubscriptionRegistry;

// =============================================================================
// Row Add Outcome
// =============================================================================

/// Result of adding a table row.
///
/// Row allocation and row-parameter population are separate bus operations;
/// a failed parameter set does not undo the allocation. Atomic contexts
/// (the transaction engine) are responsible for rolling back.
#[derive(Debug)]
pub struct RowAddOutcome {
    /// Fully qualified path of the new row, trailing dot.
    pub row_path: String,
    /// Per-field failures encountered while populating the row.
    pub field_failures: Vec<(String, BusError)>,
}

impl RowAddOutcome {
    /// Returns `true` when every field was set.
    pub fn fully_populated(&self) -> bool {
        self.field_failures.is_empty()
    }
}

// =============================================================================
// ParamBusAdapter
// =============================================================================

/// The typed get/set/subscribe/table boundary over the parameter bus.
pub struct ParamBusAdapter {
    backend: Arc<dyn ParamBackend>,
    cache: Arc<ParamCache>,
    subs: SubscriptionRegistry,
    perf: Arc<dyn PerfSink>,
    /// Channel bus events are delivered on; consumed by the event pipeline.
    event_tx: mpsc::Sender<BusEvent>,
    /// Serializes read-compare-set sequences. Atomic at this layer only.
    tas_lock: Mutex<()>,
}

impl ParamBusAdapter {
    /// Creates an adapter over an open backend handle.
    pub fn new(
        backend: Arc<dyn ParamBackend>,
        cache: Arc<ParamCache>,
        perf: Arc<dyn PerfSink>,
        event_tx: mpsc::Sender<BusEvent>,
    ) -> Self {
        Self {
            backend,
            cache,
            subs: SubscriptionRegistry::new(),
            perf,
            event_tx,
            tas_lock: Mutex::new(()),
        }
    }

    /// The component name the backend handle is registered under.
    pub fn component(&self) -> &str {
        self.backend.component()
    }

    /// The cache this adapter reads through.
    pub fn cache(&self) -> &Arc<ParamCache> {
        &self.cache
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads a parameter's string rendering.
    pub async fn get(&self, name: &str) -> BusResult<String> {
        self.get_typed(name).await.map(|(value, _)| value)
    }

    /// Reads a parameter's string rendering plus wire type.
    ///
    /// Served from cache when a live entry exists; otherwise reads the
    /// backend, projects the native type and populates the cache.
    pub async fn get_typed(&self, name: &str) -> BusResult<(String, WireType)> {
        if let Some(hit) = self.cache.get(name) {
            self.perf.cache_op("get", true);
            debug!(name, "cache hit");
            return Ok(hit);
        }
        self.perf.cache_op("get", false);

        let start = Instant::now();
        let result = self.backend.get(name).await;
        self.perf
            .bus_op("get", name, start.elapsed(), result.is_ok());

        let value = result?;
        let (rendering, wire_type) = value.encode();
        self.cache.set(name, &rendering, wire_type, None);
        Ok((rendering, wire_type))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes a parameter as a string; the bus coerces or rejects.
    ///
    /// Invalidates the cached entry before returning success.
    pub async fn set(&self, name: &str, value: &str) -> BusResult<()> {
        let start = Instant::now();
        let result = self.backend.set_str(name, value).await;
        self.perf
            .bus_op("set", name, start.elapsed(), result.is_ok());
        result?;

        self.cache.delete(name);
        Ok(())
    }

    /// Writes a parameter with an explicit typed value.
    pub async fn set_typed(&self, name: &str, value: TypedValue) -> BusResult<()> {
        let start = Instant::now();
        let result = self.backend.set_typed(name, value).await;
        self.perf
            .bus_op("set", name, start.elapsed(), result.is_ok());
        result?;

        self.cache.delete(name);
        Ok(())
    }

    /// Decodes a wire pair through the codec and writes the typed result.
    ///
    /// Used by TEST_AND_SET, row population and the transaction engine so
    /// the backend receives the native representation.
    pub async fn set_wire(&self, name: &str, value: &str, wire_type: WireType) -> BusResult<()> {
        let typed = TypedValue::decode(value, wire_type)
            .map_err(|e| BusError::invalid_value(name, e.to_string()))?;
        self.set_typed(name, typed).await
    }

    // =========================================================================
    // Wildcards
    // =========================================================================

    /// Expands a group wildcard (trailing `.`) into fully qualified names.
    ///
    /// An empty expansion is not an error.
    pub async fn expand_wildcard(&self, prefix: &str) -> BusResult<Vec<String>> {
        if !is_group_wildcard(prefix) {
            return Err(BusError::NotWildcard { name: prefix.to_string() });
        }
        self.backend.expand(prefix).await
    }

    /// Expands an interior-`*` table pattern via the bus partial-path query.
    pub async fn expand_pattern(&self, pattern: &str) -> BusResult<Vec<String>> {
        self.backend.expand(pattern).await
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Adds a row to a table and populates its fields.
    ///
    /// The bus assigns the instance number; the adapter composes the row
    /// path as `<table><instance>.`. Field failures are reported in the
    /// outcome without undoing the allocation.
    pub async fn add_table_row(&self, table: &str, row: &TableRow) -> BusResult<RowAddOutcome> {
        let start = Instant::now();
        let result = self.backend.add_row(table).await;
        self.perf
            .bus_op("add_row", table, start.elapsed(), result.is_ok());
        let instance = result?;
        let row_path = format!("{}{}.", table, instance);

        let mut field_failures = Vec::new();
        for field in row {
            let param = format!("{}{}", row_path, field.name);
            if let Err(e) = self.set_wire(&param, &field.value, field.data_type).await {
                warn!(param = %param, error = %e, "row field set failed");
                field_failures.push((field.name.clone(), e));
            }
        }

        info!(row = %row_path, failures = field_failures.len(), "table row added");
        Ok(RowAddOutcome { row_path, field_failures })
    }

    /// Deletes a table row and drops any cached members.
    pub async fn delete_table_row(&self, row_path: &str) -> BusResult<()> {
        let start = Instant::now();
        let result = self.backend.remove_row(row_path).await;
        self.perf
            .bus_op("remove_row", row_path, start.elapsed(), result.is_ok());
        result?;

        self.cache.invalidate_wildcard(&format!("{}*", row_path));
        Ok(())
    }

    /// Replaces the entire contents of a table.
    ///
    /// Semantically enumerate-existing, delete-each, add-each. Not atomic at
    /// the bus level; callers needing atomicity go through the transaction
    /// engine.
    pub async fn replace_table(&self, table: &str, rows: &[TableRow]) -> BusResult<Vec<String>> {
        let existing = self.expand_wildcard(table).await.unwrap_or_default();
        for row_path in row_paths(table, &existing) {
            if let Err(e) = self.delete_table_row(&row_path).await {
                warn!(row = %row_path, error = %e, "stale row removal failed");
            }
        }

        let mut added = Vec::with_capacity(rows.len());
        for row in rows {
            let outcome = self.add_table_row(table, row).await?;
            added.push(outcome.row_path);
        }
        self.cache.invalidate_wildcard(&format!("{}*", table));
        Ok(added)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Reads attribute metadata for a parameter.
    ///
    /// The bus exposes no attribute store, so notify support is detected by
    /// a subscribe/unsubscribe probe and access defaults to read-write; a
    /// bus-level access denial reports the parameter as read-only. A backend
    /// with real metadata can replace the probe without changing this
    /// contract.
    pub async fn get_attributes(&self, name: &str) -> BusResult<Attribute> {
        match self.backend.get(name).await {
            Ok(_) => {
                let notify = match self.backend.probe_notify(name).await {
                    Ok(true) => NotifyMode::On,
                    _ => NotifyMode::Off,
                };
                Ok(Attribute::new(notify, Some(AccessMode::ReadWrite)))
            }
            Err(BusError::AccessDenied { .. }) => {
                Ok(Attribute::new(NotifyMode::Off, Some(AccessMode::ReadOnly)))
            }
            Err(e) => Err(e),
        }
    }

    /// Applies attribute metadata to a parameter.
    ///
    /// The backend cannot persist metadata; the parameter's existence is
    /// verified and the intended change recorded.
    pub async fn set_attributes(&self, name: &str, attr: &Attribute) -> BusResult<()> {
        self.backend.get(name).await?;
        info!(
            name,
            notify = attr.notify.code(),
            access = attr.access.map(|a| a.as_str()).unwrap_or("unchanged"),
            "attributes applied"
        );
        Ok(())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribes to a bus event, refcounted.
    ///
    /// Only the first subscription per name registers with the bus.
    pub async fn subscribe(&self, event: &str) -> BusResult<()> {
        if self.subs.acquire(event) == 1 {
            if let Err(e) = self.backend.subscribe(event, self.event_tx.clone()).await {
                self.subs.release(event);
                return Err(e);
            }
            debug!(event, "bus subscription registered");
        }
        Ok(())
    }

    /// Unsubscribes from a bus event, refcounted.
    ///
    /// Only the last unsubscribe releases the bus registration.
    /// Unsubscribing an unknown event is an error.
    pub async fn unsubscribe(&self, event: &str) -> BusResult<()> {
        match self.subs.release(event) {
            None => Err(BusError::not_found(event)),
            Some(0) => {
                self.backend.unsubscribe(event).await?;
                debug!(event, "bus subscription released");
                Ok(())
            }
            Some(_) => Ok(()),
        }
    }

    /// Current refcount for an event name.
    pub fn subscription_refcount(&self, event: &str) -> u32 {
        self.subs.refcount(event)
    }

    /// Releases every subscription in reverse subscription order.
    ///
    /// Called once during shutdown, before the bus handle closes.
    pub async fn drain_subscriptions(&self) {
        for event in self.subs.drain_reversed() {
            if let Err(e) = self.backend.unsubscribe(&event).await {
                warn!(event = %event, error = %e, "unsubscribe during drain failed");
            }
        }
    }

    /// Closes the bus handle.
    pub async fn close(&self) -> BusResult<()> {
        self.backend.close().await
    }

    // =========================================================================
    // Compare-and-set
    // =========================================================================

    /// Atomically replaces a value iff its current rendering matches.
    ///
    /// The comparison happens under the canonical string encoding of
    /// `wire_type`. Atomic at the adapter layer (a mutex serializes the
    /// read-compare-set window); the bus itself offers no such guarantee.
    ///
    /// # Errors
    ///
    /// [`BusError::PreconditionFailed`] when the current value does not
    /// match; the set is not attempted and the cache keeps its entry.
    pub async fn test_and_set(
        &self,
        name: &str,
        expected: &str,
        new_value: &str,
        wire_type: WireType,
    ) -> BusResult<()> {
        let _guard = self.tas_lock.lock().await;

        let canonical_expected = TypedValue::decode(expected, wire_type)
            .map_err(|e| BusError::invalid_value(name, e.to_string()))?
            .encode()
            .0;

        let current = self.backend.get(name).await?;
        let (current_rendering, _) = current.encode();

        if current_rendering != canonical_expected {
            info!(name, "test-and-set precondition failed");
            return Err(BusError::precondition_failed(name));
        }

        self.set_wire(name, new_value, wire_type).await
    }
}

/// Derives distinct row paths (`<table><instance>.`) from expanded member
/// parameter names.
fn row_paths(table: &str, members: &[String]) -> Vec<String> {
    let mut rows = Vec::new();
    for member in members {
        let Some(rest) = member.strip_prefix(table) else {
            continue;
        };
        let Some((instance, _)) = rest.split_once('.') else {
            continue;
        };
        if instance.chars().all(|c| c.is_ascii_digit()) && !instance.is_empty() {
            let row = format!("{}{}.", table, instance);
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
    }
    rows
}

impl std::fmt::Debug for ParamBusAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamBusAdapter")
            .field("component", &self.backend.component())
            .field("subscriptions", &self.subs.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parb_cache::{CacheConfig, ParamCache};
    use parb_core::envelope::RowField;
    use parb_core::hooks::NoopPerfSink;

    use crate::memory::MemoryBackend;

    fn adapter_over(backend: Arc<MemoryBackend>) -> ParamBusAdapter {
        let (tx, _rx) = mpsc::channel(16);
        ParamBusAdapter::new(
            backend,
            Arc::new(ParamCache::new(CacheConfig::default())),
            Arc::new(NoopPerfSink),
            tx,
        )
    }

    #[tokio::test]
    async fn test_get_typed_populates_cache() {
        let backend = Arc::new(MemoryBackend::new("test"));
        backend.seed("Device.Serial", TypedValue::Str("ABC".into()));
        let adapter = adapter_over(backend.clone());

        let (v, t) = adapter.get_typed("Device.Serial").await.unwrap();
        assert_eq!((v.as_str(), t), ("ABC", WireType::String));
        assert_eq!(backend.read_count(), 1);

        // Second read is served from cache: no new backend call.
        let (v, _) = adapter.get_typed("Device.Serial").await.unwrap();
        assert_eq!(v, "ABC");
        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn test_set_invalidates_cache() {
        let backend = Arc::new(MemoryBackend::new("test"));
        backend.seed("Device.X", TypedValue::Int(1));
        let adapter = adapter_over(backend.clone());

        adapter.get_typed("Device.X").await.unwrap();
        adapter.set("Device.X", "2").await.unwrap();

        // The next read must go to the bus, not the stale cache entry.
        let (v, t) = adapter.get_typed("Device.X").await.unwrap();
        assert_eq!((v.as_str(), t), ("2", WireType::Int));
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_set_keeps_cache() {
        let backend = Arc::new(MemoryBackend::new("test"));
        backend.seed("Device.X", TypedValue::Int(1));
        let adapter = adapter_over(backend.clone());

        adapter.get_typed("Device.X").await.unwrap();
        backend.fail_writes_to("Device.X");
        assert!(adapter.set("Device.X", "2").await.is_err());

        // Cache still serves the old value; no failure-path invalidation.
        adapter.get_typed("Device.X").await.unwrap();
        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn test_expand_wildcard_requires_trailing_dot() {
        let backend = Arc::new(MemoryBackend::new("test"));
        let adapter = adapter_over(backend);
        let err = adapter.expand_wildcard("Device.NoDot").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_add_table_row_composes_path() {
        let backend = Arc::new(MemoryBackend::new("test"));
        let adapter = adapter_over(backend.clone());

        let row = vec![
            RowField::new("Enable", "true", WireType::Bool),
            RowField::new("Name", "wan0", WireType::String),
        ];
        let outcome = adapter.add_table_row("Device.IP.Interface.", &row).await.unwrap();
        assert_eq!(outcome.row_path, "Device.IP.Interface.1.");
        assert!(outcome.fully_populated());

        // The new row is visible through wildcard expansion.
        let members = adapter.expand_wildcard("Device.IP.Interface.").await.unwrap();
        assert!(members.contains(&"Device.IP.Interface.1.Enable".to_string()));
    }

    #[tokio::test]
    async fn test_replace_table_swaps_rows() {
        let backend = Arc::new(MemoryBackend::new("test"));
        let adapter = adapter_over(backend.clone());

        let old = vec![RowField::new("Name", "old", WireType::String)];
        adapter.add_table_row("Device.T.", &old).await.unwrap();

        let rows = vec![
            vec![RowField::new("Name", "a", WireType::String)],
            vec![RowField::new("Name", "b", WireType::String)],
        ];
        let added = adapter.replace_table("Device.T.", &rows).await.unwrap();
        assert_eq!(added.len(), 2);
        assert!(backend.get("Device.T.1.Name").await.is_err());
    }

    #[tokio::test]
    async fn test_subscription_refcounting() {
        let backend = Arc::new(MemoryBackend::new("test"));
        let adapter = adapter_over(backend.clone());

        adapter.subscribe("Device.E").await.unwrap();
        adapter.subscribe("Device.E").await.unwrap();
        assert_eq!(adapter.subscription_refcount("Device.E"), 2);
        assert!(backend.has_subscription("Device.E"));

        adapter.unsubscribe("Device.E").await.unwrap();
        assert!(backend.has_subscription("Device.E"), "still one holder");

        adapter.unsubscribe("Device.E").await.unwrap();
        assert!(!backend.has_subscription("Device.E"));
        assert!(adapter.unsubscribe("Device.E").await.is_err());
    }

    #[tokio::test]
    async fn test_attribute_probe() {
        let backend = Arc::new(MemoryBackend::new("test"));
        backend.seed("Device.X", TypedValue::Int(1));
        let adapter = adapter_over(backend);

        let attr = adapter.get_attributes("Device.X").await.unwrap();
        assert_eq!(attr.notify, NotifyMode::On);
        assert_eq!(attr.access, Some(AccessMode::ReadWrite));

        assert!(adapter.get_attributes("Device.Missing").await.is_err());
    }

    #[tokio::test]
    async fn test_test_and_set_match_and_mismatch() {
        let backend = Arc::new(MemoryBackend::new("test"));
        backend.seed("Device.Foo", TypedValue::Str("A".into()));
        let adapter = adapter_over(backend.clone());

        // Mismatch: no write, distinct error.
        let err = adapter
            .test_and_set("Device.Foo", "B", "C", WireType::String)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 412);
        assert_eq!(backend.write_count(), 0);
        assert_eq!(backend.get("Device.Foo").await.unwrap(), TypedValue::Str("A".into()));

        // Match: write goes through.
        adapter
            .test_and_set("Device.Foo", "A", "C", WireType::String)
            .await
            .unwrap();
        assert_eq!(backend.get("Device.Foo").await.unwrap(), TypedValue::Str("C".into()));
    }

    #[tokio::test]
    async fn test_drain_subscriptions() {
        let backend = Arc::new(MemoryBackend::new("test"));
        let adapter = adapter_over(backend.clone());
        adapter.subscribe("Device.A").await.unwrap();
        adapter.subscribe("Device.B").await.unwrap();

        adapter.drain_subscriptions().await;
        assert!(!backend.has_subscription("Device.A"));
        assert!(!backend.has_subscription("Device.B"));
        assert_eq!(adapter.subscription_refcount("Device.A"), 0);
    }

    #[test]
    fn test_row_paths_derivation() {
        let members = vec![
            "Device.T.1.Name".to_string(),
            "Device.T.1.Enable".to_string(),
            "Device.T.2.Name".to_string(),
            "Device.T.Meta".to_string(),
        ];
        assert_eq!(
            row_paths("Device.T.", &members),
            vec!["Device.T.1.".to_string(), "Device.T.2.".to_string()]
        );
    }
}
