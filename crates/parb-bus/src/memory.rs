// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory parameter-bus backend.
//!
//! Serves mock mode, the integration suite and every component test that
//! needs a bus without the platform library. The store keeps native typed
//! values, allocates table instance numbers per table path, and fans push
//! events out to matching subscriptions the way the real bus's callback
//! thread would.
//!
//! # Features
//!
//! - **Typed store**: values keep their native type; string sets coerce
//!   against the stored type and reject like the real bus
//! - **Partial-path queries**: trailing-`.` prefixes and interior-`*`
//!   patterns
//! - **Failure injection**: force writes or reads on chosen names to fail
//! - **Call counters**: read/write counts for cache-bypass assertions

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use parb_core::codec::TypedValue;
use parb_core::error::{BusError, BusResult};
use parb_core::types::is_group_wildcard;

use crate::backend::{BusEvent, ParamBackend};

// =============================================================================
// Pattern Matching
// =============================================================================

/// Matches a subscription or expansion pattern against a concrete name.
///
/// Trailing `.` matches the prefix (and the bare prefix itself for events);
/// `*` matches any single run of characters, segment boundaries included,
/// mirroring the loose matching the platform bus applies to table patterns.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern == name {
        return true;
    }
    if is_group_wildcard(pattern) && !pattern.contains('*') {
        return name.starts_with(pattern);
    }
    if !pattern.contains('*') {
        return false;
    }

    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or("");
    if !name.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let mut rest: Vec<&str> = pieces.collect();
    let last = rest.pop().unwrap_or("");

    for piece in rest {
        if piece.is_empty() {
            continue;
        }
        match name[pos..].find(piece) {
            Some(found) => pos += found + piece.len(),
            None => return false,
        }
    }
    name.len() >= pos + last.len() && name.ends_with(last)
}

// =============================================================================
// MemoryBackend
// =============================================================================

/// An in-memory [`ParamBackend`].
pub struct MemoryBackend {
    component: String,

    /// Parameter store keyed by fully qualified name.
    params: DashMap<String, TypedValue>,

    /// Next instance number per table path.
    tables: DashMap<String, u32>,

    /// Active subscriptions: pattern -> event channel.
    subs: Mutex<HashMap<String, mpsc::Sender<BusEvent>>>,

    /// Names whose writes are forced to fail.
    failing_writes: DashMap<String, ()>,

    /// Names whose reads are forced to fail.
    failing_reads: DashMap<String, ()>,

    read_count: AtomicU64,
    write_count: AtomicU64,
}

impl MemoryBackend {
    /// Creates an empty backend registered under `component`.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            params: DashMap::new(),
            tables: DashMap::new(),
            subs: Mutex::new(HashMap::new()),
            failing_writes: DashMap::new(),
            failing_reads: DashMap::new(),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    /// Seeds a parameter without emitting events.
    pub fn seed(&self, name: impl Into<String>, value: TypedValue) {
        self.params.insert(name.into(), value);
    }

    /// Forces subsequent writes to `name` to fail with an internal error.
    pub fn fail_writes_to(&self, name: impl Into<String>) {
        self.failing_writes.insert(name.into(), ());
    }

    /// Forces subsequent reads of `name` to fail with an internal error.
    pub fn fail_reads_of(&self, name: impl Into<String>) {
        self.failing_reads.insert(name.into(), ());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failing_writes.clear();
        self.failing_reads.clear();
    }

    /// Number of `get` calls that reached the backend.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of `set` calls that reached the backend.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Delivers an event to every matching subscription.
    ///
    /// Exposed so tests and the mock-mode harness can simulate events the
    /// store cannot synthesize on its own (host joins, external writes).
    pub async fn inject_event(&self, event: BusEvent) {
        let targets: Vec<mpsc::Sender<BusEvent>> = {
            let subs = self.subs.lock();
            subs.iter()
                .filter(|(pattern, _)| pattern_matches(pattern, &event.name))
                .map(|(_, tx)| tx.clone())
                .collect()
        };
        for tx in targets {
            // A full or closed pipeline drops the event; the bus does not
            // buffer on behalf of slow consumers.
            let _ = tx.send(event.clone()).await;
        }
    }

    async fn emit(&self, event: BusEvent) {
        self.inject_event(event).await;
    }

    /// Whether any subscription currently matches `name` exactly.
    pub fn has_subscription(&self, name: &str) -> bool {
        self.subs.lock().contains_key(name)
    }

    fn store(&self, name: &str, value: TypedValue) {
        self.params.insert(name.to_string(), value);
    }
}

#[async_trait]
impl ParamBackend for MemoryBackend {
    fn component(&self) -> &str {
        &self.component
    }

    async fn get(&self, name: &str) -> BusResult<TypedValue> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        if self.failing_reads.contains_key(name) {
            return Err(BusError::internal(format!("injected read failure: {}", name)));
        }
        self.params
            .get(name)
            .map(|v| v.value().clone())
            .ok_or_else(|| BusError::not_found(name))
    }

    async fn set_str(&self, name: &str, value: &str) -> BusResult<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        if self.failing_writes.contains_key(name) {
            return Err(BusError::internal(format!("injected write failure: {}", name)));
        }

        let coerced = match self.params.get(name) {
            Some(existing) => {
                let (_, wire_type) = existing.value().encode();
                match TypedValue::decode(value, wire_type) {
                    Ok(v) => v,
                    // An empty write clears the slot whatever its type;
                    // anything else must coerce.
                    Err(_) if value.is_empty() => TypedValue::Str(String::new()),
                    Err(e) => return Err(BusError::invalid_value(name, e.to_string())),
                }
            }
            None => TypedValue::Str(value.to_string()),
        };

        self.store(name, coerced.clone());
        self.emit(BusEvent::value_changed(name, coerced)).await;
        Ok(())
    }

    async fn set_typed(&self, name: &str, value: TypedValue) -> BusResult<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        if self.failing_writes.contains_key(name) {
            return Err(BusError::internal(format!("injected write failure: {}", name)));
        }
        self.store(name, value.clone());
        self.emit(BusEvent::value_changed(name, value)).await;
        Ok(())
    }

    async fn expand(&self, pattern: &str) -> BusResult<Vec<String>> {
        let mut names: Vec<String> = self
            .params
            .iter()
            .map(|e| e.key().clone())
            .filter(|name| name != pattern && pattern_matches(pattern, name))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn add_row(&self, table: &str) -> BusResult<u32> {
        if !is_group_wildcard(table) {
            return Err(BusError::NotWildcard { name: table.to_string() });
        }
        let mut next = self.tables.entry(table.to_string()).or_insert(0);
        *next += 1;
        let instance = *next;
        drop(next);

        let row = format!("{}{}.", table, instance);
        debug!(table, instance, "row allocated");
        self.emit(BusEvent::object_created(row)).await;
        Ok(instance)
    }

    async fn remove_row(&self, row: &str) -> BusResult<()> {
        let members: Vec<String> = self
            .params
            .iter()
            .map(|e| e.key().clone())
            .filter(|name| name.starts_with(row))
            .collect();
        if members.is_empty() && !self.tables.iter().any(|t| row.starts_with(t.key())) {
            return Err(BusError::not_found(row));
        }
        for name in members {
            self.params.remove(&name);
        }
        self.emit(BusEvent::object_deleted(row)).await;
        Ok(())
    }

    async fn subscribe(&self, event: &str, tx: mpsc::Sender<BusEvent>) -> BusResult<()> {
        self.subs.lock().insert(event.to_string(), tx);
        Ok(())
    }

    async fn unsubscribe(&self, event: &str) -> BusResult<()> {
        match self.subs.lock().remove(event) {
            Some(_) => Ok(()),
            None => Err(BusError::not_found(event)),
        }
    }

    async fn probe_notify(&self, name: &str) -> BusResult<bool> {
        // The store can always notify on anything it holds.
        Ok(self.params.contains_key(name))
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("component", &self.component)
            .field("params", &self.params.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BusEventKind;

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("Device.WiFi.", "Device.WiFi.Radio.1.Enable"));
        assert!(!pattern_matches("Device.WiFi.", "Device.Ethernet.1"));
        assert!(pattern_matches(
            "Device.WiFi.Radio.*.Enable",
            "Device.WiFi.Radio.2.Enable"
        ));
        assert!(!pattern_matches(
            "Device.WiFi.Radio.*.Enable",
            "Device.WiFi.Radio.2.Status"
        ));
        assert!(pattern_matches("Device.Hosts.Host.*", "Device.Hosts.Host.3."));
        assert!(pattern_matches("Device.X", "Device.X"));
        assert!(!pattern_matches("Device.X", "Device.XY"));
    }

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let bus = MemoryBackend::new("test");
        bus.set_typed("Device.A", TypedValue::Int(5)).await.unwrap();
        assert_eq!(bus.get("Device.A").await.unwrap(), TypedValue::Int(5));
        assert_eq!(bus.read_count(), 1);
        assert_eq!(bus.write_count(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let bus = MemoryBackend::new("test");
        assert!(matches!(
            bus.get("Device.Missing").await,
            Err(BusError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_string_set_coerces_against_stored_type() {
        let bus = MemoryBackend::new("test");
        bus.seed("Device.Port", TypedValue::Int(80));

        bus.set_str("Device.Port", "8080").await.unwrap();
        assert_eq!(bus.get("Device.Port").await.unwrap(), TypedValue::Int(8080));

        let err = bus.set_str("Device.Port", "not-a-number").await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_expand_prefix_and_pattern() {
        let bus = MemoryBackend::new("test");
        bus.seed("Device.WiFi.Radio.1.Enable", TypedValue::Bool(true));
        bus.seed("Device.WiFi.Radio.2.Enable", TypedValue::Bool(false));
        bus.seed("Device.WiFi.SSID.1.Name", TypedValue::Str("home".into()));

        let all = bus.expand("Device.WiFi.").await.unwrap();
        assert_eq!(all.len(), 3);

        let enables = bus.expand("Device.WiFi.Radio.*.Enable").await.unwrap();
        assert_eq!(
            enables,
            vec![
                "Device.WiFi.Radio.1.Enable".to_string(),
                "Device.WiFi.Radio.2.Enable".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_expand_empty_is_ok() {
        let bus = MemoryBackend::new("test");
        assert!(bus.expand("Device.Nothing.").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_table_rows_allocate_sequential_instances() {
        let bus = MemoryBackend::new("test");
        assert_eq!(bus.add_row("Device.IP.Interface.").await.unwrap(), 1);
        assert_eq!(bus.add_row("Device.IP.Interface.").await.unwrap(), 2);
        assert_eq!(bus.add_row("Device.NAT.PortMapping.").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_row_drops_members() {
        let bus = MemoryBackend::new("test");
        bus.add_row("Device.IP.Interface.").await.unwrap();
        bus.seed("Device.IP.Interface.1.Enable", TypedValue::Bool(true));
        bus.seed("Device.IP.Interface.1.Name", TypedValue::Str("wan0".into()));

        bus.remove_row("Device.IP.Interface.1.").await.unwrap();
        assert!(bus.get("Device.IP.Interface.1.Enable").await.is_err());
    }

    #[tokio::test]
    async fn test_events_reach_matching_subscription() {
        let bus = MemoryBackend::new("test");
        let (tx, mut rx) = mpsc::channel(8);
        bus.subscribe("Device.WiFi.Radio.*.Enable", tx).await.unwrap();

        bus.set_typed("Device.WiFi.Radio.1.Enable", TypedValue::Bool(true))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, BusEventKind::ValueChanged);
        assert_eq!(event.name, "Device.WiFi.Radio.1.Enable");
        assert_eq!(event.value, Some(TypedValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_is_not_found() {
        let bus = MemoryBackend::new("test");
        assert!(bus.unsubscribe("never-subscribed").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let bus = MemoryBackend::new("test");
        bus.seed("Device.A", TypedValue::Int(1));
        bus.fail_writes_to("Device.A");

        let err = bus.set_str("Device.A", "2").await.unwrap_err();
        assert_eq!(err.status_code(), 500);

        bus.clear_failures();
        bus.set_str("Device.A", "2").await.unwrap();
    }
}
