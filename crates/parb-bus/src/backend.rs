// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The raw parameter-bus backend trait.
//!
//! Implementations speak the platform bus's native vocabulary: typed values,
//! partial-path queries, table instance numbers, and push events delivered
//! from the bus library's own callback context. Everything uplink-facing
//! (wire types, caching, refcounts, status codes) lives above this trait in
//! the adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use parb_core::codec::TypedValue;
use parb_core::error::BusResult;

// =============================================================================
// Bus Events
// =============================================================================

/// Categories of push events the bus publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEventKind {
    /// A parameter's value changed.
    ValueChanged,
    /// A table row was created.
    ObjectCreated,
    /// A table row was deleted.
    ObjectDeleted,
}

/// A push event delivered by the bus.
///
/// Events arrive on the backend's callback context and are forwarded over an
/// mpsc channel; the receiving pipeline must never call back into the bus
/// synchronously.
#[derive(Debug, Clone)]
pub struct BusEvent {
    /// The parameter or row path the event concerns.
    pub name: String,
    /// Event category.
    pub kind: BusEventKind,
    /// New value for value-change events.
    pub value: Option<TypedValue>,
    /// Write id carried in event metadata, when the bus provides one.
    pub write_id: Option<String>,
    /// Additional event properties (e.g. `MACAddress` on host-table events).
    pub properties: HashMap<String, String>,
}

impl BusEvent {
    /// Creates a value-change event.
    pub fn value_changed(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            kind: BusEventKind::ValueChanged,
            value: Some(value),
            write_id: None,
            properties: HashMap::new(),
        }
    }

    /// Creates an object-created event.
    pub fn object_created(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BusEventKind::ObjectCreated,
            value: None,
            write_id: None,
            properties: HashMap::new(),
        }
    }

    /// Creates an object-deleted event.
    pub fn object_deleted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BusEventKind::ObjectDeleted,
            value: None,
            write_id: None,
            properties: HashMap::new(),
        }
    }

    /// Attaches a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attaches a write id.
    pub fn with_write_id(mut self, write_id: impl Into<String>) -> Self {
        self.write_id = Some(write_id.into());
        self
    }
}

// =============================================================================
// ParamBackend Trait
// =============================================================================

/// The raw bus surface.
///
/// # Thread Safety
///
/// Implementations are shared behind `Arc` between the request path and the
/// event pipeline and must be `Send + Sync`.
///
/// # Errors
///
/// Backend-native failure codes are mapped into the [`parb_core::BusError`]
/// taxonomy before they cross this boundary, so callers never see raw bus
/// error numbers.
#[async_trait]
pub trait ParamBackend: Send + Sync {
    /// Returns the component name this handle is registered under.
    fn component(&self) -> &str;

    /// Reads a parameter's native typed value.
    async fn get(&self, name: &str) -> BusResult<TypedValue>;

    /// Writes a parameter as a string; the bus coerces or rejects.
    async fn set_str(&self, name: &str, value: &str) -> BusResult<()>;

    /// Writes a parameter with an explicit native value.
    async fn set_typed(&self, name: &str, value: TypedValue) -> BusResult<()>;

    /// Expands a partial path.
    ///
    /// Accepts both trailing-`.` group prefixes and interior-`*` table
    /// patterns; returns fully qualified names in bus order. An empty result
    /// is not an error.
    async fn expand(&self, pattern: &str) -> BusResult<Vec<String>>;

    /// Allocates a new row under a table path, returning the instance number.
    async fn add_row(&self, table: &str) -> BusResult<u32>;

    /// Removes the row at the given fully qualified row path.
    async fn remove_row(&self, row: &str) -> BusResult<()>;

    /// Registers a push-event subscription; events flow into `tx`.
    async fn subscribe(&self, event: &str, tx: mpsc::Sender<BusEvent>) -> BusResult<()>;

    /// Releases a push-event subscription.
    async fn unsubscribe(&self, event: &str) -> BusResult<()>;

    /// Probes whether a parameter supports value-change notifications.
    ///
    /// The default backend cannot tell; attribute emulation treats that as
    /// notifications-off.
    async fn probe_notify(&self, _name: &str) -> BusResult<bool> {
        Ok(false)
    }

    /// Releases the bus handle. Idempotent.
    async fn close(&self) -> BusResult<()> {
        Ok(())
    }
}
