// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A fully wired gateway over the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use parb_bus::{BusEvent, MemoryBackend, ParamBusAdapter};
use parb_cache::{CacheConfig, ParamCache};
use parb_core::error::UplinkError;
use parb_core::hooks::NoopPerfSink;
use parb_notify::{EventPipeline, NotificationSink, NotifyConfig};
use parb_proto::{AclSet, AuthContext, Translator};
use parb_txn::{TxnConfig, TxnEngine};

// =============================================================================
// RecordingSink
// =============================================================================

/// Notification sink that records everything it is handed.
#[derive(Default)]
pub struct RecordingSink {
    emitted: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    /// Snapshot of `(destination, payload)` pairs emitted so far.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().clone()
    }

    /// Number of emitted notifications.
    pub fn len(&self) -> usize {
        self.emitted.lock().len()
    }

    /// Returns `true` when nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, destination: &str, payload: String) -> Result<(), UplinkError> {
        let json = serde_json::from_str(&payload)
            .map_err(|e| UplinkError::decode(e.to_string()))?;
        self.emitted.lock().push((destination.to_string(), json));
        Ok(())
    }
}

// =============================================================================
// GatewayHarness
// =============================================================================

/// Every gateway component short of the uplink session, wired over the
/// in-memory backend.
pub struct GatewayHarness {
    /// The in-memory parameter bus.
    pub backend: Arc<MemoryBackend>,
    /// The shared parameter cache.
    pub cache: Arc<ParamCache>,
    /// The parambus adapter.
    pub adapter: Arc<ParamBusAdapter>,
    /// The protocol translator.
    pub translator: Arc<Translator>,
    /// The transaction engine.
    pub engine: Arc<TxnEngine>,
    /// The event pipeline.
    pub pipeline: Arc<EventPipeline>,
    /// The recording notification sink behind the pipeline.
    pub sink: Arc<RecordingSink>,
    event_rx: mpsc::Receiver<BusEvent>,
}

impl GatewayHarness {
    /// Builds a harness with stock configuration.
    pub fn new() -> Self {
        Self::with_configs(CacheConfig::default(), TxnConfig::default(), NotifyConfig::default())
    }

    /// Builds a harness with explicit component configuration.
    pub fn with_configs(
        cache_config: CacheConfig,
        txn_config: TxnConfig,
        notify_config: NotifyConfig,
    ) -> Self {
        let backend = Arc::new(MemoryBackend::new("parodus2rbus.client"));
        let cache = Arc::new(ParamCache::new(cache_config));
        let (event_tx, event_rx) = mpsc::channel(64);
        let perf = Arc::new(NoopPerfSink);

        let adapter = Arc::new(ParamBusAdapter::new(
            backend.clone(),
            cache.clone(),
            perf.clone(),
            event_tx,
        ));
        let translator = Arc::new(Translator::new(adapter.clone(), AclSet::default_rules()));
        let engine = Arc::new(TxnEngine::new(adapter.clone(), txn_config, perf));

        let sink = Arc::new(RecordingSink::default());
        let pipeline = Arc::new(EventPipeline::new(
            notify_config,
            "config",
            cache.clone(),
            sink.clone(),
        ));

        Self {
            backend,
            cache,
            adapter,
            translator,
            engine,
            pipeline,
            sink,
            event_rx,
        }
    }

    /// Handles one payload as an authenticated operator.
    pub async fn handle(&self, payload: Value) -> Value {
        self.handle_as(payload, None, &AuthContext::operator("test")).await
    }

    /// Handles one payload with an explicit transaction id and context.
    pub async fn handle_as(
        &self,
        payload: Value,
        txn_id: Option<&str>,
        ctx: &AuthContext,
    ) -> Value {
        self.translator
            .handle_payload(payload.to_string().as_bytes(), txn_id, ctx)
            .await
    }

    /// Feeds every pending bus event through the pipeline.
    ///
    /// Returns the number of events processed.
    pub async fn pump_events(&mut self) -> usize {
        let mut processed = 0;
        loop {
            match tokio::time::timeout(Duration::from_millis(50), self.event_rx.recv()).await {
                Ok(Some(event)) => {
                    self.pipeline.handle_event(event).await;
                    processed += 1;
                }
                Ok(None) | Err(_) => break,
            }
        }
        processed
    }
}

impl Default for GatewayHarness {
    fn default() -> Self {
        Self::new()
    }
}
