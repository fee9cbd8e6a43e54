// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service runtime orchestration.
//!
//! All process-wide state (the bus handle, the cache, the subscription
//! table, the configuration) lives in one [`Service`] value with explicit
//! `init` / `shutdown` entry points. Initialization happens at most once
//! per process and shutdown drains in reverse: subscriptions first, bus
//! handle last.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use parb_bus::{BusEvent, MemoryBackend, ParamBackend, ParamBusAdapter};
use parb_cache::ParamCache;
use parb_core::error::{ConfigError, ParbError};
use parb_core::hooks::NoopPerfSink;
use parb_notify::EventPipeline;
use parb_proto::{AuthContext, Translator};
use parb_txn::TxnEngine;
use parb_uplink::{StdioTransport, UplinkSession, UplinkSink, UplinkTransport};

use crate::config::{GatewayConfig, Mode};
use crate::shutdown::ShutdownCoordinator;

/// Capacity of the bus-event channel between adapter and pipeline.
const EVENT_CHANNEL_CAPACITY: usize = 256;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

// =============================================================================
// ServiceBuilder
// =============================================================================

/// Builder wiring the service, with injection points for the platform
/// backend and uplink transport.
///
/// Mock mode defaults to the in-memory backend and the stdio transport.
/// Real mode has no built-in defaults: the platform bindings crate must
/// inject both.
pub struct ServiceBuilder {
    config: GatewayConfig,
    backend: Option<Arc<dyn ParamBackend>>,
    transport: Option<Arc<dyn UplinkTransport>>,
}

impl ServiceBuilder {
    /// Starts a builder from a validated configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            backend: None,
            transport: None,
        }
    }

    /// Injects the parameter-bus backend.
    pub fn backend(mut self, backend: Arc<dyn ParamBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Injects the uplink transport.
    pub fn transport(mut self, transport: Arc<dyn UplinkTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds and initializes the service. Init-once per process.
    pub async fn build(self) -> Result<Service, ParbError> {
        self.config.validate()?;

        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(ConfigError::AlreadyInitialized.into());
        }

        let config = self.config;
        let backend: Arc<dyn ParamBackend> = match (self.backend, config.mode) {
            (Some(backend), _) => backend,
            (None, Mode::Mock) => Arc::new(MemoryBackend::new(config.component.clone())),
            (None, Mode::Real) => {
                INITIALIZED.store(false, Ordering::SeqCst);
                return Err(ConfigError::validation(
                    "mode",
                    "real mode requires an injected parameter-bus backend",
                )
                .into());
            }
        };
        let transport: Arc<dyn UplinkTransport> = match (self.transport, config.mode) {
            (Some(transport), _) => transport,
            (None, Mode::Mock) => Arc::new(StdioTransport::new()),
            (None, Mode::Real) => {
                INITIALIZED.store(false, Ordering::SeqCst);
                return Err(ConfigError::validation(
                    "mode",
                    "real mode requires an injected uplink transport",
                )
                .into());
            }
        };

        Service::wire(config, backend, transport).await
    }
}

// =============================================================================
// Service
// =============================================================================

/// The process-wide service value.
pub struct Service {
    config: GatewayConfig,
    adapter: Arc<ParamBusAdapter>,
    engine: Arc<TxnEngine>,
    pipeline: Arc<EventPipeline>,
    session: Arc<UplinkSession>,
    shutdown: ShutdownCoordinator,
    event_rx: Option<mpsc::Receiver<BusEvent>>,
    shut_down: AtomicBool,
}

impl Service {
    /// Initializes the service with default backends for the configured
    /// mode. Equivalent to `ServiceBuilder::new(config).build()`.
    pub async fn init(config: GatewayConfig) -> Result<Self, ParbError> {
        ServiceBuilder::new(config).build().await
    }

    async fn wire(
        config: GatewayConfig,
        backend: Arc<dyn ParamBackend>,
        transport: Arc<dyn UplinkTransport>,
    ) -> Result<Self, ParbError> {
        let perf = Arc::new(NoopPerfSink);
        let cache = Arc::new(ParamCache::new(config.cache.clone()));
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let adapter = Arc::new(ParamBusAdapter::new(
            backend,
            cache.clone(),
            perf.clone(),
            event_tx,
        ));

        let translator = Arc::new(Translator::new(adapter.clone(), config.effective_acl()));
        let engine = Arc::new(TxnEngine::new(
            adapter.clone(),
            config.txn.clone(),
            perf.clone(),
        ));

        let sink = Arc::new(UplinkSink::new(
            transport.clone(),
            config.session.service_name.clone(),
        ));
        let pipeline = Arc::new(EventPipeline::new(
            config.notify.clone(),
            config.session.service_name.clone(),
            cache,
            sink,
        ));

        // Completed transactions publish a status notification upstream.
        {
            let pipeline = pipeline.clone();
            engine.set_notify_callback(Arc::new(move |transaction_id, status, details| {
                let notification =
                    pipeline.transaction_notification(transaction_id, status.as_str(), details);
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.emit(notification).await });
            }));
        }

        let session = Arc::new(UplinkSession::new(
            transport,
            translator,
            config.session.clone(),
            AuthContext::operator(config.session.service_name.clone()),
        ));

        let service = Self {
            config,
            adapter,
            engine,
            pipeline,
            session,
            shutdown: ShutdownCoordinator::new(),
            event_rx: Some(event_rx),
            shut_down: AtomicBool::new(false),
        };
        service.subscribe_startup_events().await;

        info!(
            component = %service.config.component,
            service = %service.config.session.service_name,
            mode = ?service.config.mode,
            "service initialized"
        );
        Ok(service)
    }

    async fn subscribe_startup_events(&self) {
        for event in &self.config.subscriptions {
            match self.adapter.subscribe(event).await {
                Ok(()) => info!(event = %event, "subscribed"),
                Err(e) => warn!(event = %event, error = %e, "startup subscription failed"),
            }
        }
    }

    /// The transaction engine, for surfaces that drive bulk configuration.
    pub fn engine(&self) -> &Arc<TxnEngine> {
        &self.engine
    }

    /// The parambus adapter.
    pub fn adapter(&self) -> &Arc<ParamBusAdapter> {
        &self.adapter
    }

    /// The shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs until a shutdown signal, then drains and closes.
    pub async fn run(mut self) -> Result<(), ParbError> {
        let event_rx = self
            .event_rx
            .take()
            .expect("run called once per service");

        let pipeline_task: JoinHandle<()> = {
            let pipeline = self.pipeline.clone();
            tokio::spawn(async move { pipeline.run(event_rx).await })
        };
        let signal_task: JoinHandle<()> = {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { shutdown.wait_for_signal().await })
        };

        self.session.run(self.shutdown.run_flag()).await;
        self.shutdown.trigger();

        signal_task.abort();
        pipeline_task.abort();
        self.drain().await;
        info!("service stopped");
        Ok(())
    }

    /// Drains subscriptions (reverse subscription order) and closes the
    /// bus handle. Shutdown-once.
    pub async fn drain(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.adapter.drain_subscriptions().await;
        if let Err(e) = self.adapter.close().await {
            warn!(error = %e, "bus close failed");
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("component", &self.config.component)
            .field("mode", &self.config.mode)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parb_uplink::ChannelTransport;

    fn mock_backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new("test"))
    }

    #[tokio::test]
    async fn test_init_once_and_real_mode_requirements() {
        // Real mode without injected collaborators is refused outright.
        let mut config = GatewayConfig::default();
        config.mode = Mode::Real;
        let err = Service::init(config).await.unwrap_err();
        assert_eq!(err.error_type(), "config");

        // First successful build flips the process-wide flag...
        let backend = mock_backend();
        let (transport, _to, _from) = ChannelTransport::new(4);
        let service = ServiceBuilder::new(GatewayConfig::default())
            .backend(backend.clone())
            .transport(Arc::new(transport))
            .build()
            .await
            .unwrap();

        // ...so a second init in the same process is rejected.
        let (transport2, _to2, _from2) = ChannelTransport::new(4);
        let err = ServiceBuilder::new(GatewayConfig::default())
            .backend(backend.clone())
            .transport(Arc::new(transport2))
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ParbError::Config(ConfigError::AlreadyInitialized)
        ));

        // Startup subscriptions were registered against the backend.
        assert!(backend.has_subscription("Device.Hosts.Host.*"));

        // Drain releases them and is idempotent.
        service.drain().await;
        assert!(!backend.has_subscription("Device.Hosts.Host.*"));
        service.drain().await;
    }
}
