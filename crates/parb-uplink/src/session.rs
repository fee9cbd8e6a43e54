// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The uplink receive loop.
//!
//! One task drains the transport: request-carrying frames (req, retrieve,
//! event) with a non-empty payload go through the translator, the reply is
//! framed with the inbound kind, swapped endpoints and the preserved
//! transaction uuid, and everything else is logged and dropped. Transport
//! send failures are logged and never surface as request errors.
//!
//! The receive call uses a bounded timeout so a raised shutdown flag stops
//! the loop within one timeout interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use parb_core::error::UplinkError;
use parb_notify::NotificationSink;
use parb_proto::{AuthContext, Translator};

use crate::frame::Frame;
use crate::transport::UplinkTransport;

// =============================================================================
// Configuration
// =============================================================================

/// Uplink session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    /// Name this bridge registers under on the uplink.
    pub service_name: String,
    /// Fallback destination for event replies and notifications.
    pub events_destination: String,
    /// Receive timeout; bounds shutdown latency.
    pub recv_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_name: "config".to_string(),
            events_destination: "event:device-status".to_string(),
            recv_timeout_ms: 2000,
        }
    }
}

impl SessionConfig {
    fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

// =============================================================================
// UplinkSession
// =============================================================================

/// The request/reply session over the uplink transport.
pub struct UplinkSession {
    transport: Arc<dyn UplinkTransport>,
    translator: Arc<Translator>,
    config: SessionConfig,
    auth_ctx: AuthContext,
}

impl UplinkSession {
    /// Creates a session.
    pub fn new(
        transport: Arc<dyn UplinkTransport>,
        translator: Arc<Translator>,
        config: SessionConfig,
        auth_ctx: AuthContext,
    ) -> Self {
        Self {
            transport,
            translator,
            config,
            auth_ctx,
        }
    }

    /// Runs the receive loop until `run` clears or the transport closes.
    pub async fn run(&self, run: Arc<AtomicBool>) {
        info!(service = %self.config.service_name, "uplink session running");

        while run.load(Ordering::SeqCst) {
            match self.transport.recv(self.config.recv_timeout()).await {
                Ok(None) => continue,
                Ok(Some(frame)) => self.handle_frame(frame).await,
                Err(UplinkError::Closed) => {
                    info!("uplink transport closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "uplink receive failed");
                }
            }
        }

        info!("uplink session exiting");
    }

    /// Processes one inbound frame.
    pub async fn handle_frame(&self, frame: Frame) {
        if !frame.kind.carries_request() || frame.payload_is_empty() {
            debug!(kind = ?frame.kind, "frame dropped");
            return;
        }

        let reply_payload = self
            .translator
            .handle_payload(
                &frame.payload,
                frame.transaction_uuid.as_deref(),
                &self.auth_ctx,
            )
            .await
            .to_string()
            .into_bytes();

        let mut reply = frame.reply_with(
            &self.config.service_name,
            &self.config.events_destination,
            reply_payload,
        );
        if frame.is_bare() {
            // Bare mock-mode lines get bare reply lines.
            reply.source = None;
            reply.dest = None;
            reply.transaction_uuid = None;
        }

        if let Err(e) = self.transport.send(reply).await {
            // Transport errors are logged and the frame dropped; they never
            // bubble out as request errors.
            warn!(error = %e, "reply send failed");
        }
    }
}

impl std::fmt::Debug for UplinkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UplinkSession")
            .field("service", &self.config.service_name)
            .finish()
    }
}

// =============================================================================
// UplinkSink
// =============================================================================

/// Notification sink that frames payloads as uplink events.
pub struct UplinkSink {
    transport: Arc<dyn UplinkTransport>,
    service_name: String,
}

impl UplinkSink {
    /// Creates a sink emitting as `service_name`.
    pub fn new(transport: Arc<dyn UplinkTransport>, service_name: impl Into<String>) -> Self {
        Self {
            transport,
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for UplinkSink {
    async fn emit(&self, destination: &str, payload: String) -> Result<(), UplinkError> {
        let frame = Frame::event(
            self.service_name.clone(),
            destination,
            payload.into_bytes(),
        );
        self.transport.send(frame).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use parb_bus::{MemoryBackend, ParamBusAdapter};
    use parb_cache::{CacheConfig, ParamCache};
    use parb_core::codec::TypedValue;
    use parb_core::hooks::NoopPerfSink;
    use parb_proto::AclSet;

    use crate::frame::FrameKind;
    use crate::transport::ChannelTransport;

    fn session_harness() -> (
        Arc<MemoryBackend>,
        UplinkSession,
        mpsc::Sender<Frame>,
        mpsc::Receiver<Frame>,
    ) {
        let backend = Arc::new(MemoryBackend::new("parodus2rbus.client"));
        let (event_tx, _event_rx) = mpsc::channel(16);
        let adapter = Arc::new(ParamBusAdapter::new(
            backend.clone(),
            Arc::new(ParamCache::new(CacheConfig::default())),
            Arc::new(NoopPerfSink),
            event_tx,
        ));
        let translator = Arc::new(Translator::new(adapter, AclSet::default_rules()));
        let (transport, to_transport, from_transport) = ChannelTransport::new(8);
        let session = UplinkSession::new(
            Arc::new(transport),
            translator,
            SessionConfig::default(),
            AuthContext::operator("uplink"),
        );
        (backend, session, to_transport, from_transport)
    }

    #[tokio::test]
    async fn test_request_reply_swaps_and_preserves_uuid() {
        let (backend, session, _to, mut from) = session_harness();
        backend.seed("Device.A", TypedValue::Int(1));

        let frame = Frame::request(
            "mac:peer/api",
            "mac:device/config",
            "uuid-5",
            json!({"op": "GET", "params": ["Device.A"]}).to_string().into_bytes(),
        );
        session.handle_frame(frame).await;

        let reply = from.recv().await.unwrap();
        assert_eq!(reply.kind, FrameKind::Req);
        assert_eq!(reply.source.as_deref(), Some("mac:device/config"));
        assert_eq!(reply.dest.as_deref(), Some("mac:peer/api"));
        assert_eq!(reply.transaction_uuid.as_deref(), Some("uuid-5"));

        let payload: Value = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(payload["status"], 200);
        // The transaction uuid backfills the correlation id.
        assert_eq!(payload["id"], "uuid-5");
    }

    #[tokio::test]
    async fn test_event_frame_replied_as_event() {
        let (backend, session, _to, mut from) = session_harness();
        backend.seed("Device.A", TypedValue::Int(1));

        let frame = Frame {
            kind: FrameKind::Event,
            source: Some("mac:peer/app".to_string()),
            dest: Some("mac:device/config".to_string()),
            transaction_uuid: None,
            content_type: None,
            payload: json!({"op": "GET", "params": ["Device.A"]}).to_string().into_bytes(),
        };
        session.handle_frame(frame).await;

        let reply = from.recv().await.unwrap();
        assert_eq!(reply.kind, FrameKind::Event);
        assert_eq!(reply.dest.as_deref(), Some("mac:peer/app"));
    }

    #[tokio::test]
    async fn test_non_request_kinds_dropped() {
        let (_backend, session, _to, mut from) = session_harness();

        let frame = Frame {
            kind: FrameKind::Update,
            source: Some("a".into()),
            dest: Some("b".into()),
            transaction_uuid: Some("u".into()),
            content_type: None,
            payload: b"{}".to_vec(),
        };
        session.handle_frame(frame).await;

        let empty = Frame::request("a", "b", "u", Vec::new());
        session.handle_frame(empty).await;

        assert!(from.try_recv().is_err(), "no reply expected");
    }

    #[tokio::test]
    async fn test_run_loop_and_shutdown() {
        let (backend, session, to, mut from) = session_harness();
        backend.seed("Device.A", TypedValue::Int(7));

        let run = Arc::new(AtomicBool::new(true));
        let session = Arc::new(session);
        let loop_handle = {
            let session = session.clone();
            let run = run.clone();
            tokio::spawn(async move { session.run(run).await })
        };

        to.send(Frame::request(
            "peer",
            "device",
            "u-1",
            json!({"op": "GET", "params": ["Device.A"]}).to_string().into_bytes(),
        ))
        .await
        .unwrap();

        let reply = from.recv().await.unwrap();
        let payload: Value = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(payload["results"]["Device.A"]["v"], "7");

        // Dropping the sender closes the transport; the loop exits on its own.
        drop(to);
        tokio::time::timeout(Duration::from_secs(2), loop_handle)
            .await
            .expect("loop must exit after close")
            .unwrap();
    }

    #[tokio::test]
    async fn test_uplink_sink_frames_notifications() {
        let (transport, _to, mut from) = ChannelTransport::new(4);
        let sink = UplinkSink::new(Arc::new(transport), "config");

        sink.emit("event:device-status", "{\"type\":1}".to_string())
            .await
            .unwrap();

        let frame = from.recv().await.unwrap();
        assert_eq!(frame.kind, FrameKind::Event);
        assert_eq!(frame.source.as_deref(), Some("config"));
        assert_eq!(frame.dest.as_deref(), Some("event:device-status"));
    }
}
