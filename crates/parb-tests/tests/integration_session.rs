// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Frame-level scenarios: the uplink session over a channel transport,
//! end to end through translator, adapter, cache and bus.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use parb_bus::{MemoryBackend, ParamBusAdapter};
use parb_cache::{CacheConfig, ParamCache};
use parb_core::codec::TypedValue;
use parb_core::hooks::NoopPerfSink;
use parb_proto::{AclSet, AuthContext, Translator};
use parb_uplink::{ChannelTransport, Frame, FrameKind, SessionConfig, UplinkSession};

struct SessionRig {
    backend: Arc<MemoryBackend>,
    session: Arc<UplinkSession>,
    to_session: mpsc::Sender<Frame>,
    from_session: mpsc::Receiver<Frame>,
}

fn rig() -> SessionRig {
    let backend = Arc::new(MemoryBackend::new("parodus2rbus.client"));
    let (event_tx, _event_rx) = mpsc::channel(16);
    let adapter = Arc::new(ParamBusAdapter::new(
        backend.clone(),
        Arc::new(ParamCache::new(CacheConfig::default())),
        Arc::new(NoopPerfSink),
        event_tx,
    ));
    let translator = Arc::new(Translator::new(adapter, AclSet::default_rules()));
    let (transport, to_session, from_session) = ChannelTransport::new(16);
    let session = Arc::new(UplinkSession::new(
        Arc::new(transport),
        translator,
        SessionConfig::default(),
        AuthContext::operator("uplink"),
    ));
    SessionRig {
        backend,
        session,
        to_session,
        from_session,
    }
}

#[tokio::test]
async fn request_frame_round_trip() {
    let mut r = rig();
    r.backend.seed("Device.DeviceInfo.SerialNumber", TypedValue::Str("ABC".into()));

    let run = Arc::new(AtomicBool::new(true));
    let handle = {
        let session = r.session.clone();
        let run = run.clone();
        tokio::spawn(async move { session.run(run).await })
    };

    r.to_session
        .send(Frame::request(
            "mac:cloud/api",
            "mac:device/config",
            "uuid-100",
            json!({"op": "GET", "params": ["Device.DeviceInfo.SerialNumber"]})
                .to_string()
                .into_bytes(),
        ))
        .await
        .unwrap();

    let reply = r.from_session.recv().await.unwrap();
    assert_eq!(reply.kind, FrameKind::Req);
    assert_eq!(reply.source.as_deref(), Some("mac:device/config"));
    assert_eq!(reply.dest.as_deref(), Some("mac:cloud/api"));
    assert_eq!(reply.transaction_uuid.as_deref(), Some("uuid-100"));

    let payload: Value = serde_json::from_slice(&reply.payload).unwrap();
    assert_eq!(payload["id"], "uuid-100");
    assert_eq!(payload["status"], 200);
    assert_eq!(payload["results"]["Device.DeviceInfo.SerialNumber"]["v"], "ABC");

    drop(r.to_session);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("session must exit when the transport closes")
        .unwrap();
}

#[tokio::test]
async fn webpa_frame_gets_shaped_reply() {
    let r = rig();
    r.backend.seed("Device.DeviceInfo.X", TypedValue::Int(1));

    let frame = Frame::request(
        "mac:cloud/api",
        "mac:device/config",
        "uuid-2",
        json!({"command": "GET", "names": ["Device.DeviceInfo."]})
            .to_string()
            .into_bytes(),
    );
    r.session.handle_frame(frame).await;

    let mut from = r.from_session;
    let reply = from.recv().await.unwrap();
    let payload: Value = serde_json::from_slice(&reply.payload).unwrap();
    assert_eq!(payload["statusCode"], 200);
    assert_eq!(payload["parameters"][0]["dataType"], 11);
    assert_eq!(payload["parameters"][0]["parameterCount"], 1);
}

#[tokio::test]
async fn event_kind_reply_stays_event() {
    let r = rig();
    r.backend.seed("Device.A", TypedValue::Int(1));

    let frame = Frame {
        kind: FrameKind::Event,
        source: Some("mac:peer/app".to_string()),
        dest: Some("mac:device/config".to_string()),
        transaction_uuid: None,
        content_type: Some("application/json".to_string()),
        payload: json!({"op": "GET", "params": ["Device.A"]}).to_string().into_bytes(),
    };
    r.session.handle_frame(frame).await;

    let mut from = r.from_session;
    let reply = from.recv().await.unwrap();
    assert_eq!(reply.kind, FrameKind::Event);
    assert_eq!(reply.dest.as_deref(), Some("mac:peer/app"));
    assert_eq!(reply.source.as_deref(), Some("config"));
}

#[tokio::test]
async fn unknown_kinds_and_empty_payloads_are_dropped() {
    let r = rig();

    let frame = Frame {
        kind: FrameKind::Auth,
        source: Some("a".into()),
        dest: Some("b".into()),
        transaction_uuid: None,
        content_type: None,
        payload: b"{}".to_vec(),
    };
    r.session.handle_frame(frame).await;
    r.session
        .handle_frame(Frame::request("a", "b", "u", Vec::new()))
        .await;

    let mut from = r.from_session;
    assert!(from.try_recv().is_err());
}

#[tokio::test]
async fn malformed_payload_still_gets_a_reply() {
    let r = rig();

    let frame = Frame::request("a", "b", "u-bad", b"this is not json".to_vec());
    r.session.handle_frame(frame).await;

    let mut from = r.from_session;
    let reply = from.recv().await.unwrap();
    let payload: Value = serde_json::from_slice(&reply.payload).unwrap();
    assert_eq!(payload["status"], 400);
    assert_eq!(payload["message"], "invalid json");
    assert_eq!(reply.transaction_uuid.as_deref(), Some("u-bad"));
}
