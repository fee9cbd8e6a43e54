// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event republishing and subscription lifecycle scenarios.

use chrono::Utc;
use serde_json::json;

use parb_bus::BusEvent;
use parb_core::codec::TypedValue;
use parb_core::types::WireType;
use parb_tests::GatewayHarness;

#[tokio::test]
async fn value_change_republished_with_fresh_timestamp() {
    let mut h = GatewayHarness::new();
    h.backend.seed("Device.WiFi.Radio.1.Enable", TypedValue::Bool(false));

    h.adapter.subscribe("Device.WiFi.Radio.1.Enable").await.unwrap();

    let before = Utc::now().timestamp_millis() as u64;
    h.backend
        .inject_event(BusEvent::value_changed(
            "Device.WiFi.Radio.1.Enable",
            TypedValue::Bool(true),
        ))
        .await;
    h.pump_events().await;

    let emitted = h.sink.emitted();
    assert_eq!(emitted.len(), 1);
    let (dest, json) = &emitted[0];
    assert_eq!(dest, "event:device-status");
    assert_eq!(json["type"], 1);
    assert_eq!(json["data"]["paramName"], "Device.WiFi.Radio.1.Enable");
    assert_eq!(json["data"]["newValue"], "true");
    assert_eq!(json["source"], "config");
    assert_eq!(json["destination"], "event:device-status");

    let timestamp = json["timestamp"].as_u64().unwrap();
    assert!(timestamp >= before && timestamp <= before + 50, "timestamp must be fresh");
}

#[tokio::test]
async fn old_value_comes_from_cache_snapshot() {
    let mut h = GatewayHarness::new();
    h.backend.seed("Device.X", TypedValue::Int(5));
    h.adapter.subscribe("Device.X").await.unwrap();

    // Populate the cache through a normal read.
    h.handle(json!({"op": "GET", "params": ["Device.X"]})).await;

    h.backend
        .inject_event(BusEvent::value_changed("Device.X", TypedValue::Int(9)))
        .await;
    h.pump_events().await;

    let emitted = h.sink.emitted();
    assert_eq!(emitted[0].1["data"]["oldValue"], "5");
    assert_eq!(emitted[0].1["data"]["newValue"], "9");
}

#[tokio::test]
async fn host_table_lifecycle_becomes_client_notifications() {
    let mut h = GatewayHarness::new();
    h.adapter.subscribe("Device.Hosts.Host.*").await.unwrap();

    h.backend
        .inject_event(
            BusEvent::object_created("Device.Hosts.Host.7.")
                .with_property("MACAddress", "aa:bb:cc:11:22:33"),
        )
        .await;
    h.backend
        .inject_event(
            BusEvent::object_deleted("Device.Hosts.Host.7.")
                .with_property("MACAddress", "aa:bb:cc:11:22:33"),
        )
        .await;
    h.pump_events().await;

    let emitted = h.sink.emitted();
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].1["type"], 4);
    assert_eq!(emitted[0].1["data"]["macId"], "aa:bb:cc:11:22:33");
    assert_eq!(emitted[0].1["data"]["status"], "Online");
    assert_eq!(emitted[1].1["data"]["status"], "Offline");
}

#[tokio::test]
async fn refcount_invariant_governs_bus_registration() {
    let h = GatewayHarness::new();
    let event = "Device.WiFi.Radio.1.Enable";

    // Two subscribers, one bus registration.
    h.handle(json!({"op": "SUBSCRIBE", "event": event})).await;
    h.handle(json!({"op": "SUBSCRIBE", "event": event})).await;
    assert_eq!(h.adapter.subscription_refcount(event), 2);
    assert!(h.backend.has_subscription(event));

    // First unsubscribe keeps the registration alive.
    h.handle(json!({"op": "UNSUBSCRIBE", "event": event})).await;
    assert_eq!(h.adapter.subscription_refcount(event), 1);
    assert!(h.backend.has_subscription(event));

    // Last unsubscribe releases it.
    h.handle(json!({"op": "UNSUBSCRIBE", "event": event})).await;
    assert_eq!(h.adapter.subscription_refcount(event), 0);
    assert!(!h.backend.has_subscription(event));

    // One more is an error surfaced as 404.
    let resp = h.handle(json!({"op": "UNSUBSCRIBE", "event": event})).await;
    assert_eq!(resp["status"], 404);
}

#[tokio::test]
async fn adapter_set_produces_subscribed_event() {
    let mut h = GatewayHarness::new();
    h.backend.seed("Device.X", TypedValue::Int(1));
    h.adapter.subscribe("Device.X").await.unwrap();

    h.handle(json!({"op": "SET", "param": "Device.X", "value": "2"})).await;
    let processed = h.pump_events().await;

    assert!(processed >= 1);
    let emitted = h.sink.emitted();
    assert_eq!(emitted.last().unwrap().1["data"]["newValue"], "2");
}
