// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The event pipeline.
//!
//! Drains the adapter's bus-event channel and republishes each event as a
//! notification:
//!
//! - value changes become `ParamChange` envelopes, with `oldValue` filled
//!   from the cache snapshot when the config allows it (the bus event does
//!   not carry the previous value)
//! - row lifecycle under the hosts table becomes `ConnectedClient`
//!   Online/Offline envelopes with the MAC from the event properties
//!
//! The pipeline never calls into the parambus synchronously; its only
//! dependencies are the cache snapshot and the uplink sink.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parb_bus::{BusEvent, BusEventKind};
use parb_cache::ParamCache;
use parb_core::error::UplinkError;

use crate::envelope::Notification;

// =============================================================================
// Configuration
// =============================================================================

/// Event pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotifyConfig {
    /// Device identifier carried in device-status notifications.
    pub device_id: String,
    /// Firmware version reported on upgrade notifications.
    pub fw_version: String,
    /// Uplink destination for all notifications.
    pub events_destination: String,
    /// Table prefix whose row lifecycle maps to connected-client events.
    pub hosts_table_prefix: String,
    /// Emit parameter-change notifications.
    pub enable_param_notifications: bool,
    /// Emit connected-client notifications.
    pub enable_client_notifications: bool,
    /// Emit device-status notifications.
    pub enable_device_notifications: bool,
    /// Fill `oldValue` from the cache snapshot; when off (or on a cache
    /// miss) the field carries `"unknown"` for bit-compatibility with
    /// deployments that expect it.
    pub fill_old_value_from_cache: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            device_id: "unknown-device".to_string(),
            fw_version: "1.0.0".to_string(),
            events_destination: "event:device-status".to_string(),
            hosts_table_prefix: "Device.Hosts.Host.".to_string(),
            enable_param_notifications: true,
            enable_client_notifications: true,
            enable_device_notifications: true,
            fill_old_value_from_cache: true,
        }
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Where serialized notifications go.
///
/// The uplink session implements this by framing the payload as an event
/// toward `destination`.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Emits one serialized notification.
    async fn emit(&self, destination: &str, payload: String) -> Result<(), UplinkError>;
}

// =============================================================================
// EventPipeline
// =============================================================================

/// Republishes parambus events as uplink notifications.
pub struct EventPipeline {
    config: NotifyConfig,
    service_name: String,
    cache: Arc<ParamCache>,
    sink: Arc<dyn NotificationSink>,
}

impl EventPipeline {
    /// Creates a pipeline.
    pub fn new(
        config: NotifyConfig,
        service_name: impl Into<String>,
        cache: Arc<ParamCache>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            service_name: service_name.into(),
            cache,
            sink,
        }
    }

    /// The configured events destination.
    pub fn events_destination(&self) -> &str {
        &self.config.events_destination
    }

    /// Drains the bus-event channel until it closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<BusEvent>) {
        info!(destination = %self.config.events_destination, "event pipeline running");
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        info!("event pipeline stopped");
    }

    /// Translates one bus event into zero or one notifications.
    pub async fn handle_event(&self, event: BusEvent) {
        match event.kind {
            BusEventKind::ValueChanged => self.handle_value_change(event).await,
            BusEventKind::ObjectCreated | BusEventKind::ObjectDeleted => {
                self.handle_row_lifecycle(event).await
            }
        }
    }

    async fn handle_value_change(&self, event: BusEvent) {
        if !self.config.enable_param_notifications {
            return;
        }
        let Some(value) = event.value else {
            debug!(name = %event.name, "value change without payload dropped");
            return;
        };
        let (new_value, data_type) = value.encode();

        let old_value = if self.config.fill_old_value_from_cache {
            self.cache
                .get(&event.name)
                .map(|(v, _)| v)
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            "unknown".to_string()
        };

        let write_id = event
            .write_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let notification = Notification::param_change(
            self.service_name.clone(),
            self.config.events_destination.clone(),
            event.name,
            old_value,
            new_value,
            data_type,
            write_id,
        );
        self.emit(notification).await;
    }

    async fn handle_row_lifecycle(&self, event: BusEvent) {
        if !self.config.enable_client_notifications
            || !event.name.starts_with(&self.config.hosts_table_prefix)
        {
            return;
        }
        let Some(mac) = event.properties.get("MACAddress") else {
            debug!(name = %event.name, "host event without MAC dropped");
            return;
        };
        let status = match event.kind {
            BusEventKind::ObjectCreated => "Online",
            _ => "Offline",
        };

        let notification = Notification::connected_client(
            self.service_name.clone(),
            self.config.events_destination.clone(),
            mac.clone(),
            status,
        );
        self.emit(notification).await;
    }

    /// Serializes and emits a notification through the sink.
    ///
    /// Uniform entry point also used for transaction-status, device-status,
    /// factory-reset and firmware-upgrade envelopes originated elsewhere.
    pub async fn emit(&self, notification: Notification) {
        let destination = notification.destination.clone();
        let payload = notification.to_json().to_string();
        debug!(destination = %destination, "emitting notification");
        if let Err(e) = self.sink.emit(&destination, payload).await {
            warn!(error = %e, "notification emission failed");
        }
    }

    /// Builds a transaction-status notification bound for the events
    /// endpoint.
    pub fn transaction_notification(
        &self,
        transaction_id: &str,
        status: &str,
        error_message: &str,
    ) -> Notification {
        Notification::transaction_status(
            self.service_name.clone(),
            self.config.events_destination.clone(),
            transaction_id,
            status,
            error_message,
        )
    }

    /// Builds a device-status notification bound for the events endpoint.
    pub fn device_notification(&self, status: i32, reason: &str) -> Notification {
        Notification::device_status(
            self.service_name.clone(),
            self.config.events_destination.clone(),
            status,
            reason,
            self.config.device_id.clone(),
        )
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPipeline")
            .field("service", &self.service_name)
            .field("destination", &self.config.events_destination)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
