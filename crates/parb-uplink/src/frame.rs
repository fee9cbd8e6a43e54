// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The uplink frame model.
//!
//! Frames carry a kind, routing endpoints, a transaction uuid and an opaque
//! payload. Replies keep the inbound kind, swap source and destination and
//! preserve the transaction uuid; event replies fall back to the configured
//! events endpoint when the original frame named no source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use parb_core::error::UplinkError;

// =============================================================================
// FrameKind
// =============================================================================

/// Frame kinds observed on the uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Authorization handshake; handled by the framing library.
    Auth,
    /// Request/response exchange.
    Req,
    /// Fire-and-forget or reply event.
    Event,
    /// CRUD create.
    Create,
    /// CRUD retrieve; carries request payloads like `Req`.
    Retrieve,
    /// CRUD update.
    Update,
    /// CRUD delete.
    Delete,
    /// Anything this bridge does not process.
    Unknown,
}

impl FrameKind {
    /// Returns `true` when a frame of this kind carries a request payload
    /// the translator should process.
    pub fn carries_request(&self) -> bool {
        matches!(self, FrameKind::Req | FrameKind::Retrieve | FrameKind::Event)
    }
}

// =============================================================================
// Frame
// =============================================================================

/// One framed uplink message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame kind.
    pub kind: FrameKind,
    /// Originating endpoint.
    pub source: Option<String>,
    /// Target endpoint.
    pub dest: Option<String>,
    /// Correlation uuid; replies preserve it.
    pub transaction_uuid: Option<String>,
    /// Payload media type.
    pub content_type: Option<String>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// The line-delimited JSON form used by the mock transport.
#[derive(Debug, Serialize, Deserialize)]
struct WireFrame {
    kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    payload: Value,
}

impl Frame {
    /// Creates a request frame.
    pub fn request(
        source: impl Into<String>,
        dest: impl Into<String>,
        transaction_uuid: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: FrameKind::Req,
            source: Some(source.into()),
            dest: Some(dest.into()),
            transaction_uuid: Some(transaction_uuid.into()),
            content_type: Some("application/json".to_string()),
            payload,
        }
    }

    /// Creates an outbound event frame (notifications).
    pub fn event(source: impl Into<String>, dest: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Event,
            source: Some(source.into()),
            dest: Some(dest.into()),
            transaction_uuid: None,
            content_type: Some("application/json".to_string()),
            payload,
        }
    }

    /// Builds the reply frame for this inbound frame.
    ///
    /// The kind is preserved; source and destination swap, falling back to
    /// `service_name`. Event replies route to the original source or, when
    /// absent, to `events_fallback`. The transaction uuid carries over.
    pub fn reply_with(
        &self,
        service_name: &str,
        events_fallback: &str,
        payload: Vec<u8>,
    ) -> Frame {
        match self.kind {
            FrameKind::Event => Frame {
                kind: FrameKind::Event,
                source: Some(service_name.to_string()),
                dest: Some(
                    self.source
                        .clone()
                        .unwrap_or_else(|| events_fallback.to_string()),
                ),
                transaction_uuid: self.transaction_uuid.clone(),
                content_type: Some("application/json".to_string()),
                payload,
            },
            _ => Frame {
                kind: self.kind,
                source: self
                    .dest
                    .clone()
                    .or_else(|| Some(service_name.to_string())),
                dest: self
                    .source
                    .clone()
                    .or_else(|| Some(service_name.to_string())),
                transaction_uuid: self.transaction_uuid.clone(),
                content_type: Some("application/json".to_string()),
                payload,
            },
        }
    }

    /// Returns `true` when the payload is empty.
    pub fn payload_is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Serializes to the mock transport's line form.
    pub fn to_wire_json(&self) -> Result<String, UplinkError> {
        let payload: Value = if self.payload.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.payload)
                .map_err(|e| UplinkError::decode(format!("payload is not json: {}", e)))?
        };
        let wire = WireFrame {
            kind: self.kind,
            source: self.source.clone(),
            dest: self.dest.clone(),
            transaction_uuid: self.transaction_uuid.clone(),
            content_type: self.content_type.clone(),
            payload,
        };
        serde_json::to_string(&wire).map_err(|e| UplinkError::decode(e.to_string()))
    }

    /// Parses the mock transport's line form.
    ///
    /// A line without a `kind` field is treated as a bare request payload,
    /// so plain internal-dialect requests can be piped in directly.
    pub fn from_wire_json(line: &str) -> Result<Frame, UplinkError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| UplinkError::decode(format!("invalid frame line: {}", e)))?;

        if value.get("kind").is_none() {
            return Ok(Frame {
                kind: FrameKind::Req,
                source: None,
                dest: None,
                transaction_uuid: None,
                content_type: Some("application/json".to_string()),
                payload: line.as_bytes().to_vec(),
            });
        }

        let wire: WireFrame = serde_json::from_value(value)
            .map_err(|e| UplinkError::decode(format!("invalid frame: {}", e)))?;
        let payload = match &wire.payload {
            Value::Null => Vec::new(),
            other => other.to_string().into_bytes(),
        };
        Ok(Frame {
            kind: wire.kind,
            source: wire.source,
            dest: wire.dest,
            transaction_uuid: wire.transaction_uuid,
            content_type: wire.content_type,
            payload,
        })
    }

    /// Returns `true` when this frame was synthesized from a bare payload
    /// line (no routing metadata).
    pub fn is_bare(&self) -> bool {
        self.source.is_none() && self.dest.is_none() && self.transaction_uuid.is_none()
    }
}

// =============================================================================
// Tests
// =============================================================================
