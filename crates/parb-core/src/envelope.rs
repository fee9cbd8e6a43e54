// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Internal-dialect request and response envelopes.
//!
//! Every inbound payload, whatever dialect it arrived in, is normalized
//! into the [`Request`] sum type before dispatch, and every handler produces
//! a [`Response`] that serializes to the canonical internal-dialect JSON.
//! WebPA egress shaping is layered on top by the translator and never leaks
//! into this model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Attribute, WireType};

// =============================================================================
// Table Rows
// =============================================================================

/// One field of a table row: name, wire rendering and wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowField {
    /// Field name relative to the row path.
    pub name: String,
    /// String rendering of the value.
    pub value: String,
    /// Wire type of the value.
    #[serde(rename = "dataType", default)]
    pub data_type: WireType,
}

impl RowField {
    /// Creates a row field.
    pub fn new(name: impl Into<String>, value: impl Into<String>, data_type: WireType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            data_type,
        }
    }
}

/// An ordered sequence of row fields.
pub type TableRow = Vec<RowField>;

// =============================================================================
// Request
// =============================================================================

/// A normalized uplink request.
///
/// The `id` field, when present, is echoed verbatim into the response. For
/// GET the raw JSON entries are preserved so non-string entries can be
/// reported positionally (`results["_<idx>"] = null`) without aborting the
/// rest of the request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Multi-parameter read, wildcards included.
    Get {
        /// Correlation id.
        id: Option<String>,
        /// Raw entries of the `params` array.
        params: Vec<Value>,
    },
    /// Single-parameter string write.
    Set {
        /// Correlation id.
        id: Option<String>,
        /// Parameter name.
        param: String,
        /// String rendering of the value.
        value: String,
    },
    /// Attribute read.
    GetAttributes {
        /// Correlation id.
        id: Option<String>,
        /// Parameter name.
        param: String,
    },
    /// Attribute write.
    SetAttributes {
        /// Correlation id.
        id: Option<String>,
        /// Parameter name.
        param: String,
        /// Attributes to apply.
        attributes: Attribute,
    },
    /// Table row insertion.
    AddRow {
        /// Correlation id.
        id: Option<String>,
        /// Table path, trailing dot.
        table_name: String,
        /// Fields of the new row.
        row_data: TableRow,
    },
    /// Table row deletion.
    DeleteRow {
        /// Correlation id.
        id: Option<String>,
        /// Fully qualified row path.
        row_name: String,
    },
    /// Whole-table replacement.
    ReplaceRows {
        /// Correlation id.
        id: Option<String>,
        /// Table path, trailing dot.
        table_name: String,
        /// Replacement rows.
        table_data: Vec<TableRow>,
    },
    /// Event subscription.
    Subscribe {
        /// Correlation id.
        id: Option<String>,
        /// Event name.
        event: String,
    },
    /// Event unsubscription.
    Unsubscribe {
        /// Correlation id.
        id: Option<String>,
        /// Event name.
        event: String,
    },
    /// Atomic compare-and-set.
    TestAndSet {
        /// Correlation id.
        id: Option<String>,
        /// Parameter name.
        param: String,
        /// Expected current rendering.
        old_value: String,
        /// Replacement rendering.
        new_value: String,
        /// Wire type governing the comparison encoding.
        data_type: WireType,
    },
}

impl Request {
    /// Returns the correlation id, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Request::Get { id, .. }
            | Request::Set { id, .. }
            | Request::GetAttributes { id, .. }
            | Request::SetAttributes { id, .. }
            | Request::AddRow { id, .. }
            | Request::DeleteRow { id, .. }
            | Request::ReplaceRows { id, .. }
            | Request::Subscribe { id, .. }
            | Request::Unsubscribe { id, .. }
            | Request::TestAndSet { id, .. } => id.as_deref(),
        }
    }

    /// Returns the canonical op name.
    pub fn op_name(&self) -> &'static str {
        match self {
            Request::Get { .. } => "GET",
            Request::Set { .. } => "SET",
            Request::GetAttributes { .. } => "GET_ATTRIBUTES",
            Request::SetAttributes { .. } => "SET_ATTRIBUTES",
            Request::AddRow { .. } => "ADD_ROW",
            Request::DeleteRow { .. } => "DELETE_ROW",
            Request::ReplaceRows { .. } => "REPLACE_ROWS",
            Request::Subscribe { .. } => "SUBSCRIBE",
            Request::Unsubscribe { .. } => "UNSUBSCRIBE",
            Request::TestAndSet { .. } => "TEST_AND_SET",
        }
    }

    /// Returns `true` when the op mutates bus state.
    ///
    /// Drives the read/write permission selection of the authorization hook.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Request::Set { .. }
                | Request::SetAttributes { .. }
                | Request::AddRow { .. }
                | Request::DeleteRow { .. }
                | Request::ReplaceRows { .. }
                | Request::TestAndSet { .. }
        )
    }

    /// Returns every resource name this request touches.
    ///
    /// Non-string GET entries are skipped; they fail positionally during
    /// dispatch instead.
    pub fn resources(&self) -> Vec<&str> {
        match self {
            Request::Get { params, .. } => {
                params.iter().filter_map(|v| v.as_str()).collect()
            }
            Request::Set { param, .. }
            | Request::GetAttributes { param, .. }
            | Request::SetAttributes { param, .. }
            | Request::TestAndSet { param, .. } => vec![param.as_str()],
            Request::AddRow { table_name, .. } | Request::ReplaceRows { table_name, .. } => {
                vec![table_name.as_str()]
            }
            Request::DeleteRow { row_name, .. } => vec![row_name.as_str()],
            Request::Subscribe { event, .. } | Request::Unsubscribe { event, .. } => {
                vec![event.as_str()]
            }
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// The `{"v": ..., "t": ...}` object of one successful GET result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetEntry {
    /// String rendering of the value.
    pub v: String,
    /// Wire type of the value.
    pub t: WireType,
}

impl GetEntry {
    /// Creates a result entry.
    pub fn new(v: impl Into<String>, t: WireType) -> Self {
        Self { v: v.into(), t }
    }
}

/// An internal-dialect response envelope.
///
/// Serializes to the canonical `{id?, status, results?|message?|...}` JSON.
/// The `id` mirrors the request id: present iff the request carried one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id, echoed from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// HTTP-code-space status.
    pub status: u16,

    /// Per-name GET results; entry is `{"v","t"}` or null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Map<String, Value>>,

    /// Human-readable outcome for non-GET operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Fully qualified path of a freshly added table row.
    #[serde(rename = "newRowName", skip_serializing_if = "Option::is_none")]
    pub new_row_name: Option<String>,

    /// Attribute metadata for GET_ATTRIBUTES.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attribute>,
}

impl Response {
    /// Creates a bare response with a status.
    pub fn new(id: Option<String>, status: u16) -> Self {
        Self {
            id,
            status,
            results: None,
            message: None,
            new_row_name: None,
            attributes: None,
        }
    }

    /// Creates a response carrying a message.
    pub fn with_message(id: Option<String>, status: u16, message: impl Into<String>) -> Self {
        let mut resp = Self::new(id, status);
        resp.message = Some(message.into());
        resp
    }

    /// Creates a GET response carrying per-name results.
    pub fn with_results(id: Option<String>, status: u16, results: Map<String, Value>) -> Self {
        let mut resp = Self::new(id, status);
        resp.results = Some(results);
        resp
    }

    /// Attaches the new row path.
    pub fn new_row(mut self, row: impl Into<String>) -> Self {
        self.new_row_name = Some(row.into());
        self
    }

    /// Attaches attribute metadata.
    pub fn attrs(mut self, attributes: Attribute) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Returns `true` when the status denotes full or partial success.
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 201 || self.status == 207
    }

    /// Serializes this response to its JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Tests
// =============================================================================
