// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transaction data model and JSON schema.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use parb_core::types::WireType;

// =============================================================================
// Operations
// =============================================================================

/// Per-parameter operation inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnOp {
    /// Write the value.
    #[default]
    Set,
    /// Read the value (presence check inside bulk operations).
    Get,
    /// Clear the value.
    Delete,
    /// Write the value, replacing whatever is there.
    Replace,
    /// Create the parameter; fails if it already holds a value.
    Add,
}

impl TxnOp {
    /// Returns `true` when the op requires a value.
    pub fn needs_value(&self) -> bool {
        matches!(self, TxnOp::Set | TxnOp::Replace | TxnOp::Add)
    }
}

// =============================================================================
// Status
// =============================================================================

/// Transaction and per-parameter status. The numeric codes are part of the
/// result JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxnStatus {
    /// Not yet executed (code 0).
    #[default]
    Pending,
    /// Everything succeeded (code 1).
    Success,
    /// Everything failed, or an atomic transaction aborted (code 2).
    Failure,
    /// Mixed outcome; non-atomic transactions only (code 3).
    Partial,
    /// The transaction ran out of time (code 4).
    Timeout,
}

impl TxnStatus {
    /// Returns the numeric status code.
    pub fn code(&self) -> u8 {
        match self {
            TxnStatus::Pending => 0,
            TxnStatus::Success => 1,
            TxnStatus::Failure => 2,
            TxnStatus::Partial => 3,
            TxnStatus::Timeout => 4,
        }
    }

    /// Returns the status name used in notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Pending => "Pending",
            TxnStatus::Success => "Success",
            TxnStatus::Failure => "Failure",
            TxnStatus::Partial => "Partial",
            TxnStatus::Timeout => "Timeout",
        }
    }
}

impl Serialize for TxnStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for TxnStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(TxnStatus::Pending),
            1 => Ok(TxnStatus::Success),
            2 => Ok(TxnStatus::Failure),
            3 => Ok(TxnStatus::Partial),
            4 => Ok(TxnStatus::Timeout),
            other => Err(D::Error::custom(format!("invalid txn status: {}", other))),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One parameter entry of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxnParam {
    /// Fully qualified parameter name.
    pub name: String,
    /// Wire rendering of the value; required for SET/REPLACE/ADD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Wire type of the value.
    #[serde(rename = "dataType", default)]
    pub data_type: WireType,
    /// The operation to perform.
    #[serde(rename = "operation", default)]
    pub op: TxnOp,
}

impl TxnParam {
    /// Creates a SET entry.
    pub fn set(name: impl Into<String>, value: impl Into<String>, data_type: WireType) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            data_type,
            op: TxnOp::Set,
        }
    }

    /// Creates an entry with an explicit operation.
    pub fn with_op(mut self, op: TxnOp) -> Self {
        self.op = op;
        self
    }
}

/// A bulk configuration transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id; generated when absent in the JSON form.
    #[serde(rename = "transaction_id", default = "generate_id")]
    pub transaction_id: String,
    /// Parameter entries, applied in order.
    #[serde(rename = "parameters", default)]
    pub parameters: Vec<TxnParam>,
    /// All-or-nothing execution.
    #[serde(default)]
    pub atomic: bool,
    /// Requesting user.
    #[serde(default = "unknown_string")]
    pub user_id: String,
    /// Originating surface (bulk api, uplink, ...).
    #[serde(default = "unknown_string")]
    pub source: String,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn unknown_string() -> String {
    "unknown".to_string()
}

impl Transaction {
    /// Creates a transaction with a fresh id.
    pub fn new(parameters: Vec<TxnParam>, atomic: bool) -> Self {
        Self {
            transaction_id: generate_id(),
            parameters,
            atomic,
            user_id: unknown_string(),
            source: unknown_string(),
        }
    }

    /// Sets the requesting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Sets the originating surface.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Parses the JSON transaction schema.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of one parameter entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamResult {
    /// The parameter name.
    pub name: String,
    /// Entry status.
    pub status: TxnStatus,
    /// HTTP-code-space outcome.
    pub error_code: u16,
    /// Failure detail when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ParamResult {
    /// A successful entry.
    pub fn success(name: impl Into<String>, code: u16) -> Self {
        Self {
            name: name.into(),
            status: TxnStatus::Success,
            error_code: code,
            error_message: None,
        }
    }

    /// A failed entry.
    pub fn failure(name: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TxnStatus::Failure,
            error_code: code,
            error_message: Some(message.into()),
        }
    }

    /// Returns `true` when the entry succeeded.
    pub fn is_success(&self) -> bool {
        self.status == TxnStatus::Success
    }
}

/// Outcome of a whole transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxnResult {
    /// The transaction id.
    pub transaction_id: String,
    /// Overall classification.
    pub status: TxnStatus,
    /// Per-parameter outcomes, in application order.
    pub results: Vec<ParamResult>,
    /// Unix completion time in milliseconds.
    pub completion_time_ms: u64,
    /// Failure detail of a rollback that itself went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_error: Option<String>,
}

impl TxnResult {
    /// Serializes the result JSON schema.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// =============================================================================
// Tests
// =============================================================================
