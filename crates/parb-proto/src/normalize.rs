// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dialect detection and normalization.
//!
//! Inbound payloads are either **internal-dialect** (a string `op` field
//! naming an operation) or **webpa-dialect** (a string `command` field).
//! Both are normalized into the one [`Request`] sum type here, so dispatch
//! never sniffs fields again. The WebPA command table:
//!
//! | command | required fields | target op |
//! |---|---|---|
//! | GET | `names[]` | GET (`params` ← names) |
//! | GET_ATTRIBUTES | `names[]` (first used) | GET_ATTRIBUTES |
//! | SET | `parameters[{name,value,dataType}]` (first used) | SET |
//! | SET_ATTRIBUTES | `parameters[{name,attributes}]` (first used) | SET_ATTRIBUTES |
//! | ADD_ROW | `table`, `row[]` | ADD_ROW |
//! | DELETE_ROW | `row` | DELETE_ROW |
//! | REPLACE_ROWS | `table`, `rows[][]` | REPLACE_ROWS |
//! | SUBSCRIBE / UNSUBSCRIBE | `event` | pass-through |
//!
//! A missing `id` falls back to the uplink transaction id so replies stay
//! correlatable.

use serde_json::Value;

use parb_core::envelope::{Request, RowField, TableRow};
use parb_core::error::{RequestError, RequestResult};
use parb_core::types::{has_table_wildcard, is_group_wildcard, Attribute, WireType};

// =============================================================================
// Dialect
// =============================================================================

/// The dialect a payload arrived in; decides egress shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `op`-discriminated internal schema; responses pass through unshaped.
    Internal,
    /// `command`-discriminated WebPA schema; responses are re-shaped.
    Webpa,
}

/// A normalized request plus the shaping context extracted from the
/// original payload.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    /// The tagged request.
    pub request: Request,
    /// Dialect of the inbound payload.
    pub dialect: Dialect,
    /// `true` when any GET entry carried a group or table wildcard.
    pub has_wildcard: bool,
    /// The group-wildcard prefixes of the original request, in order.
    pub wildcard_prefixes: Vec<String>,
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalizes a decoded payload into a [`NormalizedRequest`].
///
/// `txn_id` is the uplink transaction id, used as the correlation id when
/// the payload carries none.
///
/// # Errors
///
/// All failures are [`RequestError`] (HTTP 400): non-object payloads,
/// unknown ops/commands, missing or mistyped required fields.
pub fn normalize(payload: &Value, txn_id: Option<&str>) -> RequestResult<NormalizedRequest> {
    let obj = payload.as_object().ok_or(RequestError::MalformedJson)?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| txn_id.map(str::to_string));

    let (request, dialect) = if let Some(op) = obj.get("op").and_then(Value::as_str) {
        (parse_internal(op, payload, id)?, Dialect::Internal)
    } else if let Some(command) = obj.get("command").and_then(Value::as_str) {
        (parse_webpa(command, payload, id)?, Dialect::Webpa)
    } else {
        return Err(RequestError::missing_field("op"));
    };

    let (has_wildcard, wildcard_prefixes) = wildcard_info(&request);

    Ok(NormalizedRequest {
        request,
        dialect,
        has_wildcard,
        wildcard_prefixes,
    })
}

fn wildcard_info(request: &Request) -> (bool, Vec<String>) {
    let Request::Get { params, .. } = request else {
        return (false, Vec::new());
    };
    let mut has_wildcard = false;
    let mut prefixes = Vec::new();
    for entry in params {
        let Some(name) = entry.as_str() else { continue };
        if is_group_wildcard(name) {
            has_wildcard = true;
            prefixes.push(name.to_string());
        } else if has_table_wildcard(name) {
            has_wildcard = true;
        }
    }
    (has_wildcard, prefixes)
}

// =============================================================================
// Internal Dialect
// =============================================================================

fn parse_internal(op: &str, payload: &Value, id: Option<String>) -> RequestResult<Request> {
    match op {
        "GET" => {
            let params = payload
                .get("params")
                .and_then(Value::as_array)
                .ok_or_else(|| RequestError::missing_field("params"))?;
            Ok(Request::Get {
                id,
                params: params.clone(),
            })
        }
        "SET" => Ok(Request::Set {
            id,
            param: str_field(payload, "param")?,
            value: str_field(payload, "value")?,
        }),
        "GET_ATTRIBUTES" => Ok(Request::GetAttributes {
            id,
            param: str_field(payload, "param")?,
        }),
        "SET_ATTRIBUTES" => Ok(Request::SetAttributes {
            id,
            param: str_field(payload, "param")?,
            attributes: attributes_field(payload.get("attributes"))?,
        }),
        "ADD_ROW" => Ok(Request::AddRow {
            id,
            table_name: str_field(payload, "tableName")?,
            row_data: row_field(payload.get("rowData"), "rowData")?,
        }),
        "DELETE_ROW" => Ok(Request::DeleteRow {
            id,
            row_name: str_field(payload, "rowName")?,
        }),
        "REPLACE_ROWS" => Ok(Request::ReplaceRows {
            id,
            table_name: str_field(payload, "tableName")?,
            table_data: rows_field(payload.get("tableData"), "tableData")?,
        }),
        "SUBSCRIBE" => Ok(Request::Subscribe {
            id,
            event: str_field(payload, "event")?,
        }),
        "UNSUBSCRIBE" => Ok(Request::Unsubscribe {
            id,
            event: str_field(payload, "event")?,
        }),
        "TEST_AND_SET" => {
            let code = payload
                .get("dataType")
                .and_then(Value::as_u64)
                .ok_or_else(|| RequestError::missing_field("dataType"))?;
            let data_type = u8::try_from(code)
                .ok()
                .and_then(WireType::from_code)
                .ok_or_else(|| RequestError::wrong_type("dataType"))?;
            Ok(Request::TestAndSet {
                id,
                param: str_field(payload, "param")?,
                old_value: str_field(payload, "oldValue")?,
                new_value: str_field(payload, "newValue")?,
                data_type,
            })
        }
        other => Err(RequestError::unsupported_op(other)),
    }
}

// =============================================================================
// WebPA Dialect
// =============================================================================

fn parse_webpa(command: &str, payload: &Value, id: Option<String>) -> RequestResult<Request> {
    match command {
        "GET" => {
            let names = payload
                .get("names")
                .and_then(Value::as_array)
                .ok_or_else(|| RequestError::missing_field("names"))?;
            Ok(Request::Get {
                id,
                params: names.clone(),
            })
        }
        "GET_ATTRIBUTES" => {
            let names = payload
                .get("names")
                .and_then(Value::as_array)
                .ok_or_else(|| RequestError::missing_field("names"))?;
            let first = names
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| RequestError::wrong_type("names"))?;
            Ok(Request::GetAttributes {
                id,
                param: first.to_string(),
            })
        }
        "SET" => {
            let first = first_parameter(payload)?;
            let name = first
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RequestError::missing_field("parameters[0].name"))?;
            let value = first
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| RequestError::missing_field("parameters[0].value"))?;
            Ok(Request::Set {
                id,
                param: name.to_string(),
                value: value.to_string(),
            })
        }
        "SET_ATTRIBUTES" => {
            let first = first_parameter(payload)?;
            let name = first
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RequestError::missing_field("parameters[0].name"))?;
            Ok(Request::SetAttributes {
                id,
                param: name.to_string(),
                attributes: attributes_field(first.get("attributes"))?,
            })
        }
        "ADD_ROW" => Ok(Request::AddRow {
            id,
            table_name: str_field(payload, "table")?,
            row_data: row_field(payload.get("row"), "row")?,
        }),
        "DELETE_ROW" => Ok(Request::DeleteRow {
            id,
            row_name: str_field(payload, "row")?,
        }),
        "REPLACE_ROWS" => Ok(Request::ReplaceRows {
            id,
            table_name: str_field(payload, "table")?,
            table_data: rows_field(payload.get("rows"), "rows")?,
        }),
        "SUBSCRIBE" => Ok(Request::Subscribe {
            id,
            event: str_field(payload, "event")?,
        }),
        "UNSUBSCRIBE" => Ok(Request::Unsubscribe {
            id,
            event: str_field(payload, "event")?,
        }),
        other => Err(RequestError::UnsupportedCommand {
            command: other.to_string(),
        }),
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

fn first_parameter(payload: &Value) -> RequestResult<&Value> {
    let parameters = payload
        .get("parameters")
        .and_then(Value::as_array)
        .ok_or_else(|| RequestError::missing_field("parameters"))?;
    parameters
        .first()
        .ok_or_else(|| RequestError::missing_field("parameters[0]"))
}

fn str_field(payload: &Value, field: &str) -> RequestResult<String> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(RequestError::wrong_type(field)),
        None => Err(RequestError::missing_field(field)),
    }
}

fn attributes_field(value: Option<&Value>) -> RequestResult<Attribute> {
    let value = value.ok_or_else(|| RequestError::missing_field("attributes"))?;
    if !value.is_object() {
        return Err(RequestError::wrong_type("attributes"));
    }
    serde_json::from_value(value.clone()).map_err(|_| RequestError::wrong_type("attributes"))
}

fn row_field(value: Option<&Value>, field: &str) -> RequestResult<TableRow> {
    let value = value.ok_or_else(|| RequestError::missing_field(field))?;
    if !value.is_array() {
        return Err(RequestError::wrong_type(field));
    }
    serde_json::from_value::<Vec<RowField>>(value.clone())
        .map_err(|_| RequestError::wrong_type(field))
}

fn rows_field(value: Option<&Value>, field: &str) -> RequestResult<Vec<TableRow>> {
    let value = value.ok_or_else(|| RequestError::missing_field(field))?;
    if !value.is_array() {
        return Err(RequestError::wrong_type(field));
    }
    serde_json::from_value::<Vec<Vec<RowField>>>(value.clone())
        .map_err(|_| RequestError::wrong_type(field))
}

// =============================================================================
// Tests
// =============================================================================
