// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! WebPA egress shaping.
//!
//! Internal-dialect responses are the translator's native output; when the
//! request arrived in the WebPA dialect the reply payload is re-shaped into
//! the `{statusCode, parameters[], message}` schema. Two pure functions
//! cover the two shapes:
//!
//! - [`shape_flat`] for requests without wildcards: one `parameters[]`
//!   element per result
//! - [`shape_grouped`] for wildcard requests: a single group element
//!   (`dataType` 11) whose `value` array carries the expanded children
//!
//! `message` is `"Success"` iff the status is 200 or 207.

use serde_json::{json, Map, Value};

use parb_core::envelope::Response;

/// The group/table wire-type code used for the grouped container element.
const GROUP_DATA_TYPE: u8 = 11;

fn success_message(status: u16) -> &'static str {
    if status == 200 || status == 207 {
        "Success"
    } else {
        "Failure"
    }
}

/// Extracts `(value, dataType)` from one internal results entry.
///
/// Entries are `{"v": ..., "t": ...}` objects for successes and `null` for
/// failures; a failed entry renders as an empty string of type 0.
fn entry_parts(entry: &Value) -> (String, u8) {
    match entry {
        Value::Object(obj) => {
            let v = obj.get("v").and_then(Value::as_str).unwrap_or("").to_string();
            let t = obj.get("t").and_then(Value::as_u64).unwrap_or(0) as u8;
            (v, t)
        }
        Value::String(s) => (s.clone(), 0),
        Value::Bool(b) => (b.to_string(), 3),
        Value::Number(n) => (n.to_string(), 0),
        _ => (String::new(), 0),
    }
}

// =============================================================================
// Flat Shaping
// =============================================================================

/// Shapes an internal response into the flat WebPA schema.
///
/// Used when the original request carried no wildcard. GET results become
/// one `parameters[]` element each; message-only responses become a single
/// `result` element carrying the message text.
pub fn shape_flat(response: &Response) -> Value {
    let mut parameters = Vec::new();

    if let Some(results) = &response.results {
        for (name, entry) in results {
            let (value, data_type) = entry_parts(entry);
            parameters.push(json!({
                "name": name,
                "value": value,
                "dataType": data_type,
            }));
        }
    } else if let Some(message) = &response.message {
        let mut item = Map::new();
        item.insert("name".to_string(), json!("result"));
        item.insert("value".to_string(), json!(message));
        item.insert("dataType".to_string(), json!(0));
        if let Some(row) = &response.new_row_name {
            item.insert("newRowName".to_string(), json!(row));
        }
        parameters.push(Value::Object(item));
    }

    json!({
        "statusCode": response.status,
        "parameters": parameters,
        "message": success_message(response.status),
    })
}

// =============================================================================
// Grouped Shaping
// =============================================================================

/// Shapes an internal response into the grouped WebPA schema.
///
/// Used when the original request carried a wildcard. A single
/// `parameters[0]` element names the comma-joined wildcard prefixes, has
/// `dataType` 11 and `parameterCount`, and carries the expanded children in
/// its `value` array.
pub fn shape_grouped(response: &Response, wildcard_prefixes: &[String]) -> Value {
    let name = if wildcard_prefixes.is_empty() {
        "wildcard".to_string()
    } else {
        wildcard_prefixes.join(",")
    };

    let mut children = Vec::new();
    if let Some(results) = &response.results {
        for (child_name, entry) in results {
            let (value, data_type) = entry_parts(entry);
            children.push(json!({
                "name": child_name,
                "value": value,
                "dataType": data_type,
            }));
        }
    }

    let count = children.len();
    let grouped = json!({
        "name": name,
        "value": children,
        "parameterCount": count,
        "message": success_message(response.status),
        "dataType": GROUP_DATA_TYPE,
    });

    json!({
        "statusCode": response.status,
        "parameters": [grouped],
        "message": success_message(response.status),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parb_core::envelope::GetEntry;
    use parb_core::types::WireType;

    fn get_response(status: u16, entries: Vec<(&str, Option<GetEntry>)>) -> Response {
        let mut results = Map::new();
        for (name, entry) in entries {
            let value = match entry {
                Some(e) => serde_json::to_value(e).unwrap(),
                None => Value::Null,
            };
            results.insert(name.to_string(), value);
        }
        Response::with_results(Some("1".to_string()), status, results)
    }

    #[test]
    fn test_flat_get_shaping() {
        let resp = get_response(
            200,
            vec![("Device.X", Some(GetEntry::new("1", WireType::Int)))],
        );
        let shaped = shape_flat(&resp);
        assert_eq!(shaped["statusCode"], 200);
        assert_eq!(shaped["message"], "Success");
        assert_eq!(
            shaped["parameters"][0],
            json!({"name": "Device.X", "value": "1", "dataType": 1})
        );
    }

    #[test]
    fn test_flat_null_entry_renders_empty() {
        let resp = get_response(207, vec![("Device.Missing", None)]);
        let shaped = shape_flat(&resp);
        assert_eq!(shaped["message"], "Success");
        assert_eq!(
            shaped["parameters"][0],
            json!({"name": "Device.Missing", "value": "", "dataType": 0})
        );
    }

    #[test]
    fn test_flat_message_response() {
        let resp = Response::with_message(Some("2".to_string()), 500, "error");
        let shaped = shape_flat(&resp);
        assert_eq!(shaped["statusCode"], 500);
        assert_eq!(shaped["message"], "Failure");
        assert_eq!(
            shaped["parameters"][0],
            json!({"name": "result", "value": "error", "dataType": 0})
        );
    }

    #[test]
    fn test_flat_carries_new_row_name() {
        let resp = Response::with_message(None, 200, "row added").new_row("Device.T.4.");
        let shaped = shape_flat(&resp);
        assert_eq!(shaped["parameters"][0]["newRowName"], "Device.T.4.");
    }

    #[test]
    fn test_grouped_shaping_matches_wire_contract() {
        let resp = get_response(
            200,
            vec![
                ("Device.DeviceInfo.X", Some(GetEntry::new("1", WireType::Int))),
                ("Device.DeviceInfo.Y", Some(GetEntry::new("2", WireType::Int))),
            ],
        );
        let shaped = shape_grouped(&resp, &["Device.DeviceInfo.".to_string()]);

        assert_eq!(shaped["statusCode"], 200);
        assert_eq!(shaped["message"], "Success");
        let grouped = &shaped["parameters"][0];
        assert_eq!(grouped["name"], "Device.DeviceInfo.");
        assert_eq!(grouped["dataType"], 11);
        assert_eq!(grouped["parameterCount"], 2);
        assert_eq!(grouped["message"], "Success");
        assert_eq!(
            grouped["value"],
            json!([
                {"name": "Device.DeviceInfo.X", "value": "1", "dataType": 1},
                {"name": "Device.DeviceInfo.Y", "value": "2", "dataType": 1}
            ])
        );
    }

    #[test]
    fn test_grouped_joins_multiple_prefixes() {
        let resp = get_response(200, vec![]);
        let shaped = shape_grouped(
            &resp,
            &["Device.A.".to_string(), "Device.B.".to_string()],
        );
        assert_eq!(shaped["parameters"][0]["name"], "Device.A.,Device.B.");
        assert_eq!(shaped["parameters"][0]["parameterCount"], 0);
    }

    #[test]
    fn test_grouped_fallback_name() {
        let resp = get_response(200, vec![]);
        let shaped = shape_grouped(&resp, &[]);
        assert_eq!(shaped["parameters"][0]["name"], "wildcard");
    }

    #[test]
    fn test_partial_status_is_success_message() {
        let resp = get_response(207, vec![("Device.X", None)]);
        let shaped = shape_grouped(&resp, &["Device.".to_string()]);
        assert_eq!(shaped["message"], "Success");
        let resp = get_response(500, vec![("Device.X", None)]);
        let shaped = shape_grouped(&resp, &["Device.".to_string()]);
        assert_eq!(shaped["message"], "Failure");
    }
}
