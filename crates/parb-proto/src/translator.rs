// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-operation dispatch.
//!
//! [`Translator::handle_payload`] is the single entry point the uplink
//! session calls per inbound frame: decode → normalize → authorize →
//! dispatch → shape. Authorization denials never touch the parambus.
//!
//! # Composite GET status
//!
//! With `s` successes and `f` failures across all entries:
//!
//! - `f = 0` → 200 (including the zero-entry edge)
//! - `f ≥ 1 ∧ s ≥ 1` → 207
//! - `f ≥ 1 ∧ s = 0` → 500
//!
//! A succeeding expansion with zero children contributes nothing; a failing
//! expansion call contributes one failure recorded as
//! `results[prefix] = null`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use parb_bus::ParamBusAdapter;
use parb_core::envelope::{GetEntry, Request, Response};
use parb_core::error::{AuthError, BusError};
use parb_core::types::{has_table_wildcard, is_group_wildcard};

use crate::auth::{AclSet, AuthContext, Permission};
use crate::normalize::{normalize, Dialect, NormalizedRequest};
use crate::shape::{shape_flat, shape_grouped};

// =============================================================================
// Translator
// =============================================================================

/// The protocol translator.
pub struct Translator {
    adapter: Arc<ParamBusAdapter>,
    acl: AclSet,
}

impl Translator {
    /// Creates a translator over an adapter and a rule set.
    pub fn new(adapter: Arc<ParamBusAdapter>, acl: AclSet) -> Self {
        Self { adapter, acl }
    }

    /// The adapter this translator dispatches through.
    pub fn adapter(&self) -> &Arc<ParamBusAdapter> {
        &self.adapter
    }

    /// Handles one raw payload and returns the reply payload.
    ///
    /// `txn_id` is the uplink transaction id used for id fallback. The
    /// returned JSON is already shaped for the inbound dialect.
    pub async fn handle_payload(
        &self,
        payload: &[u8],
        txn_id: Option<&str>,
        ctx: &AuthContext,
    ) -> Value {
        let parsed: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(_) => {
                return Response::with_message(None, 400, "invalid json").to_json();
            }
        };

        let norm = match normalize(&parsed, txn_id) {
            Ok(norm) => norm,
            Err(e) => {
                let id = parsed
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| txn_id.map(str::to_string));
                return Response::with_message(id, 400, e.to_string()).to_json();
            }
        };

        let response = match self.authorize(&norm.request, ctx) {
            Ok(()) => self.dispatch(&norm.request).await,
            Err(e) => {
                info!(
                    op = norm.request.op_name(),
                    user = %ctx.user_id,
                    error = %e,
                    "request denied"
                );
                Response::with_message(
                    norm.request.id().map(str::to_string),
                    e.status_code(),
                    e.to_string(),
                )
            }
        };

        debug!(
            op = norm.request.op_name(),
            status = response.status,
            "request handled"
        );

        match norm.dialect {
            Dialect::Internal => response.to_json(),
            Dialect::Webpa => self.shape_webpa(&response, &norm),
        }
    }

    fn shape_webpa(&self, response: &Response, norm: &NormalizedRequest) -> Value {
        if norm.has_wildcard && response.results.is_some() {
            shape_grouped(response, &norm.wildcard_prefixes)
        } else {
            shape_flat(response)
        }
    }

    /// Checks every resource the request touches against the ACL.
    fn authorize(&self, request: &Request, ctx: &AuthContext) -> Result<(), AuthError> {
        let required = if request.is_mutating() {
            Permission::WRITE
        } else {
            Permission::READ
        };
        for resource in request.resources() {
            self.acl.check(resource, required, ctx)?;
        }
        Ok(())
    }

    /// Dispatches a normalized request to the adapter.
    pub async fn dispatch(&self, request: &Request) -> Response {
        let id = request.id().map(str::to_string);
        match request {
            Request::Get { params, .. } => self.dispatch_get(id, params).await,

            Request::Set { param, value, .. } => match self.adapter.set(param, value).await {
                Ok(()) => Response::with_message(id, 200, "OK"),
                Err(e) => bus_error_response(id, &e),
            },

            Request::GetAttributes { param, .. } => {
                match self.adapter.get_attributes(param).await {
                    Ok(attr) => Response::with_message(id, 200, "OK").attrs(attr),
                    Err(e) => bus_error_response(id, &e),
                }
            }

            Request::SetAttributes { param, attributes, .. } => {
                match self.adapter.set_attributes(param, attributes).await {
                    Ok(()) => Response::with_message(id, 200, "OK"),
                    Err(e) => bus_error_response(id, &e),
                }
            }

            Request::AddRow { table_name, row_data, .. } => {
                match self.adapter.add_table_row(table_name, row_data).await {
                    Ok(outcome) => {
                        let message = if outcome.fully_populated() {
                            "row added".to_string()
                        } else {
                            format!(
                                "row added, {} field(s) failed",
                                outcome.field_failures.len()
                            )
                        };
                        Response::with_message(id, 200, message).new_row(outcome.row_path)
                    }
                    Err(e) => bus_error_response(id, &e),
                }
            }

            Request::DeleteRow { row_name, .. } => {
                match self.adapter.delete_table_row(row_name).await {
                    Ok(()) => Response::with_message(id, 200, "row deleted"),
                    Err(e) => bus_error_response(id, &e),
                }
            }

            Request::ReplaceRows { table_name, table_data, .. } => {
                match self.adapter.replace_table(table_name, table_data).await {
                    Ok(added) => Response::with_message(
                        id,
                        200,
                        format!("table replaced, {} row(s)", added.len()),
                    ),
                    Err(e) => bus_error_response(id, &e),
                }
            }

            Request::Subscribe { event, .. } => match self.adapter.subscribe(event).await {
                Ok(()) => Response::with_message(id, 200, "subscribed"),
                Err(e) => bus_error_response(id, &e),
            },

            Request::Unsubscribe { event, .. } => match self.adapter.unsubscribe(event).await {
                Ok(()) => Response::with_message(id, 200, "unsubscribed"),
                Err(e) => bus_error_response(id, &e),
            },

            Request::TestAndSet { param, old_value, new_value, data_type, .. } => {
                match self
                    .adapter
                    .test_and_set(param, old_value, new_value, *data_type)
                    .await
                {
                    Ok(()) => Response::with_message(id, 200, "OK"),
                    Err(e) => bus_error_response(id, &e),
                }
            }
        }
    }

    async fn dispatch_get(&self, id: Option<String>, params: &[Value]) -> Response {
        let mut results = Map::new();
        let mut successes = 0usize;
        let mut failures = 0usize;

        for (idx, entry) in params.iter().enumerate() {
            match entry.as_str() {
                None => {
                    results.insert(format!("_{}", idx), Value::Null);
                    failures += 1;
                }
                Some(name) if is_group_wildcard(name) => {
                    match self.adapter.expand_wildcard(name).await {
                        Ok(children) => {
                            for child in children {
                                self.read_one(&child, &mut results, &mut successes, &mut failures)
                                    .await;
                            }
                        }
                        Err(e) => {
                            warn!(prefix = name, error = %e, "wildcard expansion failed");
                            results.insert(name.to_string(), Value::Null);
                            failures += 1;
                        }
                    }
                }
                Some(name) if has_table_wildcard(name) => {
                    match self.adapter.expand_pattern(name).await {
                        Ok(children) => {
                            for child in children {
                                self.read_one(&child, &mut results, &mut successes, &mut failures)
                                    .await;
                            }
                        }
                        Err(e) => {
                            warn!(pattern = name, error = %e, "pattern expansion failed");
                            results.insert(name.to_string(), Value::Null);
                            failures += 1;
                        }
                    }
                }
                Some(name) => {
                    self.read_one(name, &mut results, &mut successes, &mut failures)
                        .await;
                }
            }
        }

        let status = match (successes, failures) {
            (_, 0) => 200,
            (0, _) => 500,
            _ => 207,
        };
        Response::with_results(id, status, results)
    }

    async fn read_one(
        &self,
        name: &str,
        results: &mut Map<String, Value>,
        successes: &mut usize,
        failures: &mut usize,
    ) {
        match self.adapter.get_typed(name).await {
            Ok((value, wire_type)) => {
                let entry = serde_json::to_value(GetEntry::new(value, wire_type))
                    .unwrap_or(Value::Null);
                results.insert(name.to_string(), entry);
                *successes += 1;
            }
            Err(e) => {
                debug!(name, error = %e, "parameter read failed");
                results.insert(name.to_string(), Value::Null);
                *failures += 1;
            }
        }
    }
}

fn bus_error_response(id: Option<String>, error: &BusError) -> Response {
    Response::with_message(id, error.status_code(), error.to_string())
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("acl_rules", &self.acl.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    use parb_bus::{MemoryBackend, ParamBackend, ParamBusAdapter};
    use parb_cache::{CacheConfig, ParamCache};
    use parb_core::codec::TypedValue;
    use parb_core::hooks::NoopPerfSink;

    fn harness() -> (Arc<MemoryBackend>, Translator) {
        let backend = Arc::new(MemoryBackend::new("test"));
        let (tx, _rx) = mpsc::channel(16);
        let adapter = Arc::new(ParamBusAdapter::new(
            backend.clone(),
            Arc::new(ParamCache::new(CacheConfig::default())),
            Arc::new(NoopPerfSink),
            tx,
        ));
        (backend, Translator::new(adapter, AclSet::default_rules()))
    }

    async fn handle(t: &Translator, payload: Value) -> Value {
        t.handle_payload(
            payload.to_string().as_bytes(),
            None,
            &AuthContext::operator("test"),
        )
        .await
    }

    #[tokio::test]
    async fn test_single_get_hit() {
        let (backend, t) = harness();
        backend.seed("Device.DeviceInfo.SerialNumber", TypedValue::Str("ABC".into()));

        let resp = handle(
            &t,
            json!({"id": "1", "op": "GET", "params": ["Device.DeviceInfo.SerialNumber"]}),
        )
        .await;

        assert_eq!(
            resp,
            json!({
                "id": "1",
                "status": 200,
                "results": {"Device.DeviceInfo.SerialNumber": {"v": "ABC", "t": 0}}
            })
        );

        // A second identical request is served from cache.
        let reads = backend.read_count();
        handle(
            &t,
            json!({"id": "2", "op": "GET", "params": ["Device.DeviceInfo.SerialNumber"]}),
        )
        .await;
        assert_eq!(backend.read_count(), reads);
    }

    #[tokio::test]
    async fn test_mixed_get_is_207() {
        let (backend, t) = harness();
        backend.seed("Device.A", TypedValue::Int(1));
        backend.seed("Device.B", TypedValue::Int(2));

        let resp = handle(
            &t,
            json!({"op": "GET", "params": ["Device.A", "Device.Missing", "Device.B"]}),
        )
        .await;

        assert_eq!(resp["status"], 207);
        assert_eq!(resp["results"]["Device.A"], json!({"v": "1", "t": 1}));
        assert_eq!(resp["results"]["Device.B"], json!({"v": "2", "t": 1}));
        assert_eq!(resp["results"]["Device.Missing"], Value::Null);
    }

    #[tokio::test]
    async fn test_all_failed_get_is_500() {
        let (_backend, t) = harness();
        let resp = handle(&t, json!({"op": "GET", "params": ["Device.Nope"]})).await;
        assert_eq!(resp["status"], 500);
    }

    #[tokio::test]
    async fn test_non_string_entry_is_positional_null() {
        let (backend, t) = harness();
        backend.seed("Device.A", TypedValue::Int(1));

        let resp = handle(&t, json!({"op": "GET", "params": ["Device.A", 17]})).await;
        assert_eq!(resp["status"], 207);
        assert_eq!(resp["results"]["_1"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_expansion_is_success() {
        let (_backend, t) = harness();
        let resp = handle(&t, json!({"op": "GET", "params": ["Device.Empty."]})).await;
        assert_eq!(resp["status"], 200);
        assert_eq!(resp["results"], json!({}));
    }

    #[tokio::test]
    async fn test_wildcard_grouped_egress() {
        let (backend, t) = harness();
        backend.seed("Device.DeviceInfo.X", TypedValue::Int(1));
        backend.seed("Device.DeviceInfo.Y", TypedValue::Int(2));

        let resp = handle(
            &t,
            json!({"command": "GET", "names": ["Device.DeviceInfo."]}),
        )
        .await;

        assert_eq!(
            resp,
            json!({
                "statusCode": 200,
                "parameters": [{
                    "name": "Device.DeviceInfo.",
                    "value": [
                        {"name": "Device.DeviceInfo.X", "value": "1", "dataType": 1},
                        {"name": "Device.DeviceInfo.Y", "value": "2", "dataType": 1}
                    ],
                    "parameterCount": 2,
                    "message": "Success",
                    "dataType": 11
                }],
                "message": "Success"
            })
        );
    }

    #[tokio::test]
    async fn test_webpa_flat_set_egress() {
        let (backend, t) = harness();
        backend.seed("Device.X", TypedValue::Int(1));

        let resp = handle(
            &t,
            json!({
                "command": "SET",
                "parameters": [{"name": "Device.X", "value": "5", "dataType": 1}]
            }),
        )
        .await;

        assert_eq!(resp["statusCode"], 200);
        assert_eq!(resp["message"], "Success");
        assert_eq!(backend.get("Device.X").await.unwrap(), TypedValue::Int(5));
    }

    #[tokio::test]
    async fn test_test_and_set_mismatch_is_412() {
        let (backend, t) = harness();
        backend.seed("Device.Foo", TypedValue::Str("A".into()));
        // Prime the cache so we can check it survives the failed TAS.
        handle(&t, json!({"op": "GET", "params": ["Device.Foo"]})).await;

        let writes = backend.write_count();
        let resp = handle(
            &t,
            json!({
                "op": "TEST_AND_SET",
                "param": "Device.Foo",
                "oldValue": "B",
                "newValue": "C",
                "dataType": 0
            }),
        )
        .await;

        assert_eq!(resp["status"], 412);
        assert_eq!(backend.write_count(), writes, "set must not run");
        assert_eq!(
            t.adapter().cache().get("Device.Foo"),
            Some(("A".to_string(), parb_core::types::WireType::String))
        );
    }

    #[tokio::test]
    async fn test_add_row_reports_new_row_name() {
        let (_backend, t) = harness();
        let resp = handle(
            &t,
            json!({
                "op": "ADD_ROW",
                "tableName": "Device.IP.Interface.",
                "rowData": [{"name": "Enable", "value": "true", "dataType": 3}]
            }),
        )
        .await;
        assert_eq!(resp["status"], 200);
        assert_eq!(resp["newRowName"], "Device.IP.Interface.1.");
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let (backend, t) = harness();
        let resp = handle(&t, json!({"op": "SUBSCRIBE", "event": "Device.WiFi.Radio.1.Enable"})).await;
        assert_eq!(resp["status"], 200);
        assert!(backend.has_subscription("Device.WiFi.Radio.1.Enable"));

        let resp = handle(&t, json!({"op": "UNSUBSCRIBE", "event": "Device.WiFi.Radio.1.Enable"})).await;
        assert_eq!(resp["status"], 200);
        assert!(!backend.has_subscription("Device.WiFi.Radio.1.Enable"));
    }

    #[tokio::test]
    async fn test_denied_write_never_touches_bus() {
        let (backend, t) = harness();
        backend.seed("Device.ManagementServer.URL", TypedValue::Str("x".into()));

        let resp = t
            .handle_payload(
                json!({"op": "SET", "param": "Device.ManagementServer.URL", "value": "y"})
                    .to_string()
                    .as_bytes(),
                None,
                &AuthContext::operator("op"),
            )
            .await;

        assert_eq!(resp["status"], 403);
        assert_eq!(backend.write_count(), 0);
        assert_eq!(backend.read_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let (_backend, t) = harness();
        let resp = t
            .handle_payload(b"{nope", None, &AuthContext::operator("op"))
            .await;
        assert_eq!(resp["status"], 400);
        assert_eq!(resp["message"], "invalid json");
    }

    #[tokio::test]
    async fn test_id_fallback_to_transaction_uuid() {
        let (backend, t) = harness();
        backend.seed("Device.A", TypedValue::Int(1));

        let resp = t
            .handle_payload(
                json!({"op": "GET", "params": ["Device.A"]}).to_string().as_bytes(),
                Some("txn-77"),
                &AuthContext::operator("op"),
            )
            .await;
        assert_eq!(resp["id"], "txn-77");
    }

    #[tokio::test]
    async fn test_get_attributes_response() {
        let (backend, t) = harness();
        backend.seed("Device.A", TypedValue::Int(1));

        let resp = handle(&t, json!({"op": "GET_ATTRIBUTES", "param": "Device.A"})).await;
        assert_eq!(resp["status"], 200);
        assert_eq!(resp["attributes"]["notify"], 1);
        assert_eq!(resp["attributes"]["access"], "readWrite");
    }
}
