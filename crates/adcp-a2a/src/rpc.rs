// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-RPC 2.0 envelope types and the `/a2a` endpoint.
//!
//! Older buyers send numeric `id` and `messageId` values; both are coerced
//! to strings before the inner handlers see them.

use crate::message::handle_message_send;
use crate::push_config::{
    delete_push_notification_config, get_push_notification_config, list_push_notification_configs,
    set_push_notification_config,
};
use crate::A2aState;
use adcp_core::task::deserialize_lenient_id;
use adcp_core::{Headers, TransportError};
use axum::extract::State;
use axum::http::HeaderMap as HttpHeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// A JSON-RPC 2.0 request. The `id` accepts a string or a number.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request identifier, coerced to a string.
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub id: Option<String>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response; exactly one of `result` / `error` is present.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Echo of the request id.
    pub id: Option<String>,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    #[must_use]
    pub fn success(id: Option<String>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response from a transport failure.
    #[must_use]
    pub fn from_transport_error(id: Option<String>, err: &TransportError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code: err.kind.json_rpc_code(),
                message: err.message.clone(),
                data: Some(json!({ "kind": err.kind.code() })),
            }),
        }
    }
}

/// Convert axum headers into the shared case-insensitive map.
#[must_use]
pub fn to_headers(http: &HttpHeaderMap) -> Headers {
    http.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// `POST /a2a` (and `/a2a/`): parse, route, and answer JSON-RPC.
pub async fn rpc_endpoint(
    State(state): State<A2aState>,
    http_headers: HttpHeaderMap,
    Json(body): Json<Value>,
) -> Json<JsonRpcResponse> {
    let headers = to_headers(&http_headers);

    let request: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "malformed JSON-RPC request");
            let err = TransportError::invalid_params(format!("malformed JSON-RPC request: {err}"));
            return Json(JsonRpcResponse::from_transport_error(None, &err));
        }
    };
    let id = request.id.clone();

    let result = route(&state, &headers, request).await;
    Json(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::from_transport_error(id, &err),
    })
}

async fn route(
    state: &A2aState,
    headers: &Headers,
    request: JsonRpcRequest,
) -> Result<Value, TransportError> {
    match request.method.as_str() {
        "message/send" => handle_message_send(state, headers, request.params).await,
        // Single-event streaming: the complete task is the one event.
        "message/stream" => handle_message_send(state, headers, request.params).await,
        "tasks/get" => {
            let task_id = param_id(&request.params)?;
            let task = state.services.tasks.get(&task_id).await;
            Ok(serde_json::to_value(task)
                .map_err(|e| TransportError::internal(e.to_string()))?)
        }
        "tasks/cancel" => {
            let task_id = param_id(&request.params)?;
            let auth =
                adcp_skills::auth::resolve_and_maybe_authenticate(headers, state.services.store.as_ref())
                    .await?;
            let tenant_id = auth
                .1
                .as_ref()
                .map(|a| a.tenant.tenant_id.clone())
                .or_else(|| auth.0.as_ref().map(|r| r.tenant.tenant_id.clone()))
                .unwrap_or_default();
            let task = state
                .services
                .tasks
                .cancel(&tenant_id, &task_id)
                .await
                .ok_or_else(|| TransportError::not_found(format!("task {task_id}")))?;
            Ok(serde_json::to_value(task)
                .map_err(|e| TransportError::internal(e.to_string()))?)
        }
        "tasks/pushNotificationConfig/set" => {
            set_push_notification_config(state, headers, request.params).await
        }
        "tasks/pushNotificationConfig/get" => {
            get_push_notification_config(state, headers, request.params).await
        }
        "tasks/pushNotificationConfig/list" => {
            list_push_notification_configs(state, headers).await
        }
        "tasks/pushNotificationConfig/delete" => {
            delete_push_notification_config(state, headers, request.params).await
        }
        other => Err(TransportError::method_not_found(format!(
            "unknown method '{other}'"
        ))),
    }
}

fn param_id(params: &Value) -> Result<String, TransportError> {
    params
        .get("id")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| TransportError::invalid_params("missing required parameter: id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_rpc_id_coerced_to_string() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tasks/get",
            "params": {"id": "task_1"},
        }))
        .unwrap();
        assert_eq!(request.id.as_deref(), Some("7"));
    }

    #[test]
    fn string_rpc_id_preserved() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "req-9",
            "method": "message/send",
        }))
        .unwrap();
        assert_eq!(request.id.as_deref(), Some("req-9"));
    }

    #[test]
    fn error_response_carries_json_rpc_code() {
        let err = TransportError::method_not_found("unknown method 'x'");
        let resp = JsonRpcResponse::from_transport_error(Some("1".into()), &err);
        assert_eq!(resp.error.as_ref().unwrap().code, -32601);
        assert!(resp.result.is_none());
    }

    #[test]
    fn param_id_accepts_numbers() {
        assert_eq!(param_id(&json!({"id": 3})).unwrap(), "3");
        assert_eq!(param_id(&json!({"id": "t"})).unwrap(), "t");
        assert!(param_id(&json!({})).is_err());
    }
}
