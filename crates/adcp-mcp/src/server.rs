// SPDX-License-Identifier: MIT OR Apache-2.0
//! The MCP HTTP endpoint and request routing.
//!
//! Tenant resolution uses the HTTP headers attached to the MCP invocation;
//! the `Host` subdomain of the endpoint identifies the tenant. Domain
//! errors ride inside `structuredContent.errors`; transport errors become
//! JSON-RPC errors.

use crate::protocol::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, McpTool, ToolContent, MCP_PROTOCOL_VERSION,
};
use crate::tools::tool_definitions;
use adcp_core::{Headers, TransportError};
use adcp_skills::auth::resolve_and_maybe_authenticate;
use adcp_skills::{dispatch, is_discovery_skill, Services, SkillRegistry, Transport};
use axum::extract::State;
use axum::http::HeaderMap as HttpHeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the MCP router.
#[derive(Clone)]
pub struct McpState {
    /// Skill-handler resources.
    pub services: Arc<Services>,
    /// The skill registry.
    pub registry: Arc<SkillRegistry>,
    /// Server version reported by `initialize`.
    pub server_version: String,
}

/// Build the MCP router: a single JSON-RPC POST endpoint.
pub fn build_router(state: McpState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_endpoint))
        .route("/mcp/", post(mcp_endpoint))
        .with_state(state)
}

fn to_headers(http: &HttpHeaderMap) -> Headers {
    http.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

async fn mcp_endpoint(
    State(state): State<McpState>,
    http_headers: HttpHeaderMap,
    Json(body): Json<Value>,
) -> Json<JsonRpcResponse> {
    let headers = to_headers(&http_headers);
    let request: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "malformed MCP request");
            return Json(JsonRpcResponse::error(
                None,
                -32700,
                format!("parse error: {err}"),
            ));
        }
    };
    let id = request.id.clone();

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "adcp-sales-agent",
                    "version": state.server_version,
                },
            }),
        ),
        "notifications/initialized" => JsonRpcResponse::success(id, Value::Null),
        "tools/list" => {
            let tools: Vec<McpTool> = tool_definitions();
            JsonRpcResponse::success(id, json!({ "tools": tools }))
        }
        "tools/call" => match handle_tool_call(&state, &headers, &request.params).await {
            Ok(result) => JsonRpcResponse::success(
                id,
                serde_json::to_value(result).unwrap_or(Value::Null),
            ),
            Err(err) => JsonRpcResponse::error(id, err.kind.json_rpc_code(), err.message),
        },
        other => JsonRpcResponse::error(id, -32601, format!("unknown method '{other}'")),
    };
    Json(response)
}

async fn handle_tool_call(
    state: &McpState,
    headers: &Headers,
    params: &Value,
) -> Result<CallToolResult, TransportError> {
    let tool_name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::invalid_params("missing required parameter: name"))?;
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let (resolved, auth) =
        resolve_and_maybe_authenticate(headers, state.services.store.as_ref()).await?;
    if !is_discovery_skill(tool_name) && auth.is_none() {
        return Err(TransportError::missing_authentication());
    }

    let tenant = match (&auth, &resolved) {
        (Some(auth), _) => auth.tenant.clone(),
        (None, Some(resolved)) => resolved.tenant.clone(),
        (None, None) => {
            return Err(TransportError::invalid_params(
                "unable to determine tenant from headers; set Host or x-adcp-tenant",
            ));
        }
    };
    let principal_id = auth.as_ref().map(|a| a.principal.principal_id.clone());

    info!(tool = tool_name, tenant_id = %tenant.tenant_id, "MCP tool call");

    let reply = dispatch(
        &state.registry,
        &state.services,
        tool_name,
        arguments,
        principal_id.as_deref(),
        &tenant,
        Transport::Mcp,
        None,
    )
    .await?;

    // Deferred operations notify the request-embedded webhook from inside
    // the handler; here the result simply reports the submitted state.
    let text = reply
        .human_message
        .clone()
        .unwrap_or_else(|| format!("{tool_name} completed"));
    Ok(CallToolResult {
        content: vec![ToolContent::Text { text }],
        structured_content: reply.payload,
        is_error: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_adapters::{AdapterRegistry, MockAdapter};
    use adcp_store::mem::test_support;
    use adcp_store::MemStore;
    use adcp_tasks::{TaskService, WebhookSender};

    async fn state() -> McpState {
        let store = Arc::new(MemStore::new());
        store.add_tenant(test_support::tenant("t1", "alpha")).await;
        store
            .add_principal(test_support::principal("t1", "buyer_a", "tok_a"))
            .await;
        store.add_product(test_support::product("t1", "prod_1")).await;

        let mut adapters = AdapterRegistry::new();
        adapters.register("mock", MockAdapter::new());
        let tasks = Arc::new(TaskService::new(
            store.clone(),
            WebhookSender::with_container_host("localhost"),
        ));
        McpState {
            services: Arc::new(Services {
                store,
                adapters: Arc::new(adapters),
                tasks,
                ranker: None,
            }),
            registry: Arc::new(SkillRegistry::standard()),
            server_version: "0.1.0".to_string(),
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn tool_call_returns_structured_content() {
        let state = state().await;
        let result = handle_tool_call(
            &state,
            &headers(&[("Host", "alpha.sales-agent.example.com")]),
            &json!({
                "name": "get_products",
                "arguments": {"brand_manifest": {"name": "Acme"}},
            }),
        )
        .await
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.structured_content["products"].as_array().unwrap().len(),
            1
        );
        let ToolContent::Text { text } = &result.content[0];
        assert!(text.contains("1 product"));
    }

    #[tokio::test]
    async fn non_discovery_tool_requires_token() {
        let state = state().await;
        let err = handle_tool_call(
            &state,
            &headers(&[("Host", "alpha.sales-agent.example.com")]),
            &json!({"name": "list_creatives", "arguments": {}}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, adcp_core::ErrorKind::MissingAuthentication);
    }

    #[tokio::test]
    async fn x_adcp_auth_header_accepted() {
        let state = state().await;
        let result = handle_tool_call(
            &state,
            &headers(&[
                ("Host", "alpha.sales-agent.example.com"),
                ("x-adcp-auth", "tok_a"),
            ]),
            &json!({"name": "list_creatives", "arguments": {}}),
        )
        .await
        .unwrap();
        assert_eq!(result.structured_content["total_count"], 0);
    }

    #[tokio::test]
    async fn domain_errors_ride_inside_structured_content() {
        let state = state().await;
        let result = handle_tool_call(
            &state,
            &headers(&[
                ("Host", "alpha.sales-agent.example.com"),
                ("Authorization", "Bearer tok_a"),
            ]),
            &json!({
                "name": "create_media_buy",
                "arguments": {"packages": []},
            }),
        )
        .await
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.structured_content["errors"][0]["code"],
            "validation_error"
        );
    }
}
