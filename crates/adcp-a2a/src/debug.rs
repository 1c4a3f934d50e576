// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unauthenticated debug endpoints for multi-tenant routing diagnostics.
//!
//! Production gating is a deployment concern, not handled here.

use crate::rpc::to_headers;
use crate::A2aState;
use adcp_skills::auth::resolve_tenant;
use axum::extract::State;
use axum::http::{HeaderMap as HttpHeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// `GET /debug/tenant`: report what tenant the request's headers resolve to.
pub async fn debug_tenant(
    State(state): State<A2aState>,
    http_headers: HttpHeaderMap,
) -> Response {
    let headers = to_headers(&http_headers);
    let resolved = resolve_tenant(&headers, state.services.store.as_ref())
        .await
        .ok()
        .flatten();

    let body = json!({
        "tenant_id": resolved.as_ref().map(|r| r.tenant.tenant_id.clone()),
        "tenant_name": resolved.as_ref().map(|r| r.tenant.name.clone()),
        "detection_method": resolved.as_ref().map(|r| r.detection_method),
        "apx_incoming_host": headers.apx_incoming_host(),
        "host": headers.host(),
        "service": "a2a",
    });

    let mut response = Json(body).into_response();
    if let Some(resolved) = resolved {
        if let Ok(value) = HeaderValue::from_str(&resolved.tenant.tenant_id) {
            response.headers_mut().insert("x-tenant-id", value);
        }
    }
    response
}

/// `POST /admin/reset-db-pool`: close and rebuild the connection pool.
pub async fn reset_db_pool(State(state): State<A2aState>) -> Json<serde_json::Value> {
    match &state.db {
        Some(db) => match db.reset_pool().await {
            Ok(()) => Json(json!({"status": "ok", "message": "pool reset"})),
            Err(err) => Json(json!({"status": "error", "message": err.to_string()})),
        },
        None => Json(json!({"status": "ok", "message": "no database pool configured"})),
    }
}

/// `GET /debug/db-state`: health probe plus pool statistics.
pub async fn db_state(State(state): State<A2aState>) -> Json<serde_json::Value> {
    match &state.db {
        Some(db) => {
            let (healthy, detail) = db.check_health(true).await;
            let metrics = db.metrics().await;
            Json(json!({
                "healthy": healthy,
                "detail": detail,
                "pool": metrics,
            }))
        }
        None => Json(json!({
            "healthy": true,
            "detail": "in-memory store; no database pool",
        })),
    }
}
