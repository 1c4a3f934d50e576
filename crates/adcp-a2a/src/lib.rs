// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! A2A JSON-RPC transport.
//!
//! Serves `message/send`, `message/stream`, `tasks/get`, `tasks/cancel`,
//! and the push-notification-config methods at `/a2a` (and `/a2a/`), plus
//! the agent-card discovery endpoints and the tenant-routing debug surface.

pub mod card;
pub mod debug;
pub mod message;
pub mod push_config;
pub mod rpc;

use adcp_skills::{Services, SkillRegistry};
use adcp_store::Db;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

/// Shared state for the A2A router.
#[derive(Clone)]
pub struct A2aState {
    /// Skill-handler resources.
    pub services: Arc<Services>,
    /// The skill registry.
    pub registry: Arc<SkillRegistry>,
    /// The database resource, when one backs the store (debug endpoints).
    pub db: Option<Arc<Db>>,
    /// Version advertised on the agent card.
    pub agent_version: String,
    /// Fallback agent-card URL when no host header is usable.
    pub default_url: String,
}

/// Request logging middleware (method, path, status, duration) with a
/// generated request id on the response.
async fn request_logger(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let mut resp = next.run(req).await;

    info!(
        http.method = %method,
        http.path = %path,
        http.status = resp.status().as_u16(),
        http.duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request completed"
    );
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

/// Build the A2A router.
///
/// `/a2a` and `/a2a/` are registered separately so both POST without any
/// redirect, and the agent card is reachable at all three discovery paths.
pub fn build_router(state: A2aState) -> Router {
    // Browser-facing discovery endpoints need permissive CORS.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/a2a", post(rpc::rpc_endpoint))
        .route("/a2a/", post(rpc::rpc_endpoint))
        .route("/.well-known/agent-card.json", get(card::agent_card_endpoint))
        .route("/.well-known/agent.json", get(card::agent_card_endpoint))
        .route("/agent.json", get(card::agent_card_endpoint))
        .route("/debug/tenant", get(debug::debug_tenant))
        .route("/admin/reset-db-pool", post(debug::reset_db_pool))
        .route("/debug/db-state", get(debug::db_state))
        .layer(axum::middleware::from_fn(request_logger))
        .layer(cors)
        .with_state(state)
}
