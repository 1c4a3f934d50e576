// SPDX-License-Identifier: MIT OR Apache-2.0
//! Agent-card discovery.
//!
//! The card is served at `/.well-known/agent-card.json` (primary),
//! `/.well-known/agent.json` (legacy), and `/agent.json`; all three return
//! the same card. The `url` field's authority comes from
//! `Apx-Incoming-Host` when present, otherwise `Host`; the value always
//! ends in `/a2a` with no trailing slash.

use crate::rpc::to_headers;
use crate::A2aState;
use adcp_core::Headers;
use axum::extract::State;
use axum::http::HeaderMap as HttpHeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

/// `http` only for loopback hosts; everything else is behind TLS.
fn protocol_for(host: &str) -> &'static str {
    if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
        "http"
    } else {
        "https"
    }
}

/// Compute the card URL for a request.
#[must_use]
pub fn agent_card_url(headers: &Headers, default_url: &str) -> String {
    if let Some(apx) = headers.apx_incoming_host() {
        return format!("{}://{apx}/a2a", protocol_for(apx));
    }
    if let Some(host) = headers.host() {
        return format!("{}://{host}/a2a", protocol_for(host));
    }
    default_url.to_string()
}

/// One advertised skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Skill id.
    pub id: String,
    /// Skill name (same as id for AdCP skills).
    pub name: String,
    /// Human description.
    pub description: String,
    /// Discovery tags.
    pub tags: Vec<String>,
}

/// The AdCP protocol extension advertised in capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExtension {
    /// Extension schema URI.
    pub uri: String,
    /// Human description.
    pub description: String,
    /// Extension parameters: `adcp_version`, `protocols_supported`.
    pub params: serde_json::Value,
}

/// Advertised capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Push notifications are supported.
    pub push_notifications: bool,
    /// Protocol extensions.
    pub extensions: Vec<AgentExtension>,
}

/// The A2A agent card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Agent display name.
    pub name: String,
    /// Agent description.
    pub description: String,
    /// Agent version.
    pub version: String,
    /// A2A protocol version.
    pub protocol_version: String,
    /// Capabilities and extensions.
    pub capabilities: AgentCapabilities,
    /// Accepted input modes.
    pub default_input_modes: Vec<String>,
    /// Produced output modes.
    pub default_output_modes: Vec<String>,
    /// Advertised skills.
    pub skills: Vec<AgentSkill>,
    /// JSON-RPC endpoint URL. Ends in `/a2a`, never a trailing slash.
    pub url: String,
}

/// Build the card for a given endpoint URL.
#[must_use]
pub fn build_agent_card(url: String, version: &str, skill_names: &[&str]) -> AgentCard {
    let extension = AgentExtension {
        uri: format!(
            "https://adcontextprotocol.org/schemas/{}/protocols/adcp-extension.json",
            adcp_core::ADCP_VERSION
        ),
        description: "AdCP protocol version and supported domains".to_string(),
        params: serde_json::json!({
            "adcp_version": adcp_core::ADCP_VERSION,
            "protocols_supported": adcp_core::PROTOCOLS_SUPPORTED,
        }),
    };

    let skills = skill_names
        .iter()
        .map(|name| AgentSkill {
            id: (*name).to_string(),
            name: (*name).to_string(),
            description: skill_description(name).to_string(),
            tags: skill_tags(name).iter().map(|t| t.to_string()).collect(),
        })
        .collect();

    AgentCard {
        name: "AdCP Sales Agent".to_string(),
        description: "Agent for programmatic advertising campaigns via the AdCP protocol"
            .to_string(),
        version: version.to_string(),
        protocol_version: "1.0".to_string(),
        capabilities: AgentCapabilities {
            push_notifications: true,
            extensions: vec![extension],
        },
        default_input_modes: vec!["message".to_string()],
        default_output_modes: vec!["message".to_string()],
        skills,
        url,
    }
}

fn skill_description(name: &str) -> &'static str {
    match name {
        "get_products" => "Browse available advertising products and inventory",
        "create_media_buy" => "Create advertising campaigns with products, targeting, and budget",
        "list_creative_formats" => "List all available creative formats and specifications",
        "list_authorized_properties" => "List properties this agent is authorized to sell",
        "update_media_buy" => "Update an existing media buy's configuration",
        "get_media_buy_delivery" => "Get delivery metrics for media buys",
        "update_performance_index" => "Submit performance feedback for optimization",
        "sync_creatives" => "Upload and manage creatives in the centralized library",
        "list_creatives" => "Search the creative library with filtering and pagination",
        _ => "AdCP skill",
    }
}

fn skill_tags(name: &str) -> &'static [&'static str] {
    match name {
        "get_products" => &["products", "inventory", "catalog", "adcp"],
        "create_media_buy" => &["campaign", "media", "buy", "adcp"],
        "list_creative_formats" => &["creative", "formats", "discovery", "adcp"],
        "list_authorized_properties" => &["properties", "publisher", "adcp"],
        "update_media_buy" => &["campaign", "update", "management", "adcp"],
        "get_media_buy_delivery" => &["delivery", "metrics", "monitoring", "adcp"],
        "update_performance_index" => &["performance", "optimization", "adcp"],
        "sync_creatives" => &["creative", "sync", "library", "adcp"],
        "list_creatives" => &["creative", "library", "search", "adcp"],
        _ => &["adcp"],
    }
}

/// All three discovery endpoints serve this handler.
pub async fn agent_card_endpoint(
    State(state): State<A2aState>,
    http_headers: HttpHeaderMap,
) -> Json<AgentCard> {
    let headers = to_headers(&http_headers);
    let url = agent_card_url(&headers, &state.default_url);
    Json(build_agent_card(
        url,
        &state.agent_version,
        &state.registry.names(),
    ))
}
