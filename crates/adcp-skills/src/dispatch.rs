// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed skill registry and the single dispatch entry point.

use crate::params;
use adcp_core::{SkillResult, ToolContext, TransportError};
use adcp_store::models::Tenant;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Skills that may execute without a principal.
pub const DISCOVERY_SKILLS: &[&str] = &[
    "get_products",
    "list_creative_formats",
    "list_authorized_properties",
];

/// Which transport invoked the dispatcher (metadata only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// MCP tool call.
    Mcp,
    /// A2A JSON-RPC message.
    A2a,
}

impl Transport {
    fn as_str(self) -> &'static str {
        match self {
            Transport::Mcp => "mcp",
            Transport::A2a => "a2a_jsonrpc",
        }
    }
}

/// Shared resources handed to every skill handler.
pub struct Services {
    /// Persistence.
    pub store: Arc<dyn adcp_store::Store>,
    /// Ad-server adapters.
    pub adapters: Arc<adcp_adapters::AdapterRegistry>,
    /// Task lifecycle + webhooks.
    pub tasks: Arc<adcp_tasks::TaskService>,
    /// Optional brief-based product ranking helper (external LLM; the
    /// default is a pass-through).
    pub ranker: Option<Arc<dyn ProductRanker>>,
}

/// Pluggable product-ranking helper driven by the buyer's brief.
#[async_trait]
pub trait ProductRanker: Send + Sync {
    /// Reorder / filter candidate products for a free-text brief.
    async fn rank(
        &self,
        brief: &str,
        products: Vec<adcp_core::products::Product>,
    ) -> Vec<adcp_core::products::Product>;
}

/// What a skill handler returns to the transports.
#[derive(Debug, Clone)]
pub struct SkillReply {
    /// Which skill produced this.
    pub skill: String,
    /// The full AdCP response payload.
    pub payload: Value,
    /// Human-readable form of the response, for A2A text parts and MCP
    /// display text.
    pub human_message: Option<String>,
    /// The operation is deferred (manual approval / pending review). The
    /// A2A transport maps this to a `submitted` task with no artifacts.
    pub submitted: bool,
    /// Push config extracted from the request, for transports that emit
    /// protocol webhooks after dispatch.
    pub push_notification_config: Option<adcp_core::PushNotificationConfig>,
}

impl SkillReply {
    /// Reply carrying a serializable AdCP response.
    pub fn new<T: serde::Serialize + std::fmt::Display>(skill: &str, response: &T) -> SkillResult<Self> {
        let payload = serde_json::to_value(response)
            .map_err(|e| TransportError::internal(format!("response serialization failed: {e}")))?;
        Ok(Self {
            skill: skill.to_string(),
            payload,
            human_message: Some(response.to_string()),
            submitted: false,
            push_notification_config: None,
        })
    }

    /// Mark the reply as deferred.
    #[must_use]
    pub fn submitted(mut self, submitted: bool) -> Self {
        self.submitted = submitted;
        self
    }

    /// Attach the request's push config.
    #[must_use]
    pub fn with_push_config(
        mut self,
        config: Option<adcp_core::PushNotificationConfig>,
    ) -> Self {
        self.push_notification_config = config;
        self
    }
}

/// One AdCP skill.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Skill name as it appears on the wire.
    fn name(&self) -> &'static str;

    /// Whether a principal is required. Defaults to `true`; discovery
    /// skills override.
    fn requires_principal(&self) -> bool {
        true
    }

    /// Execute against normalized parameters.
    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply>;
}

/// Registry of skills, assembled once at startup.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<&'static str, Arc<dyn Skill>>,
}

impl SkillRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill.
    pub fn register(&mut self, skill: impl Skill + 'static) {
        self.skills.insert(skill.name(), Arc::new(skill));
    }

    /// The full AdCP skill set.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(crate::discovery::GetProductsSkill);
        registry.register(crate::discovery::ListCreativeFormatsSkill);
        registry.register(crate::discovery::ListAuthorizedPropertiesSkill);
        registry.register(crate::media_buy::CreateMediaBuySkill);
        registry.register(crate::media_buy::UpdateMediaBuySkill);
        registry.register(crate::media_buy::GetMediaBuyDeliverySkill);
        registry.register(crate::media_buy::UpdatePerformanceIndexSkill);
        registry.register(crate::creatives::SyncCreativesSkill);
        registry.register(crate::creatives::ListCreativesSkill);
        registry
    }

    /// Look up a skill.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    /// Sorted skill names, for `method_not_found` messages and agent cards.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.skills.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Dispatch one skill invocation.
///
/// Validates the skill exists, enforces the discovery-skill authorization
/// gate, normalizes parameters, builds the per-request [`ToolContext`], and
/// invokes the handler.
pub async fn dispatch(
    registry: &SkillRegistry,
    services: &Services,
    skill_name: &str,
    params: Value,
    principal_id: Option<&str>,
    tenant: &Tenant,
    transport: Transport,
    context_id: Option<String>,
) -> SkillResult<SkillReply> {
    let Some(skill) = registry.get(skill_name) else {
        return Err(TransportError::method_not_found(format!(
            "unknown skill '{}'; available skills: {}",
            skill_name,
            registry.names().join(", ")
        )));
    };

    if skill.requires_principal() && principal_id.is_none() {
        return Err(TransportError::missing_authentication());
    }

    let params = params::normalize(skill_name, params);

    let context_id =
        context_id.unwrap_or_else(|| format!("ctx_{}", Uuid::new_v4().simple()));
    let mut ctx = match principal_id {
        Some(principal) => ToolContext::new(context_id, &tenant.tenant_id, principal, skill_name),
        None => ToolContext::anonymous(context_id, &tenant.tenant_id, skill_name),
    };
    ctx = ctx
        .with_metadata("transport", Value::String(transport.as_str().to_string()))
        .with_metadata("tenant_subdomain", Value::String(tenant.subdomain.clone()));
    ctx.request_timestamp = Utc::now();

    info!(
        skill = skill_name,
        tenant_id = %tenant.tenant_id,
        principal_id = principal_id.unwrap_or("-"),
        transport = transport.as_str(),
        "dispatching skill"
    );

    skill.execute(services, &ctx, params).await
}

/// Whether a skill may run unauthenticated.
#[must_use]
pub fn is_discovery_skill(name: &str) -> bool {
    DISCOVERY_SKILLS.contains(&name)
}
