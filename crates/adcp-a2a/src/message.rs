// SPDX-License-Identifier: MIT OR Apache-2.0
//! `message/send` handling: part parsing, explicit-skill dispatch, natural
//! language routing, and task shaping.

use crate::A2aState;
use adcp_core::task::{Artifact, PushAuthenticationInfo, PushNotificationConfig, TaskState, TaskStatus};
use adcp_core::{Headers, SkillResult, TransportError};
use adcp_skills::auth::resolve_and_maybe_authenticate;
use adcp_skills::{dispatch, is_discovery_skill, params, SkillReply, Transport};
use adcp_store::models::Tenant;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Parsed invocation content of a message.
#[derive(Debug, Default)]
pub struct ParsedMessage {
    /// Combined lowercase text of all text parts.
    pub text: String,
    /// Explicit `(skill, parameters)` invocations found in data parts.
    pub skill_invocations: Vec<(String, Value)>,
    /// `contextId` / `messageId` fallback for conversation correlation.
    pub context_id: Option<String>,
}

/// Pull text parts and explicit skill invocations out of `params.message`.
#[must_use]
pub fn parse_message(params: &Value) -> ParsedMessage {
    let mut parsed = ParsedMessage::default();
    let Some(message) = params.get("message") else {
        return parsed;
    };

    parsed.context_id = message
        .get("contextId")
        .or_else(|| message.get("context_id"))
        .or_else(|| message.get("messageId"))
        .or_else(|| message.get("message_id"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let mut text_parts = Vec::new();
    if let Some(parts) = message.get("parts").and_then(Value::as_array) {
        for part in parts {
            // Some clients nest the part under `root`.
            let part = part.get("root").unwrap_or(part);
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                text_parts.push(text.to_string());
            } else if let Some(data) = part.get("data") {
                if let Some(invocation) = params::explicit_skill_invocation(data) {
                    info!(skill = %invocation.0, "explicit skill invocation");
                    parsed.skill_invocations.push(invocation);
                }
            }
        }
    }
    parsed.text = text_parts.join(" ").trim().to_lowercase();
    parsed
}

/// Protocol-level push config from `params.configuration`.
#[must_use]
pub fn protocol_push_config(params: &Value) -> Option<PushNotificationConfig> {
    let config = params.get("configuration")?;
    let push = config
        .get("pushNotificationConfig")
        .or_else(|| config.get("push_notification_config"))?;
    let url = push.get("url")?.as_str()?.to_string();
    let authentication = push.get("authentication").and_then(|auth| {
        let schemes = auth
            .get("schemes")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect::<Vec<_>>();
        Some(PushAuthenticationInfo {
            schemes,
            credentials: auth
                .get("credentials")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    });
    Some(PushNotificationConfig {
        id: push.get("id").and_then(Value::as_str).map(str::to_string),
        url,
        token: push.get("token").and_then(Value::as_str).map(str::to_string),
        authentication,
    })
}

/// `message/send`: returns the shaped `Task` as a JSON value.
pub async fn handle_message_send(
    state: &A2aState,
    headers: &Headers,
    params: Value,
) -> SkillResult<Value> {
    let parsed = parse_message(&params);
    let push_config = protocol_push_config(&params);

    // Authentication requirements depend on what was requested: only
    // explicit non-discovery skills hard-require a principal up front.
    let requires_auth = parsed
        .skill_invocations
        .iter()
        .any(|(skill, _)| !is_discovery_skill(skill));

    let (resolved, auth) =
        resolve_and_maybe_authenticate(headers, state.services.store.as_ref()).await?;
    if requires_auth && auth.is_none() {
        return Err(TransportError::missing_authentication());
    }

    let tenant: Tenant = match (&auth, &resolved) {
        (Some(auth), _) => auth.tenant.clone(),
        (None, Some(resolved)) => resolved.tenant.clone(),
        (None, None) => {
            return Err(TransportError::invalid_params(
                "unable to determine tenant from headers; set Host, x-adcp-tenant, or Apx-Incoming-Host",
            ));
        }
    };
    let principal_id = auth.as_ref().map(|a| a.principal.principal_id.clone());

    let invocation_type = if parsed.skill_invocations.is_empty() {
        "natural_language"
    } else {
        "explicit_skill"
    };
    let skills_requested: Vec<String> = parsed
        .skill_invocations
        .iter()
        .map(|(skill, _)| skill.clone())
        .collect();

    let mut task = state
        .services
        .tasks
        .create_task(
            &tenant.tenant_id,
            parsed.context_id.clone(),
            skills_requested.clone(),
            invocation_type,
            push_config.clone(),
        )
        .await;
    let task_type = skills_requested.first().cloned();

    // Explicit skills first; natural language only as a fallback.
    let outcomes: Vec<(String, Result<SkillReply, TransportError>)> =
        if parsed.skill_invocations.is_empty() {
            route_natural_language(state, &tenant, principal_id.as_deref(), &parsed, parsed.context_id.clone())
                .await?
        } else {
            let mut outcomes = Vec::with_capacity(parsed.skill_invocations.len());
            for (skill, skill_params) in &parsed.skill_invocations {
                let outcome = dispatch(
                    &state.registry,
                    &state.services,
                    skill,
                    skill_params.clone(),
                    principal_id.as_deref(),
                    &tenant,
                    Transport::A2a,
                    parsed.context_id.clone(),
                )
                .await;
                // Authorization and method-resolution failures abort the
                // whole message as JSON-RPC errors; handler failures become
                // per-skill error artifacts.
                if let Err(err) = &outcome {
                    use adcp_core::ErrorKind::*;
                    if matches!(
                        err.kind,
                        MissingAuthentication | InvalidAuthToken | MethodNotFound | PermissionDenied
                    ) {
                        return Err(err.clone());
                    }
                }
                outcomes.push((skill.clone(), outcome));
            }
            outcomes
        };

    // Deferred operation: per the A2A contract the task is `submitted` and
    // carries no artifacts.
    let submitted = outcomes
        .iter()
        .any(|(_, outcome)| outcome.as_ref().is_ok_and(|reply| reply.submitted));
    if submitted {
        task.mark_submitted();
        state.services.tasks.finalize(&tenant.tenant_id, &task).await;
        state
            .services
            .tasks
            .notify(&task, push_config.as_ref(), None, task_type.as_deref())
            .await;
        return serde_json::to_value(&task).map_err(|e| TransportError::internal(e.to_string()));
    }

    let mut successes = 0usize;
    let mut failures = 0usize;
    let mut failure_result = json!({});
    for (i, (skill, outcome)) in outcomes.iter().enumerate() {
        match outcome {
            Ok(reply) => {
                successes += 1;
                task.push_artifact(Artifact::from_result(
                    format!("skill_result_{}", i + 1),
                    format!("{skill}_result"),
                    reply.human_message.clone(),
                    reply.payload.clone(),
                ));
            }
            Err(err) => {
                failures += 1;
                warn!(skill = %skill, error = %err, "skill failed");
                failure_result = json!({"error": err.message});
                task.push_artifact(Artifact::from_result(
                    format!("skill_result_{}", i + 1),
                    "error_result",
                    None,
                    json!({"error": err.message, "skill": skill}),
                ));
            }
        }
    }

    let state_after = if failures > 0 && successes == 0 {
        TaskState::Failed
    } else {
        TaskState::Completed
    };
    task.status = TaskStatus::now(state_after);
    state.services.tasks.finalize(&tenant.tenant_id, &task).await;

    let result = if state_after == TaskState::Failed {
        Some(failure_result)
    } else {
        task.artifacts
            .as_ref()
            .and_then(|artifacts| artifacts.first())
            .and_then(Artifact::data)
            .cloned()
    };
    state
        .services
        .tasks
        .notify(&task, push_config.as_ref(), result, task_type.as_deref())
        .await;

    serde_json::to_value(&task).map_err(|e| TransportError::internal(e.to_string()))
}

/// Keyword-based routing for plain-text messages. The intent lists are
/// canonical; tokenization is simple substring matching.
async fn route_natural_language(
    state: &A2aState,
    tenant: &Tenant,
    principal_id: Option<&str>,
    parsed: &ParsedMessage,
    context_id: Option<String>,
) -> SkillResult<Vec<(String, Result<SkillReply, TransportError>)>> {
    let text = parsed.text.as_str();
    let contains_any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if contains_any(&["product", "inventory", "available", "catalog"]) {
        let outcome = dispatch(
            &state.registry,
            &state.services,
            "get_products",
            json!({"brief": text}),
            principal_id,
            tenant,
            Transport::A2a,
            context_id,
        )
        .await;
        return Ok(vec![("get_products".to_string(), outcome)]);
    }

    if contains_any(&["price", "pricing", "cost", "cpm", "budget"]) {
        let reply = pricing_summary(state, tenant, principal_id).await?;
        return Ok(vec![("get_pricing".to_string(), Ok(reply))]);
    }

    if contains_any(&["target", "audience"]) {
        let payload = json!({
            "targeting_options": {
                "geo": ["country", "region", "metro"],
                "device": ["desktop", "mobile", "tablet", "ctv"],
                "audience": ["demographic", "behavioral", "contextual"],
            },
        });
        let reply = SkillReply {
            skill: "get_targeting".to_string(),
            payload,
            human_message: Some("Available targeting dimensions: geo, device, audience".to_string()),
            submitted: false,
            push_notification_config: None,
        };
        return Ok(vec![("get_targeting".to_string(), Ok(reply))]);
    }

    if contains_any(&["create", "buy", "campaign", "media"]) {
        let payload = json!({
            "success": false,
            "message": "create_media_buy requires an explicit skill invocation",
            "required_parameters": ["brand_manifest", "packages", "start_time", "end_time"],
        });
        let reply = SkillReply {
            skill: "create_media_buy".to_string(),
            payload,
            human_message: Some(
                "To create a media buy, send an explicit create_media_buy skill invocation".to_string(),
            ),
            submitted: false,
            push_notification_config: None,
        };
        return Ok(vec![("create_media_buy".to_string(), Ok(reply))]);
    }

    // General help.
    let payload = json!({
        "supported_queries": [
            "product_catalog",
            "targeting_options",
            "pricing_information",
            "campaign_creation",
        ],
        "example_queries": [
            "What video ad products do you have available?",
            "Show me targeting options",
            "What are your pricing models?",
            "How do I create a media buy?",
        ],
    });
    let reply = SkillReply {
        skill: "get_capabilities".to_string(),
        payload,
        human_message: Some("Ask about products, pricing, targeting, or campaign creation".to_string()),
        submitted: false,
        push_notification_config: None,
    };
    Ok(vec![("get_capabilities".to_string(), Ok(reply))])
}

/// Assemble a pricing overview from the tenant's visible products.
async fn pricing_summary(
    state: &A2aState,
    tenant: &Tenant,
    principal_id: Option<&str>,
) -> SkillResult<SkillReply> {
    let products = state
        .services
        .store
        .products_for(&tenant.tenant_id, principal_id)
        .await
        .map_err(adcp_skills::auth::store_error)?;

    let pricing_models: Vec<Value> = products
        .iter()
        .flat_map(|product| {
            product.pricing_options.iter().map(|option| {
                json!({
                    "product_id": product.product_id,
                    "pricing_option_id": option.pricing_option_id,
                    "pricing_model": option.pricing_model,
                    "rate": option.rate,
                    "currency": option.currency,
                    "is_fixed": option.is_fixed,
                })
            })
        })
        .collect();

    let count = pricing_models.len();
    Ok(SkillReply {
        skill: "get_pricing".to_string(),
        payload: json!({ "pricing_models": pricing_models }),
        human_message: Some(format!("{count} pricing option(s) across the catalog")),
        submitted: false,
        push_notification_config: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_data_parts() {
        let parsed = parse_message(&json!({
            "message": {
                "messageId": 42,
                "parts": [
                    {"kind": "text", "text": "Please run this"},
                    {"kind": "data", "data": {"skill": "get_products", "input": {"brief": "b"}}},
                ],
            },
        }));
        assert_eq!(parsed.text, "please run this");
        assert_eq!(parsed.skill_invocations.len(), 1);
        assert_eq!(parsed.skill_invocations[0].0, "get_products");
        assert_eq!(parsed.context_id.as_deref(), Some("42"));
    }

    #[test]
    fn nested_root_parts_supported() {
        let parsed = parse_message(&json!({
            "message": {
                "parts": [
                    {"root": {"kind": "data", "data": {"skill": "list_creatives", "parameters": {}}}},
                ],
            },
        }));
        assert_eq!(parsed.skill_invocations[0].0, "list_creatives");
    }

    #[test]
    fn context_id_prefers_context_over_message_id() {
        let parsed = parse_message(&json!({
            "message": {"contextId": "ctx-1", "messageId": "m-1", "parts": []},
        }));
        assert_eq!(parsed.context_id.as_deref(), Some("ctx-1"));
    }

    #[test]
    fn protocol_push_config_parsed_from_configuration() {
        let config = protocol_push_config(&json!({
            "configuration": {
                "pushNotificationConfig": {
                    "url": "https://buyer.example.com/hook",
                    "authentication": {"schemes": ["Bearer"], "credentials": "s"},
                },
            },
        }))
        .unwrap();
        assert_eq!(config.url, "https://buyer.example.com/hook");
        assert_eq!(config.authentication.unwrap().schemes, vec!["Bearer"]);
    }

    #[test]
    fn missing_configuration_yields_no_push_config() {
        assert!(protocol_push_config(&json!({})).is_none());
    }
}
