// SPDX-License-Identifier: MIT OR Apache-2.0
//! `tasks/pushNotificationConfig/*` methods.
//!
//! Configs are persisted per `(tenant, principal)` and soft-deleted via
//! `is_active = false`.

use crate::A2aState;
use adcp_core::task::{PushNotificationConfig, TaskPushNotificationConfig};
use adcp_core::{Headers, SkillResult, TransportError};
use adcp_skills::auth::{authenticate, resolve_tenant, store_error, AuthContext};
use adcp_store::models::PushConfigRow;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

async fn authenticated(state: &A2aState, headers: &Headers) -> SkillResult<AuthContext> {
    let resolved = resolve_tenant(headers, state.services.store.as_ref()).await?;
    authenticate(headers, resolved.as_ref(), state.services.store.as_ref()).await
}

fn config_json(row: &PushConfigRow) -> Value {
    json!({
        "id": row.id,
        "url": row.url,
        "authentication": row.authentication_type.as_ref().map(|scheme| json!({
            "schemes": [scheme],
            "credentials": row.authentication_token,
        })),
        "token": row.validation_token,
        "created_at": row.created_at,
    })
}

/// `tasks/pushNotificationConfig/set`: create or update a config.
pub async fn set_push_notification_config(
    state: &A2aState,
    headers: &Headers,
    params: Value,
) -> SkillResult<Value> {
    let auth = authenticated(state, headers).await?;

    let task_id = params
        .get("taskId")
        .or_else(|| params.get("task_id"))
        .and_then(Value::as_str)
        .unwrap_or("*")
        .to_string();
    let push = params
        .get("pushNotificationConfig")
        .or_else(|| params.get("push_notification_config"))
        .ok_or_else(|| {
            TransportError::invalid_params("missing required parameter: pushNotificationConfig")
        })?;

    let url = push
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::invalid_params("missing required parameter: url"))?
        .to_string();
    let config_id = push
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("pnc_{}", &Uuid::new_v4().simple().to_string()[..16]));
    let validation_token = push
        .get("token")
        .and_then(Value::as_str)
        .map(str::to_string);

    let (auth_type, auth_token) = match push.get("authentication") {
        Some(authentication) => {
            let scheme = authentication
                .get("schemes")
                .and_then(Value::as_array)
                .and_then(|schemes| schemes.first())
                .and_then(Value::as_str)
                .map(str::to_string);
            let credentials = authentication
                .get("credentials")
                .and_then(Value::as_str)
                .map(str::to_string);
            (scheme, credentials)
        }
        None => (None, None),
    };

    let now = Utc::now();
    let row = PushConfigRow {
        id: config_id.clone(),
        tenant_id: auth.tenant.tenant_id.clone(),
        principal_id: auth.principal.principal_id.clone(),
        url: url.clone(),
        authentication_type: auth_type.clone(),
        authentication_token: auth_token.clone(),
        validation_token: validation_token.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state
        .services
        .store
        .upsert_push_config(row)
        .await
        .map_err(store_error)?;

    info!(
        config_id = %config_id,
        tenant_id = %auth.tenant.tenant_id,
        "push notification config stored"
    );

    let response = TaskPushNotificationConfig {
        task_id,
        push_notification_config: PushNotificationConfig {
            id: Some(config_id),
            url,
            token: validation_token,
            authentication: auth_type.map(|scheme| adcp_core::PushAuthenticationInfo {
                schemes: vec![scheme],
                credentials: auth_token,
            }),
        },
    };
    serde_json::to_value(response).map_err(|e| TransportError::internal(e.to_string()))
}

/// `tasks/pushNotificationConfig/get`: fetch one active config by id.
pub async fn get_push_notification_config(
    state: &A2aState,
    headers: &Headers,
    params: Value,
) -> SkillResult<Value> {
    let auth = authenticated(state, headers).await?;
    let config_id = params
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::invalid_params("missing required parameter: id"))?;

    let row = state
        .services
        .store
        .push_config(&auth.tenant.tenant_id, &auth.principal.principal_id, config_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            TransportError::not_found(format!("push notification config not found: {config_id}"))
        })?;

    Ok(config_json(&row))
}

/// `tasks/pushNotificationConfig/list`: all active configs for the caller.
pub async fn list_push_notification_configs(
    state: &A2aState,
    headers: &Headers,
) -> SkillResult<Value> {
    let auth = authenticated(state, headers).await?;
    let rows = state
        .services
        .store
        .push_configs_for(&auth.tenant.tenant_id, &auth.principal.principal_id)
        .await
        .map_err(store_error)?;

    let configs: Vec<Value> = rows.iter().map(config_json).collect();
    Ok(json!({ "configs": configs, "total_count": configs.len() }))
}

/// `tasks/pushNotificationConfig/delete`: soft-delete a config.
pub async fn delete_push_notification_config(
    state: &A2aState,
    headers: &Headers,
    params: Value,
) -> SkillResult<Value> {
    let auth = authenticated(state, headers).await?;
    let config_id = params
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::invalid_params("missing required parameter: id"))?;

    let existed = state
        .services
        .store
        .deactivate_push_config(&auth.tenant.tenant_id, &auth.principal.principal_id, config_id)
        .await
        .map_err(store_error)?;
    if !existed {
        return Err(TransportError::not_found(format!(
            "push notification config not found: {config_id}"
        )));
    }

    Ok(json!({
        "id": config_id,
        "status": "deleted",
    }))
}
