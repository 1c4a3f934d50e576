// SPDX-License-Identifier: MIT OR Apache-2.0
//! Creative library skills: `sync_creatives` and `list_creatives`.

use crate::auth::store_error;
use crate::dispatch::{Services, Skill, SkillReply};
use adcp_core::creatives::{
    CreativeInput, CreativeRecord, CreativeStatus, ListCreativesRequest, ListCreativesResponse,
    SyncAction, SyncCreativeResult, SyncCreativesRequest, SyncCreativesResponse, ValidationMode,
};
use adcp_core::{AdcpError, SkillResult, ToolContext, TransportError};
use adcp_store::models::{AssignmentRow, CreativeRow, MediaBuyRow};
use adcp_store::{MediaBuyFilter, UpsertOutcome};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

fn parse<T: serde::de::DeserializeOwned>(skill: &str, params: Value) -> SkillResult<T> {
    serde_json::from_value(params)
        .map_err(|e| TransportError::invalid_params(format!("{skill}: {e}")))
}

// ---------------------------------------------------------------------------
// sync_creatives
// ---------------------------------------------------------------------------

/// `sync_creatives` — full upsert of the principal's creative library.
pub struct SyncCreativesSkill;

/// Validation failure for a single creative, or `Ok` with the review status
/// the creative should enter with.
fn validate_creative(
    input: &CreativeInput,
    tenant: &adcp_store::models::Tenant,
    mode: ValidationMode,
) -> Result<CreativeStatus, String> {
    if input.name.trim().is_empty() {
        return Err("creative name cannot be empty".to_string());
    }
    if input.media_url.is_none() && input.snippet.is_none() {
        match mode {
            ValidationMode::Strict => {
                return Err("creative needs a media_url or a snippet".to_string())
            }
            ValidationMode::Lenient => {}
        }
    }

    // Tenant-level auto-approval by format; everything else enters review.
    let auto = tenant
        .auto_approve_format_ids
        .iter()
        .any(|f| f.id == input.format_id.id);
    Ok(if auto {
        CreativeStatus::Approved
    } else {
        CreativeStatus::PendingReview
    })
}

/// Resolve `package_buyer_ref`s to `(media_buy_id, package_id)` pairs within
/// the principal's buys.
async fn resolve_assignment_targets(
    services: &Services,
    tenant_id: &str,
    principal_id: &str,
    package_buyer_refs: &[String],
) -> SkillResult<(Vec<(String, String)>, Vec<String>)> {
    let buys: Vec<MediaBuyRow> = services
        .store
        .media_buys_for(tenant_id, principal_id, &MediaBuyFilter::default())
        .await
        .map_err(store_error)?;

    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    for package_ref in package_buyer_refs {
        let mut found = false;
        for buy in &buys {
            if let Some(package) = buy.package_by_buyer_ref(package_ref) {
                resolved.push((buy.media_buy_id.clone(), package.package_id.clone()));
                found = true;
                break;
            }
        }
        if !found {
            unresolved.push(package_ref.clone());
        }
    }
    Ok((resolved, unresolved))
}

#[async_trait]
impl Skill for SyncCreativesSkill {
    fn name(&self) -> &'static str {
        "sync_creatives"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: SyncCreativesRequest = parse(self.name(), params)?;
        let push_config = req.push_notification_config.clone();
        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;
        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;

        let now = Utc::now();
        let mut results = Vec::with_capacity(req.creatives.len());
        let mut errors: Vec<AdcpError> = Vec::new();
        let mut seen_ids = Vec::new();

        for input in &req.creatives {
            let creative_id = input
                .creative_id
                .clone()
                .unwrap_or_else(|| format!("cr_{}", Uuid::new_v4().simple()));
            seen_ids.push(creative_id.clone());

            let status = match validate_creative(input, &tenant, req.validation_mode) {
                Ok(status) => status,
                Err(reason) => {
                    errors.push(
                        AdcpError::validation_error(reason)
                            .with_details(json!({"creative_id": creative_id})),
                    );
                    results.push(SyncCreativeResult {
                        creative_id,
                        action: SyncAction::Failed,
                        status: None,
                        assigned_packages: vec![],
                    });
                    continue;
                }
            };

            // Ownership: a creative id that exists under another principal is
            // invisible here; the upsert would collide, so reject it.
            if let Some(existing) = services
                .store
                .creative(&ctx.tenant_id, &creative_id)
                .await
                .map_err(store_error)?
            {
                if existing.principal_id != principal_id {
                    errors.push(
                        AdcpError::validation_error("creative id is not available")
                            .with_details(json!({"creative_id": creative_id})),
                    );
                    results.push(SyncCreativeResult {
                        creative_id,
                        action: SyncAction::Failed,
                        status: None,
                        assigned_packages: vec![],
                    });
                    continue;
                }
            }

            let row = CreativeRow {
                tenant_id: ctx.tenant_id.clone(),
                creative_id: creative_id.clone(),
                principal_id: principal_id.to_string(),
                name: input.name.clone(),
                format_id: input.format_id.clone(),
                status,
                media_url: input.media_url.clone(),
                snippet: input.snippet.clone(),
                click_url: input.click_url.clone(),
                tags: input.tags.clone(),
                created_at: now,
                updated_at: now,
            };

            let action = if req.dry_run {
                // Report the would-be action without touching state.
                match services
                    .store
                    .creative(&ctx.tenant_id, &creative_id)
                    .await
                    .map_err(store_error)?
                {
                    Some(_) => SyncAction::Updated,
                    None => SyncAction::Created,
                }
            } else {
                match services.store.upsert_creative(row).await.map_err(store_error)? {
                    UpsertOutcome::Created => SyncAction::Created,
                    UpsertOutcome::Updated => SyncAction::Updated,
                    UpsertOutcome::Unchanged => SyncAction::Unchanged,
                }
            };

            // Same-call package assignments.
            let mut assigned_packages = Vec::new();
            if let Some(assignments) = &req.assignments {
                if let Some(package_refs) = assignments.get(&creative_id) {
                    let (targets, unresolved) = resolve_assignment_targets(
                        services,
                        &ctx.tenant_id,
                        principal_id,
                        package_refs,
                    )
                    .await?;
                    for package_ref in unresolved {
                        errors.push(
                            AdcpError::validation_error(format!(
                                "unknown package buyer_ref '{package_ref}'"
                            ))
                            .with_details(json!({"creative_id": creative_id})),
                        );
                    }
                    for (media_buy_id, package_id) in targets {
                        if !req.dry_run {
                            services
                                .store
                                .insert_assignment(AssignmentRow {
                                    tenant_id: ctx.tenant_id.clone(),
                                    assignment_id: format!(
                                        "as_{}",
                                        Uuid::new_v4().simple()
                                    ),
                                    creative_id: creative_id.clone(),
                                    media_buy_id,
                                    package_id: package_id.clone(),
                                })
                                .await
                                .map_err(store_error)?;
                        }
                        assigned_packages.push(package_id);
                    }
                }
            }

            results.push(SyncCreativeResult {
                creative_id,
                action,
                status: Some(status),
                assigned_packages,
            });
        }

        // delete_missing: remove library creatives absent from this sync,
        // optionally narrowed to the `creative_ids` scope.
        if req.delete_missing {
            // One unpaged sweep of the library; deletion scope must not be
            // capped by the default page size.
            let whole_library = ListCreativesRequest {
                limit: u32::MAX,
                ..ListCreativesRequest::default()
            };
            let library = services
                .store
                .creatives_for(&ctx.tenant_id, principal_id, &whole_library)
                .await
                .map_err(store_error)?;
            let candidates: Vec<String> = library
                .creatives
                .iter()
                .map(|c| c.creative_id.clone())
                .filter(|id| !seen_ids.contains(id))
                .filter(|id| {
                    req.creative_ids
                        .as_ref()
                        .is_none_or(|scope| scope.contains(id))
                })
                .collect();

            let deleted = if req.dry_run {
                candidates
            } else {
                services
                    .store
                    .delete_creatives(&ctx.tenant_id, principal_id, &candidates)
                    .await
                    .map_err(store_error)?
            };
            for creative_id in deleted {
                results.push(SyncCreativeResult {
                    creative_id,
                    action: SyncAction::Deleted,
                    status: None,
                    assigned_packages: vec![],
                });
            }
        }

        let response = SyncCreativesResponse {
            creatives: results,
            dry_run: req.dry_run,
            errors,
            context: req.context,
        };

        let submitted = response.any_pending_review();
        if submitted && !req.dry_run {
            if let Some(config) = &push_config {
                let task = services
                    .tasks
                    .create_task(
                        &ctx.tenant_id,
                        Some(ctx.context_id.clone()),
                        vec![self.name().to_string()],
                        "explicit_skill",
                        Some(config.clone()),
                    )
                    .await;
                let mut task = task;
                task.mark_submitted();
                services.tasks.finalize(&ctx.tenant_id, &task).await;
                services
                    .tasks
                    .notify(&task, Some(config), None, Some(self.name()))
                    .await;
            }
        }

        Ok(SkillReply::new(self.name(), &response)?
            .submitted(submitted)
            .with_push_config(push_config))
    }
}

// ---------------------------------------------------------------------------
// list_creatives
// ---------------------------------------------------------------------------

/// `list_creatives` — the principal's library, paged and filtered.
pub struct ListCreativesSkill;

#[async_trait]
impl Skill for ListCreativesSkill {
    fn name(&self) -> &'static str {
        "list_creatives"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: ListCreativesRequest = parse(self.name(), params)?;
        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;

        // Buy-scoped listing: restrict to creatives assigned to the named
        // buy. A buy owned by someone else yields the empty set, never
        // another principal's data.
        let assigned_scope = match (&req.media_buy_id, &req.buyer_ref) {
            (None, None) => None,
            (media_buy_id, buyer_ref) => {
                let buy = match media_buy_id {
                    Some(id) => services
                        .store
                        .media_buy(&ctx.tenant_id, id)
                        .await
                        .map_err(store_error)?,
                    None => match buyer_ref {
                        Some(buyer_ref) => services
                            .store
                            .media_buy_by_buyer_ref(&ctx.tenant_id, buyer_ref)
                            .await
                            .map_err(store_error)?,
                        None => None,
                    },
                };
                match buy {
                    Some(buy) if buy.principal_id == principal_id => {
                        let assignments = services
                            .store
                            .assignments_for_media_buy(&ctx.tenant_id, &buy.media_buy_id)
                            .await
                            .map_err(store_error)?;
                        Some(
                            assignments
                                .into_iter()
                                .map(|a| a.creative_id)
                                .collect::<Vec<_>>(),
                        )
                    }
                    _ => Some(vec![]),
                }
            }
        };

        let page = services
            .store
            .creatives_for(&ctx.tenant_id, principal_id, &req)
            .await
            .map_err(store_error)?;

        let creatives: Vec<CreativeRecord> = page
            .creatives
            .into_iter()
            .filter(|row| {
                assigned_scope
                    .as_ref()
                    .is_none_or(|scope| scope.contains(&row.creative_id))
            })
            .map(|row| CreativeRecord {
                creative_id: row.creative_id,
                name: row.name,
                format_id: row.format_id,
                status: row.status,
                media_url: row.media_url,
                snippet: row.snippet,
                click_url: row.click_url,
                tags: row.tags,
                created_date: row.created_at,
            })
            .collect();

        let total_count = if assigned_scope.is_some() {
            creatives.len() as u64
        } else {
            page.total_count
        };
        let has_more = u64::from(req.page) * u64::from(req.limit) < total_count;

        let response = ListCreativesResponse {
            creatives,
            total_count,
            page: req.page,
            limit: req.limit,
            has_more,
            errors: vec![],
            context: req.context,
        };
        SkillReply::new(self.name(), &response)
    }
}
