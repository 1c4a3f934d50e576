// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media-buy skills: `create_media_buy`, `update_media_buy`,
//! `get_media_buy_delivery`, `update_performance_index`.

use crate::auth::store_error;
use crate::dispatch::{Services, Skill, SkillReply};
use adcp_adapters::{
    AdapterConfig, AdapterCreateRequest, AdapterPackage, AdapterPackageUpdate,
    AdapterUpdateRequest,
};
use adcp_core::media_buy::{
    CreateMediaBuyRequest, CreateMediaBuyResponse, GetMediaBuyDeliveryRequest,
    GetMediaBuyDeliveryResponse, MediaBuyDelivery, MediaBuyStatus, PackageSummary,
    UpdateMediaBuyRequest, UpdateMediaBuyResponse,
};
use adcp_core::performance::{UpdatePerformanceIndexRequest, UpdatePerformanceIndexResponse};
use adcp_core::{AdcpError, SkillResult, ToolContext, TransportError};
use adcp_store::models::{
    AssignmentRow, InventoryProfile, MediaBuyRow, PackageRecord, ProductRow, WorkflowStepRow,
};
use adcp_store::{MediaBuyFilter, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

fn parse<T: serde::de::DeserializeOwned>(skill: &str, params: Value) -> SkillResult<T> {
    serde_json::from_value(params)
        .map_err(|e| TransportError::invalid_params(format!("{skill}: {e}")))
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

// ---------------------------------------------------------------------------
// create_media_buy
// ---------------------------------------------------------------------------

/// `create_media_buy`.
pub struct CreateMediaBuySkill;

const CREATE_REQUIRED_FIELDS: &[&str] = &["brand_manifest", "packages", "start_time", "end_time"];

/// The adapter's `implementation_config`, assembled from the products'
/// inventory profiles *at buy time* so that profile edits are reflected in
/// later buys.
async fn resolve_implementation_config(
    services: &Services,
    tenant_id: &str,
    products: &[ProductRow],
) -> SkillResult<Value> {
    let mut ad_units = Vec::new();
    let mut placements = Vec::new();
    let mut format_ids = Vec::new();

    for product in products {
        format_ids.extend(product.format_ids.iter().cloned());
        let Some(profile_id) = &product.inventory_profile_id else {
            continue;
        };
        let profile: InventoryProfile = services
            .store
            .inventory_profile(tenant_id, profile_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                TransportError::internal(format!(
                    "product {} references missing inventory profile {profile_id}",
                    product.product_id
                ))
            })?;
        ad_units.extend(profile.ad_units);
        placements.extend(profile.placements);
    }

    Ok(json!({
        "ad_units": ad_units,
        "placements": placements,
        "format_ids": format_ids,
    }))
}

fn advertiser_id_for(principal: &adcp_store::models::Principal, adapter: &str) -> Option<String> {
    principal
        .platform_mappings
        .get(adapter)
        .and_then(|m| m.get("advertiser_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl Skill for CreateMediaBuySkill {
    fn name(&self) -> &'static str {
        "create_media_buy"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        // Missing required fields are a domain-level rejection with the
        // fields listed, not a transport error.
        let missing: Vec<&str> = CREATE_REQUIRED_FIELDS
            .iter()
            .filter(|field| params.get(**field).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            let context = params.get("context").cloned();
            let response = CreateMediaBuyResponse::rejected(
                vec![AdcpError::validation_error(format!(
                    "missing required AdCP parameters: {}",
                    missing.join(", ")
                ))
                .with_details(json!({ "required": CREATE_REQUIRED_FIELDS, "missing": missing }))],
                context,
            );
            return SkillReply::new(self.name(), &response);
        }

        let req: CreateMediaBuyRequest = parse(self.name(), params)?;
        let push_config = req.push_notification_config.clone();

        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;
        let principal = services
            .store
            .principal(&ctx.tenant_id, principal_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("principal {principal_id}")))?;
        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;

        if req.packages.is_empty() {
            let response = CreateMediaBuyResponse::rejected(
                vec![AdcpError::validation_error("packages must not be empty")],
                req.context,
            );
            return SkillReply::new(self.name(), &response);
        }

        let now = Utc::now();
        let start_time = req.start_time.resolve(now);
        if req.end_time <= start_time {
            let response = CreateMediaBuyResponse::rejected(
                vec![AdcpError::validation_error("end_time must be after start_time")],
                req.context,
            );
            return SkillReply::new(self.name(), &response);
        }

        // Resolve every referenced product and pricing option up front; the
        // buy is all-or-nothing.
        let mut errors = Vec::new();
        let mut products = Vec::with_capacity(req.packages.len());
        let mut currency = None;
        for package in &req.packages {
            match services
                .store
                .product(&ctx.tenant_id, &package.product_id)
                .await
                .map_err(store_error)?
            {
                Some(product) if product.visible_to(Some(principal_id)) => {
                    match product.pricing_option(&package.pricing_option_id) {
                        Some(option) => {
                            currency.get_or_insert_with(|| option.currency.clone());
                        }
                        None => errors.push(
                            AdcpError::validation_error(format!(
                                "product {} has no pricing option '{}'",
                                package.product_id, package.pricing_option_id
                            ))
                            .with_details(json!({"buyer_ref": package.buyer_ref})),
                        ),
                    }
                    products.push(product);
                }
                _ => errors.push(
                    AdcpError::validation_error(format!("unknown product '{}'", package.product_id))
                        .with_details(json!({"buyer_ref": package.buyer_ref})),
                ),
            }
        }
        if !errors.is_empty() {
            let response = CreateMediaBuyResponse::rejected(errors, req.context);
            return SkillReply::new(self.name(), &response);
        }

        let buyer_ref = req
            .buyer_ref
            .clone()
            .unwrap_or_else(|| format!("buy_{}", short_id()));
        if services
            .store
            .media_buy_by_buyer_ref(&ctx.tenant_id, &buyer_ref)
            .await
            .map_err(store_error)?
            .is_some()
        {
            let response = CreateMediaBuyResponse::rejected(
                vec![AdcpError::new(
                    "duplicate_buyer_ref",
                    format!("a media buy with buyer_ref '{buyer_ref}' already exists"),
                )],
                req.context,
            );
            return SkillReply::new(self.name(), &response);
        }

        let implementation_config =
            resolve_implementation_config(services, &ctx.tenant_id, &products).await?;

        let raw_request = serde_json::to_value(&req)
            .map_err(|e| TransportError::internal(format!("request echo failed: {e}")))?;
        let currency = currency.unwrap_or_else(|| "USD".to_string());

        let package_records: Vec<PackageRecord> = req
            .packages
            .iter()
            .enumerate()
            .map(|(i, p)| PackageRecord {
                package_id: format!("{buyer_ref}_pkg_{}", i + 1),
                buyer_ref: p.buyer_ref.clone(),
                product_id: p.product_id.clone(),
                pricing_option_id: p.pricing_option_id.clone(),
                budget: p.budget,
                paused: false,
            })
            .collect();

        let reporting_webhook = req.reporting_webhook.clone();
        let next_report_at = reporting_webhook.as_ref().map(|webhook| {
            let interval = webhook.interval_seconds.unwrap_or(3600);
            now + chrono::Duration::seconds(interval as i64)
        });

        let mut row = MediaBuyRow {
            tenant_id: ctx.tenant_id.clone(),
            media_buy_id: String::new(),
            principal_id: principal_id.to_string(),
            buyer_ref: buyer_ref.clone(),
            status: MediaBuyStatus::Submitted,
            start_time,
            end_time: req.end_time,
            start_date: start_time.date_naive(),
            end_date: req.end_time.date_naive(),
            paused: false,
            packages: package_records.clone(),
            currency: currency.clone(),
            po_number: req.po_number.clone(),
            raw_request,
            reporting_webhook,
            next_report_at,
            created_at: now,
        };

        // Approval-gated path: persist as `submitted`, record the workflow
        // step, and defer the adapter call to the approval flow.
        if tenant.human_review_required {
            row.media_buy_id = format!("buy_{}", short_id());
            let media_buy_id = row.media_buy_id.clone();
            insert_buy(services, row, &req).await?;

            services
                .store
                .insert_workflow_step(WorkflowStepRow {
                    tenant_id: ctx.tenant_id.clone(),
                    step_id: format!("step_{}", short_id()),
                    media_buy_id: Some(media_buy_id.clone()),
                    step_type: "manual_approval".to_string(),
                    status: "pending".to_string(),
                    comments: vec![],
                    created_at: now,
                })
                .await
                .map_err(store_error)?;

            let task = services
                .tasks
                .create_task(
                    &ctx.tenant_id,
                    Some(ctx.context_id.clone()),
                    vec![self.name().to_string()],
                    "explicit_skill",
                    push_config.clone(),
                )
                .await;
            let mut task = task;
            task.mark_submitted();
            services.tasks.finalize(&ctx.tenant_id, &task).await;
            services
                .tasks
                .notify(&task, push_config.as_ref(), None, Some(self.name()))
                .await;

            info!(media_buy_id = %media_buy_id, "media buy submitted for manual approval");

            let response = CreateMediaBuyResponse {
                media_buy_id: Some(media_buy_id),
                buyer_ref: Some(buyer_ref),
                status: Some(MediaBuyStatus::Submitted),
                packages: package_summaries(&package_records),
                task_id: Some(task.id),
                errors: vec![],
                context: req.context.clone(),
            };
            return Ok(SkillReply::new(self.name(), &response)?
                .submitted(true)
                .with_push_config(push_config));
        }

        // Direct path: create on the ad server.
        let adapter = services
            .adapters
            .for_tenant(tenant.ad_server.as_deref())
            .ok_or_else(|| {
                TransportError::internal(format!(
                    "no adapter registered for ad server {:?}",
                    tenant.ad_server
                ))
            })?;

        let adapter_request = AdapterCreateRequest {
            config: AdapterConfig {
                adapter_type: adapter.name().to_string(),
                manual_approval_required: false,
                implementation_config,
            },
            advertiser_id: advertiser_id_for(&principal, adapter.name()),
            packages: req
                .packages
                .iter()
                .zip(&package_records)
                .map(|(p, record)| AdapterPackage {
                    package_id: record.package_id.clone(),
                    buyer_ref: p.buyer_ref.clone(),
                    product_id: p.product_id.clone(),
                    budget: p.budget,
                    targeting_overlay: p
                        .targeting_overlay
                        .clone()
                        .or_else(|| req.targeting_overlay.clone()),
                })
                .collect(),
            start_time,
            end_time: req.end_time,
            currency,
        };

        let created = match adapter.create_media_buy(adapter_request).await {
            Ok(created) => created,
            Err(err) => {
                let response = CreateMediaBuyResponse::rejected(
                    vec![AdcpError::adapter_error(&err.code, err.message)],
                    req.context,
                );
                return SkillReply::new(self.name(), &response);
            }
        };

        row.media_buy_id = created.media_buy_id.clone();
        row.status = created.status;
        insert_buy(services, row, &req).await?;

        info!(media_buy_id = %created.media_buy_id, status = %created.status, "media buy created");

        let response = CreateMediaBuyResponse {
            media_buy_id: Some(created.media_buy_id),
            buyer_ref: Some(buyer_ref),
            status: Some(created.status),
            packages: package_summaries(&package_records),
            task_id: None,
            errors: vec![],
            context: req.context.clone(),
        };
        Ok(SkillReply::new(self.name(), &response)?.with_push_config(push_config))
    }
}

fn package_summaries(records: &[PackageRecord]) -> Vec<PackageSummary> {
    records
        .iter()
        .map(|r| PackageSummary {
            package_id: r.package_id.clone(),
            buyer_ref: r.buyer_ref.clone(),
            product_id: r.product_id.clone(),
        })
        .collect()
}

/// Persist a new buy and its creation-time creative assignments.
async fn insert_buy(
    services: &Services,
    row: MediaBuyRow,
    req: &CreateMediaBuyRequest,
) -> SkillResult<()> {
    let tenant_id = row.tenant_id.clone();
    let media_buy_id = row.media_buy_id.clone();
    let packages = row.packages.clone();

    match services.store.insert_media_buy(row).await {
        Ok(()) => {}
        Err(StoreError::Conflict(message)) => {
            // The pre-check races with concurrent creates; the constraint is
            // authoritative.
            return Err(TransportError::invalid_params(message));
        }
        Err(other) => return Err(store_error(other)),
    }

    for (package_req, record) in req.packages.iter().zip(&packages) {
        let Some(creative_ids) = &package_req.creative_ids else {
            continue;
        };
        for creative_id in creative_ids {
            services
                .store
                .insert_assignment(AssignmentRow {
                    tenant_id: tenant_id.clone(),
                    assignment_id: format!("as_{}", short_id()),
                    creative_id: creative_id.clone(),
                    media_buy_id: media_buy_id.clone(),
                    package_id: record.package_id.clone(),
                })
                .await
                .map_err(store_error)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// update_media_buy
// ---------------------------------------------------------------------------

/// `update_media_buy`.
pub struct UpdateMediaBuySkill;

#[async_trait]
impl Skill for UpdateMediaBuySkill {
    fn name(&self) -> &'static str {
        "update_media_buy"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: UpdateMediaBuyRequest = parse(self.name(), params)?;

        // oneOf: exactly one identifier.
        let mut buy = match (&req.media_buy_id, &req.buyer_ref) {
            (Some(_), Some(_)) => {
                return Err(TransportError::invalid_params(
                    "provide exactly one of 'media_buy_id' or 'buyer_ref', not both",
                ));
            }
            (None, None) => {
                return Err(TransportError::invalid_params(
                    "one of 'media_buy_id' or 'buyer_ref' is required",
                ));
            }
            (Some(id), None) => services
                .store
                .media_buy(&ctx.tenant_id, id)
                .await
                .map_err(store_error)?
                .ok_or_else(|| TransportError::not_found(format!("media buy {id}")))?,
            (None, Some(buyer_ref)) => services
                .store
                .media_buy_by_buyer_ref(&ctx.tenant_id, buyer_ref)
                .await
                .map_err(store_error)?
                .ok_or_else(|| {
                    TransportError::not_found(format!("media buy with buyer_ref {buyer_ref}"))
                })?,
        };

        // Ownership gate before any mutation.
        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;
        if buy.principal_id != principal_id {
            return Err(TransportError::permission_denied(format!(
                "media buy {} belongs to another principal",
                buy.media_buy_id
            )));
        }

        // Resolve package updates to stored package ids.
        let mut adapter_packages = Vec::new();
        let mut affected = Vec::new();
        let mut errors = Vec::new();
        if let Some(updates) = &req.packages {
            for update in updates {
                let found = buy.packages.iter().find(|p| {
                    update
                        .package_id
                        .as_deref()
                        .is_some_and(|id| id == p.package_id)
                        || update
                            .buyer_ref
                            .as_deref()
                            .is_some_and(|r| r == p.buyer_ref)
                });
                match found {
                    Some(package) => {
                        affected.push(package.package_id.clone());
                        adapter_packages.push(AdapterPackageUpdate {
                            package_id: package.package_id.clone(),
                            budget: update.budget,
                            paused: update.paused,
                        });
                    }
                    None => errors.push(AdcpError::validation_error(format!(
                        "no package matches {:?}/{:?}",
                        update.package_id, update.buyer_ref
                    ))),
                }
            }
        }
        if !errors.is_empty() {
            let response = UpdateMediaBuyResponse {
                media_buy_id: Some(buy.media_buy_id.clone()),
                buyer_ref: Some(buy.buyer_ref.clone()),
                status: Some(buy.status),
                affected_packages: vec![],
                errors,
                context: req.context,
            };
            return SkillReply::new(self.name(), &response);
        }

        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;
        let adapter = services
            .adapters
            .for_tenant(tenant.ad_server.as_deref())
            .ok_or_else(|| {
                TransportError::internal(format!(
                    "no adapter registered for ad server {:?}",
                    tenant.ad_server
                ))
            })?;

        let now = Utc::now();
        let start_time = req.start_time.map(|s| s.resolve(now));
        if let Err(err) = adapter
            .update_media_buy(AdapterUpdateRequest {
                media_buy_id: buy.media_buy_id.clone(),
                paused: req.paused,
                start_time,
                end_time: req.end_time,
                budget: req.budget,
                packages: adapter_packages,
            })
            .await
        {
            let response = UpdateMediaBuyResponse {
                media_buy_id: Some(buy.media_buy_id.clone()),
                buyer_ref: Some(buy.buyer_ref.clone()),
                status: Some(buy.status),
                affected_packages: vec![],
                errors: vec![AdcpError::adapter_error(&err.code, err.message)],
                context: req.context,
            };
            return SkillReply::new(self.name(), &response);
        }

        // Apply the accepted updates to the stored row.
        if let Some(paused) = req.paused {
            buy.paused = paused;
            buy.status = if paused {
                MediaBuyStatus::Paused
            } else if buy.status == MediaBuyStatus::Paused {
                MediaBuyStatus::Active
            } else {
                buy.status
            };
        }
        if let Some(start) = start_time {
            buy.start_time = start;
            buy.start_date = start.date_naive();
        }
        if let Some(end) = req.end_time {
            buy.end_time = end;
            buy.end_date = end.date_naive();
        }
        if let Some(updates) = &req.packages {
            for update in updates {
                if let Some(package) = buy.packages.iter_mut().find(|p| {
                    update
                        .package_id
                        .as_deref()
                        .is_some_and(|id| id == p.package_id)
                        || update
                            .buyer_ref
                            .as_deref()
                            .is_some_and(|r| r == p.buyer_ref)
                }) {
                    if let Some(budget) = update.budget {
                        package.budget = budget;
                    }
                    if let Some(paused) = update.paused {
                        package.paused = paused;
                    }
                }
            }
        }
        services
            .store
            .update_media_buy(buy.clone())
            .await
            .map_err(store_error)?;

        let response = UpdateMediaBuyResponse {
            media_buy_id: Some(buy.media_buy_id),
            buyer_ref: Some(buy.buyer_ref),
            status: Some(buy.status),
            affected_packages: affected,
            errors: vec![],
            context: req.context,
        };
        SkillReply::new(self.name(), &response)
    }
}

// ---------------------------------------------------------------------------
// get_media_buy_delivery
// ---------------------------------------------------------------------------

/// `get_media_buy_delivery`.
pub struct GetMediaBuyDeliverySkill;

#[async_trait]
impl Skill for GetMediaBuyDeliverySkill {
    fn name(&self) -> &'static str {
        "get_media_buy_delivery"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: GetMediaBuyDeliveryRequest = parse(self.name(), params)?;
        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;

        let filter = MediaBuyFilter {
            media_buy_ids: req.media_buy_ids.clone(),
            buyer_refs: req.buyer_refs.clone(),
            status: req.status_filter.clone(),
        };
        let buys = services
            .store
            .media_buys_for(&ctx.tenant_id, principal_id, &filter)
            .await
            .map_err(store_error)?;

        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;
        let adapter = services
            .adapters
            .for_tenant(tenant.ad_server.as_deref())
            .ok_or_else(|| {
                TransportError::internal(format!(
                    "no adapter registered for ad server {:?}",
                    tenant.ad_server
                ))
            })?;

        let mut deliveries = Vec::with_capacity(buys.len());
        let mut errors = Vec::new();
        for buy in buys {
            match adapter
                .get_delivery(&buy.media_buy_id, (req.start_date, req.end_date))
                .await
            {
                Ok(delivery) => deliveries.push(MediaBuyDelivery {
                    media_buy_id: buy.media_buy_id,
                    buyer_ref: Some(buy.buyer_ref),
                    status: Some(buy.status),
                    totals: delivery.totals,
                    packages: Some(delivery.by_package),
                }),
                Err(err) => errors.push(
                    AdcpError::adapter_error(&err.code, err.message)
                        .with_details(json!({"media_buy_id": buy.media_buy_id})),
                ),
            }
        }

        // Polling never fires the reporting webhook; only the scheduler
        // emits those.
        let response = GetMediaBuyDeliveryResponse {
            media_buy_deliveries: deliveries,
            errors,
            context: req.context,
        };
        SkillReply::new(self.name(), &response)
    }
}

// ---------------------------------------------------------------------------
// update_performance_index
// ---------------------------------------------------------------------------

/// `update_performance_index`.
pub struct UpdatePerformanceIndexSkill;

#[async_trait]
impl Skill for UpdatePerformanceIndexSkill {
    fn name(&self) -> &'static str {
        "update_performance_index"
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: UpdatePerformanceIndexRequest = parse(self.name(), params)?;
        let principal_id = ctx
            .principal()
            .ok_or_else(TransportError::missing_authentication)?;

        let buy = services
            .store
            .media_buy(&ctx.tenant_id, &req.media_buy_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("media buy {}", req.media_buy_id)))?;
        if buy.principal_id != principal_id {
            return Err(TransportError::permission_denied(format!(
                "media buy {} belongs to another principal",
                buy.media_buy_id
            )));
        }

        services
            .store
            .record_performance_feedback(&ctx.tenant_id, &req.media_buy_id, &req.performance_data)
            .await
            .map_err(store_error)?;

        let response = UpdatePerformanceIndexResponse::accepted(req.context);
        SkillReply::new(self.name(), &response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_adapters::{AdapterRegistry, MockAdapter};
    use adcp_core::ErrorKind;
    use adcp_store::mem::test_support;
    use adcp_store::MemStore;
    use adcp_tasks::{TaskService, WebhookSender};
    use std::sync::Arc;

    fn services(store: Arc<MemStore>) -> Services {
        let mut adapters = AdapterRegistry::new();
        adapters.register("mock", MockAdapter::new());
        let tasks = Arc::new(TaskService::new(
            store.clone(),
            WebhookSender::with_container_host("localhost"),
        ));
        Services {
            store,
            adapters: Arc::new(adapters),
            tasks,
            ranker: None,
        }
    }

    async fn seeded() -> (Services, Arc<MemStore>) {
        let store = Arc::new(MemStore::new());
        store.add_tenant(test_support::tenant("t1", "alpha")).await;
        store
            .add_principal(test_support::principal("t1", "buyer_a", "tok_a"))
            .await;
        store.add_product(test_support::product("t1", "prod_1")).await;
        (services(store.clone()), store)
    }

    fn create_params(buyer_ref: &str) -> Value {
        json!({
            "brand_manifest": {"name": "Acme"},
            "buyer_ref": buyer_ref,
            "packages": [{
                "buyer_ref": "pk1",
                "product_id": "prod_1",
                "pricing_option_id": "cpm_usd_fixed",
                "budget": 5000.0,
            }],
            "start_time": "asap",
            "end_time": (Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
        })
    }

    fn ctx(principal: &str, tool: &str) -> ToolContext {
        ToolContext::new("ctx_test", "t1", principal, tool)
    }

    #[tokio::test]
    async fn create_missing_fields_rejected_with_listing() {
        let (services, _) = seeded().await;
        let reply = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), json!({"packages": []}))
            .await
            .unwrap();
        let errors = reply.payload["errors"].as_array().unwrap();
        assert_eq!(errors[0]["code"], "validation_error");
        let missing = errors[0]["details"]["missing"].as_array().unwrap();
        assert!(missing.iter().any(|m| m == "brand_manifest"));
        assert!(missing.iter().any(|m| m == "start_time"));
        assert!(reply.payload.get("media_buy_id").is_none());
    }

    #[tokio::test]
    async fn create_succeeds_with_active_status() {
        let (services, store) = seeded().await;
        let reply = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), create_params("br_1"))
            .await
            .unwrap();
        assert!(reply.payload["media_buy_id"].is_string());
        let status = reply.payload["status"].as_str().unwrap();
        assert!(status == "active" || status == "pending_activation");
        assert!(!reply.submitted);

        let media_buy_id = reply.payload["media_buy_id"].as_str().unwrap();
        let stored = store.media_buy("t1", media_buy_id).await.unwrap().unwrap();
        assert_eq!(stored.principal_id, "buyer_a");
        assert_eq!(stored.packages.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_buyer_ref_rejected() {
        let (services, _) = seeded().await;
        let first = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), create_params("br_dup"))
            .await
            .unwrap();
        assert!(first.payload["media_buy_id"].is_string());

        let second = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), create_params("br_dup"))
            .await
            .unwrap();
        assert!(second.payload.get("media_buy_id").is_none());
        assert_eq!(second.payload["errors"][0]["code"], "duplicate_buyer_ref");
    }

    #[tokio::test]
    async fn unknown_product_is_domain_error() {
        let (services, _) = seeded().await;
        let mut params = create_params("br_2");
        params["packages"][0]["product_id"] = json!("nope");
        let reply = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), params)
            .await
            .unwrap();
        assert_eq!(reply.payload["errors"][0]["code"], "validation_error");
        assert!(reply.payload["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("nope"));
    }

    #[tokio::test]
    async fn human_review_returns_submitted_with_task() {
        let store = Arc::new(MemStore::new());
        let mut tenant = test_support::tenant("t1", "alpha");
        tenant.human_review_required = true;
        store.add_tenant(tenant).await;
        store
            .add_principal(test_support::principal("t1", "buyer_a", "tok_a"))
            .await;
        store.add_product(test_support::product("t1", "prod_1")).await;
        let services = services(store.clone());

        let reply = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), create_params("br_hr"))
            .await
            .unwrap();
        assert!(reply.submitted);
        assert_eq!(reply.payload["status"], "submitted");
        assert!(reply.payload["task_id"].is_string());

        // A workflow step records the pending approval.
        let steps = store.workflow_steps().await;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step_type, "manual_approval");
        assert_eq!(steps[0].status, "pending");
    }

    #[tokio::test]
    async fn inventory_profile_resolved_at_buy_time() {
        let (services, store) = seeded().await;
        let mut product = test_support::product("t1", "prod_prof");
        product.inventory_profile_id = Some("prof_1".into());
        store.add_product(product).await;
        store
            .add_inventory_profile(adcp_store::models::InventoryProfile {
                tenant_id: "t1".into(),
                inventory_profile_id: "prof_1".into(),
                name: "Homepage".into(),
                ad_units: vec![json!({"id": "au_1"})],
                placements: vec![json!({"id": "pl_1"})],
                publisher_properties: vec![],
            })
            .await;

        let mut params = create_params("br_prof");
        params["packages"][0]["product_id"] = json!("prod_prof");
        let reply = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), params.clone())
            .await
            .unwrap();
        assert!(reply.payload["media_buy_id"].is_string());

        // Edit the profile; a later buy must see the new ad units.
        store
            .replace_inventory_profile(adcp_store::models::InventoryProfile {
                tenant_id: "t1".into(),
                inventory_profile_id: "prof_1".into(),
                name: "Homepage".into(),
                ad_units: vec![json!({"id": "au_2"})],
                placements: vec![],
                publisher_properties: vec![],
            })
            .await;
        let rows = store.products_for("t1", Some("buyer_a")).await.unwrap();
        let product = rows.iter().find(|p| p.product_id == "prod_prof").unwrap();
        let config = resolve_implementation_config(&services, "t1", &[product.clone()])
            .await
            .unwrap();
        assert_eq!(config["ad_units"][0]["id"], "au_2");
    }

    #[tokio::test]
    async fn cross_principal_update_rejected_without_mutation() {
        let (services, store) = seeded().await;
        store
            .add_principal(test_support::principal("t1", "buyer_b", "tok_b"))
            .await;
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "buyer_a",
                "mb_owned",
                "br_own",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();

        let err = UpdateMediaBuySkill
            .execute(
                &services,
                &ctx("buyer_b", "update_media_buy"),
                json!({"media_buy_id": "mb_owned", "paused": true}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);

        let row = store.media_buy("t1", "mb_owned").await.unwrap().unwrap();
        assert_eq!(row.status, MediaBuyStatus::Active);
        assert!(!row.paused);
    }

    #[tokio::test]
    async fn update_rejects_both_identifiers() {
        let (services, _) = seeded().await;
        let err = UpdateMediaBuySkill
            .execute(
                &services,
                &ctx("buyer_a", "update_media_buy"),
                json!({"media_buy_id": "mb_1", "buyer_ref": "br_1"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParams);
    }

    #[tokio::test]
    async fn update_pauses_owned_buy() {
        let (services, store) = seeded().await;
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "buyer_a",
                "mb_1",
                "br_1",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();

        let reply = UpdateMediaBuySkill
            .execute(
                &services,
                &ctx("buyer_a", "update_media_buy"),
                json!({"media_buy_id": "mb_1", "paused": true}),
            )
            .await
            .unwrap();
        assert_eq!(reply.payload["status"], "paused");

        let row = store.media_buy("t1", "mb_1").await.unwrap().unwrap();
        assert!(row.paused);
        assert_eq!(row.status, MediaBuyStatus::Paused);
    }

    #[tokio::test]
    async fn update_by_buyer_ref_touches_named_package() {
        let (services, store) = seeded().await;
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "buyer_a",
                "mb_1",
                "br_1",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();

        let reply = UpdateMediaBuySkill
            .execute(
                &services,
                &ctx("buyer_a", "update_media_buy"),
                json!({
                    "buyer_ref": "br_1",
                    "packages": [{"buyer_ref": "pk1", "budget": 750.0}],
                }),
            )
            .await
            .unwrap();
        assert_eq!(reply.payload["affected_packages"][0], "mb_1_pkg_1");

        let row = store.media_buy("t1", "mb_1").await.unwrap().unwrap();
        assert!((row.packages[0].budget - 750.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn delivery_returns_one_entry_per_owned_buy() {
        let (services, _) = seeded().await;
        let created = CreateMediaBuySkill
            .execute(&services, &ctx("buyer_a", "create_media_buy"), create_params("br_d"))
            .await
            .unwrap();
        let media_buy_id = created.payload["media_buy_id"].as_str().unwrap().to_string();

        let reply = GetMediaBuyDeliverySkill
            .execute(
                &services,
                &ctx("buyer_a", "get_media_buy_delivery"),
                json!({"media_buy_ids": [media_buy_id]}),
            )
            .await
            .unwrap();
        let deliveries = reply.payload["media_buy_deliveries"].as_array().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0]["media_buy_id"], json!(media_buy_id));
        assert!(deliveries[0]["totals"]["impressions"].is_u64());
    }

    #[tokio::test]
    async fn delivery_without_criteria_returns_all_owned() {
        let (services, store) = seeded().await;
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "buyer_a",
                "mb_1",
                "br_1",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "other",
                "mb_2",
                "br_2",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();

        let reply = GetMediaBuyDeliverySkill
            .execute(&services, &ctx("buyer_a", "get_media_buy_delivery"), json!({}))
            .await
            .unwrap();
        let deliveries = reply.payload["media_buy_deliveries"].as_array().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0]["media_buy_id"], "mb_1");
    }

    #[tokio::test]
    async fn performance_feedback_recorded_for_owner_only() {
        let (services, store) = seeded().await;
        store
            .insert_media_buy(test_support::media_buy(
                "t1",
                "buyer_a",
                "mb_1",
                "br_1",
                MediaBuyStatus::Active,
            ))
            .await
            .unwrap();

        let reply = UpdatePerformanceIndexSkill
            .execute(
                &services,
                &ctx("buyer_a", "update_performance_index"),
                json!({
                    "media_buy_id": "mb_1",
                    "performance_data": [{"product_id": "prod_1", "performance_index": 1.4}],
                }),
            )
            .await
            .unwrap();
        assert_eq!(reply.payload["status"], "accepted");
        assert_eq!(store.performance_feedback().await.len(), 1);

        store
            .add_principal(test_support::principal("t1", "buyer_b", "tok_b"))
            .await;
        let err = UpdatePerformanceIndexSkill
            .execute(
                &services,
                &ctx("buyer_b", "update_performance_index"),
                json!({
                    "media_buy_id": "mb_1",
                    "performance_data": [{"product_id": "prod_1", "performance_index": 0.4}],
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
    }
}
