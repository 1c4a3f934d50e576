// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory store for unit tests and environments flagged as testing.
//!
//! Semantics mirror [`crate::pg::PgStore`] exactly — tenant scoping,
//! principal ownership, buyer_ref uniqueness — so the skill handlers can be
//! exercised without a database.

use crate::models::{
    AssignmentRow, ContextRow, CreativeRow, InventoryProfile, MediaBuyRow, Principal, ProductRow,
    PushConfigRow, Tenant, TaskRow, WorkflowStepRow,
};
use crate::pool::{StoreError, StoreResult};
use crate::store::{
    page_creatives, CreativePage, MediaBuyFilter, ReportingTarget, Store, UpsertOutcome,
};
use adcp_core::creatives::ListCreativesRequest;
use adcp_core::discovery::CreativeFormat;
use adcp_core::media_buy::MediaBuyStatus;
use adcp_core::performance::ProductPerformance;
use adcp_core::TaskState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    tenants: Vec<Tenant>,
    principals: Vec<Principal>,
    products: Vec<ProductRow>,
    inventory_profiles: Vec<InventoryProfile>,
    formats: HashMap<String, Vec<CreativeFormat>>,
    media_buys: Vec<MediaBuyRow>,
    creatives: Vec<CreativeRow>,
    assignments: Vec<AssignmentRow>,
    push_configs: Vec<PushConfigRow>,
    tasks: Vec<TaskRow>,
    workflow_steps: Vec<WorkflowStepRow>,
    contexts: Vec<ContextRow>,
    performance_feedback: Vec<(String, String, Vec<ProductPerformance>)>,
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant.
    pub async fn add_tenant(&self, tenant: Tenant) {
        self.inner.write().await.tenants.push(tenant);
    }

    /// Seed a principal.
    pub async fn add_principal(&self, principal: Principal) {
        self.inner.write().await.principals.push(principal);
    }

    /// Seed a product.
    pub async fn add_product(&self, product: ProductRow) {
        self.inner.write().await.products.push(product);
    }

    /// Seed an inventory profile.
    pub async fn add_inventory_profile(&self, profile: InventoryProfile) {
        self.inner.write().await.inventory_profiles.push(profile);
    }

    /// Seed a tenant's creative formats.
    pub async fn add_creative_formats(&self, tenant_id: &str, formats: Vec<CreativeFormat>) {
        self.inner
            .write()
            .await
            .formats
            .entry(tenant_id.to_string())
            .or_default()
            .extend(formats);
    }

    /// Replace an inventory profile (tests that edit profiles between buys).
    pub async fn replace_inventory_profile(&self, profile: InventoryProfile) {
        let mut inner = self.inner.write().await;
        inner.inventory_profiles.retain(|p| {
            !(p.tenant_id == profile.tenant_id
                && p.inventory_profile_id == profile.inventory_profile_id)
        });
        inner.inventory_profiles.push(profile);
    }

    /// Recorded performance feedback, for assertions.
    pub async fn performance_feedback(&self) -> Vec<(String, String, Vec<ProductPerformance>)> {
        self.inner.read().await.performance_feedback.clone()
    }

    /// Recorded workflow steps, for assertions.
    pub async fn workflow_steps(&self) -> Vec<WorkflowStepRow> {
        self.inner.read().await.workflow_steps.clone()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<Tenant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tenants
            .iter()
            .find(|t| t.is_active && t.subdomain == subdomain)
            .cloned())
    }

    async fn tenant_by_virtual_host(&self, host: &str) -> StoreResult<Option<Tenant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tenants
            .iter()
            .find(|t| t.is_active && t.virtual_host.as_deref() == Some(host))
            .cloned())
    }

    async fn tenant_by_id(&self, tenant_id: &str) -> StoreResult<Option<Tenant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tenants
            .iter()
            .find(|t| t.is_active && t.tenant_id == tenant_id)
            .cloned())
    }

    async fn principal_by_token(
        &self,
        token: &str,
        tenant_id: Option<&str>,
    ) -> StoreResult<Option<Principal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .principals
            .iter()
            .find(|p| {
                p.access_token == token
                    && tenant_id.is_none_or(|tenant| p.tenant_id == tenant)
            })
            .cloned())
    }

    async fn principal(&self, tenant_id: &str, principal_id: &str) -> StoreResult<Option<Principal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .principals
            .iter()
            .find(|p| p.tenant_id == tenant_id && p.principal_id == principal_id)
            .cloned())
    }

    async fn products_for(
        &self,
        tenant_id: &str,
        principal_id: Option<&str>,
    ) -> StoreResult<Vec<ProductRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| p.tenant_id == tenant_id && p.visible_to(principal_id))
            .cloned()
            .collect())
    }

    async fn product(&self, tenant_id: &str, product_id: &str) -> StoreResult<Option<ProductRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .find(|p| p.tenant_id == tenant_id && p.product_id == product_id)
            .cloned())
    }

    async fn inventory_profile(
        &self,
        tenant_id: &str,
        profile_id: &str,
    ) -> StoreResult<Option<InventoryProfile>> {
        let inner = self.inner.read().await;
        Ok(inner
            .inventory_profiles
            .iter()
            .find(|p| p.tenant_id == tenant_id && p.inventory_profile_id == profile_id)
            .cloned())
    }

    async fn creative_formats(&self, tenant_id: &str) -> StoreResult<Vec<CreativeFormat>> {
        let inner = self.inner.read().await;
        Ok(inner.formats.get(tenant_id).cloned().unwrap_or_default())
    }

    async fn insert_media_buy(&self, row: MediaBuyRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .media_buys
            .iter()
            .any(|b| b.tenant_id == row.tenant_id && b.buyer_ref == row.buyer_ref);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "media buy with buyer_ref '{}' already exists",
                row.buyer_ref
            )));
        }
        inner.media_buys.push(row);
        Ok(())
    }

    async fn media_buy(&self, tenant_id: &str, media_buy_id: &str) -> StoreResult<Option<MediaBuyRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .find(|b| b.tenant_id == tenant_id && b.media_buy_id == media_buy_id)
            .cloned())
    }

    async fn media_buy_by_buyer_ref(
        &self,
        tenant_id: &str,
        buyer_ref: &str,
    ) -> StoreResult<Option<MediaBuyRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .find(|b| b.tenant_id == tenant_id && b.buyer_ref == buyer_ref)
            .cloned())
    }

    async fn media_buys_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        filter: &MediaBuyFilter,
    ) -> StoreResult<Vec<MediaBuyRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .filter(|b| {
                b.tenant_id == tenant_id && b.principal_id == principal_id && filter.matches(b)
            })
            .cloned()
            .collect())
    }

    async fn update_media_buy(&self, row: MediaBuyRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .media_buys
            .iter_mut()
            .find(|b| b.tenant_id == row.tenant_id && b.media_buy_id == row.media_buy_id)
        {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(StoreError::Query(format!(
                "media buy {} not found for update",
                row.media_buy_id
            ))),
        }
    }

    async fn media_buys_by_status(&self, statuses: &[MediaBuyStatus]) -> StoreResult<Vec<MediaBuyRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .filter(|b| statuses.contains(&b.status))
            .cloned()
            .collect())
    }

    async fn reporting_targets_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<ReportingTarget>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .filter(|b| {
                b.reporting_webhook.is_some()
                    && b.next_report_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .map(|media_buy| ReportingTarget { media_buy })
            .collect())
    }

    async fn next_report_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .media_buys
            .iter()
            .filter(|b| b.reporting_webhook.is_some())
            .filter_map(|b| b.next_report_at)
            .min())
    }

    async fn set_next_report_at(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(buy) = inner
            .media_buys
            .iter_mut()
            .find(|b| b.tenant_id == tenant_id && b.media_buy_id == media_buy_id)
        {
            buy.next_report_at = at;
        }
        Ok(())
    }

    async fn upsert_creative(&self, row: CreativeRow) -> StoreResult<UpsertOutcome> {
        let mut inner = self.inner.write().await;
        match inner
            .creatives
            .iter_mut()
            .find(|c| c.tenant_id == row.tenant_id && c.creative_id == row.creative_id)
        {
            Some(existing) => {
                // Full upsert: replacement, not patch. Identical content is
                // reported as unchanged.
                let unchanged = existing.name == row.name
                    && existing.format_id == row.format_id
                    && existing.media_url == row.media_url
                    && existing.snippet == row.snippet
                    && existing.click_url == row.click_url
                    && existing.tags == row.tags;
                if unchanged {
                    Ok(UpsertOutcome::Unchanged)
                } else {
                    let created_at = existing.created_at;
                    *existing = row;
                    existing.created_at = created_at;
                    Ok(UpsertOutcome::Updated)
                }
            }
            None => {
                inner.creatives.push(row);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn creative(&self, tenant_id: &str, creative_id: &str) -> StoreResult<Option<CreativeRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .creatives
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.creative_id == creative_id)
            .cloned())
    }

    async fn creatives_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        query: &ListCreativesRequest,
    ) -> StoreResult<CreativePage> {
        let inner = self.inner.read().await;
        let rows: Vec<CreativeRow> = inner
            .creatives
            .iter()
            .filter(|c| c.tenant_id == tenant_id && c.principal_id == principal_id)
            .cloned()
            .collect();
        Ok(page_creatives(rows, query))
    }

    async fn delete_creatives(
        &self,
        tenant_id: &str,
        principal_id: &str,
        creative_ids: &[String],
    ) -> StoreResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        let mut deleted = Vec::new();
        inner.creatives.retain(|c| {
            let matches = c.tenant_id == tenant_id
                && c.principal_id == principal_id
                && creative_ids.contains(&c.creative_id);
            if matches {
                deleted.push(c.creative_id.clone());
            }
            !matches
        });
        Ok(deleted)
    }

    async fn insert_assignment(&self, row: AssignmentRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let exists = inner.assignments.iter().any(|a| {
            a.tenant_id == row.tenant_id
                && a.creative_id == row.creative_id
                && a.media_buy_id == row.media_buy_id
                && a.package_id == row.package_id
        });
        if !exists {
            inner.assignments.push(row);
        }
        Ok(())
    }

    async fn assignments_for_media_buy(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
    ) -> StoreResult<Vec<AssignmentRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.media_buy_id == media_buy_id)
            .cloned()
            .collect())
    }

    async fn upsert_push_config(&self, row: PushConfigRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.push_configs.iter_mut().find(|c| {
            c.id == row.id && c.tenant_id == row.tenant_id && c.principal_id == row.principal_id
        }) {
            Some(existing) => {
                *existing = row;
            }
            None => inner.push_configs.push(row),
        }
        Ok(())
    }

    async fn push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<Option<PushConfigRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .push_configs
            .iter()
            .find(|c| {
                c.id == id
                    && c.tenant_id == tenant_id
                    && c.principal_id == principal_id
                    && c.is_active
            })
            .cloned())
    }

    async fn push_configs_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
    ) -> StoreResult<Vec<PushConfigRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .push_configs
            .iter()
            .filter(|c| c.tenant_id == tenant_id && c.principal_id == principal_id && c.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .push_configs
            .iter_mut()
            .find(|c| c.id == id && c.tenant_id == tenant_id && c.principal_id == principal_id)
        {
            Some(config) => {
                config.is_active = false;
                config.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_task(&self, row: TaskRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .tasks
            .iter_mut()
            .find(|t| t.tenant_id == row.tenant_id && t.task_id == row.task_id)
        {
            Some(existing) => *existing = row,
            None => inner.tasks.push(row),
        }
        Ok(())
    }

    async fn task(&self, tenant_id: &str, task_id: &str) -> StoreResult<Option<TaskRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .iter()
            .find(|t| t.tenant_id == tenant_id && t.task_id == task_id)
            .cloned())
    }

    async fn update_task_state(
        &self,
        tenant_id: &str,
        task_id: &str,
        state: TaskState,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .tasks
            .iter_mut()
            .find(|t| t.tenant_id == tenant_id && t.task_id == task_id)
        {
            Some(task) => {
                task.state = state;
                task.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_workflow_step(&self, row: WorkflowStepRow) -> StoreResult<()> {
        self.inner.write().await.workflow_steps.push(row);
        Ok(())
    }

    async fn touch_context(&self, row: ContextRow) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.contexts.iter_mut().find(|c| {
            c.tenant_id == row.tenant_id
                && c.principal_id == row.principal_id
                && c.context_id == row.context_id
        }) {
            Some(existing) => existing.last_activity_at = row.last_activity_at,
            None => inner.contexts.push(row),
        }
        Ok(())
    }

    async fn record_performance_feedback(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        feedback: &[ProductPerformance],
    ) -> StoreResult<()> {
        self.inner.write().await.performance_feedback.push((
            tenant_id.to_string(),
            media_buy_id.to_string(),
            feedback.to_vec(),
        ));
        Ok(())
    }
}

/// Builders used by this crate's tests and the workspace integration suites.
pub mod test_support {
    use super::*;
    use crate::models::{BrandManifestPolicy, PackageRecord, PropertyPortfolio};
    use adcp_core::products::{PricingModel, PricingOption};
    use adcp_core::FormatRef;
    use serde_json::json;

    /// A minimal active tenant.
    #[must_use]
    pub fn tenant(tenant_id: &str, subdomain: &str) -> Tenant {
        Tenant {
            tenant_id: tenant_id.into(),
            name: format!("{subdomain} publisher"),
            subdomain: subdomain.into(),
            virtual_host: None,
            ad_server: Some("mock".into()),
            is_active: true,
            human_review_required: false,
            auto_approve_format_ids: vec![],
            authorized_emails: vec![],
            authorized_domains: vec![],
            brand_manifest_policy: BrandManifestPolicy::Public,
            portfolio: PropertyPortfolio {
                publisher_domains: vec![format!("{subdomain}.example.com")],
                primary_channels: vec!["web".into()],
                primary_countries: vec!["US".into()],
                portfolio_description: None,
                advertising_policies: None,
                last_updated: None,
            },
        }
    }

    /// A principal with a mock platform mapping.
    #[must_use]
    pub fn principal(tenant_id: &str, principal_id: &str, token: &str) -> Principal {
        let mut mappings = serde_json::Map::new();
        mappings.insert("mock".into(), json!({"advertiser_id": format!("adv_{principal_id}")}));
        Principal {
            tenant_id: tenant_id.into(),
            principal_id: principal_id.into(),
            name: principal_id.into(),
            access_token: token.into(),
            platform_mappings: mappings,
        }
    }

    /// A product with one fixed-CPM USD pricing option.
    #[must_use]
    pub fn product(tenant_id: &str, product_id: &str) -> ProductRow {
        ProductRow {
            tenant_id: tenant_id.into(),
            product_id: product_id.into(),
            name: format!("Product {product_id}"),
            description: Some("Run-of-site display".into()),
            format_ids: vec![FormatRef::local("display_300x250")],
            delivery_type: Some("non_guaranteed".into()),
            pricing_options: vec![PricingOption {
                pricing_option_id: "cpm_usd_fixed".into(),
                pricing_model: PricingModel::Cpm,
                rate: 12.0,
                currency: "USD".into(),
                is_fixed: true,
                min_spend_per_package: None,
            }],
            inventory_profile_id: None,
            allowed_principal_ids: None,
            publisher_properties: None,
        }
    }

    /// A media buy with one package.
    #[must_use]
    pub fn media_buy(
        tenant_id: &str,
        principal_id: &str,
        media_buy_id: &str,
        buyer_ref: &str,
        status: MediaBuyStatus,
    ) -> MediaBuyRow {
        let now = Utc::now();
        MediaBuyRow {
            tenant_id: tenant_id.into(),
            media_buy_id: media_buy_id.into(),
            principal_id: principal_id.into(),
            buyer_ref: buyer_ref.into(),
            status,
            start_time: now,
            end_time: now + chrono::Duration::days(30),
            start_date: now.date_naive(),
            end_date: (now + chrono::Duration::days(30)).date_naive(),
            paused: false,
            packages: vec![PackageRecord {
                package_id: format!("{media_buy_id}_pkg_1"),
                buyer_ref: "pk1".into(),
                product_id: "prod_1".into(),
                pricing_option_id: "cpm_usd_fixed".into(),
                budget: 5000.0,
                paused: false,
            }],
            currency: "USD".into(),
            po_number: None,
            raw_request: json!({}),
            reporting_webhook: None,
            next_report_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn token_lookup_is_tenant_scoped() {
        let store = MemStore::new();
        store.add_tenant(tenant("t_a", "alpha")).await;
        store.add_tenant(tenant("t_b", "beta")).await;
        store.add_principal(principal("t_a", "buyer_a", "tok_a")).await;

        // Global lookup finds the principal.
        let found = store.principal_by_token("tok_a", None).await.unwrap();
        assert_eq!(found.unwrap().principal_id, "buyer_a");

        // Scoped to the owning tenant: found.
        let found = store.principal_by_token("tok_a", Some("t_a")).await.unwrap();
        assert!(found.is_some());

        // Scoped to another tenant: absent, never another tenant's data.
        let found = store.principal_by_token("tok_a", Some("t_b")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn inactive_tenant_resolves_as_absent() {
        let store = MemStore::new();
        let mut t = tenant("t_gone", "gone");
        t.is_active = false;
        store.add_tenant(t).await;
        assert!(store.tenant_by_subdomain("gone").await.unwrap().is_none());
        assert!(store.tenant_by_id("t_gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_buyer_ref_rejected_not_merged() {
        let store = MemStore::new();
        store
            .insert_media_buy(media_buy("t1", "p1", "mb_1", "br_dup", MediaBuyStatus::Active))
            .await
            .unwrap();
        let err = store
            .insert_media_buy(media_buy("t1", "p1", "mb_2", "br_dup", MediaBuyStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Same buyer_ref in a different tenant is fine.
        store
            .insert_media_buy(media_buy("t2", "p1", "mb_3", "br_dup", MediaBuyStatus::Active))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn media_buys_scoped_to_principal() {
        let store = MemStore::new();
        store
            .insert_media_buy(media_buy("t1", "alice", "mb_a", "br_a", MediaBuyStatus::Active))
            .await
            .unwrap();
        store
            .insert_media_buy(media_buy("t1", "bob", "mb_b", "br_b", MediaBuyStatus::Active))
            .await
            .unwrap();

        let filter = MediaBuyFilter::default();
        let bobs = store.media_buys_for("t1", "bob", &filter).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].media_buy_id, "mb_b");
    }

    #[tokio::test]
    async fn restricted_products_hidden_from_other_principals() {
        let store = MemStore::new();
        let mut restricted = product("t1", "secret");
        restricted.allowed_principal_ids = Some(vec!["alice".into()]);
        store.add_product(product("t1", "open")).await;
        store.add_product(restricted).await;

        let for_alice = store.products_for("t1", Some("alice")).await.unwrap();
        assert_eq!(for_alice.len(), 2);

        let for_bob = store.products_for("t1", Some("bob")).await.unwrap();
        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].product_id, "open");

        let anonymous = store.products_for("t1", None).await.unwrap();
        assert_eq!(anonymous.len(), 1);
    }

    #[tokio::test]
    async fn push_config_soft_delete_hides_from_lookup() {
        let store = MemStore::new();
        let now = Utc::now();
        store
            .upsert_push_config(PushConfigRow {
                id: "pnc_1".into(),
                tenant_id: "t1".into(),
                principal_id: "p1".into(),
                url: "https://buyer.example.com/hook".into(),
                authentication_type: None,
                authentication_token: None,
                validation_token: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        assert!(store.push_config("t1", "p1", "pnc_1").await.unwrap().is_some());
        assert!(store.deactivate_push_config("t1", "p1", "pnc_1").await.unwrap());
        assert!(store.push_config("t1", "p1", "pnc_1").await.unwrap().is_none());
        // Second delete reports absence.
        assert!(store.deactivate_push_config("t1", "p1", "missing").await.unwrap() == false);
    }

    #[tokio::test]
    async fn creative_upsert_distinguishes_created_updated_unchanged() {
        let store = MemStore::new();
        let now = Utc::now();
        let row = CreativeRow {
            tenant_id: "t1".into(),
            creative_id: "cr_1".into(),
            principal_id: "p1".into(),
            name: "Banner".into(),
            format_id: adcp_core::FormatRef::local("display_300x250"),
            status: adcp_core::creatives::CreativeStatus::PendingReview,
            media_url: Some("https://cdn.example.com/b.png".into()),
            snippet: None,
            click_url: None,
            tags: vec![],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(store.upsert_creative(row.clone()).await.unwrap(), UpsertOutcome::Created);
        assert_eq!(store.upsert_creative(row.clone()).await.unwrap(), UpsertOutcome::Unchanged);

        let mut renamed = row;
        renamed.name = "Banner v2".into();
        assert_eq!(store.upsert_creative(renamed).await.unwrap(), UpsertOutcome::Updated);
    }

    #[tokio::test]
    async fn reporting_targets_due_respects_next_fire() {
        let store = MemStore::new();
        let now = Utc::now();
        let mut due = media_buy("t1", "p1", "mb_due", "br_1", MediaBuyStatus::Active);
        due.reporting_webhook = Some(adcp_core::media_buy::ReportingWebhook {
            url: "https://buyer.example.com/reports".into(),
            authentication: None,
            interval_seconds: Some(3600),
        });
        due.next_report_at = Some(now - chrono::Duration::seconds(5));
        store.insert_media_buy(due).await.unwrap();

        let mut later = media_buy("t1", "p1", "mb_later", "br_2", MediaBuyStatus::Active);
        later.reporting_webhook = Some(adcp_core::media_buy::ReportingWebhook {
            url: "https://buyer.example.com/reports".into(),
            authentication: None,
            interval_seconds: Some(3600),
        });
        later.next_report_at = Some(now + chrono::Duration::hours(1));
        store.insert_media_buy(later).await.unwrap();

        let targets = store.reporting_targets_due(now).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].media_buy.media_buy_id, "mb_due");

        let next = store.next_report_time().await.unwrap().unwrap();
        assert!(next <= now);
    }
}
