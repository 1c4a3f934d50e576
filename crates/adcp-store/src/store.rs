// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `Store` trait — the persistence surface the rest of the system
//! depends on.
//!
//! Two implementations exist: [`crate::pg::PgStore`] over Postgres and
//! [`crate::mem::MemStore`] for tests and environments flagged as testing.
//! Every method that touches principal-owned data takes both the tenant and
//! the principal; implementations must filter on both.

use crate::models::{
    AssignmentRow, ContextRow, CreativeRow, InventoryProfile, MediaBuyRow, Principal,
    ProductRow, PushConfigRow, TaskRow, WorkflowStepRow,
};
use crate::pool::StoreResult;
use adcp_core::creatives::{ListCreativesRequest, SortOrder};
use adcp_core::media_buy::MediaBuyStatus;
use adcp_core::TaskState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for media-buy listings.
#[derive(Debug, Clone, Default)]
pub struct MediaBuyFilter {
    /// Restrict to these buy ids.
    pub media_buy_ids: Option<Vec<String>>,
    /// Restrict to these buyer references.
    pub buyer_refs: Option<Vec<String>>,
    /// Restrict by status; `"all"` or `None` matches everything.
    pub status: Option<String>,
}

impl MediaBuyFilter {
    /// Whether a row passes the filter (tenant/principal scoping is the
    /// store's job; this is the request-level part).
    #[must_use]
    pub fn matches(&self, row: &MediaBuyRow) -> bool {
        if let Some(ids) = &self.media_buy_ids {
            if !ids.iter().any(|id| id == &row.media_buy_id) {
                return false;
            }
        }
        if let Some(refs) = &self.buyer_refs {
            if !refs.iter().any(|r| r == &row.buyer_ref) {
                return false;
            }
        }
        if let Some(status) = self.status.as_deref() {
            if status != "all" && MediaBuyStatus::parse(status) != Some(row.status) {
                return false;
            }
        }
        true
    }
}

/// A page of creatives plus the total match count.
#[derive(Debug, Clone)]
pub struct CreativePage {
    /// The requested page, already sorted.
    pub creatives: Vec<CreativeRow>,
    /// Matches across all pages.
    pub total_count: u64,
}

/// Outcome of a creative upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The row was inserted.
    Created,
    /// An existing row was replaced.
    Updated,
    /// The stored row was already identical.
    Unchanged,
}

/// A media buy due for a scheduled delivery report.
#[derive(Debug, Clone)]
pub struct ReportingTarget {
    /// The buy, including its registered webhook.
    pub media_buy: MediaBuyRow,
}

/// Apply the in-memory portion of a creative listing: filtering, search,
/// sort, pagination. Shared by [`crate::mem::MemStore`] and used by
/// [`crate::pg::PgStore`] after the SQL-side tenant/principal scoping.
#[must_use]
pub fn page_creatives(mut rows: Vec<CreativeRow>, query: &ListCreativesRequest) -> CreativePage {
    rows.retain(|row| {
        if let Some(status) = query.status {
            if row.status != status {
                return false;
            }
        }
        if let Some(format) = query.format.as_deref() {
            if row.format_id.id != format {
                return false;
            }
        }
        if !query.tags.is_empty() && !query.tags.iter().all(|t| row.tags.contains(t)) {
            return false;
        }
        if let Some(after) = query.created_after {
            if row.created_at < after {
                return false;
            }
        }
        if let Some(before) = query.created_before {
            if row.created_at > before {
                return false;
            }
        }
        if let Some(search) = query.search.as_deref() {
            let needle = search.to_lowercase();
            let in_name = row.name.to_lowercase().contains(&needle);
            let in_tags = row.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !in_name && !in_tags {
                return false;
            }
        }
        true
    });

    match query.sort_by.as_str() {
        "name" => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        _ => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    if query.sort_order == SortOrder::Desc {
        rows.reverse();
    }

    let total_count = rows.len() as u64;
    let page = query.page.max(1);
    let limit = query.limit.max(1) as usize;
    let start = (page as usize - 1) * limit;
    let creatives = if start >= rows.len() {
        Vec::new()
    } else {
        rows.into_iter().skip(start).take(limit).collect()
    };

    CreativePage {
        creatives,
        total_count,
    }
}

/// The persistence surface.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Tenants ------------------------------------------------------------

    /// Lookup by subdomain. Inactive tenants resolve as absent.
    async fn tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<crate::models::Tenant>>;

    /// Lookup by virtual host.
    async fn tenant_by_virtual_host(&self, host: &str) -> StoreResult<Option<crate::models::Tenant>>;

    /// Lookup by tenant id.
    async fn tenant_by_id(&self, tenant_id: &str) -> StoreResult<Option<crate::models::Tenant>>;

    // -- Principals ---------------------------------------------------------

    /// Resolve an access token to its principal. When `tenant_id` is given,
    /// the lookup is tenant-scoped: a token from another tenant resolves as
    /// absent rather than leaking across the boundary.
    async fn principal_by_token(
        &self,
        token: &str,
        tenant_id: Option<&str>,
    ) -> StoreResult<Option<Principal>>;

    /// Lookup by id within a tenant.
    async fn principal(&self, tenant_id: &str, principal_id: &str) -> StoreResult<Option<Principal>>;

    // -- Products -----------------------------------------------------------

    /// All products of a tenant visible to `principal_id` (restricted
    /// products are filtered for anonymous callers and non-listed
    /// principals).
    async fn products_for(
        &self,
        tenant_id: &str,
        principal_id: Option<&str>,
    ) -> StoreResult<Vec<ProductRow>>;

    /// Lookup one product.
    async fn product(&self, tenant_id: &str, product_id: &str) -> StoreResult<Option<ProductRow>>;

    /// Resolve an inventory profile.
    async fn inventory_profile(
        &self,
        tenant_id: &str,
        profile_id: &str,
    ) -> StoreResult<Option<InventoryProfile>>;

    /// The tenant's creative formats.
    async fn creative_formats(
        &self,
        tenant_id: &str,
    ) -> StoreResult<Vec<adcp_core::discovery::CreativeFormat>>;

    // -- Media buys ---------------------------------------------------------

    /// Insert a new buy. Fails with a conflict when the `(tenant,
    /// buyer_ref)` pair already exists — duplicate submissions are rejected,
    /// not merged.
    async fn insert_media_buy(&self, row: MediaBuyRow) -> StoreResult<()>;

    /// Lookup by id within a tenant.
    async fn media_buy(&self, tenant_id: &str, media_buy_id: &str) -> StoreResult<Option<MediaBuyRow>>;

    /// Lookup by the buyer's reference.
    async fn media_buy_by_buyer_ref(
        &self,
        tenant_id: &str,
        buyer_ref: &str,
    ) -> StoreResult<Option<MediaBuyRow>>;

    /// All buys a principal owns, narrowed by `filter`.
    async fn media_buys_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        filter: &MediaBuyFilter,
    ) -> StoreResult<Vec<MediaBuyRow>>;

    /// Replace a stored buy (same tenant + id).
    async fn update_media_buy(&self, row: MediaBuyRow) -> StoreResult<()>;

    /// Cross-tenant listing by status, used by the status scheduler.
    async fn media_buys_by_status(&self, statuses: &[MediaBuyStatus]) -> StoreResult<Vec<MediaBuyRow>>;

    /// Buys whose `next_report_at` has passed, used by the delivery
    /// scheduler.
    async fn reporting_targets_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<ReportingTarget>>;

    /// Earliest `next_report_at` across all buys with a reporting webhook.
    async fn next_report_time(&self) -> StoreResult<Option<DateTime<Utc>>>;

    /// Advance a buy's `next_report_at`.
    async fn set_next_report_at(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    // -- Creatives ----------------------------------------------------------

    /// Full-upsert one creative.
    async fn upsert_creative(&self, row: CreativeRow) -> StoreResult<UpsertOutcome>;

    /// Lookup one creative.
    async fn creative(&self, tenant_id: &str, creative_id: &str) -> StoreResult<Option<CreativeRow>>;

    /// The principal's library, paged and filtered.
    async fn creatives_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        query: &ListCreativesRequest,
    ) -> StoreResult<CreativePage>;

    /// Delete creatives owned by the principal; returns the ids actually
    /// removed.
    async fn delete_creatives(
        &self,
        tenant_id: &str,
        principal_id: &str,
        creative_ids: &[String],
    ) -> StoreResult<Vec<String>>;

    /// Attach a creative to a `(media_buy, package)`.
    async fn insert_assignment(&self, row: AssignmentRow) -> StoreResult<()>;

    /// Assignments for a buy.
    async fn assignments_for_media_buy(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
    ) -> StoreResult<Vec<AssignmentRow>>;

    // -- Push-notification configs ------------------------------------------

    /// Create or update a config.
    async fn upsert_push_config(&self, row: PushConfigRow) -> StoreResult<()>;

    /// Lookup one active config owned by the principal.
    async fn push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<Option<PushConfigRow>>;

    /// All active configs owned by the principal.
    async fn push_configs_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
    ) -> StoreResult<Vec<PushConfigRow>>;

    /// Soft-delete a config; returns whether it existed.
    async fn deactivate_push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<bool>;

    // -- Tasks, workflow, contexts ------------------------------------------

    /// Persist a task.
    async fn save_task(&self, row: TaskRow) -> StoreResult<()>;

    /// Lookup a task.
    async fn task(&self, tenant_id: &str, task_id: &str) -> StoreResult<Option<TaskRow>>;

    /// Update a task's state.
    async fn update_task_state(
        &self,
        tenant_id: &str,
        task_id: &str,
        state: TaskState,
    ) -> StoreResult<bool>;

    /// Record a workflow step (e.g. a pending manual approval).
    async fn insert_workflow_step(&self, row: WorkflowStepRow) -> StoreResult<()>;

    /// Record conversation activity.
    async fn touch_context(&self, row: ContextRow) -> StoreResult<()>;

    // -- Performance feedback -----------------------------------------------

    /// Record buyer performance feedback for a buy.
    async fn record_performance_feedback(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        feedback: &[adcp_core::performance::ProductPerformance],
    ) -> StoreResult<()>;
}
