// SPDX-License-Identifier: MIT OR Apache-2.0
//! Creative library contracts: `sync_creatives` and `list_creatives`.
//!
//! `sync_creatives` is a full upsert — AdCP 2.5 removed patch semantics.

use crate::error::AdcpError;
use crate::format::FormatRef;
use crate::task::PushNotificationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Review status of a creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeStatus {
    /// Awaiting review.
    PendingReview,
    /// Cleared to serve.
    Approved,
    /// Rejected by review.
    Rejected,
}

impl CreativeStatus {
    /// Wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Validation strictness for `sync_creatives`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Any invalid creative fails the whole item.
    #[default]
    Strict,
    /// Invalid fields are dropped; the creative is kept where possible.
    Lenient,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// One creative in a sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeInput {
    /// Stable creative id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_id: Option<String>,
    /// Buyer's own reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Format reference (`{agent_url, id}` or bare id string).
    pub format_id: FormatRef,
    /// Hosted asset URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Third-party tag / snippet, for snippet formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Landing click-through URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_url: Option<String>,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// `sync_creatives` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncCreativesRequest {
    /// Creatives to upsert.
    pub creatives: Vec<CreativeInput>,
    /// Narrow the sync scope to these ids (with `delete_missing`, only these
    /// are candidates for deletion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_ids: Option<Vec<String>>,
    /// `creative_id` → package `buyer_ref`s to assign in the same call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments: Option<BTreeMap<String, Vec<String>>>,
    /// Delete library creatives not present in `creatives`.
    #[serde(default)]
    pub delete_missing: bool,
    /// Report the would-be result without mutating anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Validation strictness.
    #[serde(default)]
    pub validation_mode: ValidationMode,
    /// Webhook for task status changes on this operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// What happened to one creative during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Newly inserted.
    Created,
    /// Existing creative replaced.
    Updated,
    /// Present and identical.
    Unchanged,
    /// Removed via `delete_missing`.
    Deleted,
    /// Rejected; see the matching entry in `errors`.
    Failed,
}

/// Per-creative sync outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCreativeResult {
    /// The creative id.
    pub creative_id: String,
    /// What the sync did.
    pub action: SyncAction,
    /// Review status after the sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CreativeStatus>,
    /// Packages the creative was assigned to in this call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_packages: Vec<String>,
}

/// `sync_creatives` response.
///
/// The operation completing is not the same as every creative succeeding:
/// per-item failures are in `errors`, keyed by creative id in the details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncCreativesResponse {
    /// Per-creative outcomes.
    pub creatives: Vec<SyncCreativeResult>,
    /// Whether this was a dry run.
    #[serde(default)]
    pub dry_run: bool,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl SyncCreativesResponse {
    /// The task representing this sync is `submitted` while any creative
    /// awaits review, `completed` otherwise.
    #[must_use]
    pub fn any_pending_review(&self) -> bool {
        self.creatives
            .iter()
            .any(|c| c.status == Some(CreativeStatus::PendingReview))
    }
}

impl fmt::Display for SyncCreativesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created = self
            .creatives
            .iter()
            .filter(|c| c.action == SyncAction::Created)
            .count();
        let updated = self
            .creatives
            .iter()
            .filter(|c| c.action == SyncAction::Updated)
            .count();
        if self.dry_run {
            write!(
                f,
                "Dry run: would create {created} and update {updated} creative(s)"
            )
        } else {
            write!(f, "Synced {} creative(s): {created} created, {updated} updated", self.creatives.len())
        }
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// `list_creatives` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListCreativesRequest {
    /// Restrict to creatives assigned to this buy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buy_id: Option<String>,
    /// Restrict by the buy's buyer reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Restrict by review status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CreativeStatus>,
    /// Restrict by format id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Restrict to creatives carrying all of these tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Created-date lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    /// Created-date upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    /// Full-text search over name and tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Sort key (`"created_date"` or `"name"`).
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Sort direction.
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

fn default_sort_by() -> String {
    "created_date".to_string()
}

impl Default for ListCreativesRequest {
    fn default() -> Self {
        serde_json::from_value(Value::Object(Default::default()))
            .expect("empty object is a valid request")
    }
}

/// Library creative as returned to the buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeRecord {
    /// Creative id.
    pub creative_id: String,
    /// Display name.
    pub name: String,
    /// Format reference.
    pub format_id: FormatRef,
    /// Review status.
    pub status: CreativeStatus,
    /// Hosted asset URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Third-party snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Landing click-through URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_url: Option<String>,
    /// Labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// When the creative entered the library.
    pub created_date: DateTime<Utc>,
}

/// `list_creatives` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCreativesResponse {
    /// The requested page.
    pub creatives: Vec<CreativeRecord>,
    /// Total matches across all pages.
    pub total_count: u64,
    /// Echo of the page number.
    pub page: u32,
    /// Echo of the page size.
    pub limit: u32,
    /// Whether later pages exist.
    pub has_more: bool,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl fmt::Display for ListCreativesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} creative(s) (page {} of results, {} total)",
            self.creatives.len(),
            self.page,
            self.total_count
        )
    }
}
