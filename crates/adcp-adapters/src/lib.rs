// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Ad-server adapter abstractions.
//!
//! A uniform [`AdServerAdapter`] trait hides Google Ad Manager / Kevel /
//! mock specifics from the skill handlers. Per-tenant configuration selects
//! the adapter and carries the `implementation_config` resolved from
//! inventory profiles at buy time.

pub mod mock;
pub mod registry;

use adcp_core::creatives::{CreativeInput, CreativeStatus};
use adcp_core::media_buy::{DeliveryTotals, MediaBuyStatus, PackageDelivery};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use mock::MockAdapter;
pub use registry::AdapterRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Ad-server failure, surfaced to buyers inside the response's `errors`
/// array with the adapter's own code preserved.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AdapterError {
    /// The adapter's error identifier.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl AdapterError {
    /// Create an adapter error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-tenant adapter configuration, fetched from persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Which adapter the tenant uses (`"google_ad_manager"`, `"kevel"`,
    /// `"mock"`).
    pub adapter_type: String,
    /// The adapter requires manual approval for every buy.
    #[serde(default)]
    pub manual_approval_required: bool,
    /// Ad-server-specific settings: ad units, placements, and format
    /// constraints. Populated from the product's inventory profile at buy
    /// time, not at product-definition time.
    #[serde(default)]
    pub implementation_config: Value,
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// One package in an adapter create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterPackage {
    /// Server-assigned package id.
    pub package_id: String,
    /// Buyer's reference.
    pub buyer_ref: String,
    /// The product bought.
    pub product_id: String,
    /// Package budget.
    pub budget: f64,
    /// Package targeting overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_overlay: Option<Value>,
}

/// `create_media_buy` adapter request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterCreateRequest {
    /// Tenant configuration, including the resolved implementation config.
    pub config: AdapterConfig,
    /// The advertiser id from the principal's platform mapping.
    pub advertiser_id: Option<String>,
    /// Packages to create.
    pub packages: Vec<AdapterPackage>,
    /// Flight start.
    pub start_time: DateTime<Utc>,
    /// Flight end.
    pub end_time: DateTime<Utc>,
    /// Budget currency.
    pub currency: String,
}

/// One created line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Ad-server line-item id.
    pub line_item_id: String,
    /// The package it implements.
    pub package_id: String,
}

/// `create_media_buy` adapter response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterCreateResponse {
    /// Ad-server buy id.
    pub media_buy_id: String,
    /// Status the ad server assigned (`active` when the flight has started,
    /// `pending_activation` or `scheduled` otherwise).
    pub status: MediaBuyStatus,
    /// Created line items, one per package.
    pub line_items: Vec<LineItem>,
}

/// Partial updates forwarded to the adapter. The legacy `updates` wrapper
/// never reaches this type; the dispatcher flattens it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterUpdateRequest {
    /// The buy to update.
    pub media_buy_id: String,
    /// Pause / resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Move the flight start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Move the flight end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// New total budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Per-package updates `(package_id, budget?, paused?)`.
    #[serde(default)]
    pub packages: Vec<AdapterPackageUpdate>,
}

/// Per-package update forwarded to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterPackageUpdate {
    /// The package.
    pub package_id: String,
    /// New budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Pause / resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

/// `update_media_buy` adapter response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterUpdateResponse {
    /// The updated buy.
    pub media_buy_id: String,
    /// Status after the update.
    pub status: MediaBuyStatus,
    /// Packages the update touched.
    pub affected_packages: Vec<String>,
}

/// Delivery metrics for one buy over a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDelivery {
    /// Aggregate counters.
    pub totals: DeliveryTotals,
    /// Per-package breakdown.
    pub by_package: Vec<PackageDelivery>,
}

/// Per-creative status from an adapter sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterCreativeStatus {
    /// The creative.
    pub creative_id: String,
    /// Review status the ad server assigned.
    pub status: CreativeStatus,
}

// ---------------------------------------------------------------------------
// The adapter trait
// ---------------------------------------------------------------------------

/// Uniform interface over ad-server back-ends.
///
/// Implementations must be idempotent with respect to retried calls: AdCP
/// identifiers are stable, so re-submitting the same create with the same
/// packages must not duplicate line items.
#[async_trait]
pub trait AdServerAdapter: Send + Sync {
    /// Adapter name (`"mock"`, `"google_ad_manager"`, `"kevel"`).
    fn name(&self) -> &'static str;

    /// Create a media buy.
    async fn create_media_buy(
        &self,
        request: AdapterCreateRequest,
    ) -> AdapterResult<AdapterCreateResponse>;

    /// Apply partial updates to a buy.
    async fn update_media_buy(
        &self,
        request: AdapterUpdateRequest,
    ) -> AdapterResult<AdapterUpdateResponse>;

    /// Fetch delivery for a buy over a reporting window.
    async fn get_delivery(
        &self,
        media_buy_id: &str,
        window: (Option<NaiveDate>, Option<NaiveDate>),
    ) -> AdapterResult<AdapterDelivery>;

    /// Push creatives to the ad server, returning per-creative status.
    async fn sync_creatives(
        &self,
        creatives: &[CreativeInput],
    ) -> AdapterResult<Vec<AdapterCreativeStatus>>;
}
