// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media-buy contracts: create, update, delivery, status.

use crate::error::AdcpError;
use crate::manifest::{BrandManifest, FlightStart};
use crate::task::PushNotificationConfig;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a media buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaBuyStatus {
    /// Created; flight has not started.
    PendingActivation,
    /// Accepted by the ad server for a future flight.
    Scheduled,
    /// Awaiting manual approval.
    Submitted,
    /// Delivering.
    Active,
    /// Paused by the buyer.
    Paused,
    /// Flight ended.
    Completed,
    /// The ad server rejected or failed the buy.
    Failed,
    /// Cancelled.
    Canceled,
}

impl MediaBuyStatus {
    /// Wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingActivation => "pending_activation",
            Self::Scheduled => "scheduled",
            Self::Submitted => "submitted",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// Parse a wire string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_activation" => Some(Self::PendingActivation),
            "scheduled" => Some(Self::Scheduled),
            "submitted" => Some(Self::Submitted),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// States the delivery scheduler reports on.
    #[must_use]
    pub fn is_delivering(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for MediaBuyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// One line item of a create request. Budget lives here, not at the top
/// level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRequest {
    /// Buyer's identifier for the package.
    pub buyer_ref: String,
    /// Product being bought.
    pub product_id: String,
    /// Which of the product's pricing options applies.
    pub pricing_option_id: String,
    /// Package budget in the pricing option's currency.
    pub budget: f64,
    /// Package-level targeting refinements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_overlay: Option<Value>,
    /// Creatives to assign at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_ids: Option<Vec<String>>,
}

/// Reporting webhook registered at buy-creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingWebhook {
    /// Delivery URL.
    pub url: String,
    /// Optional auth for deliveries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<crate::task::PushAuthenticationInfo>,
    /// Requested reporting interval in seconds; the deployment default
    /// applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
}

/// `create_media_buy` request (AdCP v2.2+ shape).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateMediaBuyRequest {
    /// Brand identification.
    pub brand_manifest: BrandManifest,
    /// Line items; at least one.
    pub packages: Vec<PackageRequest>,
    /// `"asap"` or RFC-3339.
    pub start_time: FlightStart,
    /// Flight end.
    pub end_time: DateTime<Utc>,
    /// Legacy top-level total; accepted but per-package budgets are
    /// authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Purchase-order number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    /// Buyer's identifier for the whole buy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Buy-level targeting refinements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_overlay: Option<Value>,
    /// Webhook for task status changes on this operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,
    /// Webhook for scheduled delivery reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_webhook: Option<ReportingWebhook>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Summary of one created package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Server-assigned package id.
    pub package_id: String,
    /// Buyer's reference for the package.
    pub buyer_ref: String,
    /// The product bought.
    pub product_id: String,
}

/// `create_media_buy` response.
///
/// Success carries `media_buy_id`; validation and adapter failures appear in
/// `errors` with `media_buy_id` absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMediaBuyResponse {
    /// Created buy id, absent on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buy_id: Option<String>,
    /// Echo of the buyer's reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Status after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaBuyStatus>,
    /// Created packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageSummary>,
    /// Async task id when the buy awaits approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl CreateMediaBuyResponse {
    /// Response for a request-level validation failure.
    #[must_use]
    pub fn rejected(errors: Vec<AdcpError>, context: Option<Value>) -> Self {
        Self {
            errors,
            context,
            ..Self::default()
        }
    }
}

impl fmt::Display for CreateMediaBuyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.media_buy_id, self.status) {
            (Some(id), Some(MediaBuyStatus::Submitted)) => {
                write!(f, "Media buy {id} submitted for approval")
            }
            (Some(id), Some(status)) => {
                write!(
                    f,
                    "Created media buy {id} ({status}) with {} package(s)",
                    self.packages.len()
                )
            }
            (Some(id), None) => write!(f, "Created media buy {id}"),
            (None, _) => write!(
                f,
                "Media buy creation failed: {}",
                self.errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Partial update for one package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageUpdate {
    /// Server-assigned package id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    /// Buyer's reference, as an alternative key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// New budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Pause / resume the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Replace the package's creative assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_ids: Option<Vec<String>>,
}

/// `update_media_buy` request. Exactly one of `media_buy_id` / `buyer_ref`
/// identifies the buy; sending both is rejected.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateMediaBuyRequest {
    /// Server-assigned buy id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buy_id: Option<String>,
    /// Buyer's reference, as an alternative key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Pause / resume the whole buy (replaced `active` in AdCP 2.12).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Move the flight start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<FlightStart>,
    /// Move the flight end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// New total budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Package-level partial updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<PackageUpdate>>,
    /// Webhook for task status changes on this operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// `update_media_buy` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMediaBuyResponse {
    /// The updated buy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buy_id: Option<String>,
    /// Echo of the buyer's reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Status after the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaBuyStatus>,
    /// Package ids the update touched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_packages: Vec<String>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl fmt::Display for UpdateMediaBuyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.media_buy_id {
            Some(id) if self.errors.is_empty() => write!(f, "Updated media buy {id}"),
            Some(id) => write!(f, "Media buy {id} update completed with errors"),
            None => write!(f, "Media buy update failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// `get_media_buy_delivery` request. All fields optional; absence widens the
/// query to every buy the principal may see.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GetMediaBuyDeliveryRequest {
    /// Buys to report on (plural form; the dispatcher lifts the legacy
    /// singular `media_buy_id` into this).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buy_ids: Option<Vec<String>>,
    /// Alternative keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_refs: Option<Vec<String>>,
    /// Restrict by status (`"active"`, `"all"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<String>,
    /// Reporting window start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Reporting window end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Aggregate delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTotals {
    /// Impressions delivered.
    pub impressions: u64,
    /// Clicks recorded.
    pub clicks: u64,
    /// Spend in the buy's currency.
    pub spend: f64,
    /// Completed video views, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_completions: Option<u64>,
}

/// Per-package delivery counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDelivery {
    /// Package id.
    pub package_id: String,
    /// Impressions delivered.
    pub impressions: u64,
    /// Clicks recorded.
    pub clicks: u64,
    /// Spend attributed to the package.
    pub spend: f64,
}

/// Delivery for one media buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBuyDelivery {
    /// Buy id.
    pub media_buy_id: String,
    /// Buyer's reference, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_ref: Option<String>,
    /// Current buy status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaBuyStatus>,
    /// Aggregate counters.
    pub totals: DeliveryTotals,
    /// Per-package breakdown, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<PackageDelivery>>,
}

/// `get_media_buy_delivery` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetMediaBuyDeliveryResponse {
    /// One entry per matched buy.
    pub media_buy_deliveries: Vec<MediaBuyDelivery>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl fmt::Display for GetMediaBuyDeliveryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let impressions: u64 = self
            .media_buy_deliveries
            .iter()
            .map(|d| d.totals.impressions)
            .sum();
        write!(
            f,
            "Delivery for {} media buy(s): {} impressions",
            self.media_buy_deliveries.len(),
            impressions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_roundtrip_all_variants() {
        for status in [
            MediaBuyStatus::PendingActivation,
            MediaBuyStatus::Scheduled,
            MediaBuyStatus::Submitted,
            MediaBuyStatus::Active,
            MediaBuyStatus::Paused,
            MediaBuyStatus::Completed,
            MediaBuyStatus::Failed,
            MediaBuyStatus::Canceled,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            let back: MediaBuyStatus = serde_json::from_str(&wire).unwrap();
            assert_eq!(back, status);
            assert_eq!(MediaBuyStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn create_request_parses_spec_shape() {
        let req: CreateMediaBuyRequest = serde_json::from_value(json!({
            "brand_manifest": {"name": "Acme"},
            "packages": [{
                "buyer_ref": "pk1",
                "product_id": "prod_1",
                "pricing_option_id": "cpm_usd_fixed",
                "budget": 5000.0,
            }],
            "start_time": "asap",
            "end_time": "2026-09-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(req.packages.len(), 1);
        assert_eq!(req.start_time, FlightStart::Asap);
        assert!(req.budget.is_none());
    }

    #[test]
    fn submitted_response_display() {
        let resp = CreateMediaBuyResponse {
            media_buy_id: Some("mb_1".into()),
            status: Some(MediaBuyStatus::Submitted),
            ..Default::default()
        };
        assert_eq!(resp.to_string(), "Media buy mb_1 submitted for approval");
    }

    #[test]
    fn failed_response_display_collects_errors() {
        let resp = CreateMediaBuyResponse::rejected(
            vec![AdcpError::validation_error("missing packages")],
            None,
        );
        assert!(resp.to_string().contains("missing packages"));
    }

    #[test]
    fn delivery_request_all_fields_optional() {
        let req: GetMediaBuyDeliveryRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.media_buy_ids.is_none());
        assert!(req.status_filter.is_none());
    }

    #[test]
    fn update_request_legacy_active_field_is_ignored_shapewise() {
        // `active` was replaced by `paused` in AdCP 2.12; unknown fields are
        // tolerated at the serde layer.
        let req: UpdateMediaBuyRequest = serde_json::from_value(json!({
            "media_buy_id": "mb_1",
            "active": false,
            "paused": true,
        }))
        .unwrap();
        assert_eq!(req.paused, Some(true));
    }

    #[test]
    fn delivery_totals_sum_in_display() {
        let resp = GetMediaBuyDeliveryResponse {
            media_buy_deliveries: vec![MediaBuyDelivery {
                media_buy_id: "mb_1".into(),
                buyer_ref: None,
                status: Some(MediaBuyStatus::Active),
                totals: DeliveryTotals {
                    impressions: 1200,
                    clicks: 12,
                    spend: 36.0,
                    video_completions: None,
                },
                packages: None,
            }],
            errors: vec![],
            context: None,
        };
        assert_eq!(resp.to_string(), "Delivery for 1 media buy(s): 1200 impressions");
    }
}
