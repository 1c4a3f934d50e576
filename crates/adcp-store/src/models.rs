// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistent data models.
//!
//! Every child row carries its `tenant_id`; principal-owned rows also carry
//! `principal_id`. The store implementations filter on both for every query.

use adcp_core::creatives::CreativeStatus;
use adcp_core::media_buy::{MediaBuyStatus, ReportingWebhook};
use adcp_core::products::{PricingOption, Product};
use adcp_core::task::PushNotificationConfig;
use adcp_core::{FormatRef, TaskState};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json::Comment;

// ---------------------------------------------------------------------------
// Tenant
// ---------------------------------------------------------------------------

/// Who may call `get_products` for a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandManifestPolicy {
    /// Anyone, with or without a brand manifest.
    #[default]
    Public,
    /// A brand manifest (or brief) must accompany the request.
    RequireBrand,
    /// Only authenticated principals.
    RequireAuth,
}

/// Publicly disclosable publisher portfolio, returned by
/// `list_authorized_properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyPortfolio {
    /// Domains the agent sells.
    pub publisher_domains: Vec<String>,
    /// Primary channels.
    pub primary_channels: Vec<String>,
    /// Primary countries.
    pub primary_countries: Vec<String>,
    /// Description of the portfolio.
    pub portfolio_description: Option<String>,
    /// Advertising policy summary.
    pub advertising_policies: Option<String>,
    /// Last portfolio update.
    pub last_updated: Option<DateTime<Utc>>,
}

/// The unit of isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Opaque tenant identifier.
    pub tenant_id: String,
    /// Display name.
    pub name: String,
    /// Unique subdomain (`acme` in `acme.sales-agent.example`).
    pub subdomain: String,
    /// Optional dedicated domain routed by the edge.
    pub virtual_host: Option<String>,
    /// Selected ad server (`google_ad_manager`, `kevel`, `mock`), unset when
    /// onboarding is incomplete.
    pub ad_server: Option<String>,
    /// Soft-delete flag; inactive tenants resolve as absent.
    pub is_active: bool,
    /// Every media buy requires manual approval.
    pub human_review_required: bool,
    /// Formats whose creatives skip review.
    pub auto_approve_format_ids: Vec<FormatRef>,
    /// Allow-listed emails for the admin surface.
    pub authorized_emails: Vec<String>,
    /// Allow-listed email domains for the admin surface.
    pub authorized_domains: Vec<String>,
    /// Access policy for product discovery.
    pub brand_manifest_policy: BrandManifestPolicy,
    /// Public portfolio data.
    pub portfolio: PropertyPortfolio,
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An authenticated buyer within a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Owning tenant.
    pub tenant_id: String,
    /// Principal identifier within the tenant.
    pub principal_id: String,
    /// Display name.
    pub name: String,
    /// Bearer credential; unique across the deployment.
    pub access_token: String,
    /// Ad-server name → adapter-specific identifiers. Always contains at
    /// least one platform (enforced on write).
    pub platform_mappings: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Product & inventory profile
// ---------------------------------------------------------------------------

/// A stored product. Unlike the wire [`Product`], this carries the
/// visibility restriction and the inventory-profile link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Product identifier.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Accepted formats, ordered.
    pub format_ids: Vec<FormatRef>,
    /// `"guaranteed"` / `"non_guaranteed"`.
    pub delivery_type: Option<String>,
    /// Pricing options.
    pub pricing_options: Vec<PricingOption>,
    /// Linked inventory profile, resolved at buy time.
    pub inventory_profile_id: Option<String>,
    /// When set, only these principals see or buy the product. Never
    /// serialized externally.
    pub allowed_principal_ids: Option<Vec<String>>,
    /// Disclosed properties.
    pub publisher_properties: Option<Value>,
}

impl ProductRow {
    /// Whether `principal_id` may see this product. `None` (anonymous
    /// discovery) sees only unrestricted products.
    #[must_use]
    pub fn visible_to(&self, principal_id: Option<&str>) -> bool {
        match (&self.allowed_principal_ids, principal_id) {
            (None, _) => true,
            (Some(allowed), Some(principal)) => allowed.iter().any(|p| p == principal),
            (Some(_), None) => false,
        }
    }

    /// Convert to the externally visible shape. This is the single place the
    /// `allowed_principal_ids` stripping contract is enforced.
    #[must_use]
    pub fn to_wire(&self) -> Product {
        Product {
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            format_ids: self.format_ids.clone(),
            delivery_type: self.delivery_type.clone(),
            pricing_options: self.pricing_options.clone(),
            publisher_properties: self.publisher_properties.clone(),
        }
    }

    /// Find a pricing option by id.
    #[must_use]
    pub fn pricing_option(&self, id: &str) -> Option<&PricingOption> {
        self.pricing_options
            .iter()
            .find(|p| p.pricing_option_id == id)
    }
}

/// A reusable bundle of ad units / placements / properties. Resolved into
/// the adapter's `implementation_config` when a buy is created, never at
/// product-definition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryProfile {
    /// Owning tenant.
    pub tenant_id: String,
    /// Profile identifier.
    pub inventory_profile_id: String,
    /// Display name.
    pub name: String,
    /// Ad-server ad units.
    pub ad_units: Vec<Value>,
    /// Ad-server placements.
    pub placements: Vec<Value>,
    /// Properties the profile spans.
    pub publisher_properties: Vec<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Media buy
// ---------------------------------------------------------------------------

/// A package (line item) of a stored media buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Server-assigned package id.
    pub package_id: String,
    /// Buyer's reference.
    pub buyer_ref: String,
    /// Product bought.
    pub product_id: String,
    /// Selected pricing option.
    pub pricing_option_id: String,
    /// Budget in the option's currency.
    pub budget: f64,
    /// Package-level pause flag.
    pub paused: bool,
}

/// A created campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBuyRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Buy identifier.
    pub media_buy_id: String,
    /// Owning principal; enforced on every read and write.
    pub principal_id: String,
    /// Buyer-supplied alternative key, unique within the tenant.
    pub buyer_ref: String,
    /// Lifecycle status.
    pub status: MediaBuyStatus,
    /// Flight start.
    pub start_time: DateTime<Utc>,
    /// Flight end.
    pub end_time: DateTime<Utc>,
    /// Denormalized date used by the status scheduler.
    pub start_date: NaiveDate,
    /// Denormalized date used by the status scheduler.
    pub end_date: NaiveDate,
    /// Whole-buy pause flag.
    pub paused: bool,
    /// Packages.
    pub packages: Vec<PackageRecord>,
    /// Currency of the budgets.
    pub currency: String,
    /// Purchase-order number.
    pub po_number: Option<String>,
    /// The original AdCP request, for audit and re-shaping.
    pub raw_request: Value,
    /// Registered delivery-report webhook.
    pub reporting_webhook: Option<ReportingWebhook>,
    /// Next scheduled delivery report; the scheduler sleeps until the
    /// earliest of these.
    pub next_report_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl MediaBuyRow {
    /// Total budget across packages.
    #[must_use]
    pub fn total_budget(&self) -> f64 {
        self.packages.iter().map(|p| p.budget).sum()
    }

    /// Find a package by its buyer reference.
    #[must_use]
    pub fn package_by_buyer_ref(&self, buyer_ref: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.buyer_ref == buyer_ref)
    }
}

// ---------------------------------------------------------------------------
// Creatives
// ---------------------------------------------------------------------------

/// A stored library creative, owned by a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Creative identifier.
    pub creative_id: String,
    /// Owning principal.
    pub principal_id: String,
    /// Display name.
    pub name: String,
    /// Format reference.
    pub format_id: FormatRef,
    /// Review status.
    pub status: CreativeStatus,
    /// Hosted asset URL.
    pub media_url: Option<String>,
    /// Third-party snippet.
    pub snippet: Option<String>,
    /// Click-through URL.
    pub click_url: Option<String>,
    /// Labels.
    pub tags: Vec<String>,
    /// When the creative entered the library.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

/// Attachment of a creative to a `(media_buy, package)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Assignment identifier.
    pub assignment_id: String,
    /// The creative.
    pub creative_id: String,
    /// The buy.
    pub media_buy_id: String,
    /// The package within the buy.
    pub package_id: String,
}

// ---------------------------------------------------------------------------
// Push notification configs
// ---------------------------------------------------------------------------

/// Buyer-registered webhook row, scoped by `(tenant, principal)` and
/// soft-deleted via `is_active = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfigRow {
    /// Config identifier.
    pub id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Owning principal.
    pub principal_id: String,
    /// Delivery URL.
    pub url: String,
    /// Auth scheme (e.g. `"Bearer"`).
    pub authentication_type: Option<String>,
    /// Auth credential.
    pub authentication_token: Option<String>,
    /// Buyer validation token, echoed on delivery.
    pub validation_token: Option<String>,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl PushConfigRow {
    /// Convert to the A2A wire shape.
    #[must_use]
    pub fn to_wire(&self) -> PushNotificationConfig {
        PushNotificationConfig {
            id: Some(self.id.clone()),
            url: self.url.clone(),
            token: self.validation_token.clone(),
            authentication: self.authentication_type.as_ref().map(|scheme| {
                adcp_core::PushAuthenticationInfo {
                    schemes: vec![scheme.clone()],
                    credentials: self.authentication_token.clone(),
                }
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks, workflow steps, contexts
// ---------------------------------------------------------------------------

/// Persisted protocol task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Task identifier.
    pub task_id: String,
    /// Conversation id.
    pub context_id: String,
    /// Current state.
    pub state: TaskState,
    /// Skills the message requested.
    pub skills_requested: Vec<String>,
    /// `"explicit_skill"` or `"natural_language"`.
    pub invocation_type: String,
    /// Push config captured from the protocol layer.
    pub push_notification_config: Option<PushNotificationConfig>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// A discrete step of a workflow (e.g. a manual approval).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStepRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Step identifier.
    pub step_id: String,
    /// The media buy the step concerns, when applicable.
    pub media_buy_id: Option<String>,
    /// Step kind (`"manual_approval"`, ...).
    pub step_type: String,
    /// `"pending"`, `"approved"`, `"rejected"`.
    pub status: String,
    /// Reviewer comments.
    pub comments: Vec<Comment>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Long-lived conversation per principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRow {
    /// Owning tenant.
    pub tenant_id: String,
    /// Owning principal.
    pub principal_id: String,
    /// Conversation id.
    pub context_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last message in the conversation.
    pub last_activity_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(allowed: Option<Vec<&str>>) -> ProductRow {
        ProductRow {
            tenant_id: "t1".into(),
            product_id: "p1".into(),
            name: "Banner".into(),
            description: None,
            format_ids: vec![FormatRef::local("display_300x250")],
            delivery_type: None,
            pricing_options: vec![],
            inventory_profile_id: None,
            allowed_principal_ids: allowed.map(|v| v.into_iter().map(String::from).collect()),
            publisher_properties: None,
        }
    }

    #[test]
    fn unrestricted_product_visible_to_everyone() {
        let p = product(None);
        assert!(p.visible_to(Some("anyone")));
        assert!(p.visible_to(None));
    }

    #[test]
    fn restricted_product_visible_only_to_listed_principals() {
        let p = product(Some(vec!["alice"]));
        assert!(p.visible_to(Some("alice")));
        assert!(!p.visible_to(Some("bob")));
        assert!(!p.visible_to(None));
    }

    #[test]
    fn wire_product_never_carries_allowed_principal_ids() {
        let p = product(Some(vec!["alice"]));
        let wire = serde_json::to_value(p.to_wire()).unwrap();
        assert!(wire.get("allowed_principal_ids").is_none());
    }

    #[test]
    fn push_config_wire_shape_uses_scheme_zero() {
        let row = PushConfigRow {
            id: "pnc_1".into(),
            tenant_id: "t1".into(),
            principal_id: "p1".into(),
            url: "https://buyer.example.com/hook".into(),
            authentication_type: Some("Bearer".into()),
            authentication_token: Some("secret".into()),
            validation_token: Some("v".into()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let wire = row.to_wire();
        let auth = wire.authentication.unwrap();
        assert_eq!(auth.schemes, vec!["Bearer"]);
        assert_eq!(auth.credentials.as_deref(), Some("secret"));
    }

    #[test]
    fn media_buy_total_budget_sums_packages() {
        let row = MediaBuyRow {
            tenant_id: "t1".into(),
            media_buy_id: "mb_1".into(),
            principal_id: "p1".into(),
            buyer_ref: "br_1".into(),
            status: MediaBuyStatus::Active,
            start_time: Utc::now(),
            end_time: Utc::now(),
            start_date: Utc::now().date_naive(),
            end_date: Utc::now().date_naive(),
            paused: false,
            packages: vec![
                PackageRecord {
                    package_id: "pkg_1".into(),
                    buyer_ref: "pk1".into(),
                    product_id: "p1".into(),
                    pricing_option_id: "cpm".into(),
                    budget: 3000.0,
                    paused: false,
                },
                PackageRecord {
                    package_id: "pkg_2".into(),
                    buyer_ref: "pk2".into(),
                    product_id: "p2".into(),
                    pricing_option_id: "cpm".into(),
                    budget: 2000.0,
                    paused: false,
                },
            ],
            currency: "USD".into(),
            po_number: None,
            raw_request: json!({}),
            reporting_webhook: None,
            next_report_at: None,
            created_at: Utc::now(),
        };
        assert!((row.total_budget() - 5000.0).abs() < f64::EPSILON);
        assert_eq!(row.package_by_buyer_ref("pk2").unwrap().package_id, "pkg_2");
    }
}
