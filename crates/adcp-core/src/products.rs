// SPDX-License-Identifier: MIT OR Apache-2.0
//! `get_products` contract.

use crate::error::AdcpError;
use crate::format::FormatRef;
use crate::manifest::BrandManifest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Pricing model of a pricing option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Cost per mille.
    Cpm,
    /// Cost per click.
    Cpc,
    /// Cost per completed view.
    Cpcv,
    /// Flat-rate sponsorship.
    FlatRate,
}

/// One way a product may be bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOption {
    /// Identifier referenced by `packages[].pricing_option_id`.
    pub pricing_option_id: String,
    /// Pricing model.
    pub pricing_model: PricingModel,
    /// Rate in `currency` units (per mille, per click, ...).
    pub rate: f64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Fixed-price vs auction.
    pub is_fixed: bool,
    /// Minimum spend per package, when the publisher enforces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_spend_per_package: Option<f64>,
}

/// Externally visible product. The persistence layer's
/// `allowed_principal_ids` never appears here; converting a stored product
/// into this type is what enforces the serialization contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier within the tenant.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Seller-facing description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accepted creative formats, ordered.
    pub format_ids: Vec<FormatRef>,
    /// `"guaranteed"` or `"non_guaranteed"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    /// Available pricing options.
    pub pricing_options: Vec<PricingOption>,
    /// Properties the product runs on, when disclosed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_properties: Option<Value>,
}

/// Structured product filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilters {
    /// Restrict to a delivery type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    /// Restrict to products accepting any of these format types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_types: Option<Vec<String>>,
    /// Restrict to products accepting any of these formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_ids: Option<Vec<FormatRef>>,
    /// Fixed-price products only (or auction only when `false`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fixed_price: Option<bool>,
}

/// `get_products` request.
///
/// At least one of `brief` or `brand_manifest` must be present; the handler
/// rejects the request otherwise. `adcp_version` is metadata only and must
/// not influence product lookup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GetProductsRequest {
    /// Free-text campaign brief.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    /// Brand identification (object or URL string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_manifest: Option<BrandManifest>,
    /// Structured filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ProductFilters>,
    /// Minimum exposures the buyer needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_exposures: Option<u64>,
    /// Caller's protocol version; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adcp_version: Option<String>,
    /// Strategy correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl GetProductsRequest {
    /// The request is addressable when it carries a brief or a non-empty
    /// brand manifest.
    #[must_use]
    pub fn has_subject(&self) -> bool {
        self.brief.as_deref().is_some_and(|b| !b.trim().is_empty())
            || self.brand_manifest.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// `get_products` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetProductsResponse {
    /// Matching products, visibility-filtered for the caller.
    pub products: Vec<Product>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl fmt::Display for GetProductsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.products.is_empty() {
            write!(f, "No matching products found")
        } else {
            let names: Vec<&str> = self.products.iter().map(|p| p.name.as_str()).collect();
            write!(
                f,
                "Found {} product(s): {}",
                self.products.len(),
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_brief_or_manifest() {
        let empty = GetProductsRequest::default();
        assert!(!empty.has_subject());

        let brief_only: GetProductsRequest =
            serde_json::from_value(serde_json::json!({"brief": "video campaign"})).unwrap();
        assert!(brief_only.has_subject());

        let manifest_only: GetProductsRequest =
            serde_json::from_value(serde_json::json!({"brand_manifest": {"name": "Acme"}})).unwrap();
        assert!(manifest_only.has_subject());

        let blank_brief: GetProductsRequest =
            serde_json::from_value(serde_json::json!({"brief": "   "})).unwrap();
        assert!(!blank_brief.has_subject());
    }

    #[test]
    fn brand_manifest_url_string_accepted_in_request() {
        let req: GetProductsRequest = serde_json::from_value(serde_json::json!({
            "brand_manifest": "https://acme.example.com",
        }))
        .unwrap();
        let manifest = req.brand_manifest.unwrap();
        assert_eq!(manifest.name.as_deref(), Some("acme.example.com"));
    }

    #[test]
    fn response_display_lists_product_names() {
        let resp = GetProductsResponse {
            products: vec![Product {
                product_id: "p1".into(),
                name: "Homepage Takeover".into(),
                description: None,
                format_ids: vec![FormatRef::local("display_970x250")],
                delivery_type: Some("guaranteed".into()),
                pricing_options: vec![],
                publisher_properties: None,
            }],
            errors: vec![],
            context: None,
        };
        assert_eq!(resp.to_string(), "Found 1 product(s): Homepage Takeover");
    }

    #[test]
    fn empty_errors_omitted_from_wire() {
        let resp = GetProductsResponse::default();
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn pricing_model_snake_case() {
        assert_eq!(
            serde_json::to_string(&PricingModel::FlatRate).unwrap(),
            "\"flat_rate\""
        );
    }
}
