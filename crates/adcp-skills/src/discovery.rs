// SPDX-License-Identifier: MIT OR Apache-2.0
//! Auth-optional discovery skills: `get_products`, `list_creative_formats`,
//! `list_authorized_properties`.

use crate::auth::store_error;
use crate::dispatch::{Services, Skill, SkillReply};
use adcp_core::discovery::{
    CreativeFormat, ListAuthorizedPropertiesRequest, ListAuthorizedPropertiesResponse,
    ListCreativeFormatsRequest, ListCreativeFormatsResponse,
};
use adcp_core::products::{GetProductsRequest, GetProductsResponse, Product, ProductFilters};
use adcp_core::{SkillResult, ToolContext, TransportError};
use adcp_store::models::BrandManifestPolicy;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

fn parse<T: serde::de::DeserializeOwned>(skill: &str, params: Value) -> SkillResult<T> {
    serde_json::from_value(params)
        .map_err(|e| TransportError::invalid_params(format!("{skill}: {e}")))
}

// ---------------------------------------------------------------------------
// get_products
// ---------------------------------------------------------------------------

/// `get_products`.
pub struct GetProductsSkill;

fn apply_filters(products: Vec<Product>, filters: &ProductFilters) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| {
            if let Some(delivery_type) = &filters.delivery_type {
                if p.delivery_type.as_deref() != Some(delivery_type.as_str()) {
                    return false;
                }
            }
            if let Some(format_ids) = &filters.format_ids {
                if !p.format_ids.iter().any(|f| format_ids.contains(f)) {
                    return false;
                }
            }
            if let Some(is_fixed) = filters.is_fixed_price {
                if !p.pricing_options.iter().any(|o| o.is_fixed == is_fixed) {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[async_trait]
impl Skill for GetProductsSkill {
    fn name(&self) -> &'static str {
        "get_products"
    }

    fn requires_principal(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: GetProductsRequest = parse(self.name(), params)?;

        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;

        // Tenant policy gates the call before any data loads.
        match tenant.brand_manifest_policy {
            BrandManifestPolicy::RequireAuth if ctx.principal().is_none() => {
                return Err(TransportError::missing_authentication());
            }
            BrandManifestPolicy::RequireBrand
                if req.brand_manifest.as_ref().is_none_or(|m| m.is_empty()) =>
            {
                return Err(TransportError::invalid_params(
                    "this tenant requires a brand_manifest for product discovery",
                ));
            }
            _ => {}
        }

        if !req.has_subject() {
            return Err(TransportError::invalid_params(
                "either 'brand_manifest' or 'brief' parameter is required",
            ));
        }

        let rows = services
            .store
            .products_for(&ctx.tenant_id, ctx.principal())
            .await
            .map_err(store_error)?;
        let mut products: Vec<Product> = rows.iter().map(|row| row.to_wire()).collect();

        if let Some(filters) = &req.filters {
            products = apply_filters(products, filters);
        }

        // Brief-driven ranking is a pluggable helper; without one the
        // structured filters are the whole story. `adcp_version` is
        // metadata and is deliberately not part of the lookup.
        if let (Some(ranker), Some(brief)) = (&services.ranker, req.brief.as_deref()) {
            if !brief.trim().is_empty() {
                products = ranker.rank(brief, products).await;
            }
        }

        let response = GetProductsResponse {
            products,
            errors: vec![],
            context: req.context,
        };
        SkillReply::new(self.name(), &response)
    }
}

// ---------------------------------------------------------------------------
// list_creative_formats
// ---------------------------------------------------------------------------

/// `list_creative_formats`.
pub struct ListCreativeFormatsSkill;

fn format_matches(format: &CreativeFormat, req: &ListCreativeFormatsRequest) -> bool {
    if let Some(format_type) = &req.format_type {
        if &format.format_type != format_type {
            return false;
        }
    }
    if let Some(ids) = &req.format_ids {
        if !ids.iter().any(|r| r.id == format.format_id.id) {
            return false;
        }
    }
    if let Some(is_responsive) = req.is_responsive {
        if format.is_responsive != is_responsive {
            return false;
        }
    }
    if let Some(search) = &req.name_search {
        if !format.name.to_lowercase().contains(&search.to_lowercase()) {
            return false;
        }
    }
    // Dimension constraints exclude formats that have no fixed dimension.
    if let Some(min) = req.min_width {
        if !format.width.is_some_and(|w| w >= min) {
            return false;
        }
    }
    if let Some(max) = req.max_width {
        if !format.width.is_some_and(|w| w <= max) {
            return false;
        }
    }
    if let Some(min) = req.min_height {
        if !format.height.is_some_and(|h| h >= min) {
            return false;
        }
    }
    if let Some(max) = req.max_height {
        if !format.height.is_some_and(|h| h <= max) {
            return false;
        }
    }
    true
}

#[async_trait]
impl Skill for ListCreativeFormatsSkill {
    fn name(&self) -> &'static str {
        "list_creative_formats"
    }

    fn requires_principal(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: ListCreativeFormatsRequest = parse(self.name(), params)?;

        let formats = services
            .store
            .creative_formats(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .filter(|f| format_matches(f, &req))
            .collect();

        let response = ListCreativeFormatsResponse {
            formats,
            errors: vec![],
            context: req.context,
        };
        SkillReply::new(self.name(), &response)
    }
}

// ---------------------------------------------------------------------------
// list_authorized_properties
// ---------------------------------------------------------------------------

/// `list_authorized_properties`.
pub struct ListAuthorizedPropertiesSkill;

#[async_trait]
impl Skill for ListAuthorizedPropertiesSkill {
    fn name(&self) -> &'static str {
        "list_authorized_properties"
    }

    fn requires_principal(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        services: &Services,
        ctx: &ToolContext,
        params: Value,
    ) -> SkillResult<SkillReply> {
        let req: ListAuthorizedPropertiesRequest = parse(self.name(), params)?;

        if req.tags.is_some() {
            warn!("deprecated parameter 'tags' passed to list_authorized_properties; ignored");
        }

        let tenant = services
            .store
            .tenant_by_id(&ctx.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| TransportError::not_found(format!("tenant {}", ctx.tenant_id)))?;

        let portfolio = tenant.portfolio;
        let response = ListAuthorizedPropertiesResponse {
            publisher_domains: portfolio.publisher_domains,
            primary_channels: portfolio.primary_channels,
            primary_countries: portfolio.primary_countries,
            portfolio_description: portfolio.portfolio_description,
            advertising_policies: portfolio.advertising_policies,
            last_updated: portfolio.last_updated,
            errors: vec![],
        };
        SkillReply::new(self.name(), &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_adapters::{AdapterRegistry, MockAdapter};
    use adcp_core::ErrorKind;
    use adcp_core::FormatRef;
    use adcp_store::mem::test_support;
    use adcp_store::MemStore;
    use adcp_tasks::{TaskService, WebhookSender};
    use serde_json::json;
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
        store.add_product(test_support::product("t1", "prod_1")).await;
        (services(store.clone()), store)
    }

    #[tokio::test]
    async fn get_products_requires_brief_or_manifest() {
        let (services, _) = seeded().await;
        let ctx = ToolContext::anonymous("c", "t1", "get_products");
        let err = GetProductsSkill
            .execute(&services, &ctx, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParams);
    }

    #[tokio::test]
    async fn get_products_returns_wire_products_without_restriction_field() {
        let (services, store) = seeded().await;
        let mut restricted = test_support::product("t1", "secret");
        restricted.allowed_principal_ids = Some(vec!["vip".into()]);
        store.add_product(restricted).await;

        let ctx = ToolContext::anonymous("c", "t1", "get_products");
        let reply = GetProductsSkill
            .execute(&services, &ctx, json!({"brand_manifest": {"name": "Acme"}}))
            .await
            .unwrap();
        let products = reply.payload["products"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert!(products[0].get("allowed_principal_ids").is_none());
    }

    #[tokio::test]
    async fn require_auth_policy_rejects_anonymous() {
        let store = Arc::new(MemStore::new());
        let mut tenant = test_support::tenant("t1", "alpha");
        tenant.brand_manifest_policy = BrandManifestPolicy::RequireAuth;
        store.add_tenant(tenant).await;
        let services = services(store);

        let ctx = ToolContext::anonymous("c", "t1", "get_products");
        let err = GetProductsSkill
            .execute(&services, &ctx, json!({"brand_manifest": {"name": "Acme"}}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingAuthentication);
    }

    #[tokio::test]
    async fn require_brand_policy_rejects_brief_only() {
        let store = Arc::new(MemStore::new());
        let mut tenant = test_support::tenant("t1", "alpha");
        tenant.brand_manifest_policy = BrandManifestPolicy::RequireBrand;
        store.add_tenant(tenant).await;
        let services = services(store);

        let ctx = ToolContext::anonymous("c", "t1", "get_products");
        let err = GetProductsSkill
            .execute(&services, &ctx, json!({"brief": "video campaign"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParams);
    }

    #[tokio::test]
    async fn url_string_manifest_accepted() {
        let (services, _) = seeded().await;
        let ctx = ToolContext::anonymous("c", "t1", "get_products");
        let reply = GetProductsSkill
            .execute(&services, &ctx, json!({"brand_manifest": "https://acme.example.com"}))
            .await
            .unwrap();
        assert_eq!(reply.payload["products"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn format_filters_apply() {
        let store = Arc::new(MemStore::new());
        store.add_tenant(test_support::tenant("t1", "alpha")).await;
        store
            .add_creative_formats(
                "t1",
                vec![
                    CreativeFormat {
                        format_id: FormatRef::local("display_300x250"),
                        name: "Medium Rectangle".into(),
                        format_type: "display".into(),
                        width: Some(300),
                        height: Some(250),
                        duration: None,
                        is_responsive: false,
                    },
                    CreativeFormat {
                        format_id: FormatRef::local("video_15s"),
                        name: "15s Video".into(),
                        format_type: "video".into(),
                        width: None,
                        height: None,
                        duration: Some(15),
                        is_responsive: false,
                    },
                ],
            )
            .await;
        let services = services(store);
        let ctx = ToolContext::anonymous("c", "t1", "list_creative_formats");

        let reply = ListCreativeFormatsSkill
            .execute(&services, &ctx, json!({"type": "video"}))
            .await
            .unwrap();
        let formats = reply.payload["formats"].as_array().unwrap();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0]["name"], "15s Video");

        let reply = ListCreativeFormatsSkill
            .execute(&services, &ctx, json!({"min_width": 200}))
            .await
            .unwrap();
        assert_eq!(reply.payload["formats"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authorized_properties_ignores_deprecated_tags() {
        let (services, _) = seeded().await;
        let ctx = ToolContext::anonymous("c", "t1", "list_authorized_properties");
        let reply = ListAuthorizedPropertiesSkill
            .execute(&services, &ctx, json!({"tags": ["news"]}))
            .await
            .unwrap();
        assert_eq!(
            reply.payload["publisher_domains"][0],
            "alpha.example.com"
        );
        assert!(reply.payload.get("tags").is_none());
    }
}
