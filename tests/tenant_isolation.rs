// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tenant and principal isolation through the dispatch spine.

mod support;

use adcp_core::media_buy::MediaBuyStatus;
use adcp_core::{ErrorKind, Headers};
use adcp_skills::auth::{authenticate, resolve_tenant};
use adcp_skills::{dispatch, Transport};
use adcp_store::mem::test_support;
use adcp_store::Store;
use serde_json::json;
use support::TestAgent;

fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs.iter().copied().collect()
}

#[tokio::test]
async fn token_from_tenant_a_rejected_against_tenant_b_subdomain() {
    let agent = TestAgent::new().await;
    let hdrs = headers(&[
        ("Host", "beta.sales-agent.example.com"),
        ("Authorization", "Bearer tok_alice"),
    ]);

    let resolved = resolve_tenant(&hdrs, agent.store.as_ref()).await.unwrap();
    assert_eq!(resolved.as_ref().unwrap().tenant.tenant_id, "t_beta");

    let err = authenticate(&hdrs, resolved.as_ref(), agent.store.as_ref())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidAuthToken);
    assert!(err.message.contains("t_beta"));
}

#[tokio::test]
async fn same_token_against_own_subdomain_succeeds() {
    let agent = TestAgent::new().await;
    let hdrs = headers(&[
        ("Host", "alpha.sales-agent.example.com"),
        ("Authorization", "Bearer tok_alice"),
    ]);
    let resolved = resolve_tenant(&hdrs, agent.store.as_ref()).await.unwrap();
    let auth = authenticate(&hdrs, resolved.as_ref(), agent.store.as_ref())
        .await
        .unwrap();
    assert_eq!(auth.tenant.tenant_id, "t_alpha");
    assert_eq!(auth.principal.principal_id, "alice");
}

#[tokio::test]
async fn cross_principal_creative_listing_is_empty() {
    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();

    // Alice uploads a creative.
    dispatch(
        &agent.registry,
        &agent.services,
        "sync_creatives",
        json!({
            "creatives": [{
                "creative_id": "cr_alice",
                "name": "Alice banner",
                "format_id": "display_300x250",
                "media_url": "https://cdn.example.com/a.png",
            }],
        }),
        Some("alice"),
        &tenant,
        Transport::A2a,
        None,
    )
    .await
    .unwrap();

    // Bob sees none of it.
    let reply = dispatch(
        &agent.registry,
        &agent.services,
        "list_creatives",
        json!({}),
        Some("bob"),
        &tenant,
        Transport::A2a,
        None,
    )
    .await
    .unwrap();
    assert_eq!(reply.payload["total_count"], 0);
    assert!(reply.payload["creatives"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cross_principal_update_is_permission_denied_with_no_mutation() {
    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();
    agent
        .store
        .insert_media_buy(test_support::media_buy(
            "t_alpha",
            "alice",
            "mb_alice",
            "br_alice",
            MediaBuyStatus::Active,
        ))
        .await
        .unwrap();

    let err = dispatch(
        &agent.registry,
        &agent.services,
        "update_media_buy",
        json!({"media_buy_id": "mb_alice", "paused": true}),
        Some("bob"),
        &tenant,
        Transport::A2a,
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    let row = agent.store.media_buy("t_alpha", "mb_alice").await.unwrap().unwrap();
    assert_eq!(row.status, MediaBuyStatus::Active);
    assert!(!row.paused);
}

#[tokio::test]
async fn delivery_rows_all_belong_to_the_caller() {
    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();
    agent
        .store
        .insert_media_buy(test_support::media_buy(
            "t_alpha",
            "alice",
            "mb_a",
            "br_a",
            MediaBuyStatus::Active,
        ))
        .await
        .unwrap();
    agent
        .store
        .insert_media_buy(test_support::media_buy(
            "t_alpha",
            "bob",
            "mb_b",
            "br_b",
            MediaBuyStatus::Active,
        ))
        .await
        .unwrap();
    // Same buy id shape in another tenant.
    agent
        .store
        .insert_media_buy(test_support::media_buy(
            "t_beta",
            "carol",
            "mb_c",
            "br_c",
            MediaBuyStatus::Active,
        ))
        .await
        .unwrap();

    let reply = dispatch(
        &agent.registry,
        &agent.services,
        "get_media_buy_delivery",
        json!({}),
        Some("alice"),
        &tenant,
        Transport::Mcp,
        None,
    )
    .await
    .unwrap();
    let deliveries = reply.payload["media_buy_deliveries"].as_array().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0]["media_buy_id"], "mb_a");
}

#[tokio::test]
async fn restricted_product_invisible_and_unbuyable_for_outsiders() {
    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();
    let mut secret = test_support::product("t_alpha", "prod_secret");
    secret.allowed_principal_ids = Some(vec!["alice".into()]);
    agent.store.add_product(secret).await;

    // Bob's discovery does not include it.
    let reply = dispatch(
        &agent.registry,
        &agent.services,
        "get_products",
        json!({"brand_manifest": {"name": "Acme"}}),
        Some("bob"),
        &tenant,
        Transport::A2a,
        None,
    )
    .await
    .unwrap();
    let ids: Vec<&str> = reply.payload["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["product_id"].as_str().unwrap())
        .collect();
    assert!(!ids.contains(&"prod_secret"));

    // And a buy against it is rejected at validation.
    let reply = dispatch(
        &agent.registry,
        &agent.services,
        "create_media_buy",
        json!({
            "brand_manifest": {"name": "Acme"},
            "packages": [{
                "buyer_ref": "pk1",
                "product_id": "prod_secret",
                "pricing_option_id": "cpm_usd_fixed",
                "budget": 1000.0,
            }],
            "start_time": "asap",
            "end_time": (chrono::Utc::now() + chrono::Duration::days(7)).to_rfc3339(),
        }),
        Some("bob"),
        &tenant,
        Transport::A2a,
        None,
    )
    .await
    .unwrap();
    assert!(reply.payload.get("media_buy_id").is_none());
    assert_eq!(reply.payload["errors"][0]["code"], "validation_error");
}
