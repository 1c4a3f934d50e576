// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduled delivery-report webhooks, end to end: create a buy with a
//! reporting webhook, run the scheduler, inspect the payload.

mod support;

use adcp_skills::{dispatch, Transport};
use adcp_store::Store;
use adcp_tasks::{DeliveryScheduler, WebhookSender};
use chrono::{Duration, Utc};
use serde_json::json;
use support::TestAgent;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn reporting_webhook_receives_scheduled_delivery() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delivery"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();

    // Create a buy with a one-second reporting interval.
    let created = dispatch(
        &agent.registry,
        &agent.services,
        "create_media_buy",
        json!({
            "brand_manifest": {"name": "Acme"},
            "buyer_ref": "pk_report",
            "packages": [{
                "buyer_ref": "pk1",
                "product_id": "prod_1",
                "pricing_option_id": "cpm_usd_fixed",
                "budget": 5000.0,
            }],
            "start_time": "asap",
            "end_time": (Utc::now() + Duration::days(30)).to_rfc3339(),
            "reporting_webhook": {
                "url": format!("{}/delivery", receiver.uri()),
                "interval_seconds": 1,
            },
        }),
        Some("alice"),
        &tenant,
        Transport::Mcp,
        None,
    )
    .await
    .unwrap();
    let media_buy_id = created.payload["media_buy_id"].as_str().unwrap().to_string();

    // The buy's first report slot was registered at creation time.
    let next = agent.store.next_report_time().await.unwrap();
    assert!(next.is_some());

    // Run a scheduler tick after the slot has passed.
    let (_tx, rx) = watch::channel(false);
    let scheduler = DeliveryScheduler::new(
        agent.store.clone(),
        agent.services.adapters.clone(),
        WebhookSender::with_container_host("localhost"),
        3600,
        rx,
    );
    scheduler.tick(Utc::now() + Duration::seconds(2)).await;

    let requests = receiver.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["result"]["notification_type"], "scheduled");
    assert_eq!(
        body["result"]["media_buy_deliveries"][0]["media_buy_id"],
        json!(media_buy_id)
    );
    assert!(body["result"]["next_expected_at"].is_string());
    assert_eq!(body["metadata"]["task_type"], "delivery_report");
}

#[tokio::test]
async fn polling_delivery_does_not_fire_the_webhook() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;

    let agent = TestAgent::new().await;
    let tenant = agent.store.tenant_by_id("t_alpha").await.unwrap().unwrap();
    let created = dispatch(
        &agent.registry,
        &agent.services,
        "create_media_buy",
        json!({
            "brand_manifest": {"name": "Acme"},
            "buyer_ref": "pk_poll",
            "packages": [{
                "buyer_ref": "pk1",
                "product_id": "prod_1",
                "pricing_option_id": "cpm_usd_fixed",
                "budget": 5000.0,
            }],
            "start_time": "asap",
            "end_time": (Utc::now() + Duration::days(30)).to_rfc3339(),
            "reporting_webhook": {
                "url": format!("{}/delivery", receiver.uri()),
                "interval_seconds": 3600,
            },
        }),
        Some("alice"),
        &tenant,
        Transport::Mcp,
        None,
    )
    .await
    .unwrap();
    let media_buy_id = created.payload["media_buy_id"].as_str().unwrap();

    // Poll delivery twice; the receiver must stay silent.
    for _ in 0..2 {
        dispatch(
            &agent.registry,
            &agent.services,
            "get_media_buy_delivery",
            json!({"media_buy_ids": [media_buy_id]}),
            Some("alice"),
            &tenant,
            Transport::Mcp,
            None,
        )
        .await
        .unwrap();
    }
}
