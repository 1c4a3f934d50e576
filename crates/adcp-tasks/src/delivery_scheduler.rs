// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduled delivery reports.
//!
//! A single worker per process reads each reporting buy's `next_report_at`
//! and sleeps until the earliest, rather than polling on a fixed beat. A
//! buy's `next_report_at` is advanced *before* its webhook is sent, so the
//! same `(media_buy_id, interval)` slot never fires twice.

use crate::webhook::WebhookSender;
use adcp_adapters::AdapterRegistry;
use adcp_core::media_buy::MediaBuyDelivery;
use adcp_core::task::{webhook_payload, PushNotificationConfig, TaskState};
use adcp_store::{ReportingTarget, Store};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Upper bound on a single sleep so config changes are noticed.
const MAX_IDLE_SLEEP: Duration = Duration::from_secs(60);

/// The delivery-report worker.
pub struct DeliveryScheduler {
    store: Arc<dyn Store>,
    adapters: Arc<AdapterRegistry>,
    webhooks: WebhookSender,
    default_interval: ChronoDuration,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryScheduler {
    /// Build a scheduler. `default_interval_secs` applies to buys whose
    /// reporting webhook did not request its own interval.
    pub fn new(
        store: Arc<dyn Store>,
        adapters: Arc<AdapterRegistry>,
        webhooks: WebhookSender,
        default_interval_secs: u64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            adapters,
            webhooks,
            default_interval: ChronoDuration::seconds(default_interval_secs as i64),
            shutdown,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(mut self) {
        info!("delivery-report scheduler started");
        loop {
            let sleep_for = self.time_until_next_fire().await;
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("delivery-report scheduler stopping");
                        return;
                    }
                }
            }
            self.tick(Utc::now()).await;
        }
    }

    async fn time_until_next_fire(&self) -> Duration {
        match self.store.next_report_time().await {
            Ok(Some(next)) => {
                let now = Utc::now();
                if next <= now {
                    Duration::ZERO
                } else {
                    (next - now).to_std().unwrap_or(MAX_IDLE_SLEEP).min(MAX_IDLE_SLEEP)
                }
            }
            Ok(None) => MAX_IDLE_SLEEP,
            Err(err) => {
                warn!(error = %err, "could not read next report time");
                MAX_IDLE_SLEEP
            }
        }
    }

    /// Process every buy whose report slot has arrived. Public for tests.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let targets = match self.store.reporting_targets_due(now).await {
            Ok(targets) => targets,
            Err(err) => {
                warn!(error = %err, "could not load due reporting targets");
                return;
            }
        };

        for target in targets {
            self.report_one(target, now).await;
        }
    }

    async fn report_one(&self, target: ReportingTarget, now: DateTime<Utc>) {
        let buy = target.media_buy;
        let Some(webhook) = buy.reporting_webhook.clone() else {
            return;
        };

        let interval = webhook
            .interval_seconds
            .map(|s| ChronoDuration::seconds(s as i64))
            .unwrap_or(self.default_interval);
        let next_expected_at = now + interval;

        // Claim the slot first: if the webhook send fails the slot is spent,
        // not re-fired (at-least-once comes from retried *future* slots, not
        // from re-firing this one).
        if let Err(err) = self
            .store
            .set_next_report_at(&buy.tenant_id, &buy.media_buy_id, Some(next_expected_at))
            .await
        {
            warn!(error = %err, media_buy_id = %buy.media_buy_id, "could not advance report slot");
            return;
        }

        let Some(adapter) = self.adapters.for_tenant(None) else {
            warn!("no adapter registered for delivery reporting");
            return;
        };
        let delivery = match adapter.get_delivery(&buy.media_buy_id, (None, None)).await {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(error = %err, media_buy_id = %buy.media_buy_id, "delivery fetch failed");
                return;
            }
        };

        let entry = MediaBuyDelivery {
            media_buy_id: buy.media_buy_id.clone(),
            buyer_ref: Some(buy.buyer_ref.clone()),
            status: Some(buy.status),
            totals: delivery.totals,
            packages: Some(delivery.by_package),
        };
        let result = serde_json::json!({
            "media_buy_deliveries": [entry],
            "notification_type": "scheduled",
            "next_expected_at": next_expected_at,
        });

        let config = PushNotificationConfig {
            id: None,
            url: webhook.url.clone(),
            token: None,
            authentication: webhook.authentication.clone(),
        };
        let payload = webhook_payload(
            &format!("delivery_report_{}", buy.media_buy_id),
            &buy.media_buy_id,
            TaskState::Working,
            Some(result),
        );
        self.webhooks
            .send(&config, &payload, Some("delivery_report"))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_adapters::MockAdapter;
    use adcp_core::media_buy::{MediaBuyStatus, ReportingWebhook};
    use adcp_store::mem::test_support;
    use adcp_store::MemStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn scheduler_with(store: Arc<MemStore>) -> DeliveryScheduler {
        let mut registry = AdapterRegistry::new();
        registry.register("mock", MockAdapter::new());
        let (_tx, rx) = watch::channel(false);
        DeliveryScheduler::new(
            store,
            Arc::new(registry),
            WebhookSender::with_container_host("localhost"),
            3600,
            rx,
        )
    }

    #[tokio::test]
    async fn due_target_fires_scheduled_webhook_and_advances_slot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemStore::new());
        let now = Utc::now();
        let mut buy = test_support::media_buy("t1", "p1", "mb_1", "br_1", MediaBuyStatus::Active);
        buy.reporting_webhook = Some(ReportingWebhook {
            url: format!("{}/reports", server.uri()),
            authentication: None,
            interval_seconds: Some(60),
        });
        buy.next_report_at = Some(now - ChronoDuration::seconds(1));
        store.insert_media_buy(buy).await.unwrap();

        let scheduler = scheduler_with(store.clone()).await;
        scheduler.tick(now).await;

        // The slot advanced past `now`: the same interval cannot re-fire.
        let next = store.next_report_time().await.unwrap().unwrap();
        assert!(next > now);

        let received = &server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["result"]["notification_type"], "scheduled");
        assert_eq!(
            body["result"]["media_buy_deliveries"][0]["media_buy_id"],
            "mb_1"
        );
        assert!(body["result"]["next_expected_at"].is_string());
    }

    #[tokio::test]
    async fn not_yet_due_target_does_not_fire() {
        let store = Arc::new(MemStore::new());
        let now = Utc::now();
        let mut buy = test_support::media_buy("t1", "p1", "mb_1", "br_1", MediaBuyStatus::Active);
        buy.reporting_webhook = Some(ReportingWebhook {
            url: "http://localhost:1/reports".into(),
            authentication: None,
            interval_seconds: Some(60),
        });
        buy.next_report_at = Some(now + ChronoDuration::hours(1));
        store.insert_media_buy(buy).await.unwrap();

        let scheduler = scheduler_with(store.clone()).await;
        scheduler.tick(now).await;

        // Slot untouched.
        let next = store.next_report_time().await.unwrap().unwrap();
        assert_eq!(next, now + ChronoDuration::hours(1));
    }

    #[tokio::test]
    async fn same_slot_never_double_fires() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemStore::new());
        let now = Utc::now();
        let mut buy = test_support::media_buy("t1", "p1", "mb_1", "br_1", MediaBuyStatus::Active);
        buy.reporting_webhook = Some(ReportingWebhook {
            url: format!("{}/r", server.uri()),
            authentication: None,
            interval_seconds: Some(3600),
        });
        buy.next_report_at = Some(now - ChronoDuration::seconds(1));
        store.insert_media_buy(buy).await.unwrap();

        let scheduler = scheduler_with(store.clone()).await;
        scheduler.tick(now).await;
        // A second tick at the same instant finds nothing due.
        scheduler.tick(now).await;
    }
}
