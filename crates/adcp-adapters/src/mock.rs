//! Mock ad-server adapter, authoritative for tests and environments flagged
//! as testing.
//!
//! Deterministic: ids derive from the inputs, delivery scales with budget
//! and the elapsed fraction of the flight, so repeated calls agree with
//! each other.

use crate::{
    AdServerAdapter, AdapterCreateRequest, AdapterCreateResponse, AdapterCreativeStatus,
    AdapterDelivery, AdapterError, AdapterResult, AdapterUpdateRequest, AdapterUpdateResponse,
    LineItem,
};
use adcp_core::creatives::{CreativeInput, CreativeStatus};
use adcp_core::media_buy::{DeliveryTotals, MediaBuyStatus, PackageDelivery};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Assumed CPM for spend→impressions conversion in mock delivery.
const MOCK_CPM: f64 = 12.0;

/// Click-through rate applied to mock impressions.
const MOCK_CTR: f64 = 0.01;

#[derive(Clone)]
struct MockBuy {
    start_time: chrono::DateTime<Utc>,
    end_time: chrono::DateTime<Utc>,
    packages: Vec<(String, f64)>,
}

/// In-memory mock of an ad server.
#[derive(Default)]
pub struct MockAdapter {
    buys: Mutex<HashMap<String, MockBuy>>,
}

impl MockAdapter {
    /// Fresh mock with no recorded buys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdServerAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_media_buy(
        &self,
        request: AdapterCreateRequest,
    ) -> AdapterResult<AdapterCreateResponse> {
        if request.packages.is_empty() {
            return Err(AdapterError::new("NO_PACKAGES", "a media buy needs at least one package"));
        }

        // Stable id: the first package's id anchors it, so a retried create
        // lands on the same buy.
        let media_buy_id = format!("mock_buy_{}", request.packages[0].package_id);

        let line_items = request
            .packages
            .iter()
            .enumerate()
            .map(|(i, p)| LineItem {
                line_item_id: format!("{media_buy_id}_li_{}", i + 1),
                package_id: p.package_id.clone(),
            })
            .collect();

        let status = if request.start_time <= Utc::now() {
            MediaBuyStatus::Active
        } else {
            MediaBuyStatus::PendingActivation
        };

        self.buys.lock().expect("mock buys lock").insert(
            media_buy_id.clone(),
            MockBuy {
                start_time: request.start_time,
                end_time: request.end_time,
                packages: request
                    .packages
                    .iter()
                    .map(|p| (p.package_id.clone(), p.budget))
                    .collect(),
            },
        );

        info!(media_buy_id = %media_buy_id, status = %status, "mock ad server created media buy");

        Ok(AdapterCreateResponse {
            media_buy_id,
            status,
            line_items,
        })
    }

    async fn update_media_buy(
        &self,
        request: AdapterUpdateRequest,
    ) -> AdapterResult<AdapterUpdateResponse> {
        let buys = self.buys.lock().expect("mock buys lock");
        let known = buys.contains_key(&request.media_buy_id);
        drop(buys);

        // The mock accepts updates for buys it has never seen (e.g. seeded
        // directly into the database) rather than failing the skill.
        if !known {
            info!(media_buy_id = %request.media_buy_id, "mock update for externally created buy");
        }

        let status = match request.paused {
            Some(true) => MediaBuyStatus::Paused,
            _ => MediaBuyStatus::Active,
        };

        Ok(AdapterUpdateResponse {
            media_buy_id: request.media_buy_id,
            status,
            affected_packages: request
                .packages
                .iter()
                .map(|p| p.package_id.clone())
                .collect(),
        })
    }

    async fn get_delivery(
        &self,
        media_buy_id: &str,
        _window: (Option<NaiveDate>, Option<NaiveDate>),
    ) -> AdapterResult<AdapterDelivery> {
        let buys = self.buys.lock().expect("mock buys lock");
        let Some(buy) = buys.get(media_buy_id).cloned() else {
            // Unknown buy: report zero delivery rather than an error, so
            // polling a just-approved buy is well-defined.
            return Ok(AdapterDelivery {
                totals: DeliveryTotals::default(),
                by_package: vec![],
            });
        };
        drop(buys);

        let now = Utc::now();
        let flight = (buy.end_time - buy.start_time).num_seconds().max(1) as f64;
        let elapsed = (now - buy.start_time).num_seconds().clamp(0, flight as i64) as f64;
        let progress = elapsed / flight;

        let mut totals = DeliveryTotals::default();
        let mut by_package = Vec::with_capacity(buy.packages.len());
        for (package_id, budget) in &buy.packages {
            let spend = budget * progress;
            let impressions = (spend / MOCK_CPM * 1000.0) as u64;
            let clicks = (impressions as f64 * MOCK_CTR) as u64;
            totals.impressions += impressions;
            totals.clicks += clicks;
            totals.spend += spend;
            by_package.push(PackageDelivery {
                package_id: package_id.clone(),
                impressions,
                clicks,
                spend,
            });
        }

        Ok(AdapterDelivery { totals, by_package })
    }

    async fn sync_creatives(
        &self,
        creatives: &[CreativeInput],
    ) -> AdapterResult<Vec<AdapterCreativeStatus>> {
        Ok(creatives
            .iter()
            .enumerate()
            .map(|(i, c)| AdapterCreativeStatus {
                creative_id: c
                    .creative_id
                    .clone()
                    .unwrap_or_else(|| format!("mock_cr_{}", i + 1)),
                // The mock approves hosted assets and holds snippets for
                // review, giving tests both paths.
                status: if c.snippet.is_some() {
                    CreativeStatus::PendingReview
                } else {
                    CreativeStatus::Approved
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdapterConfig, AdapterPackage};
    use adcp_core::FormatRef;
    use chrono::Duration;

    fn create_request(start_offset_mins: i64) -> AdapterCreateRequest {
        let now = Utc::now();
        AdapterCreateRequest {
            config: AdapterConfig::default(),
            advertiser_id: Some("adv_1".into()),
            packages: vec![AdapterPackage {
                package_id: "pkg_1".into(),
                buyer_ref: "pk1".into(),
                product_id: "prod_1".into(),
                budget: 5000.0,
                targeting_overlay: None,
            }],
            start_time: now + Duration::minutes(start_offset_mins),
            end_time: now + Duration::days(30),
            currency: "USD".into(),
        }
    }

    #[tokio::test]
    async fn started_flight_is_active() {
        let adapter = MockAdapter::new();
        let resp = adapter.create_media_buy(create_request(-5)).await.unwrap();
        assert_eq!(resp.status, MediaBuyStatus::Active);
        assert_eq!(resp.line_items.len(), 1);
    }

    #[tokio::test]
    async fn future_flight_is_pending_activation() {
        let adapter = MockAdapter::new();
        let resp = adapter.create_media_buy(create_request(60)).await.unwrap();
        assert_eq!(resp.status, MediaBuyStatus::PendingActivation);
    }

    #[tokio::test]
    async fn create_is_idempotent_for_identical_requests() {
        let adapter = MockAdapter::new();
        let first = adapter.create_media_buy(create_request(-5)).await.unwrap();
        let second = adapter.create_media_buy(create_request(-5)).await.unwrap();
        assert_eq!(first.media_buy_id, second.media_buy_id);
    }

    #[tokio::test]
    async fn empty_packages_rejected() {
        let adapter = MockAdapter::new();
        let mut req = create_request(0);
        req.packages.clear();
        let err = adapter.create_media_buy(req).await.unwrap_err();
        assert_eq!(err.code, "NO_PACKAGES");
    }

    #[tokio::test]
    async fn delivery_scales_with_flight_progress() {
        let adapter = MockAdapter::new();
        let mut req = create_request(0);
        // A flight that started an hour ago and runs for two hours: ~50%.
        req.start_time = Utc::now() - Duration::hours(1);
        req.end_time = Utc::now() + Duration::hours(1);
        let created = adapter.create_media_buy(req).await.unwrap();

        let delivery = adapter
            .get_delivery(&created.media_buy_id, (None, None))
            .await
            .unwrap();
        assert!(delivery.totals.spend > 2000.0 && delivery.totals.spend < 3000.0);
        assert!(delivery.totals.impressions > 0);
        assert_eq!(delivery.by_package.len(), 1);
    }

    #[tokio::test]
    async fn unknown_buy_reports_zero_delivery() {
        let adapter = MockAdapter::new();
        let delivery = adapter.get_delivery("never_created", (None, None)).await.unwrap();
        assert_eq!(delivery.totals.impressions, 0);
    }

    #[tokio::test]
    async fn snippet_creatives_pend_review_hosted_approved() {
        let adapter = MockAdapter::new();
        let creatives = vec![
            CreativeInput {
                creative_id: Some("cr_hosted".into()),
                buyer_ref: None,
                name: "Hosted".into(),
                format_id: FormatRef::local("display_300x250"),
                media_url: Some("https://cdn.example.com/b.png".into()),
                snippet: None,
                click_url: None,
                tags: vec![],
            },
            CreativeInput {
                creative_id: Some("cr_snippet".into()),
                buyer_ref: None,
                name: "Tag".into(),
                format_id: FormatRef::local("display_300x250"),
                media_url: None,
                snippet: Some("<script>render()</script>".into()),
                click_url: None,
                tags: vec![],
            },
        ];
        let statuses = adapter.sync_creatives(&creatives).await.unwrap();
        assert_eq!(statuses[0].status, CreativeStatus::Approved);
        assert_eq!(statuses[1].status, CreativeStatus::PendingReview);
    }
}
