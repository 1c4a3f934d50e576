// SPDX-License-Identifier: MIT OR Apache-2.0
//! Media-buy status transitions on flight-date boundaries.
//!
//! - `pending_activation` → `active` once the start time has passed and
//!   every assigned creative is approved;
//! - `scheduled` → `active` once the start time has passed;
//! - `active` → `completed` once the end time has passed.

use adcp_core::creatives::CreativeStatus;
use adcp_core::media_buy::MediaBuyStatus;
use adcp_store::models::MediaBuyRow;
use adcp_store::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// The status-transition worker.
pub struct StatusScheduler {
    store: Arc<dyn Store>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StatusScheduler {
    /// Build a scheduler that ticks every `interval_secs`.
    pub fn new(store: Arc<dyn Store>, interval_secs: u64, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(interval_secs),
            shutdown,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(mut self) {
        info!("media-buy status scheduler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("media-buy status scheduler stopping");
                        return;
                    }
                }
            }
            self.tick(Utc::now()).await;
        }
    }

    /// Apply all due transitions. Public for tests.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let candidates = match self
            .store
            .media_buys_by_status(&[
                MediaBuyStatus::PendingActivation,
                MediaBuyStatus::Scheduled,
                MediaBuyStatus::Active,
            ])
            .await
        {
            Ok(buys) => buys,
            Err(err) => {
                warn!(error = %err, "could not load media buys for status scan");
                return;
            }
        };

        for buy in candidates {
            match buy.status {
                MediaBuyStatus::PendingActivation => {
                    if buy.start_time <= now && self.creatives_ready(&buy).await {
                        self.transition(buy, MediaBuyStatus::Active).await;
                    }
                }
                MediaBuyStatus::Scheduled => {
                    if buy.start_time <= now {
                        self.transition(buy, MediaBuyStatus::Active).await;
                    }
                }
                MediaBuyStatus::Active => {
                    if buy.end_time <= now {
                        self.transition(buy, MediaBuyStatus::Completed).await;
                    }
                }
                _ => {}
            }
        }
    }

    /// A pending buy activates only once every assigned creative is
    /// approved. A buy with no assignments is not blocked.
    async fn creatives_ready(&self, buy: &MediaBuyRow) -> bool {
        let assignments = match self
            .store
            .assignments_for_media_buy(&buy.tenant_id, &buy.media_buy_id)
            .await
        {
            Ok(assignments) => assignments,
            Err(err) => {
                warn!(error = %err, media_buy_id = %buy.media_buy_id, "could not load assignments");
                return false;
            }
        };

        for assignment in assignments {
            match self.store.creative(&buy.tenant_id, &assignment.creative_id).await {
                Ok(Some(creative)) if creative.status == CreativeStatus::Approved => {}
                Ok(_) => return false,
                Err(err) => {
                    warn!(error = %err, creative_id = %assignment.creative_id, "could not load creative");
                    return false;
                }
            }
        }
        true
    }

    async fn transition(&self, mut buy: MediaBuyRow, to: MediaBuyStatus) {
        let from = buy.status;
        buy.status = to;
        let media_buy_id = buy.media_buy_id.clone();
        match self.store.update_media_buy(buy).await {
            Ok(()) => info!(media_buy_id = %media_buy_id, %from, %to, "media buy status transition"),
            Err(err) => warn!(error = %err, media_buy_id = %media_buy_id, "status transition failed"),
        }
    }
}
