// SPDX-License-Identifier: MIT OR Apache-2.0
//! Postgres implementation of [`Store`].
//!
//! All queries are runtime-bound (`sqlx::query` + `bind`), filter on
//! `tenant_id` (and `principal_id` for principal-owned rows), and go through
//! [`Db::observe`] so connection-class failures feed the circuit breaker.

use crate::models::{
    AssignmentRow, BrandManifestPolicy, ContextRow, CreativeRow, InventoryProfile, MediaBuyRow,
    Principal, ProductRow, PropertyPortfolio, PushConfigRow, Tenant, TaskRow, WorkflowStepRow,
};
use crate::pool::{Db, StoreError, StoreResult};
use crate::store::{
    page_creatives, CreativePage, MediaBuyFilter, ReportingTarget, Store, UpsertOutcome,
};
use adcp_core::creatives::{CreativeStatus, ListCreativesRequest};
use adcp_core::discovery::CreativeFormat;
use adcp_core::media_buy::MediaBuyStatus;
use adcp_core::performance::ProductPerformance;
use adcp_core::TaskState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::sync::Arc;

/// Postgres-backed [`Store`].
pub struct PgStore {
    db: Arc<Db>,
}

impl PgStore {
    /// Wrap a database resource.
    #[must_use]
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// The underlying database resource (for health checks and pool admin).
    #[must_use]
    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        let pool = self.db.pool().await;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn decode_json<T: DeserializeOwned>(row: &PgRow, col: &str) -> Result<T, sqlx::Error> {
    let value: Value = row.try_get(col)?;
    serde_json::from_value(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn decode_json_opt<T: DeserializeOwned>(row: &PgRow, col: &str) -> Result<Option<T>, sqlx::Error> {
    let value: Option<Value> = row.try_get(col)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: col.to_string(),
                source: Box::new(e),
            }),
    }
}

fn json_field<T>(result: Result<T, crate::json::JsonFieldError>, col: &str) -> Result<T, sqlx::Error> {
    result.map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn decode_enum<T: DeserializeOwned>(row: &PgRow, col: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    serde_json::from_value(Value::String(raw)).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn enum_str<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, sqlx::Error> {
    Ok(Tenant {
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        subdomain: row.try_get("subdomain")?,
        virtual_host: row.try_get("virtual_host")?,
        ad_server: row.try_get("ad_server")?,
        is_active: row.try_get("is_active")?,
        human_review_required: row.try_get("human_review_required")?,
        // Legacy rows may hold string-serialized arrays; the normalizers
        // accept both shapes.
        auto_approve_format_ids: json_field(
            crate::json::normalize_format_refs(
                row.try_get("auto_approve_format_ids")?,
                "auto_approve_format_ids",
            ),
            "auto_approve_format_ids",
        )?,
        authorized_emails: json_field(
            crate::json::ensure_string_array(row.try_get("authorized_emails")?, "authorized_emails"),
            "authorized_emails",
        )?,
        authorized_domains: json_field(
            crate::json::ensure_string_array(
                row.try_get("authorized_domains")?,
                "authorized_domains",
            ),
            "authorized_domains",
        )?,
        brand_manifest_policy: decode_enum::<BrandManifestPolicy>(row, "brand_manifest_policy")?,
        portfolio: decode_json::<PropertyPortfolio>(row, "portfolio")?,
    })
}

fn principal_from_row(row: &PgRow) -> Result<Principal, sqlx::Error> {
    Ok(Principal {
        tenant_id: row.try_get("tenant_id")?,
        principal_id: row.try_get("principal_id")?,
        name: row.try_get("name")?,
        access_token: row.try_get("access_token")?,
        platform_mappings: json_field(
            crate::json::normalize_platform_mappings(
                row.try_get("platform_mappings")?,
                "platform_mappings",
            ),
            "platform_mappings",
        )?,
    })
}

fn product_from_row(row: &PgRow) -> Result<ProductRow, sqlx::Error> {
    Ok(ProductRow {
        tenant_id: row.try_get("tenant_id")?,
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        format_ids: json_field(
            crate::json::normalize_format_refs(row.try_get("format_ids")?, "format_ids"),
            "format_ids",
        )?,
        delivery_type: row.try_get("delivery_type")?,
        pricing_options: decode_json(row, "pricing_options")?,
        inventory_profile_id: row.try_get("inventory_profile_id")?,
        allowed_principal_ids: decode_json_opt(row, "allowed_principal_ids")?,
        publisher_properties: row.try_get("publisher_properties")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<InventoryProfile, sqlx::Error> {
    Ok(InventoryProfile {
        tenant_id: row.try_get("tenant_id")?,
        inventory_profile_id: row.try_get("inventory_profile_id")?,
        name: row.try_get("name")?,
        ad_units: decode_json(row, "ad_units")?,
        placements: decode_json(row, "placements")?,
        publisher_properties: json_field(
            crate::json::normalize_publisher_properties(
                row.try_get("publisher_properties")?,
                "publisher_properties",
            ),
            "publisher_properties",
        )?,
    })
}

fn media_buy_from_row(row: &PgRow) -> Result<MediaBuyRow, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(MediaBuyRow {
        tenant_id: row.try_get("tenant_id")?,
        media_buy_id: row.try_get("media_buy_id")?,
        principal_id: row.try_get("principal_id")?,
        buyer_ref: row.try_get("buyer_ref")?,
        status: MediaBuyStatus::parse(&status).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unknown media buy status '{status}'").into(),
        })?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        paused: row.try_get("paused")?,
        packages: decode_json(row, "packages")?,
        currency: row.try_get("currency")?,
        po_number: row.try_get("po_number")?,
        raw_request: row.try_get("raw_request")?,
        reporting_webhook: decode_json_opt(row, "reporting_webhook")?,
        next_report_at: row.try_get("next_report_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn creative_from_row(row: &PgRow) -> Result<CreativeRow, sqlx::Error> {
    Ok(CreativeRow {
        tenant_id: row.try_get("tenant_id")?,
        creative_id: row.try_get("creative_id")?,
        principal_id: row.try_get("principal_id")?,
        name: row.try_get("name")?,
        format_id: decode_json(row, "format_id")?,
        status: decode_enum::<CreativeStatus>(row, "status")?,
        media_url: row.try_get("media_url")?,
        snippet: row.try_get("snippet")?,
        click_url: row.try_get("click_url")?,
        tags: decode_json(row, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn assignment_from_row(row: &PgRow) -> Result<AssignmentRow, sqlx::Error> {
    Ok(AssignmentRow {
        tenant_id: row.try_get("tenant_id")?,
        assignment_id: row.try_get("assignment_id")?,
        creative_id: row.try_get("creative_id")?,
        media_buy_id: row.try_get("media_buy_id")?,
        package_id: row.try_get("package_id")?,
    })
}

fn push_config_from_row(row: &PgRow) -> Result<PushConfigRow, sqlx::Error> {
    Ok(PushConfigRow {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        principal_id: row.try_get("principal_id")?,
        url: row.try_get("url")?,
        authentication_type: row.try_get("authentication_type")?,
        authentication_token: row.try_get("authentication_token")?,
        validation_token: row.try_get("validation_token")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<TaskRow, sqlx::Error> {
    Ok(TaskRow {
        tenant_id: row.try_get("tenant_id")?,
        task_id: row.try_get("task_id")?,
        context_id: row.try_get("context_id")?,
        state: decode_enum::<TaskState>(row, "state")?,
        skills_requested: decode_json(row, "skills_requested")?,
        invocation_type: row.try_get("invocation_type")?,
        push_notification_config: decode_json_opt(row, "push_notification_config")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn json_of<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

const TENANT_COLS: &str = "tenant_id, name, subdomain, virtual_host, ad_server, is_active, \
     human_review_required, auto_approve_format_ids, authorized_emails, authorized_domains, \
     brand_manifest_policy, portfolio";

const MEDIA_BUY_COLS: &str = "tenant_id, media_buy_id, principal_id, buyer_ref, status, \
     start_time, end_time, start_date, end_date, paused, packages, currency, po_number, \
     raw_request, reporting_webhook, next_report_at, created_at";

const CREATIVE_COLS: &str = "tenant_id, creative_id, principal_id, name, format_id, status, \
     media_url, snippet, click_url, tags, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    async fn tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<Tenant>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {TENANT_COLS} FROM tenants WHERE subdomain = $1 AND is_active"
            ))
            .bind(subdomain)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| tenant_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn tenant_by_virtual_host(&self, host: &str) -> StoreResult<Option<Tenant>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {TENANT_COLS} FROM tenants WHERE virtual_host = $1 AND is_active"
            ))
            .bind(host)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| tenant_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn tenant_by_id(&self, tenant_id: &str) -> StoreResult<Option<Tenant>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {TENANT_COLS} FROM tenants WHERE tenant_id = $1 AND is_active"
            ))
            .bind(tenant_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| tenant_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn principal_by_token(
        &self,
        token: &str,
        tenant_id: Option<&str>,
    ) -> StoreResult<Option<Principal>> {
        // Authentication is the hottest path; transient connection drops get
        // the retry treatment here.
        let token = token.to_string();
        let tenant = tenant_id.map(str::to_string);
        let row = self
            .db
            .run_with_retry(move |pool| {
                let token = token.clone();
                let tenant = tenant.clone();
                async move {
                    match tenant {
                        Some(tenant) => {
                            sqlx::query(
                                "SELECT tenant_id, principal_id, name, access_token, \
                                 platform_mappings FROM principals \
                                 WHERE access_token = $1 AND tenant_id = $2",
                            )
                            .bind(&token)
                            .bind(&tenant)
                            .fetch_optional(&pool)
                            .await
                        }
                        None => {
                            sqlx::query(
                                "SELECT tenant_id, principal_id, name, access_token, \
                                 platform_mappings FROM principals WHERE access_token = $1",
                            )
                            .bind(&token)
                            .fetch_optional(&pool)
                            .await
                        }
                    }
                }
            })
            .await?;
        row.map(|r| principal_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn principal(&self, tenant_id: &str, principal_id: &str) -> StoreResult<Option<Principal>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, principal_id, name, access_token, platform_mappings \
                 FROM principals WHERE tenant_id = $1 AND principal_id = $2",
            )
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| principal_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn products_for(
        &self,
        tenant_id: &str,
        principal_id: Option<&str>,
    ) -> StoreResult<Vec<ProductRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, product_id, name, description, format_ids, delivery_type, \
                 pricing_options, inventory_profile_id, allowed_principal_ids, publisher_properties \
                 FROM products WHERE tenant_id = $1 ORDER BY product_id",
            )
            .bind(tenant_id)
            .fetch_all(&pool)
            .await,
        )?;
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            // Visibility is re-checked in process rather than in SQL so the
            // rule lives in exactly one place (ProductRow::visible_to).
            if product.visible_to(principal_id) {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn product(&self, tenant_id: &str, product_id: &str) -> StoreResult<Option<ProductRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, product_id, name, description, format_ids, delivery_type, \
                 pricing_options, inventory_profile_id, allowed_principal_ids, publisher_properties \
                 FROM products WHERE tenant_id = $1 AND product_id = $2",
            )
            .bind(tenant_id)
            .bind(product_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| product_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn inventory_profile(
        &self,
        tenant_id: &str,
        profile_id: &str,
    ) -> StoreResult<Option<InventoryProfile>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, inventory_profile_id, name, ad_units, placements, \
                 publisher_properties FROM inventory_profiles \
                 WHERE tenant_id = $1 AND inventory_profile_id = $2",
            )
            .bind(tenant_id)
            .bind(profile_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| profile_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn creative_formats(&self, tenant_id: &str) -> StoreResult<Vec<CreativeFormat>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query("SELECT spec FROM creative_formats WHERE tenant_id = $1 ORDER BY format_id")
                .bind(tenant_id)
                .fetch_all(&pool)
                .await,
        )?;
        rows.iter()
            .map(|row| decode_json::<CreativeFormat>(row, "spec"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn insert_media_buy(&self, row: MediaBuyRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let result = sqlx::query(
            "INSERT INTO media_buys (tenant_id, media_buy_id, principal_id, buyer_ref, status, \
             start_time, end_time, start_date, end_date, paused, packages, currency, po_number, \
             raw_request, reporting_webhook, next_report_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(&row.tenant_id)
        .bind(&row.media_buy_id)
        .bind(&row.principal_id)
        .bind(&row.buyer_ref)
        .bind(row.status.as_str())
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.paused)
        .bind(json_of(&row.packages))
        .bind(&row.currency)
        .bind(&row.po_number)
        .bind(&row.raw_request)
        .bind(row.reporting_webhook.as_ref().map(json_of))
        .bind(row.next_report_at)
        .bind(row.created_at)
        .execute(&pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(format!(
                    "media buy with buyer_ref '{}' already exists",
                    row.buyer_ref
                )))
            }
            Err(other) => self.db.observe(Err::<(), _>(other)),
        }
    }

    async fn media_buy(&self, tenant_id: &str, media_buy_id: &str) -> StoreResult<Option<MediaBuyRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {MEDIA_BUY_COLS} FROM media_buys WHERE tenant_id = $1 AND media_buy_id = $2"
            ))
            .bind(tenant_id)
            .bind(media_buy_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| media_buy_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn media_buy_by_buyer_ref(
        &self,
        tenant_id: &str,
        buyer_ref: &str,
    ) -> StoreResult<Option<MediaBuyRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {MEDIA_BUY_COLS} FROM media_buys WHERE tenant_id = $1 AND buyer_ref = $2"
            ))
            .bind(tenant_id)
            .bind(buyer_ref)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| media_buy_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn media_buys_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        filter: &MediaBuyFilter,
    ) -> StoreResult<Vec<MediaBuyRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(&format!(
                "SELECT {MEDIA_BUY_COLS} FROM media_buys \
                 WHERE tenant_id = $1 AND principal_id = $2 ORDER BY created_at"
            ))
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_all(&pool)
            .await,
        )?;
        let mut buys = Vec::with_capacity(rows.len());
        for row in &rows {
            let buy = media_buy_from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            if filter.matches(&buy) {
                buys.push(buy);
            }
        }
        Ok(buys)
    }

    async fn update_media_buy(&self, row: MediaBuyRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let result = self.db.observe(
            sqlx::query(
                "UPDATE media_buys SET status = $3, start_time = $4, end_time = $5, \
                 start_date = $6, end_date = $7, paused = $8, packages = $9, po_number = $10, \
                 reporting_webhook = $11, next_report_at = $12 \
                 WHERE tenant_id = $1 AND media_buy_id = $2",
            )
            .bind(&row.tenant_id)
            .bind(&row.media_buy_id)
            .bind(row.status.as_str())
            .bind(row.start_time)
            .bind(row.end_time)
            .bind(row.start_date)
            .bind(row.end_date)
            .bind(row.paused)
            .bind(json_of(&row.packages))
            .bind(&row.po_number)
            .bind(row.reporting_webhook.as_ref().map(json_of))
            .bind(row.next_report_at)
            .execute(&pool)
            .await,
        )?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Query(format!(
                "media buy {} not found for update",
                row.media_buy_id
            )));
        }
        Ok(())
    }

    async fn media_buys_by_status(&self, statuses: &[MediaBuyStatus]) -> StoreResult<Vec<MediaBuyRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let status_strings: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = self.db.observe(
            sqlx::query(&format!(
                "SELECT {MEDIA_BUY_COLS} FROM media_buys WHERE status = ANY($1)"
            ))
            .bind(&status_strings)
            .fetch_all(&pool)
            .await,
        )?;
        rows.iter()
            .map(media_buy_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn reporting_targets_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<ReportingTarget>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(&format!(
                "SELECT {MEDIA_BUY_COLS} FROM media_buys \
                 WHERE reporting_webhook IS NOT NULL AND next_report_at <= $1"
            ))
            .bind(now)
            .fetch_all(&pool)
            .await,
        )?;
        rows.iter()
            .map(|row| media_buy_from_row(row).map(|media_buy| ReportingTarget { media_buy }))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn next_report_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT MIN(next_report_at) AS next FROM media_buys \
                 WHERE reporting_webhook IS NOT NULL",
            )
            .fetch_one(&pool)
            .await,
        )?;
        row.try_get("next")
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn set_next_report_at(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "UPDATE media_buys SET next_report_at = $3 \
                 WHERE tenant_id = $1 AND media_buy_id = $2",
            )
            .bind(tenant_id)
            .bind(media_buy_id)
            .bind(at)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn upsert_creative(&self, row: CreativeRow) -> StoreResult<UpsertOutcome> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let existing = self.db.observe(
            sqlx::query(&format!(
                "SELECT {CREATIVE_COLS} FROM creatives WHERE tenant_id = $1 AND creative_id = $2"
            ))
            .bind(&row.tenant_id)
            .bind(&row.creative_id)
            .fetch_optional(&pool)
            .await,
        )?;

        if let Some(existing_row) = existing {
            let existing =
                creative_from_row(&existing_row).map_err(|e| StoreError::Query(e.to_string()))?;
            let unchanged = existing.name == row.name
                && existing.format_id == row.format_id
                && existing.media_url == row.media_url
                && existing.snippet == row.snippet
                && existing.click_url == row.click_url
                && existing.tags == row.tags;
            if unchanged {
                return Ok(UpsertOutcome::Unchanged);
            }
            self.db.observe(
                sqlx::query(
                    "UPDATE creatives SET name = $3, format_id = $4, status = $5, media_url = $6, \
                     snippet = $7, click_url = $8, tags = $9, updated_at = $10 \
                     WHERE tenant_id = $1 AND creative_id = $2",
                )
                .bind(&row.tenant_id)
                .bind(&row.creative_id)
                .bind(&row.name)
                .bind(json_of(&row.format_id))
                .bind(enum_str(&row.status))
                .bind(&row.media_url)
                .bind(&row.snippet)
                .bind(&row.click_url)
                .bind(json_of(&row.tags))
                .bind(row.updated_at)
                .execute(&pool)
                .await,
            )?;
            Ok(UpsertOutcome::Updated)
        } else {
            self.db.observe(
                sqlx::query(
                    "INSERT INTO creatives (tenant_id, creative_id, principal_id, name, format_id, \
                     status, media_url, snippet, click_url, tags, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                )
                .bind(&row.tenant_id)
                .bind(&row.creative_id)
                .bind(&row.principal_id)
                .bind(&row.name)
                .bind(json_of(&row.format_id))
                .bind(enum_str(&row.status))
                .bind(&row.media_url)
                .bind(&row.snippet)
                .bind(&row.click_url)
                .bind(json_of(&row.tags))
                .bind(row.created_at)
                .bind(row.updated_at)
                .execute(&pool)
                .await,
            )?;
            Ok(UpsertOutcome::Created)
        }
    }

    async fn creative(&self, tenant_id: &str, creative_id: &str) -> StoreResult<Option<CreativeRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(&format!(
                "SELECT {CREATIVE_COLS} FROM creatives WHERE tenant_id = $1 AND creative_id = $2"
            ))
            .bind(tenant_id)
            .bind(creative_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| creative_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn creatives_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
        query: &ListCreativesRequest,
    ) -> StoreResult<CreativePage> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        // Tenant/principal scoping happens in SQL; the request-level
        // filter/search/sort/pagination is shared with the in-memory store.
        let rows = self.db.observe(
            sqlx::query(&format!(
                "SELECT {CREATIVE_COLS} FROM creatives \
                 WHERE tenant_id = $1 AND principal_id = $2"
            ))
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_all(&pool)
            .await,
        )?;
        let decoded = rows
            .iter()
            .map(creative_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(page_creatives(decoded, query))
    }

    async fn delete_creatives(
        &self,
        tenant_id: &str,
        principal_id: &str,
        creative_ids: &[String],
    ) -> StoreResult<Vec<String>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(
                "DELETE FROM creatives \
                 WHERE tenant_id = $1 AND principal_id = $2 AND creative_id = ANY($3) \
                 RETURNING creative_id",
            )
            .bind(tenant_id)
            .bind(principal_id)
            .bind(creative_ids)
            .fetch_all(&pool)
            .await,
        )?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("creative_id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn insert_assignment(&self, row: AssignmentRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO creative_assignments \
                 (tenant_id, assignment_id, creative_id, media_buy_id, package_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (tenant_id, creative_id, media_buy_id, package_id) DO NOTHING",
            )
            .bind(&row.tenant_id)
            .bind(&row.assignment_id)
            .bind(&row.creative_id)
            .bind(&row.media_buy_id)
            .bind(&row.package_id)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn assignments_for_media_buy(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
    ) -> StoreResult<Vec<AssignmentRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, assignment_id, creative_id, media_buy_id, package_id \
                 FROM creative_assignments WHERE tenant_id = $1 AND media_buy_id = $2",
            )
            .bind(tenant_id)
            .bind(media_buy_id)
            .fetch_all(&pool)
            .await,
        )?;
        rows.iter()
            .map(assignment_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn upsert_push_config(&self, row: PushConfigRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO push_notification_configs \
                 (id, tenant_id, principal_id, url, authentication_type, authentication_token, \
                  validation_token, is_active, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (tenant_id, principal_id, id) DO UPDATE SET \
                   url = EXCLUDED.url, \
                   authentication_type = EXCLUDED.authentication_type, \
                   authentication_token = EXCLUDED.authentication_token, \
                   validation_token = EXCLUDED.validation_token, \
                   is_active = EXCLUDED.is_active, \
                   updated_at = EXCLUDED.updated_at",
            )
            .bind(&row.id)
            .bind(&row.tenant_id)
            .bind(&row.principal_id)
            .bind(&row.url)
            .bind(&row.authentication_type)
            .bind(&row.authentication_token)
            .bind(&row.validation_token)
            .bind(row.is_active)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<Option<PushConfigRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT id, tenant_id, principal_id, url, authentication_type, \
                 authentication_token, validation_token, is_active, created_at, updated_at \
                 FROM push_notification_configs \
                 WHERE tenant_id = $1 AND principal_id = $2 AND id = $3 AND is_active",
            )
            .bind(tenant_id)
            .bind(principal_id)
            .bind(id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| push_config_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn push_configs_for(
        &self,
        tenant_id: &str,
        principal_id: &str,
    ) -> StoreResult<Vec<PushConfigRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let rows = self.db.observe(
            sqlx::query(
                "SELECT id, tenant_id, principal_id, url, authentication_type, \
                 authentication_token, validation_token, is_active, created_at, updated_at \
                 FROM push_notification_configs \
                 WHERE tenant_id = $1 AND principal_id = $2 AND is_active \
                 ORDER BY created_at",
            )
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_all(&pool)
            .await,
        )?;
        rows.iter()
            .map(push_config_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn deactivate_push_config(
        &self,
        tenant_id: &str,
        principal_id: &str,
        id: &str,
    ) -> StoreResult<bool> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let result = self.db.observe(
            sqlx::query(
                "UPDATE push_notification_configs SET is_active = FALSE, updated_at = $4 \
                 WHERE tenant_id = $1 AND principal_id = $2 AND id = $3",
            )
            .bind(tenant_id)
            .bind(principal_id)
            .bind(id)
            .bind(Utc::now())
            .execute(&pool)
            .await,
        )?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_task(&self, row: TaskRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO tasks (tenant_id, task_id, context_id, state, skills_requested, \
                 invocation_type, push_notification_config, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (tenant_id, task_id) DO UPDATE SET \
                   state = EXCLUDED.state, updated_at = EXCLUDED.updated_at",
            )
            .bind(&row.tenant_id)
            .bind(&row.task_id)
            .bind(&row.context_id)
            .bind(row.state.as_str())
            .bind(json_of(&row.skills_requested))
            .bind(&row.invocation_type)
            .bind(row.push_notification_config.as_ref().map(json_of))
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn task(&self, tenant_id: &str, task_id: &str) -> StoreResult<Option<TaskRow>> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let row = self.db.observe(
            sqlx::query(
                "SELECT tenant_id, task_id, context_id, state, skills_requested, \
                 invocation_type, push_notification_config, created_at, updated_at \
                 FROM tasks WHERE tenant_id = $1 AND task_id = $2",
            )
            .bind(tenant_id)
            .bind(task_id)
            .fetch_optional(&pool)
            .await,
        )?;
        row.map(|r| task_from_row(&r))
            .transpose()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn update_task_state(
        &self,
        tenant_id: &str,
        task_id: &str,
        state: TaskState,
    ) -> StoreResult<bool> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        let result = self.db.observe(
            sqlx::query(
                "UPDATE tasks SET state = $3, updated_at = $4 \
                 WHERE tenant_id = $1 AND task_id = $2",
            )
            .bind(tenant_id)
            .bind(task_id)
            .bind(state.as_str())
            .bind(Utc::now())
            .execute(&pool)
            .await,
        )?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_workflow_step(&self, row: WorkflowStepRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO workflow_steps \
                 (tenant_id, step_id, media_buy_id, step_type, status, comments, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&row.tenant_id)
            .bind(&row.step_id)
            .bind(&row.media_buy_id)
            .bind(&row.step_type)
            .bind(&row.status)
            .bind(json_of(&row.comments))
            .bind(row.created_at)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn touch_context(&self, row: ContextRow) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO contexts (tenant_id, principal_id, context_id, created_at, \
                 last_activity_at) VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (tenant_id, principal_id, context_id) DO UPDATE SET \
                   last_activity_at = EXCLUDED.last_activity_at",
            )
            .bind(&row.tenant_id)
            .bind(&row.principal_id)
            .bind(&row.context_id)
            .bind(row.created_at)
            .bind(row.last_activity_at)
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }

    async fn record_performance_feedback(
        &self,
        tenant_id: &str,
        media_buy_id: &str,
        feedback: &[ProductPerformance],
    ) -> StoreResult<()> {
        self.db.ensure_healthy()?;
        let pool = self.db.pool().await;
        self.db.observe(
            sqlx::query(
                "INSERT INTO performance_feedback (tenant_id, media_buy_id, feedback, recorded_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(tenant_id)
            .bind(media_buy_id)
            .bind(json_of(&feedback))
            .bind(Utc::now())
            .execute(&pool)
            .await,
        )?;
        Ok(())
    }
}
