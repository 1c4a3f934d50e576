// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Server wiring: configuration, telemetry, resource assembly, and the two
//! transport listeners.

pub mod config;
pub mod telemetry;

use adcp_a2a::A2aState;
use adcp_adapters::{AdapterRegistry, MockAdapter};
use adcp_mcp::McpState;
use adcp_skills::{Services, SkillRegistry};
use adcp_store::{Db, DbConfig, MemStore, PgStore, Store};
use adcp_tasks::{DeliveryScheduler, StatusScheduler, TaskService, WebhookSender};
use config::ServerConfig;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub use config::ConfigError;

/// Everything the transports and schedulers share. Built once at startup
/// and passed into handlers; there are no process globals.
pub struct Resources {
    /// Skill-handler services.
    pub services: Arc<Services>,
    /// The skill registry.
    pub registry: Arc<SkillRegistry>,
    /// The database resource, absent in testing mode.
    pub db: Option<Arc<Db>>,
    /// The runtime configuration.
    pub config: ServerConfig,
}

impl Resources {
    /// Assemble the resource plane from configuration.
    pub async fn build(config: ServerConfig) -> anyhow::Result<Self> {
        let (store, db): (Arc<dyn Store>, Option<Arc<Db>>) = match (&config.database_url, config.testing)
        {
            (Some(url), false) => {
                let mut db_config = DbConfig::new(url.clone());
                db_config.use_pgbouncer = config.use_pgbouncer;
                let db = Arc::new(Db::connect(db_config).await?);
                let store = PgStore::new(db.clone());
                store.migrate().await?;
                info!("connected to PostgreSQL");
                (Arc::new(store) as Arc<dyn Store>, Some(db))
            }
            _ => {
                info!("testing mode: in-memory store, mock adapter authoritative");
                (Arc::new(MemStore::new()) as Arc<dyn Store>, None)
            }
        };

        let mut adapters = AdapterRegistry::new();
        adapters.register("mock", MockAdapter::new());

        let webhooks = WebhookSender::new();
        let tasks = Arc::new(TaskService::new(store.clone(), webhooks));

        let services = Arc::new(Services {
            store,
            adapters: Arc::new(adapters),
            tasks,
            ranker: None,
        });

        Ok(Self {
            services,
            registry: Arc::new(SkillRegistry::standard()),
            db,
            config,
        })
    }

    /// Spawn the delivery-report and status schedulers. Returns the
    /// shutdown handle; setting it to `true` drains both workers.
    pub fn spawn_schedulers(&self) -> watch::Sender<bool> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let delivery = DeliveryScheduler::new(
            self.services.store.clone(),
            self.services.adapters.clone(),
            self.services.tasks.webhooks().clone(),
            self.config.delivery_webhook_interval_secs,
            shutdown_rx.clone(),
        );
        tokio::spawn(delivery.run());

        let status = StatusScheduler::new(
            self.services.store.clone(),
            self.config.status_scheduler_interval_secs,
            shutdown_rx,
        );
        tokio::spawn(status.run());

        shutdown_tx
    }

    /// State for the A2A router.
    #[must_use]
    pub fn a2a_state(&self) -> A2aState {
        A2aState {
            services: self.services.clone(),
            registry: self.registry.clone(),
            db: self.db.clone(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            default_url: self.config.default_a2a_url(),
        }
    }

    /// State for the MCP router.
    #[must_use]
    pub fn mcp_state(&self) -> McpState {
        McpState {
            services: self.services.clone(),
            registry: self.registry.clone(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Serve both transports until ctrl-c.
pub async fn run(resources: Resources) -> anyhow::Result<()> {
    let shutdown = resources.spawn_schedulers();

    let a2a_app = adcp_a2a::build_router(resources.a2a_state());
    let mcp_app = adcp_mcp::build_router(resources.mcp_state());

    let a2a_addr = format!("{}:{}", resources.config.host, resources.config.a2a_port);
    let mcp_addr = format!("{}:{}", resources.config.host, resources.config.mcp_port);

    let a2a_listener = tokio::net::TcpListener::bind(&a2a_addr).await?;
    let mcp_listener = tokio::net::TcpListener::bind(&mcp_addr).await?;
    info!(a2a = %a2a_addr, mcp = %mcp_addr, "sales agent listening");

    let a2a_server = axum::serve(a2a_listener, a2a_app).into_future();
    let mcp_server = axum::serve(mcp_listener, mcp_app).into_future();

    tokio::select! {
        result = a2a_server => result?,
        result = mcp_server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown.send(true);
    // Give the schedulers a beat to notice the signal.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
