// SPDX-License-Identifier: MIT OR Apache-2.0
//! Server configuration: TOML file plus environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Parse error detail.
        reason: String,
    },
    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failures.
        reasons: Vec<String>,
    },
}

/// Runtime settings for the sales agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Postgres URL. Absent means the in-memory store (testing only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Bind address for both transports.
    #[serde(default = "default_host")]
    pub host: String,

    /// A2A JSON-RPC port.
    #[serde(default = "default_a2a_port")]
    pub a2a_port: u16,

    /// MCP port.
    #[serde(default = "default_mcp_port")]
    pub mcp_port: u16,

    /// Default delivery-report interval in seconds.
    #[serde(default = "default_delivery_interval")]
    pub delivery_webhook_interval_secs: u64,

    /// Status-scheduler tick interval in seconds.
    #[serde(default = "default_status_interval")]
    pub status_scheduler_interval_secs: u64,

    /// Public domain the agent is reachable on (agent-card fallback URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_agent_domain: Option<String>,

    /// Testing mode: use the in-memory store and the mock adapter only.
    #[serde(default)]
    pub testing: bool,

    /// Use PgBouncer pool settings regardless of port detection.
    #[serde(default)]
    pub use_pgbouncer: bool,

    /// Log filter (e.g. `"info"`, `"adcp_skills=debug,info"`).
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON.
    #[serde(default)]
    pub log_json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_a2a_port() -> u16 {
    8091
}

fn default_mcp_port() -> u16 {
    8080
}

fn default_delivery_interval() -> u64 {
    3600
}

fn default_status_interval() -> u64 {
    60
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config is valid")
    }
}

impl ServerConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })
    }

    /// Apply environment-variable overrides on top of the file values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database_url = Some(url);
            }
        }
        if let Ok(port) = std::env::var("A2A_PORT") {
            if let Ok(port) = port.parse() {
                self.a2a_port = port;
            }
        }
        if let Ok(port) = std::env::var("MCP_PORT") {
            if let Ok(port) = port.parse() {
                self.mcp_port = port;
            }
        }
        if let Ok(interval) = std::env::var("DELIVERY_WEBHOOK_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse() {
                self.delivery_webhook_interval_secs = interval;
            }
        }
        if let Ok(interval) = std::env::var("STATUS_SCHEDULER_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse() {
                self.status_scheduler_interval_secs = interval;
            }
        }
        if let Ok(domain) = std::env::var("SALES_AGENT_DOMAIN") {
            if !domain.is_empty() {
                self.sales_agent_domain = Some(domain);
            }
        }
        if let Ok(testing) = std::env::var("ADCP_TESTING") {
            self.testing = matches!(testing.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(pgbouncer) = std::env::var("USE_PGBOUNCER") {
            self.use_pgbouncer = pgbouncer.to_lowercase() == "true";
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.is_empty() {
                self.log_filter = filter;
            }
        }
        self
    }

    /// Semantic validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();

        if !self.testing && self.database_url.is_none() {
            reasons.push(
                "database_url (or DATABASE_URL) is required outside testing mode".to_string(),
            );
        }
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                reasons.push("database_url must be a postgresql:// URL".to_string());
            }
        }
        if self.a2a_port == self.mcp_port {
            reasons.push("a2a_port and mcp_port must differ".to_string());
        }
        if self.delivery_webhook_interval_secs == 0 {
            reasons.push("delivery_webhook_interval_secs must be positive".to_string());
        }
        if self.status_scheduler_interval_secs == 0 {
            reasons.push("status_scheduler_interval_secs must be positive".to_string());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { reasons })
        }
    }

    /// Fallback agent-card URL.
    #[must_use]
    pub fn default_a2a_url(&self) -> String {
        match &self.sales_agent_domain {
            Some(domain) => format!("https://{domain}/a2a"),
            None => format!("http://localhost:{}/a2a", self.a2a_port),
        }
    }
}
