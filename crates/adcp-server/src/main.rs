// SPDX-License-Identifier: MIT OR Apache-2.0
//! AdCP sales agent entry point.

use adcp_server::config::ServerConfig;
use adcp_server::{telemetry, Resources};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("ADCP_CONFIG") {
        Ok(path) => ServerConfig::from_file(&path)?,
        Err(_) => ServerConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;

    telemetry::init(&config.log_filter, config.log_json);

    let resources = Resources::build(config).await?;
    adcp_server::run(resources).await
}
