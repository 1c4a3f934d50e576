// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracing initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Safe to call once per process; later
/// calls are no-ops.
pub fn init(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init();
    }
}
