//! One-shot maintenance job removing expired refresh tokens and blacklist
//! entries from the configured store.
//!
//! Intended to be run periodically by an external scheduler.

use anyhow::Context;
use chrono::Duration;
use tracing::{info, warn};

use tw_core::{TokenCleanupConfig, TokenCleanupService};
use tw_infra::build_store;
use tw_shared::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!(
        environment = %config.environment,
        backend = %config.store.backend,
        "Starting token sweep"
    );

    let store = build_store(&config.store)
        .await
        .context("Failed to connect to token store")?;

    let skew = Duration::try_seconds(config.jwt.clock_skew)
        .with_context(|| format!("Clock skew of {}s is out of range", config.jwt.clock_skew))?;
    let cleanup = TokenCleanupService::new(store, TokenCleanupConfig::for_clock_skew(skew));
    let result = cleanup.run_cleanup().await?;

    if result.is_success() {
        info!(cleaned = result.total_cleaned(), "Token sweep finished");
        Ok(())
    } else {
        for error in &result.errors {
            warn!("{}", error);
        }
        anyhow::bail!("Token sweep finished with {} errors", result.errors.len())
    }
}
