//! Mintwatch daemon entry point

use anyhow::Context;
use mintwatch_core::Config;
use mintwatch_engine::{LogNotifier, Scheduler};
use mintwatch_persistence::sqlite::{events, ThresholdBasis};
use mintwatch_persistence::{Database, HitCache};
use mintwatch_providers::ProviderClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mintwatch.toml"));
    let config = load_config(&config_path)?;

    let db = Arc::new(
        Database::connect(Path::new(&config.database.path))
            .await
            .context("opening database")?,
    );
    info!(path = %config.database.path, "database ready");

    // Rebuild the hit cache from persisted threshold events
    let cache = Arc::new(HitCache::new());
    let keys = events::all_event_keys(db.pool()).await?;
    cache.seed(keys.into_iter().filter_map(|(signal_id, multiplier, basis)| {
        ThresholdBasis::parse(&basis).map(|b| (signal_id, multiplier, b))
    }));
    info!(recorded_crossings = cache.len(), "hit cache seeded");

    let provider = Arc::new(ProviderClient::new(config.provider.clone()));
    let notifier = Arc::new(LogNotifier);

    let shutdown = Arc::new(Notify::new());
    let shutdown_trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown_trigger.notify_waiters();
        }
    });

    let scheduler = Scheduler::new(db, provider, notifier, cache, config);
    scheduler.run(shutdown).await;

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        let config = Config::load(path).with_context(|| format!("loading {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    } else {
        warn!(path = %path.display(), "no config file, using defaults");
        Ok(Config::default())
    }
}
