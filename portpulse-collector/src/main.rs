//! Daemon entry point: bootstrap sequence and the startup helpers around it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, info};

use portpulse_collector::cache::LatestValues;
use portpulse_collector::config;
use portpulse_collector::feed::{FeedSource, JsonFileFeed};
use portpulse_collector::license::SERVICE_NAME;
use portpulse_collector::models::Setting;
use portpulse_collector::scheduler;
use portpulse_collector::state::CollectorState;
use portpulse_collector::store::{JsonStore, Store};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    info!("{SERVICE_NAME} [{VERSION}] starting");

    let config = config::load_config().await;
    let store: Arc<dyn Store> = Arc::new(JsonStore::new(config.data_dir.clone()));
    wait_for_store(store.as_ref()).await;
    stamp_version(store.as_ref()).await;
    let caches = seed_caches(store.as_ref()).await;
    let feed: Arc<dyn FeedSource> = Arc::new(JsonFileFeed::new(config.feed_path.as_str()));

    let state = CollectorState::new(config, store, feed, caches);
    info!("{SERVICE_NAME} [{VERSION}] started");
    scheduler::run(state).await;
    Ok(())
}

/// Blocks until the store answers; the daemon must not poll against a store
/// that is still coming up.
async fn wait_for_store(store: &dyn Store) {
    loop {
        match store.ready().await {
            Ok(()) => {
                info!("store ready");
                return;
            }
            Err(e) => {
                error!("store not ready: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Records the running version in the service's setting row. The row also
/// carries the license token in its note, which the upsert preserves.
async fn stamp_version(store: &dyn Store) {
    let mut setting = match store.setting(SERVICE_NAME).await {
        Ok(Some(setting)) => setting,
        Ok(None) => Setting::named(SERVICE_NAME),
        Err(e) => {
            error!("version stamp skipped: {e}");
            return;
        }
    };
    setting.value = VERSION.to_string();
    if let Err(e) = store.save_setting(setting).await {
        error!("failed to record version: {e}");
    }
}

/// Pre-fills the latest-value caches from the store's newest row per port.
async fn seed_caches(store: &dyn Store) -> LatestValues {
    let caches = LatestValues::new();
    match store.latest_digital_per_port().await {
        Ok(records) => caches.seed_digital(&records),
        Err(e) => error!("digital cache seed failed: {e}"),
    }
    match store.latest_analog_per_port().await {
        Ok(records) => caches.seed_analog(&records),
        Err(e) => error!("analog cache seed failed: {e}"),
    }
    info!(
        "seeded latest values for {} digital and {} analog ports",
        caches.digital_len(),
        caches.analog_len()
    );
    caches
}
