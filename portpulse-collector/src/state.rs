//! Owned shared state of the collector.
//!
//! Everything the scheduler and its workers share lives in one
//! `CollectorState` passed around behind an `Arc`; no package-level mutable
//! globals. The two device sets sit behind a single mutex because the
//! admission cap check and worker bookkeeping must not race each other; the
//! latest-value caches carry their own locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::cache::LatestValues;
use crate::config::CollectorConfig;
use crate::feed::FeedSource;
use crate::models::Device;
use crate::store::Store;

/// Bookkeeping entry for a worker currently executing. The abort handle lets
/// the scheduler retire a worker that outlives its timeout.
pub struct RunningWorker {
    pub device: Device,
    pub started_at: Instant,
    pub abort: AbortHandle,
}

/// Active set (rebuilt every tick, capped by admission) and running set
/// (one entry per in-flight worker). Guarded together by one lock.
#[derive(Default)]
pub struct DeviceSets {
    pub active: HashMap<u32, Device>,
    pub running: HashMap<u32, RunningWorker>,
}

pub struct CollectorState {
    pub config: CollectorConfig,
    pub store: Arc<dyn Store>,
    pub feed: Arc<dyn FeedSource>,
    pub caches: LatestValues,
    pub devices: Mutex<DeviceSets>,
}

impl CollectorState {
    pub fn new(
        config: CollectorConfig,
        store: Arc<dyn Store>,
        feed: Arc<dyn FeedSource>,
        caches: LatestValues,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            feed,
            caches,
            devices: Mutex::new(DeviceSets::default()),
        })
    }
}
