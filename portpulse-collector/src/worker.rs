//! Per-device ingestion worker.
//!
//! One run: fetch the device's port lists, pull its pending feed batch, hand
//! everything to the classifier, log the outcome. Every failure is contained
//! here: a worker never brings down the scheduler, and the scheduler (not
//! the worker) guarantees only one run per device is in flight.

use tracing::{debug, error, info};

use crate::feed::FeedSource;
use crate::ingest;
use crate::models::{Device, PortKind};
use crate::state::CollectorState;
use crate::store::Store;

pub async fn run(state: &CollectorState, device: &Device) {
    debug!("device {}: worker started", device.id);

    let digital_ports = match state
        .store
        .ports_for_device(device.id, PortKind::Digital)
        .await
    {
        Ok(ports) => ports,
        Err(e) => {
            error!("device {}: digital port lookup failed: {e}", device.id);
            Vec::new()
        }
    };
    let analog_ports = match state
        .store
        .ports_for_device(device.id, PortKind::Analog)
        .await
    {
        Ok(ports) => ports,
        Err(e) => {
            error!("device {}: analog port lookup failed: {e}", device.id);
            Vec::new()
        }
    };

    let readings = match state.feed.fetch(device).await {
        Ok(readings) => readings,
        Err(e) => {
            error!("device {}: {e}", device.id);
            return;
        }
    };

    let outcome = ingest::process_batch(
        device,
        &readings,
        &digital_ports,
        &analog_ports,
        state.store.as_ref(),
        &state.caches,
    )
    .await;

    info!(
        "device {}: {} readings -> {} digital / {} analog records, {} skipped",
        device.id,
        readings.len(),
        outcome.digital_appended,
        outcome.analog_appended,
        outcome.skipped_readings
    );
}
