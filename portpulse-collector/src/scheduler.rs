/**
 * ORDONNANCEUR - Boucle de collecte du démon PortPulse
 *
 * RÔLE :
 * Boucle unique sans état terminal : à chaque tour, contrôle d'admission,
 * reconstruction de l'ensemble des appareils actifs (plafonné par la
 * licence), lancement d'un worker par appareil actif sans worker en cours,
 * puis sommeil du reste de l'intervalle fixe (corrigé de la dérive).
 *
 * FONCTIONNEMENT :
 * - un seul verrou pour les deux ensembles (actifs + en cours)
 * - le wrapper de spawn retire l'appareil de l'ensemble "en cours" à la fin
 *   du worker; le worker lui-même n'en sait rien
 * - watchdog : un worker qui dépasse son délai est retiré (abort) pour que
 *   son appareil redevienne planifiable
 *
 * UTILITÉ :
 * Aucune erreur d'un composant ne termine la boucle; tout dégrade en
 * "non licencié" ou "ensemble vide" avec un log.
 */
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::license::{self, Admission};
use crate::models::Device;
use crate::state::{CollectorState, RunningWorker};
use crate::store::{Store, StoreError};
use crate::worker;

/// Runs the polling loop until the process exits.
pub async fn run(state: Arc<CollectorState>) {
    loop {
        let cycle_start = Instant::now();

        let admission = license::check(state.store.as_ref()).await;
        info!("license activated: {}", admission.authorized);

        refresh_active_devices(&state, admission).await;
        dispatch(&state);

        pace(cycle_start, state.config.poll_interval()).await;
    }
}

/// Rebuilds the active set from the store, capped by the admission outcome.
/// Store failures degrade to an empty set.
pub(crate) async fn refresh_active_devices(state: &CollectorState, admission: Admission) {
    let limit = if admission.authorized {
        admission.device_cap
    } else {
        1
    };

    let devices = match fetch_devices(state, limit).await {
        Ok(devices) => devices,
        Err(e) => {
            error!("device refresh failed: {e}");
            Vec::new()
        }
    };

    let mut sets = state.devices.lock();
    sets.active = devices.into_iter().map(|d| (d.id, d)).collect();
    info!(
        "active devices: {}, running devices: {}",
        sets.active.len(),
        sets.running.len()
    );
}

async fn fetch_devices(state: &CollectorState, limit: usize) -> Result<Vec<Device>, StoreError> {
    let name = &state.config.device_type;
    let Some(device_type) = state.store.device_type_by_name(name).await? else {
        warn!("device type {name:?} not present in store");
        return Ok(Vec::new());
    };
    state.store.activated_devices(device_type.id, limit).await
}

/// Starts a worker for every active device without one. The active set is
/// snapshotted first so the lock is not held across task dispatch.
pub(crate) fn dispatch(state: &Arc<CollectorState>) {
    retire_stale_workers(state);

    let waiting: Vec<Device> = {
        let sets = state.devices.lock();
        sets.active
            .values()
            .filter(|d| !sets.running.contains_key(&d.id))
            .cloned()
            .collect()
    };

    for device in waiting {
        spawn_worker(state, device);
    }
}

/// Aborts and unregisters workers that outlived the configured timeout, so a
/// wedged feed read cannot occupy its device slot forever.
pub(crate) fn retire_stale_workers(state: &CollectorState) {
    let timeout = state.config.worker_timeout();
    let mut sets = state.devices.lock();
    let stale: Vec<u32> = sets
        .running
        .iter()
        .filter(|(_, w)| w.started_at.elapsed() > timeout)
        .map(|(id, _)| *id)
        .collect();
    for id in stale {
        if let Some(w) = sets.running.remove(&id) {
            w.abort.abort();
            warn!(
                "device {id} ({}): worker exceeded {timeout:?}, retired",
                w.device.name
            );
        }
    }
}

/// Registers the device as running and spawns its worker. The wrapper owns
/// the removal from the running set; insertion and spawn happen under the
/// same lock hold, so the entry can never outlive an already-finished task.
pub(crate) fn spawn_worker(state: &Arc<CollectorState>, device: Device) {
    let mut sets = state.devices.lock();
    if sets.running.contains_key(&device.id) {
        return;
    }

    let task_state = Arc::clone(state);
    let task_device = device.clone();
    let handle = tokio::spawn(async move {
        worker::run(&task_state, &task_device).await;
        task_state.devices.lock().running.remove(&task_device.id);
    });

    sets.running.insert(
        device.id,
        RunningWorker {
            device,
            started_at: Instant::now(),
            abort: handle.abort_handle(),
        },
    );
}

/// Sleeps out the remainder of the poll interval. A cycle that overran the
/// interval rolls straight into the next one, without catch-up skipping.
async fn pace(cycle_start: Instant, interval: Duration) {
    let elapsed = cycle_start.elapsed();
    if elapsed < interval {
        let remaining = interval - elapsed;
        debug!("cycle finished in {elapsed:?}, sleeping {remaining:?}");
        tokio::time::sleep(remaining).await;
    }
}
