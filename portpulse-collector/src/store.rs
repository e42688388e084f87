/**
 * STORE - Interface de persistence du collecteur PortPulse
 *
 * RÔLE :
 * Ce module définit le contrat `Store` entre le collecteur et son moteur de
 * stockage : lecture des appareils/ports/réglages, ajout des enregistrements
 * digitaux et analogiques (append-only), requêtes "dernière ligne par port".
 *
 * FONCTIONNEMENT :
 * - Store trait = interface opaque (le moteur relationnel réel vit ailleurs)
 * - JsonStore = backend de référence en fichiers JSON (chargé en mémoire au
 *   démarrage, persisté à chaque append/save)
 * - Les IDs d'enregistrements sont attribués par le store, croissants
 *
 * UTILITÉ :
 * Le démon tourne tel quel avec JsonStore; brancher un autre moteur =
 * implémenter le trait, rien d'autre ne change.
 */
use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{AnalogRecord, Device, DevicePort, DeviceType, DigitalRecord, PortKind, Setting};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data error: {0}")]
    Data(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Opaque append/query store the collector runs against.
///
/// Append operations assign the record id; callers pass `id: 0`. Reads never
/// return virtual ports or deactivated devices unless stated otherwise.
#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness/initialization probe; the startup path retries this until it
    /// succeeds before anything else touches the store.
    async fn ready(&self) -> Result<(), StoreError>;

    async fn device_type_by_name(&self, name: &str) -> Result<Option<DeviceType>, StoreError>;

    /// Activated devices of one type, at most `limit` of them, in store order.
    async fn activated_devices(
        &self,
        device_type_id: u32,
        limit: usize,
    ) -> Result<Vec<Device>, StoreError>;

    /// Non-virtual ports of one device and kind, in store order.
    async fn ports_for_device(
        &self,
        device_id: u32,
        kind: PortKind,
    ) -> Result<Vec<DevicePort>, StoreError>;

    async fn append_digital(&self, record: DigitalRecord) -> Result<(), StoreError>;

    async fn append_analog(&self, record: AnalogRecord) -> Result<(), StoreError>;

    /// Highest-id digital record for every port that has one.
    async fn latest_digital_per_port(&self) -> Result<Vec<DigitalRecord>, StoreError>;

    async fn latest_analog_per_port(&self) -> Result<Vec<AnalogRecord>, StoreError>;

    async fn setting(&self, name: &str) -> Result<Option<Setting>, StoreError>;

    /// Upsert by name.
    async fn save_setting(&self, setting: Setting) -> Result<(), StoreError>;
}

const DEVICE_TYPES_FILE: &str = "device_types.json";
const DEVICES_FILE: &str = "devices.json";
const PORTS_FILE: &str = "ports.json";
const SETTINGS_FILE: &str = "settings.json";
const DIGITAL_RECORDS_FILE: &str = "digital_records.json";
const ANALOG_RECORDS_FILE: &str = "analog_records.json";

#[derive(Default)]
struct StoreData {
    device_types: Vec<DeviceType>,
    devices: Vec<Device>,
    ports: Vec<DevicePort>,
    settings: Vec<Setting>,
    digital_records: Vec<DigitalRecord>,
    analog_records: Vec<AnalogRecord>,
    next_digital_id: u64,
    next_analog_id: u64,
}

/// Reference store backend: one JSON file per table under `data_dir`.
pub struct JsonStore {
    data_dir: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            data: RwLock::new(StoreData::default()),
        }
    }

    /// `new` + `ready` in one step, for callers that want an error instead of
    /// the startup retry loop.
    pub async fn open<P: Into<PathBuf>>(data_dir: P) -> Result<Self, StoreError> {
        let store = Self::new(data_dir);
        store.ready().await?;
        Ok(store)
    }

    fn file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    async fn load_file<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.file(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_file<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(rows)?;
        fs::write(self.file(name), content).await?;
        Ok(())
    }
}

fn next_id<I: Iterator<Item = u64>>(ids: I) -> u64 {
    ids.max().unwrap_or(0) + 1
}

fn latest_per_port<R: Clone>(records: &[R], id: fn(&R) -> u64, port: fn(&R) -> u32) -> Vec<R> {
    let mut latest: HashMap<u32, &R> = HashMap::new();
    for record in records {
        let key = port(record);
        let newer = latest
            .get(&key)
            .map_or(true, |existing| id(existing) < id(record));
        if newer {
            latest.insert(key, record);
        }
    }
    latest.into_values().cloned().collect()
}

#[async_trait]
impl Store for JsonStore {
    async fn ready(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).await?;
        let device_types = self.load_file(DEVICE_TYPES_FILE).await?;
        let devices = self.load_file(DEVICES_FILE).await?;
        let ports = self.load_file(PORTS_FILE).await?;
        let settings = self.load_file(SETTINGS_FILE).await?;
        let digital_records: Vec<DigitalRecord> = self.load_file(DIGITAL_RECORDS_FILE).await?;
        let analog_records: Vec<AnalogRecord> = self.load_file(ANALOG_RECORDS_FILE).await?;

        let mut data = self.data.write().await;
        data.next_digital_id = next_id(digital_records.iter().map(|r| r.id));
        data.next_analog_id = next_id(analog_records.iter().map(|r| r.id));
        data.device_types = device_types;
        data.devices = devices;
        data.ports = ports;
        data.settings = settings;
        data.digital_records = digital_records;
        data.analog_records = analog_records;
        debug!(
            "store loaded from {:?}: {} devices, {} ports, {} digital / {} analog records",
            self.data_dir,
            data.devices.len(),
            data.ports.len(),
            data.digital_records.len(),
            data.analog_records.len()
        );
        Ok(())
    }

    async fn device_type_by_name(&self, name: &str) -> Result<Option<DeviceType>, StoreError> {
        let data = self.data.read().await;
        Ok(data.device_types.iter().find(|t| t.name == name).cloned())
    }

    async fn activated_devices(
        &self,
        device_type_id: u32,
        limit: usize,
    ) -> Result<Vec<Device>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .devices
            .iter()
            .filter(|d| d.device_type_id == device_type_id && d.activated)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ports_for_device(
        &self,
        device_id: u32,
        kind: PortKind,
    ) -> Result<Vec<DevicePort>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .ports
            .iter()
            .filter(|p| p.device_id == device_id && p.kind == kind && !p.is_virtual)
            .cloned()
            .collect())
    }

    async fn append_digital(&self, mut record: DigitalRecord) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        record.id = data.next_digital_id;
        data.next_digital_id += 1;
        data.digital_records.push(record);
        self.save_file(DIGITAL_RECORDS_FILE, &data.digital_records)
            .await
    }

    async fn append_analog(&self, mut record: AnalogRecord) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        record.id = data.next_analog_id;
        data.next_analog_id += 1;
        data.analog_records.push(record);
        self.save_file(ANALOG_RECORDS_FILE, &data.analog_records)
            .await
    }

    async fn latest_digital_per_port(&self) -> Result<Vec<DigitalRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(latest_per_port(
            &data.digital_records,
            |r| r.id,
            |r| r.port_id,
        ))
    }

    async fn latest_analog_per_port(&self) -> Result<Vec<AnalogRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(latest_per_port(
            &data.analog_records,
            |r| r.id,
            |r| r.port_id,
        ))
    }

    async fn setting(&self, name: &str) -> Result<Option<Setting>, StoreError> {
        let data = self.data.read().await;
        Ok(data.settings.iter().find(|s| s.name == name).cloned())
    }

    async fn save_setting(&self, setting: Setting) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        match data.settings.iter_mut().find(|s| s.name == setting.name) {
            Some(existing) => *existing = setting,
            None => data.settings.push(setting),
        }
        self.save_file(SETTINGS_FILE, &data.settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono::NaiveDateTime;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 10)
            .unwrap()
            .and_hms_opt(14, minute, 0)
            .unwrap()
    }

    fn digital(port_id: u32, minute: u32, value: i64) -> DigitalRecord {
        DigitalRecord { id: 0, port_id, at: at(minute), value }
    }

    #[tokio::test]
    async fn appends_assign_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        store.append_digital(digital(7, 0, 1)).await.unwrap();
        store.append_digital(digital(7, 1, 0)).await.unwrap();

        let latest = store.latest_digital_per_port().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, 2);
        assert_eq!(latest[0].value, 0);
    }

    #[tokio::test]
    async fn latest_per_port_keeps_highest_id_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        store.append_digital(digital(1, 0, 10)).await.unwrap();
        store.append_digital(digital(2, 1, 20)).await.unwrap();
        store.append_digital(digital(1, 2, 30)).await.unwrap();

        let mut latest = store.latest_digital_per_port().await.unwrap();
        latest.sort_by_key(|r| r.port_id);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].value, 30);
        assert_eq!(latest[1].value, 20);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonStore::open(dir.path()).await.unwrap();
            store
                .append_analog(AnalogRecord { id: 0, port_id: 4, at: at(0), value: 21.5 })
                .await
                .unwrap();
        }
        let reopened = JsonStore::open(dir.path()).await.unwrap();
        let latest = reopened.latest_analog_per_port().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].port_id, 4);
        assert_eq!(latest[0].value, 21.5);

        // Ids keep increasing after a reload.
        reopened
            .append_analog(AnalogRecord { id: 0, port_id: 4, at: at(1), value: 22.0 })
            .await
            .unwrap();
        let latest = reopened.latest_analog_per_port().await.unwrap();
        assert_eq!(latest[0].id, 2);
    }

    #[tokio::test]
    async fn ports_query_filters_kind_and_virtual() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        {
            let mut data = store.data.write().await;
            data.ports = vec![
                DevicePort { id: 1, device_id: 9, kind: PortKind::Digital, position: 1, is_virtual: false },
                DevicePort { id: 2, device_id: 9, kind: PortKind::Digital, position: 2, is_virtual: true },
                DevicePort { id: 3, device_id: 9, kind: PortKind::Analog, position: 1, is_virtual: false },
                DevicePort { id: 4, device_id: 8, kind: PortKind::Digital, position: 1, is_virtual: false },
            ];
        }

        let ports = store.ports_for_device(9, PortKind::Digital).await.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].id, 1);
    }

    #[tokio::test]
    async fn activated_devices_honors_limit_and_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        {
            let mut data = store.data.write().await;
            data.devices = (1..=4)
                .map(|id| Device {
                    id,
                    name: format!("device-{id}"),
                    device_type_id: 1,
                    activated: id != 3,
                })
                .collect();
        }

        let devices = store.activated_devices(1, 2).await.unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.activated));

        let all = store.activated_devices(1, 100).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn settings_upsert_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        store
            .save_setting(Setting {
                name: "company".into(),
                value: "Acme".into(),
                note: String::new(),
            })
            .await
            .unwrap();
        store
            .save_setting(Setting {
                name: "company".into(),
                value: "Globex".into(),
                note: "moved".into(),
            })
            .await
            .unwrap();

        let setting = store.setting("company").await.unwrap().unwrap();
        assert_eq!(setting.value, "Globex");
        assert_eq!(setting.note, "moved");
        assert!(store.setting("missing").await.unwrap().is_none());
    }
}
