//! Reading classification and persistence.
//!
//! One polled reading applies to every port of the device that shares its
//! signal kind (a broadcast value, not a single-port sample), so a digital
//! reading fans out to all digital ports and an analog reading to all analog
//! ports within the position cap. Each successful append is mirrored into the
//! latest-value cache; failures are logged and never abort the batch.

use tracing::{debug, error};

use crate::cache::{AnalogSample, DigitalSample, LatestValues};
use crate::models::{AnalogRecord, Device, DevicePort, DigitalRecord, RawReading};
use crate::store::Store;
use crate::timefmt;

/// Analog records are only kept for ports up to this position.
pub const MAX_ANALOG_POSITIONS: u32 = 10;

/// What one batch did, for worker logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub digital_appended: usize,
    pub analog_appended: usize,
    /// Readings dropped for a malformed timestamp.
    pub skipped_readings: usize,
}

pub async fn process_batch(
    device: &Device,
    readings: &[RawReading],
    digital_ports: &[DevicePort],
    analog_ports: &[DevicePort],
    store: &dyn Store,
    caches: &LatestValues,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for reading in readings {
        match reading.kind.as_str() {
            "digital" => {
                let at = match timefmt::parse_dense(&reading.datetime) {
                    Ok(at) => at,
                    Err(e) => {
                        error!("device {}: skipping digital reading: {e}", device.id);
                        outcome.skipped_readings += 1;
                        continue;
                    }
                };
                let value = reading.data as i64;
                for port in digital_ports {
                    let record = DigitalRecord {
                        id: 0,
                        port_id: port.id,
                        at,
                        value,
                    };
                    match store.append_digital(record).await {
                        Ok(()) => {
                            caches.record_digital(port.id, DigitalSample { at, value });
                            outcome.digital_appended += 1;
                        }
                        Err(e) => error!(
                            "device {}: digital append failed for port {}: {e}",
                            device.id, port.id
                        ),
                    }
                }
            }
            "analog" => {
                let at = match timefmt::parse_plain(&reading.datetime) {
                    Ok(at) => at,
                    Err(e) => {
                        error!("device {}: skipping analog reading: {e}", device.id);
                        outcome.skipped_readings += 1;
                        continue;
                    }
                };
                let value = reading.data;
                for port in analog_ports {
                    if port.position > MAX_ANALOG_POSITIONS {
                        continue;
                    }
                    let record = AnalogRecord {
                        id: 0,
                        port_id: port.id,
                        at,
                        value,
                    };
                    match store.append_analog(record).await {
                        Ok(()) => {
                            caches.record_analog(port.id, AnalogSample { at, value });
                            outcome.analog_appended += 1;
                        }
                        Err(e) => error!(
                            "device {}: analog append failed for port {}: {e}",
                            device.id, port.id
                        ),
                    }
                }
            }
            other => debug!(
                "device {}: ignoring reading of kind {other:?} for port {}",
                device.id, reading.port
            ),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortKind;
    use crate::store::JsonStore;
    use chrono::NaiveDate;

    fn device() -> Device {
        Device {
            id: 1,
            name: "line-1".into(),
            device_type_id: 1,
            activated: true,
        }
    }

    fn port(id: u32, kind: PortKind, position: u32) -> DevicePort {
        DevicePort {
            id,
            device_id: 1,
            kind,
            position,
            is_virtual: false,
        }
    }

    fn reading(kind: &str, datetime: &str, data: f64) -> RawReading {
        RawReading {
            kind: kind.into(),
            port: 1,
            datetime: datetime.into(),
            data,
        }
    }

    async fn open_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn digital_reading_fans_out_and_updates_cache() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let digital = vec![port(7, PortKind::Digital, 1), port(8, PortKind::Digital, 2)];

        let outcome = process_batch(
            &device(),
            &[reading("digital", "2023-5-10 14:30:00.500", 1.0)],
            &digital,
            &[],
            &store,
            &caches,
        )
        .await;

        assert_eq!(outcome.digital_appended, 2);
        assert_eq!(outcome.skipped_readings, 0);

        let expected_at = NaiveDate::from_ymd_opt(2023, 5, 10)
            .unwrap()
            .and_hms_milli_opt(14, 30, 0, 500)
            .unwrap();
        for port_id in [7, 8] {
            let sample = caches.digital(port_id).unwrap();
            assert_eq!(sample.at, expected_at);
            assert_eq!(sample.value, 1);
        }

        let mut latest = store.latest_digital_per_port().await.unwrap();
        latest.sort_by_key(|r| r.port_id);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].port_id, 7);
        assert_eq!(latest[0].at, expected_at);
        assert_eq!(latest[0].value, 1);
    }

    #[tokio::test]
    async fn analog_cap_excludes_high_positions() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let analog = vec![
            port(20, PortKind::Analog, 10),
            port(21, PortKind::Analog, 11),
        ];

        let outcome = process_batch(
            &device(),
            &[reading("analog", "2023-5-10 14:30:00", 20.5)],
            &[],
            &analog,
            &store,
            &caches,
        )
        .await;

        assert_eq!(outcome.analog_appended, 1);
        assert!(caches.analog(20).is_some());
        assert!(caches.analog(21).is_none());
        let latest = store.latest_analog_per_port().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].port_id, 20);
    }

    #[tokio::test]
    async fn malformed_timestamp_skips_only_that_reading() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let digital = vec![port(7, PortKind::Digital, 1)];

        let outcome = process_batch(
            &device(),
            &[
                reading("digital", "2023-5-10 14:30:00.500", 1.0),
                reading("digital", "not a timestamp", 0.0),
                reading("digital", "2023-5-10 14:30:01.000", 0.0),
            ],
            &digital,
            &[],
            &store,
            &caches,
        )
        .await;

        assert_eq!(outcome.digital_appended, 2);
        assert_eq!(outcome.skipped_readings, 1);
        // Last valid reading wins in the cache.
        assert_eq!(caches.digital(7).unwrap().value, 0);
    }

    #[tokio::test]
    async fn analog_timestamp_with_fraction_is_rejected() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let analog = vec![port(20, PortKind::Analog, 1)];

        let outcome = process_batch(
            &device(),
            &[reading("analog", "2023-5-10 14:30:00.500", 20.5)],
            &[],
            &analog,
            &store,
            &caches,
        )
        .await;

        assert_eq!(outcome.analog_appended, 0);
        assert_eq!(outcome.skipped_readings, 1);
    }

    #[tokio::test]
    async fn unknown_kind_is_ignored() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let digital = vec![port(7, PortKind::Digital, 1)];

        let outcome = process_batch(
            &device(),
            &[reading("thermal", "2023-5-10 14:30:00", 3.0)],
            &digital,
            &[],
            &store,
            &caches,
        )
        .await;

        assert_eq!(outcome, BatchOutcome::default());
        assert!(caches.digital(7).is_none());
    }

    #[tokio::test]
    async fn digital_value_is_truncated_to_integer() {
        let (_dir, store) = open_store().await;
        let caches = LatestValues::new();
        let digital = vec![port(7, PortKind::Digital, 1)];

        process_batch(
            &device(),
            &[reading("digital", "2023-5-10 14:30:00.000", 1.9)],
            &digital,
            &[],
            &store,
            &caches,
        )
        .await;

        assert_eq!(caches.digital(7).unwrap().value, 1);
    }
}
