//! In-memory latest-value caches.
//!
//! Two independent maps, one per signal kind, each behind its own
//! reader/writer lock so lookups from other tasks never contend with each
//! other. Entries are replaced as a unit: a reader sees either the previous
//! sample or the new one, never a mix. Writes are last-write-wins with
//! no timestamp comparison, so a late reading may overwrite a newer entry.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use parking_lot::RwLock;

use crate::models::{AnalogRecord, DigitalRecord};

/// Most recent digital observation for one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitalSample {
    pub at: NaiveDateTime,
    pub value: i64,
}

/// Most recent analog observation for one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogSample {
    pub at: NaiveDateTime,
    pub value: f64,
}

#[derive(Default)]
pub struct LatestValues {
    digital: RwLock<HashMap<u32, DigitalSample>>,
    analog: RwLock<HashMap<u32, AnalogSample>>,
}

impl LatestValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load from the store's latest-row-per-port query. Startup only.
    pub fn seed_digital(&self, records: &[DigitalRecord]) {
        let mut map = self.digital.write();
        for record in records {
            map.insert(
                record.port_id,
                DigitalSample {
                    at: record.at,
                    value: record.value,
                },
            );
        }
    }

    pub fn seed_analog(&self, records: &[AnalogRecord]) {
        let mut map = self.analog.write();
        for record in records {
            map.insert(
                record.port_id,
                AnalogSample {
                    at: record.at,
                    value: record.value,
                },
            );
        }
    }

    pub fn record_digital(&self, port_id: u32, sample: DigitalSample) {
        self.digital.write().insert(port_id, sample);
    }

    pub fn record_analog(&self, port_id: u32, sample: AnalogSample) {
        self.analog.write().insert(port_id, sample);
    }

    pub fn digital(&self, port_id: u32) -> Option<DigitalSample> {
        self.digital.read().get(&port_id).copied()
    }

    pub fn analog(&self, port_id: u32) -> Option<AnalogSample> {
        self.analog.read().get(&port_id).copied()
    }

    pub fn digital_len(&self) -> usize {
        self.digital.read().len()
    }

    pub fn analog_len(&self) -> usize {
        self.analog.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 10)
            .unwrap()
            .and_hms_opt(14, minute, 0)
            .unwrap()
    }

    #[test]
    fn seed_loads_every_port() {
        let cache = LatestValues::new();
        cache.seed_digital(&[
            DigitalRecord { id: 1, port_id: 7, at: at(0), value: 1 },
            DigitalRecord { id: 2, port_id: 8, at: at(1), value: 0 },
        ]);
        assert_eq!(cache.digital_len(), 2);
        assert_eq!(cache.digital(7).unwrap().value, 1);
        assert_eq!(cache.digital(8).unwrap().value, 0);
    }

    #[test]
    fn record_replaces_unconditionally() {
        let cache = LatestValues::new();
        cache.record_analog(3, AnalogSample { at: at(5), value: 20.5 });
        // An older timestamp still wins: the cache does not order writes.
        cache.record_analog(3, AnalogSample { at: at(1), value: 19.0 });
        let sample = cache.analog(3).unwrap();
        assert_eq!(sample.at, at(1));
        assert_eq!(sample.value, 19.0);
    }

    #[test]
    fn absent_port_reads_none() {
        let cache = LatestValues::new();
        assert!(cache.digital(42).is_none());
        assert!(cache.analog(42).is_none());
    }

    #[test]
    fn kinds_are_independent() {
        let cache = LatestValues::new();
        cache.record_digital(5, DigitalSample { at: at(0), value: 1 });
        assert!(cache.analog(5).is_none());
        assert_eq!(cache.analog_len(), 0);
        assert_eq!(cache.digital_len(), 1);
    }
}
