use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceType {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Device {
    pub id: u32,
    pub name: String,
    pub device_type_id: u32,
    pub activated: bool,
}

/// Signal kind of a port, also the discriminator used in store files.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Digital,
    Analog,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DevicePort {
    pub id: u32,
    pub device_id: u32,
    pub kind: PortKind,
    /// Physical position on the device; only meaningful for the analog cap.
    pub position: u32,
    /// Virtual ports are derived values and never ingested.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

/// One element of the feed's JSON array, exactly as it arrives on the wire.
///
/// `datetime` stays textual here: its layout depends on `kind` and parsing
/// failures must be handled per reading, not at deserialization time.
#[derive(Debug, Deserialize, Clone)]
pub struct RawReading {
    #[serde(rename = "type")]
    pub kind: String,
    pub port: u32,
    pub datetime: String,
    pub data: f64,
}

/// Persisted digital observation. Append-only; `id` is assigned by the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DigitalRecord {
    pub id: u64,
    pub port_id: u32,
    pub at: NaiveDateTime,
    pub value: i64,
}

/// Persisted analog observation. Append-only; `id` is assigned by the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalogRecord {
    pub id: u64,
    pub port_id: u32,
    pub at: NaiveDateTime,
    pub value: f64,
}

/// Named configuration row (customer name, license token, version stamp).
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Setting {
    pub name: String,
    pub value: String,
    pub note: String,
}

impl Setting {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}
