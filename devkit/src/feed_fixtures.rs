/*!
Constructeurs de flux JSON pour les tests du collecteur.

Produit des tableaux de lectures au format du flux réel:
`[{"type": "digital", "port": 1, "datetime": "...", "data": 1}, ...]`
*/

use chrono::NaiveDateTime;
use serde_json::{json, Value};

/// Builds a feed payload reading by reading.
#[derive(Debug, Default)]
pub struct FeedBuilder {
    readings: Vec<Value>,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digital reading; `datetime` uses the dense layout with milliseconds.
    pub fn digital(self, port: u32, datetime: &str, data: f64) -> Self {
        self.reading("digital", port, datetime, data)
    }

    /// Analog reading; `datetime` uses the fraction-free layout.
    pub fn analog(self, port: u32, datetime: &str, data: f64) -> Self {
        self.reading("analog", port, datetime, data)
    }

    /// Arbitrary kind, for exercising the unknown-kind path.
    pub fn reading(mut self, kind: &str, port: u32, datetime: &str, data: f64) -> Self {
        self.readings.push(json!({
            "type": kind,
            "port": port,
            "datetime": datetime,
            "data": data,
        }));
        self
    }

    pub fn build(self) -> Value {
        Value::Array(self.readings)
    }
}

/// Formats a timestamp the way digital readings carry it.
pub fn dense_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Formats a timestamp the way analog readings carry it.
pub fn plain_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
