//! PortPulse Collector - JSON feed ingestion daemon
//!
//! Long-running service that unwraps per-device JSON readings and saves them
//! into the store:
//! - license-gated device admission (signed token caps the fleet size)
//! - fixed-interval polling with one worker per active device
//! - digital/analog classification with per-port fan-out
//! - in-memory latest-value cache per port, seeded from the store at startup
//!
//! The binary wires a [`store::JsonStore`] and [`feed::JsonFileFeed`] into a
//! [`state::CollectorState`] and runs [`scheduler::run`] forever; in-process
//! consumers read current port values through [`cache::LatestValues`].

pub mod cache;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod license;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod timefmt;
pub mod worker;
