//! Sensor telemetry acquisition: a latest-value cache fed by independent
//! sensor streams, a periodic snapshot scheduler, an append-only record store
//! and a plain-text exporter.

pub mod cache;
pub mod config;
pub mod control;
pub mod database;
pub mod engine;
pub mod export;
pub mod feed;
pub mod logger;
pub mod rate;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod utils;

pub use cache::SensorChannelCache;
pub use engine::TelemetryEngine;
pub use export::{parse_export, ExportError, Exporter, ParsedExport};
pub use rate::RateController;
pub use scheduler::{SchedulerState, SnapshotScheduler};
pub use store::{DataPointStore, MemoryStore, StoreError};
pub use types::{DataPoint, Location, SensorReading, TickOutcome, Vector3};
