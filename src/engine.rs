//! The telemetry engine: one cache, one store, one scheduler, one rate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::cache::SensorChannelCache;
use crate::config::{AppConfig, StorageBackend};
use crate::database::DatabaseStore;
use crate::export::{ExportError, Exporter};
use crate::rate::RateController;
use crate::scheduler::{SchedulerState, SnapshotScheduler};
use crate::store::{DataPointStore, MemoryStore, StoreError};
use crate::types::{SensorReading, TickOutcome};

/// Owns every engine component. Share it by reference or `Arc`; there is no
/// global instance.
pub struct TelemetryEngine {
    cache: Arc<SensorChannelCache>,
    store: Arc<dyn DataPointStore>,
    scheduler: Arc<SnapshotScheduler>,
    rate_controller: RateController,
    exporter: Exporter,
}

impl TelemetryEngine {
    /// Builds an engine around `store`. The scheduler stays stopped until the
    /// first [`set_rate`](Self::set_rate).
    pub fn new(store: Arc<dyn DataPointStore>, initial_rate: i64) -> Self {
        let cache = Arc::new(SensorChannelCache::new());
        let scheduler = Arc::new(SnapshotScheduler::new(Arc::clone(&cache), Arc::clone(&store)));
        Self::assemble(cache, store, scheduler, initial_rate)
    }

    /// Builds an engine from configuration, opens its store and starts the
    /// scheduler at the configured rate.
    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DataPointStore> = match config.database.backend {
            StorageBackend::Duckdb => Arc::new(DatabaseStore::open(&config.database)?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        info!("Using {:?} storage backend", config.database.backend);

        let engine = Self::new(store, config.sampling.rate);
        engine.set_logging_enabled(config.sampling.logging_enabled);
        engine.set_rate(config.sampling.rate);
        Ok(engine)
    }

    fn assemble(
        cache: Arc<SensorChannelCache>,
        store: Arc<dyn DataPointStore>,
        scheduler: Arc<SnapshotScheduler>,
        initial_rate: i64,
    ) -> Self {
        Self {
            rate_controller: RateController::new(Arc::clone(&scheduler), initial_rate),
            exporter: Exporter::new(Arc::clone(&store)),
            cache,
            store,
            scheduler,
        }
    }

    /// Handle for sensor feeds.
    pub fn cache(&self) -> Arc<SensorChannelCache> {
        Arc::clone(&self.cache)
    }

    pub fn update_acceleration(&self, x: f64, y: f64, z: f64) {
        self.cache.update_acceleration(x, y, z);
    }

    pub fn update_rotation(&self, x: f64, y: f64, z: f64) {
        self.cache.update_rotation(x, y, z);
    }

    pub fn update_compass(&self, x: f64, y: f64, z: f64) {
        self.cache.update_compass(x, y, z);
    }

    pub fn update_location(&self, latitude: f64, longitude: f64, altitude: f64, floor: i32) {
        self.cache.update_location(latitude, longitude, altitude, floor);
    }

    /// Current cache contents without consuming the location flag.
    pub fn current_reading(&self) -> SensorReading {
        self.cache.peek()
    }

    pub fn set_rate(&self, requested: i64) -> u32 {
        self.rate_controller.set_rate(requested)
    }

    pub fn rate(&self) -> u32 {
        self.rate_controller.rate()
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.scheduler.set_logging_enabled(enabled);
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.scheduler.is_logging_enabled()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn tick(&self) -> TickOutcome {
        self.scheduler.tick()
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.store.count()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        info!("Cleared all data points");
        Ok(())
    }

    /// Renders the store with the rate selected right now. Before the first
    /// [`set_rate`](Self::set_rate) that is the clamped initial rate.
    pub fn export(&self) -> Result<String, StoreError> {
        self.exporter.export(self.rate())
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, ExportError> {
        self.exporter.export_to_file(path, self.rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::manager::IN_MEMORY_PATH;

    #[test]
    fn test_new_engine_is_stopped_until_rate_set() {
        let engine = TelemetryEngine::new(Arc::new(MemoryStore::new()), 12);
        assert_eq!(engine.rate(), 12);
        assert_eq!(engine.scheduler_state(), SchedulerState::Stopped);

        engine.set_rate(12);
        assert_eq!(engine.scheduler_state(), SchedulerState::Running);
    }

    #[test]
    fn test_export_before_set_rate_declares_initial_rate() {
        let engine = TelemetryEngine::new(Arc::new(MemoryStore::new()), 45);
        assert_eq!(engine.scheduler_state(), SchedulerState::Stopped);
        assert_eq!(engine.rate(), 30);

        let text = engine.export().unwrap();
        assert_eq!(text.lines().nth(2), Some("30 samples per second"));
    }

    #[test]
    fn test_from_config_with_memory_backend() {
        let mut config = AppConfig::default();
        config.database.backend = StorageBackend::Memory;
        config.sampling.rate = 99;

        let engine = TelemetryEngine::from_config(&config).unwrap();
        assert_eq!(engine.rate(), 30);
        assert!(!engine.is_logging_enabled());
        assert_eq!(engine.count().unwrap(), 0);
    }

    #[test]
    fn test_from_config_with_in_memory_duckdb() {
        let mut config = AppConfig::default();
        config.database.path = IN_MEMORY_PATH.to_string();

        let engine = TelemetryEngine::from_config(&config).unwrap();
        engine.set_logging_enabled(true);
        engine.update_acceleration(1.0, 2.0, 3.0);
        assert!(engine.tick().is_appended());
        assert!(engine.count().unwrap() >= 1);
    }

    #[test]
    fn test_current_reading_does_not_consume_location() {
        let engine = TelemetryEngine::new(Arc::new(MemoryStore::new()), 1);
        engine.update_location(1.0, 2.0, 3.0, 4);
        assert!(engine.current_reading().location_changed);

        engine.set_logging_enabled(true);
        let outcome = engine.tick();
        assert_eq!(outcome.data_point().map(|p| p.location_changed), Some(true));
    }
}
