//! Latest-value cache shared between the sensor feeds and the scheduler.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{Location, SensorReading, Vector3};

/// Holds the most recent reading of every sensor channel.
///
/// All channels sit behind one mutex, so a [`snapshot`](Self::snapshot) sees
/// each channel either entirely before or entirely after a concurrent update,
/// and the location flag is read and cleared in the same critical section.
#[derive(Debug, Default)]
pub struct SensorChannelCache {
    reading: Mutex<SensorReading>,
}

impl SensorChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn reading(&self) -> MutexGuard<'_, SensorReading> {
        // 写入都是单字段赋值，锁毒化不会留下撕裂的数据
        self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_acceleration(&self, x: f64, y: f64, z: f64) {
        self.reading().acceleration = Vector3::new(x, y, z);
    }

    pub fn update_rotation(&self, x: f64, y: f64, z: f64) {
        self.reading().rotation = Vector3::new(x, y, z);
    }

    pub fn update_compass(&self, x: f64, y: f64, z: f64) {
        self.reading().compass = Vector3::new(x, y, z);
    }

    /// Marks the location as changed even when the new fix equals the old one.
    pub fn update_location(&self, latitude: f64, longitude: f64, altitude: f64, floor: i32) {
        let mut reading = self.reading();
        reading.location = Location::new(latitude, longitude, altitude, floor);
        reading.location_changed = true;
    }

    /// Copies every channel and consumes the location-changed flag.
    pub fn snapshot(&self) -> SensorReading {
        let mut reading = self.reading();
        let copy = *reading;
        reading.location_changed = false;
        copy
    }

    /// Copies every channel without consuming the location-changed flag.
    pub fn peek(&self) -> SensorReading {
        *self.reading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_cache_is_zeroed() {
        let cache = SensorChannelCache::new();
        assert_eq!(cache.snapshot(), SensorReading::default());
    }

    #[test]
    fn test_updates_touch_only_their_channel() {
        let cache = SensorChannelCache::new();
        cache.update_acceleration(1.0, 2.0, 3.0);
        cache.update_compass(7.0, 8.0, 9.0);

        let snap = cache.snapshot();
        assert_eq!(snap.acceleration, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(snap.rotation, Vector3::default());
        assert_eq!(snap.compass, Vector3::new(7.0, 8.0, 9.0));
        assert!(!snap.location_changed);
    }

    #[test]
    fn test_location_flag_is_consumed_once() {
        let cache = SensorChannelCache::new();
        cache.update_location(1.0, 2.0, 3.0, 4);

        let first = cache.snapshot();
        assert!(first.location_changed);
        assert_eq!(first.location, Location::new(1.0, 2.0, 3.0, 4));

        let second = cache.snapshot();
        assert!(!second.location_changed);
        assert_eq!(second.location, Location::new(1.0, 2.0, 3.0, 4));
    }

    #[test]
    fn test_identical_location_still_sets_flag() {
        let cache = SensorChannelCache::new();
        cache.update_location(1.0, 2.0, 3.0, 4);
        cache.snapshot();
        cache.update_location(1.0, 2.0, 3.0, 4);

        assert!(cache.snapshot().location_changed);
    }

    #[test]
    fn test_update_after_snapshot_appears_in_next_snapshot() {
        let cache = SensorChannelCache::new();
        cache.update_rotation(0.5, 0.5, 0.5);
        let before = cache.snapshot();

        cache.update_rotation(1.5, 1.5, 1.5);
        let after = cache.snapshot();

        assert_eq!(before.rotation, Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(after.rotation, Vector3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_peek_keeps_flag() {
        let cache = SensorChannelCache::new();
        cache.update_location(5.0, 6.0, 7.0, 1);

        assert!(cache.peek().location_changed);
        assert!(cache.snapshot().location_changed);
        assert!(!cache.peek().location_changed);
    }

    #[test]
    fn test_concurrent_location_updates_never_double_report() {
        let cache = Arc::new(SensorChannelCache::new());
        let updates = 500;

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..updates {
                    cache.update_location(i as f64, 0.0, 0.0, 0);
                    cache.update_acceleration(i as f64, i as f64, i as f64);
                }
            })
        };

        let mut reported = 0;
        while !writer.is_finished() {
            if cache.snapshot().location_changed {
                reported += 1;
            }
        }
        writer.join().unwrap();
        if cache.snapshot().location_changed {
            reported += 1;
        }

        // 多次更新可能合并为一次报告，但不会超过更新次数
        assert!(reported >= 1);
        assert!(reported <= updates);
        assert!(!cache.snapshot().location_changed);
    }
}
