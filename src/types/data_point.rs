use super::{Location, SensorReading, Vector3};

/// One logged record. Never mutated after the scheduler creates it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataPoint {
    pub timestamp: i64,
    pub acceleration: Vector3,
    pub rotation: Vector3,
    pub compass: Vector3,
    pub location: Location,
    pub location_changed: bool,
}

impl DataPoint {
    pub fn from_reading(reading: SensorReading, timestamp: i64) -> Self {
        Self {
            timestamp,
            acceleration: reading.acceleration,
            rotation: reading.rotation,
            compass: reading.compass,
            location: reading.location,
            location_changed: reading.location_changed,
        }
    }
}
