use serde::Deserialize;

/// Three-axis reading shared by the acceleration, rotation and compass channels.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Position fix reported by the location/floor source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub floor: i32,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, altitude: f64, floor: i32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            floor,
        }
    }
}

/// Latest value of every sensor channel plus the consume-once location flag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorReading {
    pub acceleration: Vector3,
    pub rotation: Vector3,
    pub compass: Vector3,
    pub location: Location,
    pub location_changed: bool,
}
