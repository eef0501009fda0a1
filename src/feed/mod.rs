//! Sensor input feeds. Each feed pushes readings into the cache through the
//! four `update_*` calls and knows nothing about scheduling or storage.

pub mod mqtt;
pub mod simulated;

pub use mqtt::MqttFeed;
pub use simulated::SimulatedFeed;

use serde::Deserialize;

use crate::cache::SensorChannelCache;
use crate::types::{Location, Vector3};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Missing environment variable {0}")]
    MissingCredential(&'static str),
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("Feed thread error: {0}")]
    Thread(String),
    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// Channel a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    Acceleration,
    Rotation,
    Compass,
    Location,
}

/// One reading received from a feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorUpdate {
    Acceleration(Vector3),
    Rotation(Vector3),
    Compass(Vector3),
    Location(Location),
}

#[derive(Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: f64,
    #[serde(default)]
    floor: i32,
}

impl SensorUpdate {
    /// Decodes a JSON payload for `channel`.
    pub fn parse(channel: SensorChannel, payload: &[u8]) -> Result<Self, FeedError> {
        let payload_str = std::str::from_utf8(payload)
            .map_err(|e| FeedError::Payload(format!("Invalid UTF-8: {}", e)))?;
        let json_error = |e: serde_json::Error| FeedError::Payload(format!("JSON parsing error: {}", e));

        Ok(match channel {
            SensorChannel::Acceleration => {
                SensorUpdate::Acceleration(serde_json::from_str(payload_str).map_err(json_error)?)
            }
            SensorChannel::Rotation => {
                SensorUpdate::Rotation(serde_json::from_str(payload_str).map_err(json_error)?)
            }
            SensorChannel::Compass => {
                SensorUpdate::Compass(serde_json::from_str(payload_str).map_err(json_error)?)
            }
            SensorChannel::Location => {
                let p: LocationPayload = serde_json::from_str(payload_str).map_err(json_error)?;
                SensorUpdate::Location(Location::new(p.latitude, p.longitude, p.altitude, p.floor))
            }
        })
    }

    pub fn apply(&self, cache: &SensorChannelCache) {
        match *self {
            SensorUpdate::Acceleration(v) => cache.update_acceleration(v.x, v.y, v.z),
            SensorUpdate::Rotation(v) => cache.update_rotation(v.x, v.y, v.z),
            SensorUpdate::Compass(v) => cache.update_compass(v.x, v.y, v.z),
            SensorUpdate::Location(l) => {
                cache.update_location(l.latitude, l.longitude, l.altitude, l.floor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_payload() {
        let update = SensorUpdate::parse(
            SensorChannel::Rotation,
            br#"{"x": 0.5, "y": -1.0, "z": 2}"#,
        )
        .unwrap();
        assert_eq!(update, SensorUpdate::Rotation(Vector3::new(0.5, -1.0, 2.0)));
    }

    #[test]
    fn test_parse_location_payload_with_defaults() {
        let update = SensorUpdate::parse(
            SensorChannel::Location,
            br#"{"latitude": 40.7, "longitude": -74.0}"#,
        )
        .unwrap();
        assert_eq!(update, SensorUpdate::Location(Location::new(40.7, -74.0, 0.0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            SensorUpdate::parse(SensorChannel::Compass, b"{\"x\": 1}"),
            Err(FeedError::Payload(_))
        ));
        assert!(matches!(
            SensorUpdate::parse(SensorChannel::Acceleration, &[0xff, 0xfe]),
            Err(FeedError::Payload(_))
        ));
    }

    #[test]
    fn test_apply_routes_to_channel() {
        let cache = SensorChannelCache::new();
        SensorUpdate::Compass(Vector3::new(1.0, 2.0, 3.0)).apply(&cache);
        SensorUpdate::Location(Location::new(1.0, 2.0, 3.0, 4)).apply(&cache);

        let reading = cache.snapshot();
        assert_eq!(reading.compass, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(reading.acceleration, Vector3::default());
        assert!(reading.location_changed);
    }
}
