pub mod data_point;
pub mod reading;
pub mod results;
pub mod tasks;

pub use data_point::DataPoint;
pub use reading::{Location, SensorReading, Vector3};
pub use results::TickOutcome;
pub use tasks::DatabaseTask;
