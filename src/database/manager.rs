use std::fs;
use std::path::Path;

use duckdb::{Connection, Result as DuckResult};
use log::{error, info};

use super::schema::DatabaseSchema;
use crate::config::DatabaseConfig;
use crate::types::{DataPoint, Location, Vector3};

/// Path value that selects a transient in-memory DuckDB database.
pub const IN_MEMORY_PATH: &str = ":memory:";

pub struct DatabaseManager {
    conn: Connection,
}

impl DatabaseManager {
    pub fn open(config: &DatabaseConfig) -> DuckResult<Self> {
        if config.path == IN_MEMORY_PATH {
            return Self::open_in_memory();
        }

        let db_path = Path::new(&config.path);
        if config.auto_create_dir {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create data directory {}: {}", parent.display(), e);
                }
            }
        }

        let conn = Connection::open(db_path)?;
        info!("Database connection established at: {}", db_path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> DuckResult<Self> {
        let conn = Connection::open_in_memory()?;
        info!("In-memory database connection established");
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DuckResult<Self> {
        DatabaseSchema::create_tables(&conn)?;
        Ok(DatabaseManager { conn })
    }

    pub fn insert_data_point(&self, point: &DataPoint) -> DuckResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO data_points (
                timestamp_ms, acc_x, acc_y, acc_z, rot_x, rot_y, rot_z,
                compass_x, compass_y, compass_z,
                latitude, longitude, altitude, floor, location_changed
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;

        stmt.execute(duckdb::params![
            point.timestamp,
            point.acceleration.x,
            point.acceleration.y,
            point.acceleration.z,
            point.rotation.x,
            point.rotation.y,
            point.rotation.z,
            point.compass.x,
            point.compass.y,
            point.compass.z,
            point.location.latitude,
            point.location.longitude,
            point.location.altitude,
            point.location.floor,
            point.location_changed,
        ])?;
        Ok(())
    }

    pub fn count_data_points(&self) -> DuckResult<usize> {
        self.conn.query_row("SELECT COUNT(*) FROM data_points", [], |row| {
            Ok(row.get::<_, i64>(0)? as usize)
        })
    }

    pub fn load_data_points(&self) -> DuckResult<Vec<DataPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp_ms, acc_x, acc_y, acc_z, rot_x, rot_y, rot_z,
                    compass_x, compass_y, compass_z,
                    latitude, longitude, altitude, floor, location_changed
             FROM data_points
             ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DataPoint {
                timestamp: row.get(0)?,
                acceleration: Vector3::new(row.get(1)?, row.get(2)?, row.get(3)?),
                rotation: Vector3::new(row.get(4)?, row.get(5)?, row.get(6)?),
                compass: Vector3::new(row.get(7)?, row.get(8)?, row.get(9)?),
                location: Location::new(row.get(10)?, row.get(11)?, row.get(12)?, row.get(13)?),
                location_changed: row.get(14)?,
            })
        })?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    pub fn delete_all(&self) -> DuckResult<usize> {
        let deleted = self.conn.execute("DELETE FROM data_points", [])?;
        info!("Deleted {} data points", deleted);
        Ok(deleted)
    }
}
