use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct DatabaseSchema;

impl DatabaseSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        let existed = Self::check_table_exists(conn, "data_points")?;

        // id 序列保证追加顺序
        conn.execute("CREATE SEQUENCE IF NOT EXISTS data_points_seq", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS data_points (
                id BIGINT PRIMARY KEY DEFAULT nextval('data_points_seq'),
                timestamp_ms BIGINT NOT NULL,
                acc_x DOUBLE,
                acc_y DOUBLE,
                acc_z DOUBLE,
                rot_x DOUBLE,
                rot_y DOUBLE,
                rot_z DOUBLE,
                compass_x DOUBLE,
                compass_y DOUBLE,
                compass_z DOUBLE,
                latitude DOUBLE,
                longitude DOUBLE,
                altitude DOUBLE,
                floor INTEGER,
                location_changed BOOLEAN DEFAULT FALSE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        if existed {
            info!("Reusing existing data_points table");
        } else {
            info!("Created data_points table");
        }
        Ok(())
    }

    fn check_table_exists(conn: &Connection, table_name: &str) -> DuckResult<bool> {
        conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [table_name],
            |row| Ok(row.get::<_, i64>(0)? > 0),
        )
    }
}
