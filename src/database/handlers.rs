use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

use super::manager::DatabaseManager;
use crate::store::StoreError;
use crate::types::DatabaseTask;

/// Serves [`DatabaseTask`]s until the channel disconnects or shutdown is signalled.
///
/// The handler thread is the only owner of the DuckDB connection, so tasks are
/// executed strictly one after another.
pub fn run_database_handler(
    db_manager: DatabaseManager,
    task_receiver: Receiver<DatabaseTask>,
    shutdown_signal: Arc<AtomicBool>,
) {
    info!("Database handler thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => handle_task(&db_manager, task),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Database handler: Task channel disconnected, exiting");
                break;
            }
        }
    }

    info!("Database handler thread exiting gracefully");
}

fn handle_task(db_manager: &DatabaseManager, task: DatabaseTask) {
    match task {
        DatabaseTask::Append {
            data_point,
            response_sender,
        } => {
            let result = db_manager.insert_data_point(&data_point).map_err(|e| {
                error!("Database handler: Failed to append data point: {}", e);
                StoreError::Write(e.to_string())
            });
            if response_sender.send(result).is_err() {
                debug!("Database handler: Append requester went away");
            }
        }
        DatabaseTask::Count { response_sender } => {
            let result = db_manager
                .count_data_points()
                .map_err(|e| StoreError::Read(e.to_string()));
            if let Err(e) = response_sender.send(result) {
                warn!("Database handler: Failed to send count: {}", e);
            }
        }
        DatabaseTask::LoadAll { response_sender } => {
            let result = db_manager
                .load_data_points()
                .map_err(|e| StoreError::Read(e.to_string()));
            if let Err(e) = response_sender.send(result) {
                warn!("Database handler: Failed to send data points: {}", e);
            }
        }
        DatabaseTask::Clear { response_sender } => {
            let result = db_manager
                .delete_all()
                .map_err(|e| StoreError::Write(e.to_string()));
            if let Err(e) = response_sender.send(result) {
                warn!("Database handler: Failed to send clear result: {}", e);
            }
        }
    }
}
