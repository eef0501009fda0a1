use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};

use super::handlers::run_database_handler;
use super::manager::DatabaseManager;
use crate::config::DatabaseConfig;
use crate::store::{DataPointStore, StoreError};
use crate::types::{DataPoint, DatabaseTask};

/// DuckDB-backed [`DataPointStore`].
///
/// The connection lives on a dedicated handler thread. Each operation sends a
/// [`DatabaseTask`] and blocks on its private response channel.
pub struct DatabaseStore {
    task_sender: Sender<DatabaseTask>,
    shutdown_signal: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DatabaseStore {
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let (task_sender, task_receiver) = bounded(config.channel_capacity);
        let (init_sender, init_receiver) = bounded(1);
        let shutdown_signal = Arc::new(AtomicBool::new(false));

        let handler_config = config.clone();
        let handler_shutdown = Arc::clone(&shutdown_signal);
        let handle = thread::Builder::new()
            .name("database-handler".into())
            .spawn(move || {
                // 在处理线程中创建数据库连接
                let db_manager = match DatabaseManager::open(&handler_config) {
                    Ok(db) => {
                        let _ = init_sender.send(Ok(()));
                        db
                    }
                    Err(e) => {
                        error!("Database handler thread: Failed to initialize DuckDB: {}", e);
                        let _ = init_sender.send(Err(StoreError::Open(e.to_string())));
                        return;
                    }
                };
                run_database_handler(db_manager, task_receiver, handler_shutdown);
            })
            .map_err(|e| StoreError::Open(e.to_string()))?;

        init_receiver
            .recv()
            .map_err(|_| StoreError::Disconnected)??;

        info!("Database store ready at: {}", config.path);
        Ok(Self {
            task_sender,
            shutdown_signal,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn request<T>(
        &self,
        build: impl FnOnce(Sender<Result<T, StoreError>>) -> DatabaseTask,
    ) -> Result<T, StoreError> {
        let (response_sender, response_receiver) = bounded(1);
        self.task_sender
            .send(build(response_sender))
            .map_err(|_| StoreError::Disconnected)?;
        response_receiver
            .recv()
            .map_err(|_| StoreError::Disconnected)?
    }
}

impl DataPointStore for DatabaseStore {
    fn append(&self, data_point: &DataPoint) -> Result<(), StoreError> {
        self.request(|response_sender| DatabaseTask::Append {
            data_point: *data_point,
            response_sender,
        })
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.request(|response_sender| DatabaseTask::Count { response_sender })
    }

    fn all(&self) -> Result<Vec<DataPoint>, StoreError> {
        self.request(|response_sender| DatabaseTask::LoadAll { response_sender })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.request(|response_sender| DatabaseTask::Clear { response_sender })
            .map(|_| ())
    }
}

impl Drop for DatabaseStore {
    fn drop(&mut self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        let handle = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Database handler thread panicked");
            }
        }
    }
}
