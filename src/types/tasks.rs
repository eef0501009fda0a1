use crossbeam_channel::Sender;

use super::DataPoint;
use crate::store::StoreError;

/// Requests served by the database handler thread.
///
/// Every variant carries its own response channel; the caller blocks on the
/// matching receiver until the handler has finished with the request.
#[derive(Debug, Clone)]
pub enum DatabaseTask {
    Append {
        data_point: DataPoint,
        response_sender: Sender<Result<(), StoreError>>,
    },
    Count {
        response_sender: Sender<Result<usize, StoreError>>,
    },
    LoadAll {
        response_sender: Sender<Result<Vec<DataPoint>, StoreError>>,
    },
    Clear {
        response_sender: Sender<Result<usize, StoreError>>,
    },
}
