use crate::storage::StorageError;

use super::RequestStatus;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Request {0} not found")]
    NotFound(i64),
    #[error("Request {id} is already {status}")]
    AlreadyDecided { id: i64, status: RequestStatus },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
