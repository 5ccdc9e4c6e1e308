use crate::{storage::StorageError, transport::TransportError};

use super::request::RequestError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Request error: {0}")]
    Request(#[from] RequestError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Other error: {0}")]
    Other(String),
}
