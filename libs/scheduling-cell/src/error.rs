// libs/scheduling-cell/src/error.rs
use thiserror::Error;

use provider_cell::DirectoryError;
use shared_models::error::AppError;

use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => SchedulingError::Conflict(msg),
            StoreError::NotFound(msg) => SchedulingError::NotFound(msg),
            StoreError::Closed(msg) => SchedulingError::Validation(msg),
            StoreError::Backend(msg) => SchedulingError::Storage(msg),
        }
    }
}

impl From<DirectoryError> for SchedulingError {
    fn from(err: DirectoryError) -> Self {
        SchedulingError::Storage(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::Conflict(msg) => AppError::Conflict(msg),
            SchedulingError::NotFound(msg) => AppError::NotFound(msg),
            SchedulingError::Forbidden(msg) => AppError::Forbidden(msg),
            SchedulingError::Storage(msg) => AppError::Database(msg),
        }
    }
}
