use thiserror::Error;

/// Rule-engine errors.
///
/// `Validation`, `NotFound` and `Conflict` are business rejections the caller can act
/// on. `Storage` is an internal failure and should be reported without detail.
#[derive(Debug, Error)]
pub enum RentalError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl RentalError {
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} does not exist", id))
    }
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique or referential constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

// Constraint violations caught by the store (e.g. two requests racing on the same
// plate number) surface as the same business errors the engines raise themselves.
impl From<StorageError> for RentalError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => Self::NotFound(message),
            StorageError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other),
        }
    }
}

pub type RentalResult<T> = Result<T, RentalError>;
