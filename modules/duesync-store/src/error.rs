use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),
}
