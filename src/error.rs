// Error module for types shared by the library and the CLI driver

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    /// The photo library refused access; nothing can load until access is granted
    #[error("Photo library unavailable: {0}")]
    AdapterUnavailable(String),

    /// A single thumbnail could not be produced
    #[error("Thumbnail unavailable: {0}")]
    ThumbnailUnavailable(String),

    /// The batch delete failed; the queue is left as it was
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("A delete is already in progress")]
    CommitBusy,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;
