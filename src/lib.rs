//! Shotswp - screenshot triage library
//!
//! This crate provides the deletion queue, triage cursor and thumbnail
//! loading behind the `shotswp` tool, independent of any particular photo
//! library API.

pub mod async_preview;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod preview;
pub mod session;

// Re-export primary types for convenience
pub use async_preview::{ThumbnailLoader, ThumbnailState};
pub use catalog::{AssetCatalog, DirectoryCatalog, MemoryCatalog, ThumbnailDelivery};
pub use config::UserConfig;
pub use domain::{
    AuthorizationState, CandidateFilter, CommitOutcome, Decision, DeletionQueue,
    DeletionQueueManager, MediaId, MediaItem, TriageCursor, TriageStatistics,
};
pub use error::{Result, SweepError};
pub use preview::{Thumbnail, ThumbnailSize};
pub use session::{SessionOptions, TriageSession};
