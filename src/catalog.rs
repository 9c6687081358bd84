// Catalog module for photo library adapters behind the AssetCatalog trait

use crate::domain::{AuthorizationState, CandidateFilter, MediaItem};
use crate::error::Result;
use crate::preview::{Thumbnail, ThumbnailSize};
use async_trait::async_trait;
use tokio::sync::mpsc;

mod directory;
mod memory;

pub use directory::{DirectoryCatalog, DEFAULT_SCREENSHOT_PATTERNS};
pub use memory::MemoryCatalog;

/// One result delivered for a thumbnail request.
///
/// A catalog may send a quick degraded preview before the final image, only
/// one of the two, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailDelivery {
    Degraded(Thumbnail),
    Final(Thumbnail),
    Failed(String),
}

#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Current access to the library, without prompting
    fn authorization(&self) -> AuthorizationState;

    /// Asks for access if it has not been decided yet
    async fn request_authorization(&self) -> AuthorizationState;

    /// Items matching `filter`, newest first, at most `limit` of them.
    ///
    /// Fails with `AdapterUnavailable` when access has not been granted.
    async fn list_candidates(
        &self,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>>;

    /// Starts producing a thumbnail for `item`.
    ///
    /// Dropping the receiver cancels the request; senders must treat a closed
    /// channel as the signal to stop work.
    fn request_thumbnail(
        &self,
        item: &MediaItem,
        target: ThumbnailSize,
    ) -> mpsc::Receiver<ThumbnailDelivery>;

    /// Best-effort size of the item in bytes, zero when unknown
    fn estimated_size(&self, item: &MediaItem) -> u64;

    /// Deletes every item in one operation, so the user confirms at most once
    async fn batch_delete(&self, items: &[MediaItem]) -> Result<()>;
}
