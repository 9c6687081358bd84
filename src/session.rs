// Session module wiring catalog, deletion queue, cursor and thumbnails together

use crate::async_preview::{ThumbnailLoader, ThumbnailState, CACHE_SIZE, DEFAULT_THUMBNAIL_WAIT};
use crate::catalog::AssetCatalog;
use crate::config::{DEFAULT_CANDIDATE_LIMIT, DEFAULT_THUMBNAIL_SIZE};
use crate::domain::{
    AuthorizationState, CandidateFilter, CommitOutcome, Decision, DeletionQueueManager, MediaId,
    MediaItem, TriageCursor, TriageStatistics,
};
use crate::error::{Result, SweepError};
use crate::preview::ThumbnailSize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub filter: CandidateFilter,
    pub candidate_limit: usize,
    pub thumbnail_size: ThumbnailSize,
    pub thumbnail_wait: Duration,
    pub thumbnail_cache_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            filter: CandidateFilter::Screenshots,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            thumbnail_size: ThumbnailSize::square(DEFAULT_THUMBNAIL_SIZE),
            thumbnail_wait: DEFAULT_THUMBNAIL_WAIT,
            thumbnail_cache_size: CACHE_SIZE,
        }
    }
}

pub struct TriageSession<C: ?Sized> {
    catalog: Arc<C>,
    queue: Arc<DeletionQueueManager<C>>,
    cursor: TriageCursor,
    thumbnails: ThumbnailLoader<C>,
    options: SessionOptions,
    authorization: AuthorizationState,
    kept: usize,
}

impl<C: AssetCatalog + ?Sized + 'static> TriageSession<C> {
    pub fn new(catalog: Arc<C>, options: SessionOptions) -> Self {
        let thumbnails = ThumbnailLoader::with_options(
            Arc::clone(&catalog),
            options.thumbnail_wait,
            options.thumbnail_cache_size,
        );
        Self {
            queue: Arc::new(DeletionQueueManager::new(Arc::clone(&catalog))),
            authorization: catalog.authorization(),
            catalog,
            cursor: TriageCursor::default(),
            thumbnails,
            options,
            kept: 0,
        }
    }

    /// Resolves library access, prompting if it is undecided, then loads candidates.
    ///
    /// Returns the number of candidates loaded.
    pub async fn start(&mut self) -> Result<usize> {
        let mut state = self.catalog.authorization();
        if state == AuthorizationState::NotDetermined {
            state = self.catalog.request_authorization().await;
        }
        self.authorization = state;

        if !state.grants_access() {
            warn!(?state, "Photo library access not granted");
            return Err(SweepError::AdapterUnavailable(format!(
                "Photo library access is {:?}",
                state
            )));
        }

        self.reload().await
    }

    /// Fetches a fresh candidate list and rewinds the cursor
    pub async fn reload(&mut self) -> Result<usize> {
        let candidates = self
            .catalog
            .list_candidates(self.options.filter, self.options.candidate_limit)
            .await?;
        let count = candidates.len();

        self.cursor.reset(candidates);
        self.kept = 0;

        info!(count, "Loaded candidates");
        Ok(count)
    }

    pub fn authorization(&self) -> AuthorizationState {
        self.authorization
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.cursor.current()
    }

    pub fn peek_next(&self) -> Option<&MediaItem> {
        self.cursor.peek_next()
    }

    pub fn cursor(&self) -> &TriageCursor {
        &self.cursor
    }

    pub fn has_more(&self) -> bool {
        !self.cursor.is_exhausted()
    }

    /// Applies a decision to the current candidate and moves to the next one
    pub fn decide(&mut self, decision: Decision) -> Option<MediaItem> {
        let decided = self.cursor.decide(decision, &*self.queue)?;
        if decision == Decision::Keep {
            self.kept += 1;
        }
        Some(decided)
    }

    pub fn queue(&self) -> &Arc<DeletionQueueManager<C>> {
        &self.queue
    }

    pub fn unqueue(&self, id: &MediaId) -> Option<MediaItem> {
        self.queue.dequeue(id)
    }

    pub fn clear_queue(&self) {
        self.queue.clear();
    }

    /// Deletes the queue in one batch, then reloads so deleted items are not
    /// offered again. A failed delete leaves queue and cursor as they were.
    ///
    /// Once the delete went through the outcome is always returned; if the
    /// reload fails the deleted items are dropped from the current candidates.
    pub async fn clean(&mut self) -> Result<CommitOutcome> {
        let committed: Vec<MediaId> = self.queue.items().into_iter().map(|i| i.id).collect();
        let outcome = self.queue.commit().await?;

        if let CommitOutcome::Deleted { .. } = outcome {
            self.thumbnails.evict(&committed).await;
            if let Err(e) = self.reload().await {
                warn!(error = %e, "Reload after delete failed, keeping current candidates");
                self.cursor.discard(&committed);
            }
        }

        Ok(outcome)
    }

    pub async fn thumbnail(&self, item: &MediaItem) -> ThumbnailState {
        self.thumbnails.load(item, self.options.thumbnail_size).await
    }

    /// Starts loading the next candidate's thumbnail in the background
    pub fn prefetch_next(&self) {
        if let Some(next) = self.cursor.peek_next() {
            self.thumbnails.prefetch(next, self.options.thumbnail_size);
        }
    }

    pub fn thumbnails(&self) -> &ThumbnailLoader<C> {
        &self.thumbnails
    }

    pub fn statistics(&self) -> TriageStatistics {
        let queue = self.queue.snapshot();
        TriageStatistics {
            total: self.cursor.len(),
            reviewed: self.cursor.position(),
            kept: self.kept,
            queued: queue.len(),
            queued_bytes: queue.queued_bytes(),
        }
    }
}
