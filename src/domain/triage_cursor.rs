// Triage cursor walking forward through the candidates

use super::{Decision, DeletionQueueManager, MediaId, MediaItem};
use crate::catalog::AssetCatalog;

/// Position within the ordered candidate list.
///
/// The cursor only moves forward; `reset` is the one way back to the start.
#[derive(Debug, Clone, Default)]
pub struct TriageCursor {
    candidates: Vec<MediaItem>,
    position: usize,
}

impl TriageCursor {
    pub fn new(candidates: Vec<MediaItem>) -> Self {
        Self {
            candidates,
            position: 0,
        }
    }

    /// Applies a decision to the current candidate and advances by one.
    ///
    /// A delete decision queues the item before the cursor moves, so the
    /// cursor is never ahead of an unqueued delete. Returns the decided item,
    /// or `None` once every candidate has been reviewed.
    pub fn decide<C>(
        &mut self,
        decision: Decision,
        queue: &DeletionQueueManager<C>,
    ) -> Option<MediaItem>
    where
        C: AssetCatalog + ?Sized,
    {
        let item = self.current()?.clone();

        if decision == Decision::Delete {
            queue.enqueue(item.clone());
        }

        self.position = (self.position + 1).min(self.candidates.len());
        Some(item)
    }

    /// Drops the given items from the candidates, keeping the cursor on the
    /// same undecided item
    pub fn discard(&mut self, ids: &[MediaId]) {
        let before = self.candidates[..self.position]
            .iter()
            .filter(|item| ids.contains(&item.id))
            .count();
        self.candidates.retain(|item| !ids.contains(&item.id));
        self.position = (self.position - before).min(self.candidates.len());
    }

    /// Replaces the candidates and rewinds to the first one
    pub fn reset(&mut self, candidates: Vec<MediaItem>) {
        self.candidates = candidates;
        self.position = 0;
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.candidates.get(self.position)
    }

    /// The candidate after the current one, for prefetching
    pub fn peek_next(&self) -> Option<&MediaItem> {
        self.candidates.get(self.position + 1)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position == self.candidates.len()
    }

    pub fn candidates(&self) -> &[MediaItem] {
        &self.candidates
    }
}
