// Memory catalog, a scriptable in-memory photo library

use super::{AssetCatalog, ThumbnailDelivery};
use crate::domain::{sort_newest_first, AuthorizationState, CandidateFilter, MediaId, MediaItem};
use crate::error::{Result, SweepError};
use crate::preview::{Thumbnail, ThumbnailSize};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Scripted thumbnail deliveries for one item: each is sent after its delay
pub type ThumbnailScript = Vec<(Duration, ThumbnailDelivery)>;

#[derive(Debug)]
struct LibraryEntry {
    item: MediaItem,
    is_screenshot: bool,
}

#[derive(Debug)]
struct State {
    entries: Vec<LibraryEntry>,
    authorization: AuthorizationState,
    /// What `request_authorization` resolves to when access is undecided
    prompt_answer: AuthorizationState,
    delete_failure: Option<String>,
    delete_calls: Vec<Vec<MediaId>>,
    thumbnail_scripts: HashMap<MediaId, ThumbnailScript>,
    thumbnail_requests: HashMap<MediaId, usize>,
}

/// In-memory photo library.
///
/// Records every batch delete and can be scripted to deny access, fail
/// deletes, or deliver thumbnails with arbitrary timing.
#[derive(Debug)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: Vec::new(),
                authorization: AuthorizationState::Authorized,
                prompt_answer: AuthorizationState::Authorized,
                delete_failure: None,
                delete_calls: Vec::new(),
                thumbnail_scripts: HashMap::new(),
                thumbnail_requests: HashMap::new(),
            }),
        }
    }

    /// A library whose items are all screenshots
    pub fn with_items(items: Vec<MediaItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.add_screenshot(item);
        }
        catalog
    }

    pub fn add_screenshot(&self, item: MediaItem) {
        self.lock().entries.push(LibraryEntry {
            item,
            is_screenshot: true,
        });
    }

    /// Adds an image that only shows up with [`CandidateFilter::AllImages`]
    pub fn add_photo(&self, item: MediaItem) {
        self.lock().entries.push(LibraryEntry {
            item,
            is_screenshot: false,
        });
    }

    /// Everything still in the library, in insertion order
    pub fn items(&self) -> Vec<MediaItem> {
        self.lock().entries.iter().map(|e| e.item.clone()).collect()
    }

    pub fn set_authorization(&self, state: AuthorizationState) {
        self.lock().authorization = state;
    }

    pub fn set_prompt_answer(&self, state: AuthorizationState) {
        self.lock().prompt_answer = state;
    }

    /// Makes every following batch delete fail with `reason`
    pub fn fail_deletes(&self, reason: impl Into<String>) {
        self.lock().delete_failure = Some(reason.into());
    }

    pub fn allow_deletes(&self) {
        self.lock().delete_failure = None;
    }

    /// Ids passed to each batch delete call, in call order
    pub fn delete_calls(&self) -> Vec<Vec<MediaId>> {
        self.lock().delete_calls.clone()
    }

    pub fn script_thumbnail(&self, id: impl Into<MediaId>, script: ThumbnailScript) {
        self.lock().thumbnail_scripts.insert(id.into(), script);
    }

    pub fn thumbnail_requests(&self, id: &MediaId) -> usize {
        self.lock().thumbnail_requests.get(id).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetCatalog for MemoryCatalog {
    fn authorization(&self) -> AuthorizationState {
        self.lock().authorization
    }

    async fn request_authorization(&self) -> AuthorizationState {
        let mut state = self.lock();
        if state.authorization == AuthorizationState::NotDetermined {
            state.authorization = state.prompt_answer;
        }
        state.authorization
    }

    async fn list_candidates(
        &self,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let state = self.lock();
        if !state.authorization.grants_access() {
            return Err(SweepError::AdapterUnavailable(format!(
                "Library access is {:?}",
                state.authorization
            )));
        }

        let mut items: Vec<MediaItem> = state
            .entries
            .iter()
            .filter(|e| filter == CandidateFilter::AllImages || e.is_screenshot)
            .map(|e| e.item.clone())
            .collect();
        sort_newest_first(&mut items);
        items.truncate(limit);
        Ok(items)
    }

    fn request_thumbnail(
        &self,
        item: &MediaItem,
        target: ThumbnailSize,
    ) -> mpsc::Receiver<ThumbnailDelivery> {
        let script = {
            let mut state = self.lock();
            *state.thumbnail_requests.entry(item.id.clone()).or_insert(0) += 1;
            state.thumbnail_scripts.get(&item.id).cloned()
        };

        let script = script.unwrap_or_else(|| {
            vec![(
                Duration::ZERO,
                ThumbnailDelivery::Final(Thumbnail {
                    width: target.width,
                    height: target.height,
                    bytes: item.id.as_str().as_bytes().to_vec(),
                }),
            )]
        });

        let (tx, rx) = mpsc::channel(script.len().max(1));
        tokio::spawn(async move {
            for (delay, delivery) in script {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(delivery).await.is_err() {
                    return;
                }
            }
        });
        rx
    }

    fn estimated_size(&self, item: &MediaItem) -> u64 {
        self.lock()
            .entries
            .iter()
            .find(|e| e.item.id == item.id)
            .map(|e| e.item.estimated_size_bytes)
            .unwrap_or(0)
    }

    async fn batch_delete(&self, items: &[MediaItem]) -> Result<()> {
        let mut state = self.lock();
        state
            .delete_calls
            .push(items.iter().map(|i| i.id.clone()).collect());

        if let Some(reason) = &state.delete_failure {
            return Err(SweepError::DeleteFailed(reason.clone()));
        }

        if let Some(unknown) = items
            .iter()
            .find(|i| !state.entries.iter().any(|e| e.item.id == i.id))
        {
            return Err(SweepError::DeleteFailed(format!(
                "Unknown item: {}",
                unknown.id
            )));
        }

        state
            .entries
            .retain(|e| !items.iter().any(|i| i.id == e.item.id));
        Ok(())
    }
}
