// Async preview module for single-flight thumbnail loading with caching

use crate::catalog::{AssetCatalog, ThumbnailDelivery};
use crate::domain::{MediaId, MediaItem};
use crate::error::SweepError;
use crate::preview::{Thumbnail, ThumbnailSize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::AbortHandle;
use tracing::debug;

/// Maximum number of cached thumbnails
pub const CACHE_SIZE: usize = 32;

/// How long to wait for a final image before settling for the best one so far
pub const DEFAULT_THUMBNAIL_WAIT: Duration = Duration::from_millis(250);

/// Outcome of a thumbnail request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailState {
    /// Final, full-quality thumbnail
    Ready(Thumbnail),
    /// Only a degraded preview arrived in time
    Degraded(Thumbnail),
    /// Nothing usable; show a placeholder
    Unavailable(String),
    /// A newer request or a cancellation replaced this one; discard it
    Stale,
}

impl ThumbnailState {
    /// The image to display, if any
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        match self {
            Self::Ready(t) | Self::Degraded(t) => Some(t),
            Self::Unavailable(_) | Self::Stale => None,
        }
    }

    pub fn into_result(self) -> crate::Result<Thumbnail> {
        match self {
            Self::Ready(t) | Self::Degraded(t) => Ok(t),
            Self::Unavailable(reason) => Err(SweepError::ThumbnailUnavailable(reason)),
            Self::Stale => Err(SweepError::ThumbnailUnavailable(
                "Request was superseded".to_string(),
            )),
        }
    }
}

type CacheKey = (MediaId, ThumbnailSize);

/// LRU-like cache for final thumbnails
#[derive(Debug)]
struct ThumbnailCache {
    cache: HashMap<CacheKey, Thumbnail>,
    /// Order of access for LRU eviction (most recent at end)
    access_order: Vec<CacheKey>,
    max_size: usize,
}

impl ThumbnailCache {
    fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::new(),
            access_order: Vec::new(),
            max_size,
        }
    }

    /// Get a cached thumbnail, updating access order
    fn get(&mut self, key: &CacheKey) -> Option<Thumbnail> {
        let thumbnail = self.cache.get(key)?.clone();
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.clone());
        Some(thumbnail)
    }

    /// Insert a thumbnail, evicting the least recently used if necessary
    fn insert(&mut self, key: CacheKey, thumbnail: Thumbnail) {
        if self.max_size == 0 {
            return;
        }

        if self.cache.contains_key(&key) {
            self.access_order.retain(|k| k != &key);
        } else if self.cache.len() >= self.max_size && !self.access_order.is_empty() {
            let oldest = self.access_order.remove(0);
            self.cache.remove(&oldest);
        }

        self.cache.insert(key.clone(), thumbnail);
        self.access_order.push(key);
    }

    /// Drops every size cached for `id`
    fn evict(&mut self, id: &MediaId) {
        self.cache.retain(|(cached_id, _), _| cached_id != id);
        self.access_order.retain(|(cached_id, _)| cached_id != id);
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn clear(&mut self) {
        self.cache.clear();
        self.access_order.clear();
    }
}

/// The request currently allowed to publish a result for an item
#[derive(Debug)]
struct InFlight {
    generation: u64,
    target: ThumbnailSize,
    abort: AbortHandle,
    /// Result of this request, for callers that joined it
    result: watch::Receiver<Option<ThumbnailState>>,
}

type InFlightMap = HashMap<MediaId, InFlight>;

fn lock_in_flight(in_flight: &StdMutex<InFlightMap>) -> MutexGuard<'_, InFlightMap> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a request whose caller stopped waiting: the fetch is aborted and
/// the entry removed, unless a newer generation already replaced it
struct InFlightGuard {
    in_flight: Arc<StdMutex<InFlightMap>>,
    id: MediaId,
    generation: u64,
    abort: AbortHandle,
    finished: bool,
}

impl InFlightGuard {
    /// Retires the entry; returns whether this request was still the current one
    fn finish(&mut self) -> bool {
        self.finished = true;
        self.remove_if_current()
    }

    fn remove_if_current(&self) -> bool {
        let mut in_flight = lock_in_flight(&self.in_flight);
        match in_flight.get(&self.id) {
            Some(current) if current.generation == self.generation => {
                in_flight.remove(&self.id);
                true
            }
            _ => false,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.abort.abort();
        if self.remove_if_current() {
            debug!(id = %self.id, "Thumbnail request dropped by caller");
        }
    }
}

/// What the catalog produced before the wait ran out
enum Fetched {
    Final(Thumbnail),
    Degraded(Thumbnail),
    Nothing(String),
}

/// Loads thumbnails from a catalog, one outstanding request per item.
///
/// Each request takes a fresh generation number. Starting a request for an
/// item at a different size, or cancelling it, retires the previous
/// generation: its fetch is aborted and its callers get
/// [`ThumbnailState::Stale`], so a slow old result can never land after a
/// newer one. A request for the size already being fetched joins it instead.
/// Dropping the future returned by [`ThumbnailLoader::load`] releases the
/// request.
#[derive(Debug)]
pub struct ThumbnailLoader<C: ?Sized> {
    catalog: Arc<C>,
    cache: Arc<Mutex<ThumbnailCache>>,
    in_flight: Arc<StdMutex<InFlightMap>>,
    next_generation: Arc<AtomicU64>,
    wait: Duration,
}

impl<C: ?Sized> Clone for ThumbnailLoader<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
            next_generation: Arc::clone(&self.next_generation),
            wait: self.wait,
        }
    }
}

impl<C: AssetCatalog + ?Sized + 'static> ThumbnailLoader<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self::with_options(catalog, DEFAULT_THUMBNAIL_WAIT, CACHE_SIZE)
    }

    pub fn with_options(catalog: Arc<C>, wait: Duration, cache_size: usize) -> Self {
        Self {
            catalog,
            cache: Arc::new(Mutex::new(ThumbnailCache::new(cache_size))),
            in_flight: Arc::new(StdMutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            wait,
        }
    }

    /// Requests a thumbnail. Joins an outstanding request for the same item
    /// and size, and replaces one for a different size.
    pub async fn load(&self, item: &MediaItem, target: ThumbnailSize) -> ThumbnailState {
        let key = (item.id.clone(), target);

        loop {
            if let Some(cached) = self.cache.lock().await.get(&key) {
                return ThumbnailState::Ready(cached);
            }

            let joined = lock_in_flight(&self.in_flight)
                .get(&item.id)
                .filter(|current| current.target == target)
                .map(|current| current.result.clone());

            let Some(mut result) = joined else {
                return self.fetch(item, target).await;
            };

            debug!(id = %item.id, "Joining in-flight thumbnail request");
            let shared = match result.wait_for(Option::is_some).await {
                Ok(state) => state.clone(),
                Err(_) => None,
            };
            if let Some(state) = shared {
                return state;
            }
            // The joined request was dropped before it finished; start over
        }
    }

    async fn fetch(&self, item: &MediaItem, target: ThumbnailSize) -> ThumbnailState {
        let key = (item.id.clone(), target);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let deliveries = self.catalog.request_thumbnail(item, target);
        let task = tokio::spawn(await_delivery(deliveries, self.wait));
        let (result_tx, result_rx) = watch::channel(None);

        let current = InFlight {
            generation,
            target,
            abort: task.abort_handle(),
            result: result_rx,
        };
        if let Some(previous) = lock_in_flight(&self.in_flight).insert(item.id.clone(), current) {
            previous.abort.abort();
            debug!(id = %item.id, "Superseded thumbnail request");
        }

        let mut guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            id: item.id.clone(),
            generation,
            abort: task.abort_handle(),
            finished: false,
        };

        let fetched = task.await;

        let mut state = match fetched {
            Ok(Fetched::Final(thumbnail)) => ThumbnailState::Ready(thumbnail),
            Ok(Fetched::Degraded(thumbnail)) => ThumbnailState::Degraded(thumbnail),
            Ok(Fetched::Nothing(reason)) => {
                debug!(id = %item.id, %reason, "Thumbnail unavailable");
                ThumbnailState::Unavailable(reason)
            }
            Err(e) if e.is_cancelled() => ThumbnailState::Stale,
            Err(e) => ThumbnailState::Unavailable(format!("Thumbnail task panicked: {}", e)),
        };

        // Only the newest generation may publish; the cache lock keeps a
        // concurrent `load` from missing both the cache and the entry
        {
            let mut cache = self.cache.lock().await;
            if !guard.finish() {
                state = ThumbnailState::Stale;
            } else if let ThumbnailState::Ready(thumbnail) = &state {
                cache.insert(key, thumbnail.clone());
            }
        }

        result_tx.send_replace(Some(state.clone()));
        state
    }

    /// Warms the cache for an item in the background
    pub fn prefetch(&self, item: &MediaItem, target: ThumbnailSize) {
        let loader = self.clone();
        let item = item.clone();
        tokio::spawn(async move {
            loader.load(&item, target).await;
        });
    }

    /// Cancels the outstanding request for an item; its callers get `Stale`
    pub fn cancel(&self, id: &MediaId) {
        if let Some(previous) = lock_in_flight(&self.in_flight).remove(id) {
            previous.abort.abort();
            debug!(%id, "Cancelled thumbnail request");
        }
    }

    pub fn is_in_flight(&self, id: &MediaId) -> bool {
        lock_in_flight(&self.in_flight).contains_key(id)
    }

    pub async fn get_cached(&self, id: &MediaId, target: ThumbnailSize) -> Option<Thumbnail> {
        self.cache.lock().await.get(&(id.clone(), target))
    }

    pub async fn is_cached(&self, id: &MediaId, target: ThumbnailSize) -> bool {
        self.cache.lock().await.contains(&(id.clone(), target))
    }

    /// Forgets cached thumbnails of items that no longer exist
    pub async fn evict(&self, ids: &[MediaId]) {
        let mut cache = self.cache.lock().await;
        for id in ids {
            cache.evict(id);
        }
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

/// Accepts the first final thumbnail; after `wait` settles for the best
/// degraded one received, if any
async fn await_delivery(
    mut deliveries: mpsc::Receiver<ThumbnailDelivery>,
    wait: Duration,
) -> Fetched {
    let deadline = tokio::time::Instant::now() + wait;
    let mut best_so_far = None;

    loop {
        match tokio::time::timeout_at(deadline, deliveries.recv()).await {
            Ok(Some(ThumbnailDelivery::Final(thumbnail))) => return Fetched::Final(thumbnail),
            Ok(Some(ThumbnailDelivery::Degraded(thumbnail))) => best_so_far = Some(thumbnail),
            Ok(Some(ThumbnailDelivery::Failed(reason))) => return Fetched::Nothing(reason),
            // Catalog finished without a final image, or the wait ran out
            Ok(None) | Err(_) => break,
        }
    }

    match best_so_far {
        Some(thumbnail) => Fetched::Degraded(thumbnail),
        None => Fetched::Nothing(format!("No thumbnail within {}ms", wait.as_millis())),
    }
}
