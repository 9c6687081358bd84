// Directory catalog serving a folder on disk as the photo library

use super::{AssetCatalog, ThumbnailDelivery};
use crate::domain::{sort_newest_first, AuthorizationState, CandidateFilter, MediaItem};
use crate::error::{Result, SweepError};
use crate::preview::{load_image, render_thumbnail, ThumbnailQuality, ThumbnailSize};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// File-name fragments that mark a screenshot on common desktop and phone platforms
pub const DEFAULT_SCREENSHOT_PATTERNS: &[&str] = &[
    "screenshot",
    "screen shot",
    "bildschirmfoto",
    "capture d",
    "スクリーンショット",
];

/// Extensions treated as photos
fn is_image_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "heic"
    )
}

/// A directory on disk used as the photo library
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    screenshot_patterns: Vec<String>,
    /// Dry run mode - deletions are logged, files stay where they are
    dry_run: bool,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            screenshot_patterns: DEFAULT_SCREENSHOT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            dry_run: false,
        }
    }

    /// Replaces the screenshot name patterns (matched case-insensitively)
    pub fn with_screenshot_patterns(mut self, patterns: Vec<String>) -> Self {
        self.screenshot_patterns = patterns.into_iter().map(|p| p.to_lowercase()).collect();
        self
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, item: &MediaItem) -> PathBuf {
        self.root.join(&item.name)
    }

    fn is_screenshot_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.screenshot_patterns
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }

    /// Scans the directory, newest first. Unreadable entries are skipped.
    fn discover(&self, filter: CandidateFilter, limit: usize) -> io::Result<Vec<MediaItem>> {
        let mut items = Vec::new();

        for entry_result in fs::read_dir(&self.root)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let path = entry.path();

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            if file_name.starts_with('.') {
                continue;
            }

            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !is_image_extension(extension) {
                continue;
            }

            if filter == CandidateFilter::Screenshots && !self.is_screenshot_name(&file_name) {
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if !metadata.is_file() {
                continue;
            }

            // Creation time is not available on every filesystem
            let created = match metadata.created().or_else(|_| metadata.modified()) {
                Ok(t) => t,
                Err(_) => continue,
            };
            let created_at: DateTime<Utc> = created.into();

            items.push(MediaItem::new(
                path.to_string_lossy().into_owned(),
                file_name,
                created_at,
                metadata.len(),
            ));
        }

        sort_newest_first(&mut items);
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl AssetCatalog for DirectoryCatalog {
    fn authorization(&self) -> AuthorizationState {
        match fs::read_dir(&self.root) {
            Ok(_) => AuthorizationState::Authorized,
            Err(e) if e.kind() == io::ErrorKind::NotFound => AuthorizationState::Denied,
            Err(_) => AuthorizationState::Restricted,
        }
    }

    async fn request_authorization(&self) -> AuthorizationState {
        // Filesystem permissions cannot be granted from here
        self.authorization()
    }

    async fn list_candidates(
        &self,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let state = self.authorization();
        if !state.grants_access() {
            return Err(SweepError::AdapterUnavailable(format!(
                "{} is not accessible ({:?})",
                self.root.display(),
                state
            )));
        }

        let catalog = self.clone();
        let items = tokio::task::spawn_blocking(move || catalog.discover(filter, limit))
            .await
            .map_err(|e| io::Error::other(format!("Scan task failed: {}", e)))??;

        debug!(root = %self.root.display(), count = items.len(), "Listed candidates");
        Ok(items)
    }

    fn request_thumbnail(
        &self,
        item: &MediaItem,
        target: ThumbnailSize,
    ) -> mpsc::Receiver<ThumbnailDelivery> {
        let (tx, rx) = mpsc::channel(2);
        let path = self.path_of(item);

        tokio::task::spawn_blocking(move || {
            let img = match load_image(&path) {
                Ok(img) => img,
                Err(e) => {
                    let _ = tx.blocking_send(ThumbnailDelivery::Failed(e.to_string()));
                    return;
                }
            };

            for quality in [ThumbnailQuality::Degraded, ThumbnailQuality::Final] {
                // Receiver gone means the request was cancelled
                if tx.is_closed() {
                    return;
                }

                let delivery = match render_thumbnail(&img, target, quality) {
                    Ok(thumb) if quality == ThumbnailQuality::Degraded => {
                        ThumbnailDelivery::Degraded(thumb)
                    }
                    Ok(thumb) => ThumbnailDelivery::Final(thumb),
                    Err(e) => ThumbnailDelivery::Failed(e.to_string()),
                };
                let failed = matches!(delivery, ThumbnailDelivery::Failed(_));

                if tx.blocking_send(delivery).is_err() || failed {
                    return;
                }
            }
        });

        rx
    }

    fn estimated_size(&self, item: &MediaItem) -> u64 {
        fs::metadata(self.path_of(item))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    async fn batch_delete(&self, items: &[MediaItem]) -> Result<()> {
        let paths: Vec<PathBuf> = items.iter().map(|item| self.path_of(item)).collect();

        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(SweepError::DeleteFailed(format!(
                "File not found: {}",
                missing.display()
            )));
        }

        if self.dry_run {
            info!(count = paths.len(), "[DRY RUN] Would move files to trash");
            return Ok(());
        }

        let count = paths.len();
        tokio::task::spawn_blocking(move || trash::delete_all(&paths))
            .await
            .map_err(|e| SweepError::DeleteFailed(format!("Trash task failed: {}", e)))?
            .map_err(|e| {
                warn!(error = %e, "Moving files to trash failed");
                SweepError::DeleteFailed(format!("Trash error: {}", e))
            })?;

        info!(count, "Moved files to trash");
        Ok(())
    }
}
