// Domain module for media items, decisions and triage state

use chrono::{DateTime, Utc};
use std::fmt;

mod deletion_queue;
mod triage_cursor;

pub use deletion_queue::{CommitOutcome, DeletionQueue, DeletionQueueManager};
pub use triage_cursor::TriageCursor;

/// Opaque identifier of a media item, stable within one catalog session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A candidate for deletion, as enumerated by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: MediaId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Best-effort size; zero when the catalog cannot tell
    pub estimated_size_bytes: u64,
}

impl MediaItem {
    pub fn new(
        id: impl Into<MediaId>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        estimated_size_bytes: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            estimated_size_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Delete,
}

/// Which items of the library are offered for triage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateFilter {
    #[default]
    Screenshots,
    AllImages,
}

/// Access the user has granted to the photo library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    /// Access to a user-selected subset of the library
    Limited,
}

impl AuthorizationState {
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Authorized | Self::Limited)
    }
}

/// Statistics about the current triage session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriageStatistics {
    pub total: usize,
    pub reviewed: usize,
    pub kept: usize,
    pub queued: usize,
    pub queued_bytes: u64,
}

/// Sorts items newest first, the order candidates are presented in
pub fn sort_newest_first(items: &mut [MediaItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Item whose creation time is derived from `minute` so ordering is predictable
    pub fn item(id: &str, size: u64, minute: u32) -> MediaItem {
        let created_at = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .unwrap();
        MediaItem::new(id, format!("{}.png", id), created_at, size)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::item;
    use super::*;

    #[test]
    fn test_authorization_grants_access() {
        assert!(AuthorizationState::Authorized.grants_access());
        assert!(AuthorizationState::Limited.grants_access());
        assert!(!AuthorizationState::Denied.grants_access());
        assert!(!AuthorizationState::Restricted.grants_access());
        assert!(!AuthorizationState::NotDetermined.grants_access());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut items = vec![item("old", 1, 0), item("new", 1, 30), item("mid", 1, 10)];
        sort_newest_first(&mut items);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_media_id_display() {
        let id = MediaId::new("IMG_0001");
        assert_eq!(id.to_string(), "IMG_0001");
        assert_eq!(MediaId::from("IMG_0001"), id);
    }

    #[test]
    fn test_candidate_filter_default() {
        assert_eq!(CandidateFilter::default(), CandidateFilter::Screenshots);
    }
}
