// Collaborator boundaries for the aggregation and detection pipelines.
//
// Store adapters (document database, NLP, ML classifier, LLM) live outside
// this workspace and implement these traits. MemoryStore implements the
// storage-side ones for tests and offline replay.

use std::ops::Bound;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Category, ContentItem, DisasterRecord, LocationProfile};

/// Time range over a location's content log, always closed at `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentWindow {
    pub start: Bound<DateTime<Utc>>,
    pub until: DateTime<Utc>,
}

impl ContentWindow {
    /// Everything up to and including `until`.
    pub fn everything_until(until: DateTime<Utc>) -> Self {
        Self {
            start: Bound::Unbounded,
            until,
        }
    }

    /// `(after, until]`: items newer than `after`.
    pub fn between(after: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            start: Bound::Excluded(after),
            until,
        }
    }

    /// `[from, until]`.
    pub fn spanning(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            start: Bound::Included(from),
            until,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let after_start = match self.start {
            Bound::Included(from) => ts >= from,
            Bound::Excluded(after) => ts > after,
            Bound::Unbounded => true,
        };
        after_start && ts <= self.until
    }
}

/// Snapshot of every geocoded location profile.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_all_profiles(&self) -> Result<Vec<LocationProfile>>;
}

/// Per-location content log.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_content(
        &self,
        location_id: &str,
        window: ContentWindow,
    ) -> Result<Vec<ContentItem>>;
}

/// Maps one content item to its disaster category.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, item: &ContentItem) -> Category;
}

#[async_trait]
pub trait ProfileSink: Send + Sync {
    /// Upsert the profile's history and `latest_*` fields.
    async fn persist_profile_update(&self, profile: &LocationProfile) -> Result<()>;
}

#[async_trait]
pub trait DisasterSink: Send + Sync {
    /// Bulk, non-transactional upsert keyed by record id.
    async fn persist_disaster_records(&self, records: &[DisasterRecord]) -> Result<()>;
}

/// Turns the collected posts of one disaster into a short summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, disaster_type: Category, corpus: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_excludes_start_and_includes_end() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let window = ContentWindow::between(start, end);
        assert!(!window.contains(start));
        assert!(window.contains(end));
        assert!(window.contains(start + chrono::Duration::hours(1)));
        assert!(!window.contains(end + chrono::Duration::seconds(1)));
    }

    #[test]
    fn spanning_window_includes_both_ends() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let window = ContentWindow::spanning(start, end);
        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(start - chrono::Duration::seconds(1)));
    }

    #[test]
    fn open_window_reaches_back_to_epoch() {
        let end = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let window = ContentWindow::everything_until(end);
        assert!(window.contains(DateTime::<Utc>::UNIX_EPOCH));
        assert!(window.contains(end));
    }
}
