use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::FirebirdError;
use crate::traits::{ContentSource, ContentWindow, DisasterSink, ProfileSink, ProfileSource};
use crate::types::{ContentItem, DisasterRecord, LocationProfile};

/// Serializable export of profiles and their content, replayable through
/// [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub profiles: Vec<LocationProfile>,
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub disasters: Vec<DisasterRecord>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        serde_json::from_str(raw).map_err(|e| FirebirdError::Snapshot(e.to_string()))
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FirebirdError::Snapshot(e.to_string()))
    }

    /// JSON Schema of the snapshot file format.
    pub fn json_schema() -> crate::error::Result<String> {
        serde_json::to_string_pretty(&schemars::schema_for!(Snapshot))
            .map_err(|e| FirebirdError::Snapshot(e.to_string()))
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Insertion order is the order `fetch_all_profiles` returns.
    profiles: Vec<LocationProfile>,
    content: HashMap<String, Vec<ContentItem>>,
    disasters: Vec<DisasterRecord>,
    fail_profile_fetch: bool,
    fail_content_for: HashSet<String>,
    fail_profile_writes: bool,
    fail_disaster_writes: bool,
    profile_writes: usize,
}

/// In-memory implementation of every storage collaborator.
/// Failure switches make individual operations return errors.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for profile in snapshot.profiles {
            store = store.with_profile(profile);
        }
        for item in snapshot.content {
            store = store.with_content(item);
        }
        store.inner.get_mut().disasters = snapshot.disasters;
        store
    }

    pub fn with_profile(mut self, profile: LocationProfile) -> Self {
        self.inner.get_mut().profiles.push(profile);
        self
    }

    pub fn with_content(mut self, item: ContentItem) -> Self {
        self.inner
            .get_mut()
            .content
            .entry(item.location_id.clone())
            .or_default()
            .push(item);
        self
    }

    pub fn failing_profile_fetch(mut self) -> Self {
        self.inner.get_mut().fail_profile_fetch = true;
        self
    }

    pub fn failing_content_for(mut self, location_id: &str) -> Self {
        self.inner
            .get_mut()
            .fail_content_for
            .insert(location_id.to_string());
        self
    }

    pub fn failing_profile_writes(mut self) -> Self {
        self.inner.get_mut().fail_profile_writes = true;
        self
    }

    pub fn failing_disaster_writes(mut self) -> Self {
        self.inner.get_mut().fail_disaster_writes = true;
        self
    }

    // --- Read-back helpers ---

    pub async fn profiles(&self) -> Vec<LocationProfile> {
        self.inner.lock().await.profiles.clone()
    }

    pub async fn profile(&self, id: &str) -> Option<LocationProfile> {
        self.inner
            .lock()
            .await
            .profiles
            .iter()
            .find(|p| p.id() == Some(id))
            .cloned()
    }

    pub async fn disasters(&self) -> Vec<DisasterRecord> {
        self.inner.lock().await.disasters.clone()
    }

    pub async fn profile_writes(&self) -> usize {
        self.inner.lock().await.profile_writes
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        let mut content: Vec<ContentItem> = inner.content.values().flatten().cloned().collect();
        content.sort_by(|a, b| {
            a.location_id
                .cmp(&b.location_id)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.id.cmp(&b.id))
        });
        Snapshot {
            profiles: inner.profiles.clone(),
            content,
            disasters: inner.disasters.clone(),
        }
    }
}

#[async_trait]
impl ProfileSource for MemoryStore {
    async fn fetch_all_profiles(&self) -> Result<Vec<LocationProfile>> {
        let inner = self.inner.lock().await;
        if inner.fail_profile_fetch {
            bail!("MemoryStore: profile fetch disabled");
        }
        Ok(inner.profiles.clone())
    }
}

#[async_trait]
impl ContentSource for MemoryStore {
    async fn fetch_content(
        &self,
        location_id: &str,
        window: ContentWindow,
    ) -> Result<Vec<ContentItem>> {
        let inner = self.inner.lock().await;
        if inner.fail_content_for.contains(location_id) {
            bail!("MemoryStore: content fetch disabled for {location_id}");
        }
        let mut items: Vec<ContentItem> = inner
            .content
            .get(location_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| window.contains(item.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by_key(|item| item.timestamp);
        Ok(items)
    }
}

#[async_trait]
impl ProfileSink for MemoryStore {
    async fn persist_profile_update(&self, profile: &LocationProfile) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_profile_writes {
            bail!("MemoryStore: profile writes disabled");
        }
        let Some(id) = profile.id() else {
            bail!("MemoryStore: cannot upsert profile '{}' without an id", profile.name);
        };
        match inner.profiles.iter().position(|p| p.id() == Some(id)) {
            Some(idx) => inner.profiles[idx] = profile.clone(),
            None => inner.profiles.push(profile.clone()),
        }
        inner.profile_writes += 1;
        Ok(())
    }
}

#[async_trait]
impl DisasterSink for MemoryStore {
    async fn persist_disaster_records(&self, records: &[DisasterRecord]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_disaster_writes {
            bail!("MemoryStore: disaster writes disabled");
        }
        for record in records {
            match inner.disasters.iter().position(|d| d.id == record.id) {
                Some(idx) => inner.disasters[idx] = record.clone(),
                None => inner.disasters.push(record.clone()),
            }
        }
        Ok(())
    }
}
