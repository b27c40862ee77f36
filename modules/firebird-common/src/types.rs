use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// --- Enums ---

/// Disaster category of a single content item or of a whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Wildfire,
    Hurricane,
    Earthquake,
    NonDisaster,
}

impl Category {
    pub fn is_disaster(self) -> bool {
        self != Category::NonDisaster
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Wildfire => write!(f, "wildfire"),
            Category::Hurricane => write!(f, "hurricane"),
            Category::Earthquake => write!(f, "earthquake"),
            Category::NonDisaster => write!(f, "non-disaster"),
        }
    }
}

/// Ordered so that `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisasterStatus {
    NotActive,
    #[default]
    Active,
    Recovery,
}

// --- Counts and snapshots ---

/// Per-category item counters. Cumulative wherever they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryCounts {
    pub fire: u32,
    pub hurricane: u32,
    pub earthquake: u32,
    pub non_disaster: u32,
}

impl CategoryCounts {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn record(&mut self, category: Category) {
        match category {
            Category::Wildfire => self.fire = self.fire.saturating_add(1),
            Category::Hurricane => self.hurricane = self.hurricane.saturating_add(1),
            Category::Earthquake => self.earthquake = self.earthquake.saturating_add(1),
            Category::NonDisaster => self.non_disaster = self.non_disaster.saturating_add(1),
        }
    }

    /// Sum of all four counters, `non_disaster` included.
    pub fn total(&self) -> u64 {
        u64::from(self.fire)
            + u64::from(self.hurricane)
            + u64::from(self.earthquake)
            + u64::from(self.non_disaster)
    }

    /// Largest of the three disaster counters.
    pub fn max_disaster_count(&self) -> u32 {
        self.fire.max(self.hurricane).max(self.earthquake)
    }
}

/// Counters saturate at `u32::MAX` rather than wrapping.
impl AddAssign for CategoryCounts {
    fn add_assign(&mut self, other: Self) {
        self.fire = self.fire.saturating_add(other.fire);
        self.hurricane = self.hurricane.saturating_add(other.hurricane);
        self.earthquake = self.earthquake.saturating_add(other.earthquake);
        self.non_disaster = self.non_disaster.saturating_add(other.non_disaster);
    }
}

impl FromIterator<Category> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut counts = Self::default();
        for category in iter {
            counts.record(category);
        }
        counts
    }
}

/// One entry in a location's sentiment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Cumulative number of items averaged into this snapshot.
    pub item_count: u32,
    pub average_sentiment: f32,
    #[serde(default)]
    pub category_counts: CategoryCounts,
}

// --- Location profile ---

/// Stable identifier for a place name: hex SHA-256 of the normalized name.
///
/// Normalization trims, lowercases and collapses internal whitespace, so
/// `"  Los   Angeles"` and `"los angeles"` map to the same profile.
pub fn location_id(name: &str) -> String {
    let normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Running summary of disaster-relevant signal for one named place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    pub lat: f64,
    #[serde(rename = "long")]
    pub lng: f64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sentiment_history: Vec<SentimentSnapshot>,
    #[serde(default)]
    pub latest_skeet_count: u32,
    #[serde(default)]
    pub latest_category_counts: CategoryCounts,
    #[serde(default)]
    pub latest_sentiment: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_observed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed_at: Option<String>,
}

impl LocationProfile {
    /// New, empty profile whose id is derived from `name`.
    pub fn new(name: &str, formatted_address: &str, lat: f64, lng: f64, kind: &str) -> Self {
        Self {
            id: Some(location_id(name)),
            name: name.to_string(),
            formatted_address: formatted_address.to_string(),
            lat,
            lng,
            kind: kind.to_string(),
            sentiment_history: Vec::new(),
            latest_skeet_count: 0,
            latest_category_counts: CategoryCounts::default(),
            latest_sentiment: 0.0,
            first_observed_at: None,
            last_observed_at: None,
        }
    }

    /// The stable identifier, treating an empty string as missing.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn latest_snapshot(&self) -> Option<&SentimentSnapshot> {
        self.sentiment_history.last()
    }

    /// Copy the latest snapshot into the `latest_*` mirror fields.
    pub fn sync_latest(&mut self) {
        if let Some(snapshot) = self.sentiment_history.last() {
            self.latest_skeet_count = snapshot.item_count;
            self.latest_category_counts = snapshot.category_counts;
            self.latest_sentiment = snapshot.average_sentiment;
        }
    }
}

// --- Content ---

/// A social item mentioning a location, with NLP results already attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment_score: f32,
    /// Raw classifier scores, ordered `[fire, hurricane, earthquake, non_disaster]`.
    #[serde(default)]
    pub classification: Vec<f64>,
    #[serde(default)]
    pub text: String,
}

impl ContentItem {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

// --- Disaster records ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Degenerate box covering a single point.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            min_lat: lat,
            max_lat: lat,
            min_lon: lng,
            max_lon: lng,
        }
    }

    pub fn extend(&mut self, lat: f64, lng: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lng);
        self.max_lon = self.max_lon.max(lng);
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lng)
    }
}

/// One detected, geographically clustered disaster event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisasterRecord {
    pub id: Uuid,
    pub centroid_lat: f64,
    pub centroid_long: f64,
    /// Sorted ascending.
    pub location_ids: Vec<String>,
    pub location_count: usize,
    pub bounding_box: BoundingBox,
    pub disaster_type: Category,
    pub severity: Severity,
    pub status: DisasterStatus,
    pub reported_date: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub total_skeets_amount: u64,
    pub cluster_sentiment: f32,
    pub cluster_counts: CategoryCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}
