use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::{FirebirdError, Result};

/// Sentiment cut-offs for cluster severity. Each is an exclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub medium: f32,
    pub high: f32,
    pub critical: f32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: -0.43,
            high: -0.53,
            critical: -0.63,
        }
    }
}

/// Tunables for a detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// A seed's latest sentiment must be at or below this.
    pub sentiment_threshold: f32,
    /// A seed needs at least this many items in one disaster category.
    pub min_disaster_count: u32,
    /// Maximum hop distance between clustered locations.
    pub distance_threshold_km: f64,
    pub severity: SeverityThresholds,
    pub summary_concurrency: usize,
    pub max_summary_items: usize,
    pub max_summary_chars: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: -0.05,
            min_disaster_count: 3,
            distance_threshold_km: 50.0,
            severity: SeverityThresholds::default(),
            summary_concurrency: 4,
            max_summary_items: 69,
            max_summary_chars: 15_000,
        }
    }
}

/// Tunables for the per-location aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Application configuration loaded from `FIREBIRD_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub detection: DetectionConfig,
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Every variable is optional; unset ones keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let detection = DetectionConfig {
            sentiment_threshold: parse_or(
                &lookup,
                "FIREBIRD_SENTIMENT_THRESHOLD",
                defaults.detection.sentiment_threshold,
            )?,
            min_disaster_count: parse_or(
                &lookup,
                "FIREBIRD_MIN_DISASTER_COUNT",
                defaults.detection.min_disaster_count,
            )?,
            distance_threshold_km: parse_or(
                &lookup,
                "FIREBIRD_DISTANCE_KM",
                defaults.detection.distance_threshold_km,
            )?,
            summary_concurrency: parse_or(
                &lookup,
                "FIREBIRD_SUMMARY_CONCURRENCY",
                defaults.detection.summary_concurrency,
            )?,
            ..defaults.detection
        };
        let aggregator = AggregatorConfig {
            concurrency: parse_or(
                &lookup,
                "FIREBIRD_AGGREGATE_CONCURRENCY",
                defaults.aggregator.concurrency,
            )?,
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FIREBIRD_FETCH_TIMEOUT_SECS",
                defaults.aggregator.fetch_timeout.as_secs(),
            )?),
        };

        if detection.distance_threshold_km < 0.0 {
            return Err(FirebirdError::Config(
                "FIREBIRD_DISTANCE_KM must not be negative".to_string(),
            ));
        }
        if aggregator.concurrency == 0 || detection.summary_concurrency == 0 {
            return Err(FirebirdError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            detection,
            aggregator,
        })
    }

    pub fn log_summary(&self) {
        info!(
            sentiment_threshold = self.detection.sentiment_threshold,
            min_disaster_count = self.detection.min_disaster_count,
            distance_threshold_km = self.detection.distance_threshold_km,
            summary_concurrency = self.detection.summary_concurrency,
            aggregate_concurrency = self.aggregator.concurrency,
            fetch_timeout_secs = self.aggregator.fetch_timeout.as_secs(),
            "Loaded config"
        );
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| FirebirdError::Config(format!("{key} has invalid value '{raw}'"))),
        _ => Ok(default),
    }
}
