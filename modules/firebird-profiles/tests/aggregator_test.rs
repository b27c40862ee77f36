//! Batch aggregation tests.
//!
//! These drive `BatchAggregator` against the in-memory store and check that
//! one location's failure never leaks into another's profile.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use firebird_common::{
    AggregatorConfig, CategoryCounts, ContentItem, ContentSource, ContentWindow, FirebirdError,
    LocationProfile, MemoryStore, SentimentSnapshot,
};
use firebird_profiles::{BatchAggregator, ProfileUpdate, ScoreClassifier};

const FIRE: [f64; 4] = [0.9, 0.05, 0.03, 0.02];

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

fn location(name: &str, lat: f64, lng: f64) -> LocationProfile {
    LocationProfile::new(name, &format!("{name}, CA, USA"), lat, lng, "LOCATION")
}

fn post(profile: &LocationProfile, n: u32, ts: DateTime<Utc>, sentiment: f32) -> ContentItem {
    ContentItem {
        id: format!("{}-{n}", profile.name),
        location_id: profile.id().unwrap().to_string(),
        timestamp: ts,
        sentiment_score: sentiment,
        classification: FIRE.to_vec(),
        text: format!("smoke everywhere near {}", profile.name),
    }
}

fn aggregator(store: &Arc<MemoryStore>, config: AggregatorConfig) -> BatchAggregator {
    BatchAggregator::new(store.clone(), store.clone(), Arc::new(ScoreClassifier), config)
}

#[tokio::test]
async fn every_location_gets_its_own_snapshot() {
    let pasadena = location("Pasadena", 34.15, -118.14);
    let malibu = location("Malibu", 34.03, -118.78);
    let store = Arc::new(
        MemoryStore::new()
            .with_profile(pasadena.clone())
            .with_profile(malibu.clone())
            .with_content(post(&pasadena, 1, at(7, 1), -0.6))
            .with_content(post(&pasadena, 2, at(7, 2), -0.4))
            .with_content(post(&malibu, 1, at(7, 3), -0.2)),
    );

    let report = aggregator(&store, AggregatorConfig::default())
        .run_from_source(store.as_ref(), at(8, 0))
        .await
        .unwrap();

    assert_eq!(report.updated.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(store.profile_writes().await, 2);

    let stored = store.profile(pasadena.id().unwrap()).await.unwrap();
    assert_eq!(stored.latest_skeet_count, 2);
    assert!((stored.latest_sentiment - (-0.5)).abs() < 1e-6);
    assert_eq!(stored.latest_category_counts.fire, 2);

    let stored = store.profile(malibu.id().unwrap()).await.unwrap();
    assert_eq!(stored.latest_skeet_count, 1);
}

#[tokio::test]
async fn content_failure_is_isolated_to_its_location() {
    let pasadena = location("Pasadena", 34.15, -118.14);
    let malibu = location("Malibu", 34.03, -118.78);
    let store = Arc::new(
        MemoryStore::new()
            .with_profile(pasadena.clone())
            .with_profile(malibu.clone())
            .with_content(post(&pasadena, 1, at(7, 1), -0.6))
            .with_content(post(&malibu, 1, at(7, 3), -0.2))
            .failing_content_for(malibu.id().unwrap()),
    );

    let report = aggregator(&store, AggregatorConfig::default())
        .run(store.profiles().await, at(8, 0))
        .await;

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].location_id, pasadena.id().unwrap());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].location_id, malibu.id().unwrap());
    assert!(matches!(report.failed[0].error, FirebirdError::ContentFetch { .. }));

    // failed location was never written
    let stored = store.profile(malibu.id().unwrap()).await.unwrap();
    assert!(stored.sentiment_history.is_empty());
    assert_eq!(store.profile_writes().await, 1);
}

#[tokio::test]
async fn persist_failure_is_reported_per_location() {
    let pasadena = location("Pasadena", 34.15, -118.14);
    let store = Arc::new(
        MemoryStore::new()
            .with_profile(pasadena.clone())
            .with_content(post(&pasadena, 1, at(7, 1), -0.6))
            .failing_profile_writes(),
    );

    let report = aggregator(&store, AggregatorConfig::default())
        .run(store.profiles().await, at(8, 0))
        .await;

    assert!(report.updated.is_empty());
    assert!(matches!(report.failed[0].error, FirebirdError::Persistence(_)));
    assert!(store
        .profile(pasadena.id().unwrap())
        .await
        .unwrap()
        .sentiment_history
        .is_empty());
}

#[tokio::test]
async fn profiles_without_id_are_skipped_not_failed() {
    let mut orphan = location("Nowhere", 0.0, 0.0);
    orphan.id = None;
    let store = Arc::new(MemoryStore::new());

    let report = aggregator(&store, AggregatorConfig::default())
        .run(vec![orphan], at(8, 0))
        .await;

    assert!(report.updated.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, vec!["Nowhere".to_string()]);
    assert_eq!(store.profile_writes().await, 0);
}

#[tokio::test]
async fn profile_fetch_failure_aborts_the_pass() {
    let store = Arc::new(MemoryStore::new().failing_profile_fetch());
    let err = aggregator(&store, AggregatorConfig::default())
        .run_from_source(store.as_ref(), at(8, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, FirebirdError::ProfileFetch(_)));
}

struct StalledSource;

#[async_trait]
impl ContentSource for StalledSource {
    async fn fetch_content(&self, _: &str, _: ContentWindow) -> Result<Vec<ContentItem>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![])
    }
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let pasadena = location("Pasadena", 34.15, -118.14);
    let store = Arc::new(MemoryStore::new().with_profile(pasadena.clone()));
    let config = AggregatorConfig {
        concurrency: 2,
        fetch_timeout: Duration::from_millis(50),
    };
    let batch = BatchAggregator::new(
        Arc::new(StalledSource),
        store.clone(),
        Arc::new(ScoreClassifier),
        config,
    );

    let report = batch.run(vec![pasadena.clone()], at(8, 0)).await;

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        &report.failed[0].error,
        FirebirdError::Timeout { location_id, .. } if location_id == pasadena.id().unwrap()
    ));
    assert_eq!(store.profile_writes().await, 0);
}

#[tokio::test]
async fn second_pass_only_folds_in_new_content() {
    let mut pasadena = location("Pasadena", 34.15, -118.14);
    pasadena.sentiment_history.push(SentimentSnapshot {
        timestamp: at(6, 0),
        item_count: 1,
        average_sentiment: -0.2,
        category_counts: CategoryCounts {
            fire: 1,
            ..Default::default()
        },
    });
    pasadena.sync_latest();
    let store = Arc::new(
        MemoryStore::new()
            .with_profile(pasadena.clone())
            .with_content(post(&pasadena, 1, at(5, 0), -0.2))
            .with_content(post(&pasadena, 2, at(7, 0), -0.8)),
    );
    let batch = aggregator(&store, AggregatorConfig::default());

    let first = batch.run(store.profiles().await, at(8, 0)).await;
    assert!(matches!(
        first.updated[0].update,
        ProfileUpdate::Appended { new_items: 1 }
    ));

    let second = batch.run(store.profiles().await, at(9, 0)).await;
    assert_eq!(second.updated[0].update, ProfileUpdate::Refreshed);

    let stored = store.profile(pasadena.id().unwrap()).await.unwrap();
    assert_eq!(stored.sentiment_history.len(), 2);
    assert_eq!(stored.sentiment_history[1].timestamp, at(9, 0));
    assert!((stored.latest_sentiment - (-0.5)).abs() < 1e-6);

    let summary = second.to_string();
    assert!(summary.contains("refreshed:        1"));
}
