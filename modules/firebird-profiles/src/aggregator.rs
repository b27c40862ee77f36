use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use firebird_common::error::Result;
use firebird_common::time::{format_timestamp, parse_timestamp};
use firebird_common::{
    CategoryClassifier, CategoryCounts, ContentItem, ContentSource, ContentWindow, FirebirdError,
    LocationProfile, SentimentSnapshot,
};

/// What one aggregation pass did to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdate {
    /// First snapshot built from the full content history.
    Initialized { items: u32 },
    /// New snapshot appended for `new_items` unseen items.
    Appended { new_items: u32 },
    /// Latest snapshot's category counts rebuilt from the full history.
    Recounted { items: u32 },
    /// Nothing new; latest snapshot's timestamp moved to `now`.
    Refreshed,
    /// Profile has no id, so its content log cannot be addressed.
    SkippedMissingId,
}

/// Running mean after folding `new_count` items summing to `new_sum` into
/// a prior mean over `prior_count` items.
pub fn running_mean(prior_mean: f32, prior_count: u32, new_sum: f64, new_count: u32) -> f32 {
    let total = u64::from(prior_count) + u64::from(new_count);
    if total == 0 {
        return 0.0;
    }
    let combined = f64::from(prior_mean) * f64::from(prior_count) + new_sum;
    (combined / total as f64) as f32
}

/// Arithmetic mean of the items' sentiment scores; 0 for no items.
pub fn mean_sentiment(items: &[ContentItem]) -> f32 {
    if items.is_empty() {
        return 0.0;
    }
    (sentiment_sum(items) / items.len() as f64) as f32
}

fn sentiment_sum(items: &[ContentItem]) -> f64 {
    items.iter().map(|item| f64::from(item.sentiment_score)).sum()
}

fn count_categories(classifier: &dyn CategoryClassifier, items: &[ContentItem]) -> CategoryCounts {
    items.iter().map(|item| classifier.classify(item)).collect()
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Fold new content for one location into its sentiment history.
///
/// The content fetch is the only suspension point and happens before any
/// field is touched, so an `Err` leaves `profile` exactly as it was.
pub async fn update_profile(
    profile: &mut LocationProfile,
    content: &dyn ContentSource,
    classifier: &dyn CategoryClassifier,
    now: DateTime<Utc>,
) -> Result<ProfileUpdate> {
    let Some(location_id) = profile.id().map(str::to_string) else {
        warn!(name = profile.name.as_str(), "Profile missing id, skipping aggregation");
        return Ok(ProfileUpdate::SkippedMissingId);
    };

    let fetch = |window: ContentWindow| {
        let location_id = location_id.clone();
        async move {
            content
                .fetch_content(&location_id, window)
                .await
                .map_err(|e| FirebirdError::ContentFetch {
                    location_id,
                    message: format!("{e:#}"),
                })
        }
    };

    let Some(latest) = profile.latest_snapshot().cloned() else {
        let items = fetch(ContentWindow::everything_until(now)).await?;
        let counts = count_categories(classifier, &items);
        profile.sentiment_history.push(SentimentSnapshot {
            timestamp: now,
            item_count: saturating_u32(items.len() as u64),
            average_sentiment: mean_sentiment(&items),
            category_counts: counts,
        });
        observe_time_bounds(profile, &items);
        profile.sync_latest();
        debug!(location_id = location_id.as_str(), items = items.len(), "Initialized sentiment history");
        return Ok(ProfileUpdate::Initialized {
            items: saturating_u32(items.len() as u64),
        });
    };

    // Older profiles were written before category counts existed. Only
    // items already averaged into the snapshot are recounted; later ones
    // arrive through the append path on the next pass.
    if latest.category_counts.is_zero() && latest.item_count > 0 {
        let items = fetch(ContentWindow::everything_until(latest.timestamp)).await?;
        let counts = count_categories(classifier, &items);
        if let Some(last) = profile.sentiment_history.last_mut() {
            last.category_counts = counts;
        }
        observe_time_bounds(profile, &items);
        profile.sync_latest();
        debug!(location_id = location_id.as_str(), items = items.len(), "Recounted categories for legacy snapshot");
        return Ok(ProfileUpdate::Recounted {
            items: saturating_u32(items.len() as u64),
        });
    }

    let items = fetch(ContentWindow::between(latest.timestamp, now)).await?;
    // History timestamps never move backwards, even under clock skew.
    let stamp = now.max(latest.timestamp);

    if items.is_empty() {
        if let Some(last) = profile.sentiment_history.last_mut() {
            last.timestamp = stamp;
        }
        debug!(location_id = location_id.as_str(), "No new content, refreshed latest snapshot timestamp");
        return Ok(ProfileUpdate::Refreshed);
    }

    let new_items = saturating_u32(items.len() as u64);
    let mut counts = latest.category_counts;
    counts += count_categories(classifier, &items);

    // Category counts are authoritative when the two totals disagree.
    let item_count = latest
        .item_count
        .saturating_add(new_items)
        .max(saturating_u32(counts.total()));

    profile.sentiment_history.push(SentimentSnapshot {
        timestamp: stamp,
        item_count,
        average_sentiment: running_mean(
            latest.average_sentiment,
            latest.item_count,
            sentiment_sum(&items),
            new_items,
        ),
        category_counts: counts,
    });
    observe_time_bounds(profile, &items);
    profile.sync_latest();
    debug!(location_id = location_id.as_str(), new_items, item_count, "Appended sentiment snapshot");
    Ok(ProfileUpdate::Appended { new_items })
}

/// Widen `first_observed_at`/`last_observed_at` to cover the items.
fn observe_time_bounds(profile: &mut LocationProfile, items: &[ContentItem]) {
    let Some(earliest) = items.iter().map(|item| item.timestamp).min() else {
        return;
    };
    let latest = items.iter().map(|item| item.timestamp).max().unwrap_or(earliest);

    let first = match profile.first_observed_at.as_deref().map(|raw| (raw, parse_timestamp(raw))) {
        Some((_, Some(existing))) => existing.min(earliest),
        Some((raw, None)) => {
            warn!(name = profile.name.as_str(), raw, "Unparsable firstObservedAt, replacing");
            earliest
        }
        None => earliest,
    };
    let last = match profile.last_observed_at.as_deref().map(|raw| (raw, parse_timestamp(raw))) {
        Some((_, Some(existing))) => existing.max(latest),
        Some((raw, None)) => {
            warn!(name = profile.name.as_str(), raw, "Unparsable lastObservedAt, replacing");
            latest
        }
        None => latest,
    };

    profile.first_observed_at = Some(format_timestamp(first));
    profile.last_observed_at = Some(format_timestamp(last));
}
