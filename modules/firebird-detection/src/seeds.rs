use tracing::warn;

use firebird_common::{DetectionConfig, LocationProfile};

/// Whether a profile's latest signal is strong enough to start a cluster.
///
/// Sentiment at or below the threshold, plus at least one disaster category
/// reaching the minimum count. `non_disaster` never counts.
pub fn is_seed(profile: &LocationProfile, config: &DetectionConfig) -> bool {
    profile.latest_sentiment <= config.sentiment_threshold
        && profile.latest_category_counts.max_disaster_count() >= config.min_disaster_count
}

/// Filter `profiles` down to seeds, preserving input order.
pub fn select_seeds<'a>(
    profiles: &'a [LocationProfile],
    config: &DetectionConfig,
) -> Vec<&'a LocationProfile> {
    profiles
        .iter()
        .filter(|profile| {
            if profile.id().is_none() {
                warn!(name = profile.name.as_str(), "Profile missing id, not seeding");
                return false;
            }
            is_seed(profile, config)
        })
        .collect()
}
