use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use firebird_common::time::parse_timestamp;
use firebird_common::{
    BoundingBox, Category, DisasterRecord, DisasterStatus, LocationProfile, Severity,
    SeverityThresholds,
};

use crate::classify::cluster_counts;

/// Severity from cluster sentiment. Each threshold is checked in turn and
/// overwrites the previous result, so the lowest one crossed wins.
pub fn severity_for(sentiment: f32, thresholds: &SeverityThresholds) -> Severity {
    let mut severity = Severity::Low;
    if sentiment < thresholds.medium {
        severity = Severity::Medium;
    }
    if sentiment < thresholds.high {
        severity = Severity::High;
    }
    if sentiment < thresholds.critical {
        severity = Severity::Critical;
    }
    severity
}

/// Reduce a cluster to one disaster record. Returns `None` for an empty
/// cluster.
pub fn aggregate_cluster(
    cluster: &[&LocationProfile],
    disaster_type: Category,
    thresholds: &SeverityThresholds,
) -> Option<DisasterRecord> {
    let first = cluster.first()?;
    let n = cluster.len() as f64;

    let mut bounding_box = BoundingBox::at(first.lat, first.lng);
    let mut location_ids = Vec::with_capacity(cluster.len());
    let (mut sum_lat, mut sum_lng, mut sum_sentiment) = (0.0f64, 0.0f64, 0.0f64);
    let mut total_skeets_amount = 0u64;
    let mut reported_date: Option<DateTime<Utc>> = None;
    let mut last_update: Option<DateTime<Utc>> = None;

    for member in cluster {
        match member.id() {
            Some(id) => location_ids.push(id.to_string()),
            None => warn!(
                address = member.formatted_address.as_str(),
                "Cluster member missing id, leaving it out of locationIds"
            ),
        }

        bounding_box.extend(member.lat, member.lng);
        sum_lat += member.lat;
        sum_lng += member.lng;
        sum_sentiment += f64::from(member.latest_sentiment);
        total_skeets_amount += u64::from(member.latest_skeet_count);

        let first_seen = member.first_observed_at.as_deref();
        if let Some(ts) = member_timestamp(member, first_seen, "firstObservedAt") {
            reported_date = Some(reported_date.map_or(ts, |current| current.min(ts)));
        }
        let last_seen = member.last_observed_at.as_deref();
        if let Some(ts) = member_timestamp(member, last_seen, "lastObservedAt") {
            last_update = Some(last_update.map_or(ts, |current| current.max(ts)));
        }
    }
    location_ids.sort();

    let cluster_sentiment = (sum_sentiment / n) as f32;

    Some(DisasterRecord {
        id: Uuid::new_v4(),
        centroid_lat: sum_lat / n,
        centroid_long: sum_lng / n,
        location_count: cluster.len(),
        location_ids,
        bounding_box,
        disaster_type,
        severity: severity_for(cluster_sentiment, thresholds),
        status: DisasterStatus::Active,
        reported_date,
        last_update,
        total_skeets_amount,
        cluster_sentiment,
        cluster_counts: cluster_counts(cluster),
        summary: None,
    })
}

fn member_timestamp(
    member: &LocationProfile,
    raw: Option<&str>,
    field: &'static str,
) -> Option<DateTime<Utc>> {
    let raw = raw.filter(|raw| !raw.trim().is_empty())?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        warn!(name = member.name.as_str(), field, raw, "Unparsable timestamp, skipping");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use firebird_common::CategoryCounts;

    fn member(name: &str, lat: f64, lng: f64, sentiment: f32) -> LocationProfile {
        let mut p = LocationProfile::new(name, name, lat, lng, "LOCATION");
        p.latest_sentiment = sentiment;
        p.latest_skeet_count = 10;
        p.latest_category_counts = CategoryCounts {
            fire: 6,
            non_disaster: 4,
            ..Default::default()
        };
        p
    }

    fn aggregate(cluster: &[&LocationProfile]) -> DisasterRecord {
        aggregate_cluster(cluster, Category::Wildfire, &SeverityThresholds::default()).unwrap()
    }

    #[test]
    fn severity_escalates_through_each_threshold() {
        let t = SeverityThresholds::default();
        assert_eq!(severity_for(0.2, &t), Severity::Low);
        assert_eq!(severity_for(-0.43, &t), Severity::Low);
        assert_eq!(severity_for(-0.44, &t), Severity::Medium);
        assert_eq!(severity_for(-0.53, &t), Severity::Medium);
        assert_eq!(severity_for(-0.54, &t), Severity::High);
        assert_eq!(severity_for(-0.63, &t), Severity::High);
        assert_eq!(severity_for(-0.631, &t), Severity::Critical);
        assert_eq!(severity_for(-5.0, &t), Severity::Critical);
    }

    #[test]
    fn severity_never_de_escalates_as_sentiment_drops() {
        let t = SeverityThresholds::default();
        let mut previous = Severity::Low;
        for step in 0..200 {
            let sentiment = 0.5 - step as f32 * 0.01;
            let severity = severity_for(sentiment, &t);
            assert!(severity >= previous, "severity dropped at {sentiment}");
            previous = severity;
        }
        assert_eq!(previous, Severity::Critical);
    }

    #[test]
    fn empty_cluster_has_no_record() {
        assert!(aggregate_cluster(&[], Category::Wildfire, &SeverityThresholds::default()).is_none());
    }

    #[test]
    fn centroid_is_the_mean_and_box_holds_every_member() {
        let a = member("a", 34.0, -118.5, -0.2);
        let b = member("b", 34.3, -118.1, -0.4);
        let c = member("c", 33.9, -118.3, -0.6);
        let cluster = [&a, &b, &c];

        let record = aggregate(&cluster);

        assert!((record.centroid_lat - (34.0 + 34.3 + 33.9) / 3.0).abs() < 1e-9);
        assert!((record.centroid_long - (-118.5 - 118.1 - 118.3) / 3.0).abs() < 1e-9);
        for m in cluster {
            assert!(record.bounding_box.contains(m.lat, m.lng));
        }
        assert_eq!(record.bounding_box.min_lat, 33.9);
        assert_eq!(record.bounding_box.max_lon, -118.1);
        assert!((record.cluster_sentiment - (-0.4)).abs() < 1e-6);
        assert_eq!(record.severity, Severity::Low);
    }

    #[test]
    fn totals_and_ids_are_aggregated() {
        let a = member("zeta", 1.0, 1.0, -0.7);
        let b = member("alpha", 1.1, 1.1, -0.7);
        let mut ghost = member("ghost", 1.2, 1.2, -0.7);
        ghost.id = None;

        let record = aggregate(&[&a, &b, &ghost]);

        let mut expected = vec![a.id().unwrap().to_string(), b.id().unwrap().to_string()];
        expected.sort();
        assert_eq!(record.location_ids, expected);
        assert_eq!(record.location_count, 3);
        assert_eq!(record.total_skeets_amount, 30);
        assert_eq!(record.cluster_counts.fire, 18);
        assert_eq!(record.cluster_counts.non_disaster, 12);
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.status, DisasterStatus::Active);
        assert_eq!(record.disaster_type, Category::Wildfire);
        assert!(record.summary.is_none());
    }

    #[test]
    fn time_range_spans_members_and_skips_bad_values() {
        let mut a = member("a", 0.0, 0.0, -0.2);
        a.first_observed_at = Some("2025-01-07T18:30:00Z".to_string());
        a.last_observed_at = Some("2025-01-08T02:00:00.250Z".to_string());
        let mut b = member("b", 0.0, 0.1, -0.2);
        b.first_observed_at = Some("yesterday".to_string());
        b.last_observed_at = Some("2025-01-09T11:00:00Z".to_string());
        let mut c = member("c", 0.0, 0.2, -0.2);
        c.first_observed_at = Some("2025-01-07T09:00:00Z".to_string());
        c.last_observed_at = Some(String::new());

        let record = aggregate(&[&a, &b, &c]);

        assert_eq!(
            record.reported_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 7, 9, 0, 0).unwrap())
        );
        assert_eq!(
            record.last_update,
            Some(Utc.with_ymd_and_hms(2025, 1, 9, 11, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_timestamps_leave_range_empty() {
        let a = member("a", 0.0, 0.0, -0.2);
        let record = aggregate(&[&a]);
        assert!(record.reported_date.is_none());
        assert!(record.last_update.is_none());
    }

    #[test]
    fn every_record_gets_a_fresh_id() {
        let a = member("a", 0.0, 0.0, -0.2);
        assert_ne!(aggregate(&[&a]).id, aggregate(&[&a]).id);
    }
}
