use tracing::{debug, info};

use firebird_common::{Category, DetectionConfig, DisasterRecord, LocationProfile};

use crate::aggregate::aggregate_cluster;
use crate::classify::classify_cluster;
use crate::cluster::build_clusters;
use crate::seeds::select_seeds;

/// Records from one pass over a profile snapshot, plus the counts behind them.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub records: Vec<DisasterRecord>,
    pub seeds: usize,
    pub clusters: usize,
    /// Clusters that classified as non-disaster or came out empty.
    pub discarded: usize,
}

/// Seed, cluster, classify and aggregate over an immutable profile snapshot.
///
/// Pure computation. Output depends on the order of `profiles`.
pub fn detect(profiles: &[LocationProfile], config: &DetectionConfig) -> DetectionOutcome {
    let seeds = select_seeds(profiles, config);
    let clusters = build_clusters(profiles, &seeds, config.distance_threshold_km);

    let mut outcome = DetectionOutcome {
        seeds: seeds.len(),
        clusters: clusters.len(),
        ..Default::default()
    };

    for cluster in &clusters {
        let category = classify_cluster(cluster);
        if category == Category::NonDisaster {
            debug!(members = cluster.len(), "Cluster classified non-disaster, discarding");
            outcome.discarded += 1;
            continue;
        }
        match aggregate_cluster(cluster, category, &config.severity) {
            Some(record) => {
                debug!(
                    disaster_id = %record.id,
                    disaster_type = %record.disaster_type,
                    locations = record.location_count,
                    "Disaster cluster identified"
                );
                outcome.records.push(record);
            }
            None => outcome.discarded += 1,
        }
    }

    info!(
        profiles = profiles.len(),
        seeds = outcome.seeds,
        clusters = outcome.clusters,
        disasters = outcome.records.len(),
        "Detection complete"
    );
    outcome
}
