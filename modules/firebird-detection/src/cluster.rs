use std::collections::{HashSet, VecDeque};

use tracing::debug;

use firebird_common::{distance_km, LocationProfile};

/// Ids already claimed by a cluster during one detection run.
pub type Claimed<'a> = HashSet<&'a str>;

/// Expand every unclaimed seed into a cluster of nearby profiles.
///
/// Seed order decides which cluster claims a shared neighbor, so callers
/// wanting reproducible output must pass seeds in a stable order.
pub fn build_clusters<'a>(
    all: &'a [LocationProfile],
    seeds: &[&'a LocationProfile],
    distance_threshold_km: f64,
) -> Vec<Vec<&'a LocationProfile>> {
    let mut claimed = Claimed::new();
    seeds
        .iter()
        .filter_map(|&seed| {
            let id = seed.id()?;
            if claimed.contains(id) {
                return None;
            }
            let cluster = expand(seed, all, distance_threshold_km, &mut claimed);
            debug!(seed = seed.name.as_str(), members = cluster.len(), "Cluster built");
            Some(cluster)
        })
        .collect()
}

/// Breadth-first expansion from `seed` over every profile within
/// `distance_threshold_km` of an already reached one.
///
/// Profiles claimed by an earlier cluster are still traversed but are not
/// added to this one. Profiles without an id are never reached.
pub fn expand<'a>(
    seed: &'a LocationProfile,
    all: &'a [LocationProfile],
    distance_threshold_km: f64,
    claimed: &mut Claimed<'a>,
) -> Vec<&'a LocationProfile> {
    let Some(seed_id) = seed.id() else {
        return Vec::new();
    };

    let mut members = Vec::new();
    let mut reached: HashSet<&'a str> = HashSet::from([seed_id]);
    let mut queue = VecDeque::from([seed]);

    while let Some(current) = queue.pop_front() {
        let Some(current_id) = current.id() else {
            continue;
        };
        if claimed.insert(current_id) {
            members.push(current);
        }

        for neighbor in all {
            let Some(neighbor_id) = neighbor.id() else {
                continue;
            };
            if neighbor_id == current_id || reached.contains(neighbor_id) {
                continue;
            }
            if distance_km(current.lat, current.lng, neighbor.lat, neighbor.lng)
                <= distance_threshold_km
            {
                reached.insert(neighbor_id);
                queue.push_back(neighbor);
            }
        }
    }

    members
}
