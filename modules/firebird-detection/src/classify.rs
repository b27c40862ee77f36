use firebird_common::{Category, CategoryCounts, LocationProfile};

/// Sum of the members' latest category counts.
pub fn cluster_counts(cluster: &[&LocationProfile]) -> CategoryCounts {
    let mut total = CategoryCounts::default();
    for member in cluster {
        total += member.latest_category_counts;
    }
    total
}

/// Dominant disaster category of a cluster's combined counts.
///
/// Each category must strictly beat the best so far, so ties go to the
/// earlier of wildfire, hurricane, earthquake. No positive count at all
/// means `NonDisaster`.
pub fn dominant_category(counts: &CategoryCounts) -> Category {
    let mut best = (Category::NonDisaster, 0u32);
    for (category, count) in [
        (Category::Wildfire, counts.fire),
        (Category::Hurricane, counts.hurricane),
        (Category::Earthquake, counts.earthquake),
    ] {
        if count > best.1 {
            best = (category, count);
        }
    }
    best.0
}

pub fn classify_cluster(cluster: &[&LocationProfile]) -> Category {
    dominant_category(&cluster_counts(cluster))
}
