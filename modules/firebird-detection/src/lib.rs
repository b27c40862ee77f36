pub mod aggregate;
pub mod classify;
pub mod cluster;
pub mod detector;
pub mod run;
pub mod seeds;
pub mod summarize;

pub use aggregate::{aggregate_cluster, severity_for};
pub use classify::{classify_cluster, cluster_counts, dominant_category};
pub use cluster::build_clusters;
pub use detector::{detect, DetectionOutcome};
pub use run::{DetectionReport, DetectionRun};
pub use seeds::select_seeds;
pub use summarize::{collect_context, summarize_records};
