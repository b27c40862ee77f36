pub mod aggregator;
pub mod batch;
pub mod classifier;

pub use aggregator::{mean_sentiment, running_mean, update_profile, ProfileUpdate};
pub use batch::{BatchAggregator, BatchReport, LocationFailure, LocationSuccess};
pub use classifier::ScoreClassifier;
