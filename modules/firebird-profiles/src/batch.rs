use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use firebird_common::error::Result;
use firebird_common::{
    AggregatorConfig, CategoryClassifier, ContentSource, FirebirdError, LocationProfile,
    ProfileSink, ProfileSource,
};

use crate::aggregator::{update_profile, ProfileUpdate};

/// A location whose profile was updated and persisted.
#[derive(Debug, Clone)]
pub struct LocationSuccess {
    pub location_id: String,
    pub update: ProfileUpdate,
}

/// A location whose update was abandoned. Its stored profile is unchanged.
#[derive(Debug)]
pub struct LocationFailure {
    pub location_id: String,
    pub error: FirebirdError,
}

/// Outcome of one aggregation pass over many locations.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub updated: Vec<LocationSuccess>,
    /// Names of profiles skipped for lacking an id.
    pub skipped: Vec<String>,
    pub failed: Vec<LocationFailure>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&ProfileUpdate) -> bool) -> usize {
        self.updated.iter().filter(|s| pred(&s.update)).count()
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Aggregation Complete ===")?;
        writeln!(f, "Locations updated:  {}", self.updated.len())?;
        writeln!(
            f,
            "  initialized:      {}",
            self.count(|u| matches!(u, ProfileUpdate::Initialized { .. }))
        )?;
        writeln!(
            f,
            "  appended:         {}",
            self.count(|u| matches!(u, ProfileUpdate::Appended { .. }))
        )?;
        writeln!(
            f,
            "  recounted:        {}",
            self.count(|u| matches!(u, ProfileUpdate::Recounted { .. }))
        )?;
        writeln!(
            f,
            "  refreshed:        {}",
            self.count(|u| matches!(u, ProfileUpdate::Refreshed))
        )?;
        writeln!(f, "Locations skipped:  {}", self.skipped.len())?;
        writeln!(f, "Locations failed:   {}", self.failed.len())?;
        for failure in &self.failed {
            writeln!(f, "  {}: {}", failure.location_id, failure.error)?;
        }
        Ok(())
    }
}

enum Outcome {
    Updated(LocationSuccess),
    Skipped(String),
    Failed(LocationFailure),
}

/// Runs the incremental aggregator over many locations concurrently.
///
/// Each location reads and writes only its own profile, so there is no
/// ordering between them. Callers must not run two passes over the same
/// location at once.
pub struct BatchAggregator {
    content: Arc<dyn ContentSource>,
    sink: Arc<dyn ProfileSink>,
    classifier: Arc<dyn CategoryClassifier>,
    config: AggregatorConfig,
}

impl BatchAggregator {
    pub fn new(
        content: Arc<dyn ContentSource>,
        sink: Arc<dyn ProfileSink>,
        classifier: Arc<dyn CategoryClassifier>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            content,
            sink,
            classifier,
            config,
        }
    }

    /// Fetch every profile from `source`, then [`run`](Self::run) over them.
    pub async fn run_from_source(
        &self,
        source: &dyn ProfileSource,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        let profiles = source
            .fetch_all_profiles()
            .await
            .map_err(|e| FirebirdError::ProfileFetch(format!("{e:#}")))?;
        Ok(self.run(profiles, now).await)
    }

    pub async fn run(&self, profiles: Vec<LocationProfile>, now: DateTime<Utc>) -> BatchReport {
        let total = profiles.len();
        info!(
            locations = total,
            concurrency = self.config.concurrency,
            "Starting aggregation pass"
        );

        let outcomes: Vec<Outcome> = stream::iter(profiles)
            .map(|profile| self.process(profile, now))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Updated(success) => report.updated.push(success),
                Outcome::Skipped(name) => report.skipped.push(name),
                Outcome::Failed(failure) => {
                    warn!(
                        location_id = failure.location_id.as_str(),
                        error = %failure.error,
                        "Location aggregation failed"
                    );
                    report.failed.push(failure);
                }
            }
        }

        info!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Aggregation pass complete"
        );
        report
    }

    async fn process(&self, mut profile: LocationProfile, now: DateTime<Utc>) -> Outcome {
        let Some(location_id) = profile.id().map(str::to_string) else {
            warn!(name = profile.name.as_str(), "Profile missing id, skipping aggregation");
            return Outcome::Skipped(profile.name);
        };

        let timeout = self.config.fetch_timeout;
        let update = match tokio::time::timeout(
            timeout,
            update_profile(&mut profile, self.content.as_ref(), self.classifier.as_ref(), now),
        )
        .await
        {
            Ok(Ok(update)) => update,
            Ok(Err(error)) => return Outcome::Failed(LocationFailure { location_id, error }),
            Err(_) => {
                return Outcome::Failed(LocationFailure {
                    error: FirebirdError::Timeout {
                        location_id: location_id.clone(),
                        seconds: timeout.as_secs(),
                    },
                    location_id,
                })
            }
        };

        if let Err(e) = self.sink.persist_profile_update(&profile).await {
            return Outcome::Failed(LocationFailure {
                location_id,
                error: FirebirdError::Persistence(format!("{e:#}")),
            });
        }

        Outcome::Updated(LocationSuccess {
            location_id,
            update,
        })
    }
}
