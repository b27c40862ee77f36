use std::sync::Arc;

use tracing::{info, warn};

use firebird_common::error::Result;
use firebird_common::{
    ContentSource, DetectionConfig, DisasterRecord, DisasterSink, FirebirdError, ProfileSource,
    Summarizer,
};

use crate::detector::detect;
use crate::summarize::summarize_records;

/// Stats and output of one detection run.
#[derive(Debug, Default)]
pub struct DetectionReport {
    pub profiles_scanned: usize,
    pub seeds: usize,
    pub clusters: usize,
    pub discarded: usize,
    pub summarized: usize,
    pub records: Vec<DisasterRecord>,
}

impl std::fmt::Display for DetectionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Detection Run Complete ===")?;
        writeln!(f, "Profiles scanned:   {}", self.profiles_scanned)?;
        writeln!(f, "Seeds:              {}", self.seeds)?;
        writeln!(f, "Clusters:           {}", self.clusters)?;
        writeln!(f, "Discarded:          {} (non-disaster)", self.discarded)?;
        writeln!(f, "Disasters:          {}", self.records.len())?;
        writeln!(f, "Summarized:         {}", self.summarized)?;
        for record in &self.records {
            writeln!(
                f,
                "  {} {} ({:?}) at ({:.3}, {:.3}), {} locations",
                record.id,
                record.disaster_type,
                record.severity,
                record.centroid_lat,
                record.centroid_long,
                record.location_count
            )?;
        }
        Ok(())
    }
}

/// Fetch, detect, summarize, persist.
///
/// A failed profile fetch aborts the run before anything is written.
pub struct DetectionRun {
    profiles: Arc<dyn ProfileSource>,
    content: Arc<dyn ContentSource>,
    sink: Arc<dyn DisasterSink>,
    summarizer: Option<Arc<dyn Summarizer>>,
    config: DetectionConfig,
}

impl DetectionRun {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        content: Arc<dyn ContentSource>,
        sink: Arc<dyn DisasterSink>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            profiles,
            content,
            sink,
            summarizer: None,
            config,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub async fn execute(&self) -> Result<DetectionReport> {
        let profiles = self
            .profiles
            .fetch_all_profiles()
            .await
            .map_err(|e| FirebirdError::ProfileFetch(format!("{e:#}")))?;
        info!(profiles = profiles.len(), "Starting detection run");

        let outcome = detect(&profiles, &self.config);
        let mut records = outcome.records;

        let summarized = match &self.summarizer {
            Some(summarizer) if !records.is_empty() => {
                summarize_records(
                    &mut records,
                    self.content.as_ref(),
                    summarizer.as_ref(),
                    &self.config,
                )
                .await
            }
            _ => 0,
        };

        persist(self.sink.as_ref(), &records).await?;

        Ok(DetectionReport {
            profiles_scanned: profiles.len(),
            seeds: outcome.seeds,
            clusters: outcome.clusters,
            discarded: outcome.discarded,
            summarized,
            records,
        })
    }
}

/// Bulk write of the run's records. An empty set never reaches the sink.
pub async fn persist(sink: &dyn DisasterSink, records: &[DisasterRecord]) -> Result<()> {
    if records.is_empty() {
        info!("No disasters to persist");
        return Ok(());
    }
    sink.persist_disaster_records(records).await.map_err(|e| {
        warn!(error = %e, records = records.len(), "Failed to persist disasters");
        FirebirdError::Persistence(format!("{e:#}"))
    })?;
    info!(records = records.len(), "Persisted disasters");
    Ok(())
}
