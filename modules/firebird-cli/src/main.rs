use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use firebird_common::telemetry::init_tracing;
use firebird_common::{Config, MemoryStore, Snapshot};
use firebird_detection::DetectionRun;
use firebird_profiles::{BatchAggregator, ScoreClassifier};

#[derive(Parser)]
#[command(name = "firebird", about = "Disaster detection over per-location sentiment profiles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fold new content into every profile of a snapshot
    Aggregate {
        /// Snapshot JSON with profiles and content
        #[arg(long)]
        snapshot: PathBuf,
        /// Where to write the updated snapshot (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Aggregation time as RFC3339 (defaults to now)
        #[arg(long)]
        now: Option<String>,
    },
    /// Cluster the snapshot's profiles into disaster records
    Detect {
        #[arg(long)]
        snapshot: PathBuf,
        /// Where to write the records (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the JSON Schema of the snapshot file
    Schema {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("firebird=info")?;

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.log_summary();

    match cli.command {
        Command::Aggregate { snapshot, out, now } => {
            let now = match now {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("--now '{raw}' is not RFC3339"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let store = Arc::new(load_store(&snapshot)?);
            let aggregator = BatchAggregator::new(
                store.clone(),
                store.clone(),
                Arc::new(ScoreClassifier),
                config.aggregator.clone(),
            );
            let report = aggregator.run_from_source(store.as_ref(), now).await?;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "Some locations were not updated");
            }
            info!("Aggregation complete. {report}");

            write_output(out.as_deref(), &store.snapshot().await.to_json()?)?;
        }
        Command::Detect { snapshot, out } => {
            let store = Arc::new(load_store(&snapshot)?);
            let run = DetectionRun::new(
                store.clone(),
                store.clone(),
                store.clone(),
                config.detection.clone(),
            );
            let report = run.execute().await?;
            info!("Detection complete. {report}");

            let json = serde_json::to_string_pretty(&report.records)?;
            write_output(out.as_deref(), &json)?;
        }
        Command::Schema { out } => {
            write_output(out.as_deref(), &Snapshot::json_schema()?)?;
        }
    }

    Ok(())
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot = Snapshot::from_json(&raw)?;
    info!(
        path = %path.display(),
        profiles = snapshot.profiles.len(),
        content = snapshot.content.len(),
        "Loaded snapshot"
    );
    Ok(MemoryStore::from_snapshot(snapshot))
}

fn write_output(out: Option<&Path>, json: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{json}"),
    }
    Ok(())
}
