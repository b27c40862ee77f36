use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use firebird_common::{ContentSource, ContentWindow, DetectionConfig, DisasterRecord, Summarizer};

const SEPARATOR: &str = "\n---\n";

/// Gather the posts behind a disaster into one prompt-sized corpus.
///
/// Walks member locations in id order, keeping non-empty texts observed
/// between the record's reported date and last update, until
/// `max_summary_items` is reached. Returns `None` when the record has no
/// time range or nothing was collected.
pub async fn collect_context(
    record: &DisasterRecord,
    content: &dyn ContentSource,
    config: &DetectionConfig,
) -> Option<String> {
    let (Some(from), Some(until)) = (record.reported_date, record.last_update) else {
        warn!(disaster_id = %record.id, "Disaster has no time range, skipping summary");
        return None;
    };
    let window = ContentWindow::spanning(from, until);

    let mut texts: Vec<String> = Vec::new();
    for location_id in &record.location_ids {
        if texts.len() >= config.max_summary_items {
            debug!(
                disaster_id = %record.id,
                limit = config.max_summary_items,
                "Summary item limit reached"
            );
            break;
        }
        let items = match content.fetch_content(location_id, window).await {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    disaster_id = %record.id,
                    location_id = location_id.as_str(),
                    error = %e,
                    "Failed to fetch content for summary, skipping location"
                );
                continue;
            }
        };
        let room = config.max_summary_items - texts.len();
        texts.extend(
            items
                .into_iter()
                .filter(|item| item.has_text())
                .take(room)
                .map(|item| item.text),
        );
    }

    if texts.is_empty() {
        return None;
    }
    Some(truncate_chars(texts.join(SEPARATOR), config.max_summary_chars))
}

/// Cut `text` to at most `max_bytes`, backing off to a char boundary.
fn truncate_chars(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}

/// Fill `summary` on every record the summarizer can describe.
///
/// Records are handled concurrently. A failure leaves that record's summary
/// empty and never affects the others. Returns how many were summarized.
pub async fn summarize_records(
    records: &mut [DisasterRecord],
    content: &dyn ContentSource,
    summarizer: &dyn Summarizer,
    config: &DetectionConfig,
) -> usize {
    info!(disasters = records.len(), "Starting summary generation");

    let summaries: Vec<(usize, Option<String>)> = stream::iter(records.iter().enumerate())
        .map(|(idx, record)| async move {
            (idx, summarize_one(record, content, summarizer, config).await)
        })
        .buffer_unordered(config.summary_concurrency.max(1))
        .collect()
        .await;

    let mut filled = 0;
    for (idx, summary) in summaries {
        if let Some(summary) = summary {
            records[idx].summary = Some(summary);
            filled += 1;
        }
    }
    info!(summarized = filled, "Summary generation finished");
    filled
}

async fn summarize_one(
    record: &DisasterRecord,
    content: &dyn ContentSource,
    summarizer: &dyn Summarizer,
    config: &DetectionConfig,
) -> Option<String> {
    let corpus = collect_context(record, content, config).await?;
    match summarizer.summarize(record.disaster_type, &corpus).await {
        Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
        Ok(_) => {
            warn!(disaster_id = %record.id, "Summarizer returned empty text");
            None
        }
        Err(e) => {
            warn!(disaster_id = %record.id, error = %e, "Summary generation failed");
            None
        }
    }
}
