//! Batch insertion of event documents

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use mongodb::Collection;
use mongodb::bson::{self, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of a load run
#[derive(Debug, Default)]
pub struct LoadReport {
    pub parsed: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub failed_batches: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    /// Inserted documents per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.inserted as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Inserted {} of {} documents in {:.2}s ({:.0} ops/s)",
            self.inserted,
            self.parsed,
            self.elapsed.as_secs_f64(),
            self.throughput()
        );
        if self.skipped > 0 || self.failed_batches > 0 {
            warn!(
                "{} entries skipped, {} batches reported write errors",
                self.skipped, self.failed_batches
            );
        }
    }
}

/// Parse a JSON array into BSON documents.
///
/// Array elements that are not objects are counted as skipped.
pub fn parse_documents(raw: &str) -> Result<(Vec<Document>, usize)> {
    let value: Value = serde_json::from_str(raw).context("File is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("Expected a JSON array of event documents");
    };

    let mut documents = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        if !item.is_object() {
            skipped += 1;
            continue;
        }
        match bson::to_document(&item) {
            Ok(document) => documents.push(document),
            Err(e) => {
                warn!("Skipping entry that cannot be converted to BSON: {}", e);
                skipped += 1;
            }
        }
    }
    Ok((documents, skipped))
}

/// Insert the contents of `path` in unordered batches of `batch_size`
pub async fn load_file(
    collection: &Collection<Document>,
    path: &Path,
    batch_size: usize,
) -> Result<LoadReport> {
    if batch_size == 0 {
        bail!("Batch size must be positive");
    }

    info!("Reading events from {:?}", path);
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let (documents, skipped) = parse_documents(&raw)?;
    info!("Preparing {} documents...", documents.len());

    let mut report = LoadReport {
        parsed: documents.len(),
        skipped,
        ..Default::default()
    };

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let started = Instant::now();
    for batch in documents.chunks(batch_size) {
        match collection.insert_many(batch.to_vec()).ordered(false).await {
            Ok(result) => report.inserted += result.inserted_ids.len(),
            Err(e) => {
                // Unordered inserts keep going past duplicate keys
                let inserted = inserted_despite_error(&e, batch.len());
                warn!(
                    "Batch write reported errors ({} of {} inserted): {}",
                    inserted,
                    batch.len(),
                    e
                );
                report.inserted += inserted;
                report.failed_batches += 1;
            }
        }
        pb.inc(batch.len() as u64);
    }
    report.elapsed = started.elapsed();
    pb.finish_with_message("done");

    Ok(report)
}

/// Documents an unordered `insert_many` wrote before reporting `err`.
///
/// Only per-document write errors leave the rest of the batch in place;
/// any other failure is treated as nothing written.
fn inserted_despite_error(err: &MongoError, batch_len: usize) -> usize {
    match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) if failure.write_concern_error.is_none() => {
            let failed = failure.write_errors.as_ref().map_or(0, Vec::len);
            unordered_inserted(batch_len, failed)
        }
        _ => 0,
    }
}

fn unordered_inserted(batch_len: usize, failed: usize) -> usize {
    batch_len.saturating_sub(failed)
}
