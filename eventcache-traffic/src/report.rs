//! Run statistics and the CSV results file

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::client::{OutcomeKind, QueryOutcome};

pub const CSV_HEADER: &str = "Timestamp,RedisPolicy,RedisMaxMemory,Distribution,SimulationType,TotalQueries,CacheHits,CacheMisses,Errors,HitRatePercent,AvgLatencyMs";

/// Client-side tally of one simulation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total: u64,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub latency_total: Duration,
}

impl RunStats {
    pub fn record(&mut self, outcome: &QueryOutcome) {
        self.total += 1;
        self.latency_total += outcome.latency;
        match outcome.kind {
            OutcomeKind::Hit => self.hits += 1,
            OutcomeKind::Miss => self.misses += 1,
            OutcomeKind::Unknown => {}
            OutcomeKind::HttpError(_) | OutcomeKind::Timeout | OutcomeKind::Transport(_) => {
                self.errors += 1
            }
        }
    }

    /// Percentage of hits over all queries
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.hits as f64 / self.total as f64 * 100.0
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.latency_total.as_secs_f64() * 1000.0 / self.total as f64
    }
}

/// One row of the results file
#[derive(Debug, Clone)]
pub struct RunRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub redis_policy: &'a str,
    pub redis_max_memory: &'a str,
    pub distribution: &'a str,
    pub simulation: &'a str,
    pub stats: &'a RunStats,
}

impl RunRecord<'_> {
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{:.2},{:.2}",
            self.timestamp.to_rfc3339(),
            csv_field(self.redis_policy),
            csv_field(self.redis_max_memory),
            csv_field(self.distribution),
            csv_field(self.simulation),
            self.stats.total,
            self.stats.hits,
            self.stats.misses,
            self.stats.errors,
            self.stats.hit_rate(),
            self.stats.avg_latency_ms()
        )
    }
}

/// Append `record`, writing the header first when the file is new or empty
pub fn append_result(path: &Path, record: &RunRecord<'_>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_header {
        writeln!(file, "{}", CSV_HEADER)?;
    }
    writeln!(file, "{}", record.to_csv_line())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
