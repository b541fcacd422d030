//! EventCache Traffic Generator
//!
//! Replays sampled event identifiers against the cache service and appends
//! one results row per simulation.

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use eventcache_traffic::sampler::{RECENCY_BIAS, RECENCY_WINDOW};
use eventcache_traffic::{
    ArrivalProcess, CacheServiceClient, Distribution, RunRecord, append_result, run_simulation,
    source,
};
use mongodb::Client;
use mongodb::bson::Document;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Constant,
    Poisson,
    /// Constant rate first, then Poisson
    Both,
}

#[derive(Parser)]
#[command(name = "eventcache-traffic")]
#[command(about = "Generate lookup traffic against the event cache service", long_about = None)]
#[command(version)]
struct Cli {
    /// Lookup route of the cache service
    #[arg(long, env = "CACHE_SERVICE_URL", default_value = "http://localhost:3001/event")]
    url: String,

    /// Identifier distribution
    #[arg(short, long, value_enum, default_value_t = Distribution::Uniform)]
    distribution: Distribution,

    /// Arrival process(es) to run
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Queries per simulation
    #[arg(short = 'n', long, env = "TOTAL_QUERIES", default_value_t = 1000)]
    total_queries: u64,

    /// Rate of the constant-rate simulation
    #[arg(long, env = "QUERIES_PER_SECOND_DIST1", default_value_t = 5.0)]
    qps: f64,

    /// Mean inter-arrival time of the Poisson simulation
    #[arg(long, env = "MEAN_ARRIVAL_TIME_DIST2_MS", default_value_t = 150)]
    mean_arrival_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Recency window size
    #[arg(long, default_value_t = RECENCY_WINDOW)]
    window: usize,

    /// Probability of drawing from the recency window
    #[arg(long, default_value_t = RECENCY_BIAS)]
    bias: f64,

    /// Read the event pool from a JSON array file instead of MongoDB
    #[arg(long)]
    ids_file: Option<PathBuf>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// CSV file results are appended to
    #[arg(long, default_value = "./results/simulation_results.csv")]
    results: PathBuf,

    /// Cache eviction policy label for the results file
    #[arg(long, env = "REDIS_POLICY", default_value = "N/A")]
    redis_policy: String,

    /// Cache memory limit label for the results file
    #[arg(long, env = "REDIS_MAXMEMORY", default_value = "N/A")]
    redis_maxmemory: String,

    /// MongoDB connection string [default: MONGO_CONECTION or mongodb://localhost:27017]
    #[arg(long, env = "MONGO_CONNECTION")]
    mongo_uri: Option<String>,

    /// Database name
    #[arg(long, env = "MONGO_DB_NAME", default_value = "Waze")]
    database: String,

    /// Collection name
    #[arg(long, env = "MONGO_COLLECTION_NAME", default_value = "Events")]
    collection: String,

    /// Field holding the event identifier
    #[arg(long, default_value = "uuid")]
    id_field: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    let constant = ArrivalProcess::constant(cli.qps)
        .ok_or_else(|| anyhow!("--qps must be a positive rate, got {}", cli.qps))?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let pool_size = cli.distribution.pool_size(cli.total_queries);
    let events = match cli.ids_file {
        Some(ref path) => source::sample_from_file(path, &cli.id_field, pool_size, &mut rng)?,
        None => {
            let uri = source::resolve_mongo_uri(
                cli.mongo_uri.clone(),
                std::env::var(source::LEGACY_MONGO_URI_VAR).ok(),
            );
            let client = Client::with_uri_str(&uri)
                .await
                .context("Invalid MongoDB connection string")?;
            let collection = client
                .database(&cli.database)
                .collection::<Document>(&cli.collection);
            let events =
                source::sample_from_collection(&collection, &cli.id_field, pool_size).await?;
            client.shutdown().await;
            events
        }
    };
    if events.is_empty() {
        bail!("no events available to sample from");
    }

    let client = CacheServiceClient::new(&cli.url, Duration::from_millis(cli.timeout_ms))?;
    let processes = match cli.mode {
        Mode::Constant => vec![constant],
        Mode::Poisson => vec![ArrivalProcess::Poisson {
            mean: Duration::from_millis(cli.mean_arrival_ms),
        }],
        Mode::Both => vec![
            constant,
            ArrivalProcess::Poisson {
                mean: Duration::from_millis(cli.mean_arrival_ms),
            },
        ],
    };

    info!(
        "Target {} | distribution {} | policy {} | maxmemory {}",
        cli.url,
        cli.distribution.label(),
        cli.redis_policy,
        cli.redis_maxmemory
    );

    for arrival in processes {
        // Each run starts with a fresh recency window
        let mut sampler = cli.distribution.build_sampler(&events, cli.window, cli.bias);
        let stats =
            run_simulation(&client, &mut sampler, arrival, cli.total_queries, &mut rng).await;

        let record = RunRecord {
            timestamp: Utc::now(),
            redis_policy: &cli.redis_policy,
            redis_max_memory: &cli.redis_maxmemory,
            distribution: cli.distribution.label(),
            simulation: arrival.name(),
            stats: &stats,
        };
        append_result(&cli.results, &record)
            .with_context(|| format!("Failed to write {:?}", cli.results))?;
        info!("Results appended to {:?}", cli.results);
    }

    Ok(())
}
