//! EventCache Bulk Loader
//!
//! Seeds the persistent event collection from a JSON dump and builds the
//! indexes the cache service and workload generators rely on.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mongodb::Client;
use mongodb::bson::Document;
use std::path::PathBuf;
use tracing::info;

mod indexes;
mod load;

#[derive(Parser)]
#[command(name = "eventcache-loader")]
#[command(about = "Seed the event collection and build its indexes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    mongo: MongoArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Legacy, misspelled name still found in deployed `.env` files
const LEGACY_MONGO_URI_VAR: &str = "MONGO_CONECTION";

#[derive(Args)]
struct MongoArgs {
    /// MongoDB connection string [default: MONGO_CONECTION or mongodb://localhost:27017]
    #[arg(long, env = "MONGO_CONNECTION", global = true)]
    mongo_uri: Option<String>,

    /// Database name
    #[arg(long, env = "MONGO_DB_NAME", global = true, default_value = "Waze")]
    database: String,

    /// Collection name
    #[arg(long, env = "MONGO_COLLECTION_NAME", global = true, default_value = "Events")]
    collection: String,

    /// Field holding the event identifier
    #[arg(long, global = true, default_value = "uuid")]
    id_field: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert every event of a JSON array file, then build indexes
    Load {
        /// JSON file holding an array of event documents
        #[arg(short, long, default_value = "./data/waze_50k_events.json")]
        file: PathBuf,

        /// Documents per insert batch
        #[arg(short, long, default_value_t = 500)]
        batch_size: usize,

        /// Do not create indexes after loading
        #[arg(long)]
        skip_indexes: bool,
    },

    /// Only (re)build indexes
    Indexes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    let uri = resolve_mongo_uri(
        cli.mongo.mongo_uri.clone(),
        std::env::var(LEGACY_MONGO_URI_VAR).ok(),
    );
    let client = Client::with_uri_str(&uri)
        .await
        .context("Invalid MongoDB connection string")?;
    let collection = client
        .database(&cli.mongo.database)
        .collection::<Document>(&cli.mongo.collection);
    info!(
        "Using collection {}.{}",
        cli.mongo.database, cli.mongo.collection
    );

    match cli.command {
        Commands::Load {
            file,
            batch_size,
            skip_indexes,
        } => {
            let report = load::load_file(&collection, &file, batch_size)
                .await
                .context("Failed to load events")?;
            report.log_summary();

            if !skip_indexes {
                indexes::create_indexes(&collection, &cli.mongo.id_field)
                    .await
                    .context("Failed to create indexes")?;
            }
        }

        Commands::Indexes => {
            indexes::create_indexes(&collection, &cli.mongo.id_field)
                .await
                .context("Failed to create indexes")?;
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Explicit URI (flag or `MONGO_CONNECTION`), then the legacy variable, then
/// the local default. Blank values count as unset.
fn resolve_mongo_uri(explicit: Option<String>, legacy: Option<String>) -> String {
    explicit
        .filter(|uri| !uri.trim().is_empty())
        .or_else(|| legacy.filter(|uri| !uri.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MONGO_URI.to_string())
}
