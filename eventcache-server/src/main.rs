use anyhow::{Context, Result};
use clap::Parser;
use eventcache_server::{
    AppState, CacheStore, DocumentStore, MongoDocumentStore, RedisCacheStore, ServerConfig,
    create_router, init_metrics,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "eventcache-server")]
#[command(about = "Read-through cache in front of the event document store", long_about = None)]
#[command(version)]
struct Args {
    /// YAML configuration file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.config {
        Some(ref path) => {
            let mut config = ServerConfig::from_file(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            config.apply_env(|name| std::env::var(name).ok())?;
            config
        }
        None => ServerConfig::from_env()?,
    };
    config.validate()?;

    init_tracing(&config);
    info!("Starting EventCache Server v{}", env!("CARGO_PKG_VERSION"));
    init_metrics();

    // Both stores must answer before we serve anything
    let cache: Arc<dyn CacheStore> = Arc::new(
        RedisCacheStore::connect(&config.cache_store)
            .await
            .context("Redis is unreachable")?,
    );
    let documents: Arc<dyn DocumentStore> = Arc::new(
        MongoDocumentStore::connect(&config.document_store)
            .await
            .context("MongoDB is unreachable")?,
    );

    let state = AppState::new(cache, documents, &config);
    let monitor = state.health.start_monitor(config.health_probe_interval());
    let app = create_router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Cache service listening on http://{} (TTL {}s)",
        addr, config.cache_store.ttl_secs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    info!("Connections closed, bye");
    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing connections...");
}
