mod adapters;
mod handler;
mod router;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use proxy_backend::{BlobStore, Index};
use proxy_config::{Config, DatabaseDriver};
use proxy_fetcher::{Fetcher, ReqwestFetcher};
use proxy_storage_fs::LocalFsStore;
use proxy_storage_object::ObjectStoreBackend;
use tracing_subscriber::EnvFilter;

use crate::router::build_router;
use crate::state::AppContext;

/// Caching reverse proxy fronting language package registries.
#[derive(Debug, Parser)]
#[command(name = "proxy-server", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `listen` from the configuration file/environment.
    #[arg(long)]
    listen: Option<String>,

    /// Overrides `base-url` from the configuration file/environment.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `log.level` from the configuration file/environment.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    init_tracing(&config);

    let metrics_handle = proxy_metrics::install_recorder()?;

    let blobs: Arc<dyn BlobStore> = build_blob_store(&config).await?;
    let index: Arc<dyn Index> = build_index(&config).await?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::default_client()?);

    let cache = Arc::new(proxy_cache::CacheCore::new(index, blobs, fetcher.clone()));
    let ctx = AppContext {
        cache,
        fetcher,
        base_url: config.base_url.clone(),
    };

    let app = build_router(&ctx, &config, metrics_handle);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(listen = %config.listen, "proxy-server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log.format {
        proxy_config::LogFormat::Json => subscriber.json().init(),
        proxy_config::LogFormat::Text => subscriber.init(),
    }
}

async fn build_blob_store(config: &Config) -> anyhow::Result<Arc<dyn BlobStore>> {
    if config.storage.url.starts_with("file://") || !config.storage.url.contains("://") {
        let root = config.storage.path.clone().unwrap_or_else(|| "./data/blobs".to_string());
        return Ok(Arc::new(LocalFsStore::new(root)));
    }

    let url = url::Url::parse(&config.storage.url)?;
    let (store, _path) = object_store::parse_url(&url)?;
    let store: Arc<dyn object_store::ObjectStore> = Arc::from(store);
    Ok(Arc::new(ObjectStoreBackend::new(store)))
}

async fn build_index(config: &Config) -> anyhow::Result<Arc<dyn Index>> {
    let url = match config.database.driver {
        DatabaseDriver::EmbeddedSql => {
            let path = config.database.path.clone().unwrap_or_else(|| "./data/index.sqlite".to_string());
            format!("sqlite://{path}")
        }
        DatabaseDriver::PostgresSql => config.database.url.clone().ok_or_else(|| anyhow::anyhow!("database.url is required when driver is postgres-sql"))?,
    };
    let index = proxy_index_sql::SqlIndex::connect(&url, 10).await?;
    Ok(Arc::new(index))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
