//! curio-id - Product identification service
//!
//! Turns a photo of a collectible into a metadata draft: vision keywords,
//! vendor-scoped image search, product page scraping, vision extraction and
//! merge. Serves the pipeline over HTTP REST + SSE.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use curio_common::config::{
    default_config_path, load_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use curio_common::events::EventBus;
use curio_id::config::Credentials;
use curio_id::db::items::SqliteItemRepository;
use curio_id::services::{
    GoogleImageSearchClient, HttpPageFetcher, ImageSearchBackend, KeywordExtractor,
    LocalImageStore, OpenAiVisionClient, PageScraper, ScopedSearchClient, StructuredExtractor,
    VisionBackend,
};
use curio_id::workflow::PipelineController;
use curio_id::AppState;

const MODULE_NAME: &str = "curio-id";

#[derive(Debug, Parser)]
#[command(name = "curio-id", version, about = "Photo-to-draft product identification service")]
struct Args {
    /// Root folder holding the database and stored images
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(long, env = "CURIO_BIND")]
    bind: Option<String>,

    /// TOML config file
    #[arg(long, env = "CURIO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&toml_config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new(&defaults.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting curio-id (product identification) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_config_path(config_path)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = curio_id::db::init_database_pool(&db_path).await?;

    let credentials = Credentials::resolve(&db_pool, &toml_config).await?;

    let vision: Option<Arc<dyn VisionBackend>> = match credentials.openai_api_key.clone() {
        Some(key) => Some(Arc::new(OpenAiVisionClient::new(
            key,
            toml_config.vision_model.clone(),
        )?)),
        None => None,
    };
    let search_backend: Option<Arc<dyn ImageSearchBackend>> = match credentials.search() {
        Some((key, engine_id)) => Some(Arc::new(GoogleImageSearchClient::new(key, engine_id)?)),
        None => None,
    };

    let bind_address = args
        .bind
        .clone()
        .or_else(|| toml_config.bind_address.clone())
        .unwrap_or(defaults.bind_address);
    let public_base_url = toml_config
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", bind_address));

    let vendors = toml_config.vendors.clone();
    let event_bus = EventBus::new(100);

    let controller = PipelineController::new(
        KeywordExtractor::new(vision.clone()),
        ScopedSearchClient::new(search_backend, vendors.clone()),
        PageScraper::new(Arc::new(HttpPageFetcher::new()?), vendors),
        StructuredExtractor::new(vision),
        Arc::new(SqliteItemRepository::new(db_pool)),
        Arc::new(LocalImageStore::new(
            initializer.images_path(),
            public_base_url,
        )),
        event_bus,
    );

    let state = AppState::new(Arc::new(controller)).with_images_dir(initializer.images_path());
    curio_id::api::spawn_idle_sweeper(
        state.clone(),
        chrono::Duration::minutes(curio_id::RUN_IDLE_TIMEOUT_MINUTES),
        std::time::Duration::from_secs(curio_id::RUN_SWEEP_INTERVAL_SECS),
    );
    let app = curio_id::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
