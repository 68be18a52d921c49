//! curio-id library interface
//!
//! Photo-to-draft product identification: the pipeline components, the run
//! state machine and the HTTP API around them.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use uuid::Uuid;

use curio_common::events::EventBus;

use crate::workflow::{PipelineController, PipelineRun};

/// Largest accepted upload (photos from phone cameras)
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Runs untouched for this long are dropped by the idle sweep
pub const RUN_IDLE_TIMEOUT_MINUTES: i64 = 30;

/// How often the idle sweep runs
pub const RUN_SWEEP_INTERVAL_SECS: u64 = 60;

/// Shared handle to one in-memory run
pub type SharedRun = Arc<Mutex<PipelineRun>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PipelineController>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Active pipeline runs by run id
    pub runs: Arc<RwLock<HashMap<Uuid, SharedRun>>>,
    /// Cancellation tokens for active runs
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Directory served under `/images`
    pub images_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(controller: Arc<PipelineController>) -> Self {
        Self {
            event_bus: controller.event_bus().clone(),
            controller,
            runs: Arc::new(RwLock::new(HashMap::new())),
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            images_dir: None,
        }
    }

    pub fn with_images_dir(mut self, images_dir: PathBuf) -> Self {
        self.images_dir = Some(images_dir);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let images_dir = state.images_dir.clone();

    let router = Router::new()
        .merge(api::identify_routes())
        .merge(api::pipeline_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    match images_dir {
        Some(dir) => router.nest_service("/images", ServeDir::new(dir)),
        None => router,
    }
}
