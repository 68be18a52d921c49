//! Pipeline run endpoints
//!
//! Each request holds the run's lock while its stage work is in flight, so
//! requests against one run are serialized. Cancel fires the run's token
//! first, which makes any in-flight stage give up and release the lock.
//! A run that lands in capture or success is forgotten, and runs left idle
//! are dropped by [`spawn_idle_sweeper`].

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use curio_common::events::PipelineStage;

use crate::api::read_photo;
use crate::error::{ApiError, ApiResult};
use crate::workflow::{PipelineError, PipelineRun, SubmissionRequest};
use crate::{AppState, SharedRun};

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

/// POST /pipeline
///
/// Starts a run from the uploaded photo and returns once the candidate list
/// is ready (stage `selecting`).
pub async fn start_pipeline(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PipelineRun>> {
    let photo = read_photo(multipart).await?;

    let run_id = Uuid::new_v4();
    let run: SharedRun = Arc::new(Mutex::new(PipelineRun::new(run_id)));
    let token = CancellationToken::new();

    // Lock before publishing so no other request sees the empty run
    let mut guard = run.clone().lock_owned().await;
    state.runs.write().await.insert(run_id, run);
    state
        .cancellation_tokens
        .write()
        .await
        .insert(run_id, token.clone());

    tracing::info!(run_id = %run_id, "Pipeline run started");

    let result = state.controller.start(&mut guard, photo, &token).await;
    settle(&state, &guard, result).await
}

/// GET /pipeline/{run_id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, _) = lookup(&state, run_id).await?;
    let guard = run.lock().await;
    Ok(Json(guard.clone()))
}

/// POST /pipeline/{run_id}/select
pub async fn select_candidate(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, token) = lookup(&state, run_id).await?;
    let mut guard = run.lock().await;

    let result = state
        .controller
        .select(&mut guard, request.index, &token)
        .await;
    settle(&state, &guard, result).await
}

/// POST /pipeline/{run_id}/skip
pub async fn skip_selection(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, token) = lookup(&state, run_id).await?;
    let mut guard = run.lock().await;

    let result = state.controller.skip(&mut guard, &token).await;
    settle(&state, &guard, result).await
}

/// POST /pipeline/{run_id}/submit
pub async fn submit_draft(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(request): Json<SubmissionRequest>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, token) = lookup(&state, run_id).await?;
    let mut guard = run.lock().await;

    let result = state.controller.submit(&mut guard, request, &token).await;
    settle(&state, &guard, result).await
}

/// POST /pipeline/{run_id}/cancel
pub async fn cancel_pipeline(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, token) = lookup(&state, run_id).await?;
    token.cancel();

    let mut guard = run.lock().await;
    let result = state.controller.cancel(&mut guard).map(|_| ());
    tracing::info!(run_id = %run_id, "Pipeline run cancelled");
    settle(&state, &guard, result).await
}

/// POST /pipeline/{run_id}/reset
pub async fn reset_pipeline(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let (run, _) = lookup(&state, run_id).await?;
    let mut guard = run.lock().await;

    let result = state.controller.reset(&mut guard).map(|_| ());
    settle(&state, &guard, result).await
}

async fn lookup(state: &AppState, run_id: Uuid) -> ApiResult<(SharedRun, CancellationToken)> {
    let run = state
        .runs
        .read()
        .await
        .get(&run_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline run {}", run_id)))?;

    let token = state
        .cancellation_tokens
        .read()
        .await
        .get(&run_id)
        .cloned()
        .unwrap_or_default();

    Ok((run, token))
}

/// Forget finished runs, record failures, build the response
async fn settle(
    state: &AppState,
    run: &PipelineRun,
    result: Result<(), PipelineError>,
) -> ApiResult<Json<PipelineRun>> {
    if matches!(run.stage, PipelineStage::Capture | PipelineStage::Success) {
        release(state, run.run_id).await;
        tracing::debug!(run_id = %run.run_id, stage = %run.stage, "Pipeline run released");
    }

    if let Some(message) = &run.error {
        *state.last_error.write().await = Some(message.clone());
    }

    match result {
        Ok(()) => Ok(Json(run.clone())),
        Err(e) => Err(e.into()),
    }
}

async fn release(state: &AppState, run_id: Uuid) {
    state.runs.write().await.remove(&run_id);
    if let Some(token) = state.cancellation_tokens.write().await.remove(&run_id) {
        token.cancel();
    }
}

/// Drop runs whose last transition is older than `max_idle`
///
/// Runs locked by an in-flight request are left alone. Returns how many runs
/// were dropped.
pub async fn sweep_idle_runs(state: &AppState, max_idle: chrono::Duration) -> usize {
    let cutoff = Utc::now() - max_idle;

    let idle: Vec<Uuid> = state
        .runs
        .read()
        .await
        .iter()
        .filter_map(|(run_id, run)| match run.try_lock() {
            Ok(guard) if guard.updated_at < cutoff => Some(*run_id),
            _ => None,
        })
        .collect();

    for run_id in &idle {
        release(state, *run_id).await;
        tracing::info!(run_id = %run_id, "Idle pipeline run dropped");
    }
    idle.len()
}

/// Sweep idle runs every `every` until the runtime shuts down
pub fn spawn_idle_sweeper(
    state: AppState,
    max_idle: chrono::Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            let dropped = sweep_idle_runs(&state, max_idle).await;
            if dropped > 0 {
                let remaining = state.runs.read().await.len();
                tracing::debug!(dropped, remaining, "Idle run sweep");
            }
        }
    })
}

pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline", post(start_pipeline))
        .route("/pipeline/:run_id", get(get_pipeline))
        .route("/pipeline/:run_id/select", post(select_candidate))
        .route("/pipeline/:run_id/skip", post(skip_selection))
        .route("/pipeline/:run_id/submit", post(submit_draft))
        .route("/pipeline/:run_id/cancel", post(cancel_pipeline))
        .route("/pipeline/:run_id/reset", post(reset_pipeline))
}
