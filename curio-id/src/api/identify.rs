//! Stateless per-stage endpoints
//!
//! Each endpoint runs one pipeline component on its own, outside any run:
//! - `POST /api/search-images`: keywords from the photo, then scoped search
//! - `POST /api/scrape-product`: heuristics over one vendor product page
//! - `POST /api/analyze-image`: structured record straight from the photo

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::read_photo;
use crate::error::{ApiError, ApiResult};
use crate::models::{SearchCandidate, VisionRecord};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageSearchResponse {
    pub results: Vec<SearchCandidate>,
    pub total_results: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /api/search-images
///
/// Search problems are reported in `error`; the status is 200 either way.
pub async fn search_images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImageSearchResponse>> {
    let photo = read_photo(multipart).await?;

    let keywords = state.controller.keywords().extract(&photo).await;
    let outcome = state.controller.search().search(keywords.as_deref()).await;

    Ok(Json(ImageSearchResponse {
        results: outcome.candidates,
        total_results: outcome.total_results,
        error: outcome.diagnostic,
    }))
}

/// POST /api/scrape-product
///
/// 400 for a missing or non-vendor URL, 502 with the null record when the
/// page could not be fetched.
pub async fn scrape_product(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Response> {
    let url = request.url.unwrap_or_default();
    let scraper = state.controller.scraper();

    scraper
        .check_url(&url)
        .map_err(|rejection| ApiError::BadRequest(rejection.to_string()))?;

    let outcome = scraper.scrape(&url).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((status, Json(outcome)).into_response())
}

/// POST /api/analyze-image
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VisionRecord>> {
    let photo = read_photo(multipart).await?;

    let record = state.controller.vision().extract(&photo).await.map_err(|e| {
        tracing::error!(error = %e, "Image analysis failed");
        ApiError::BadGateway(format!("Failed to analyze image: {}", e))
    })?;

    Ok(Json(record))
}

pub fn identify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search-images", post(search_images))
        .route("/api/scrape-product", post(scrape_product))
        .route("/api/analyze-image", post(analyze_image))
}
