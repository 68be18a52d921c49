//! HTTP API handlers for curio-id
//!
//! Stateless per-stage endpoints under `/api`, the session-oriented pipeline
//! under `/pipeline`, health and an SSE event stream.

pub mod health;
pub mod identify;
pub mod pipeline;
pub mod sse;

pub use health::health_routes;
pub use identify::identify_routes;
pub use pipeline::{pipeline_routes, spawn_idle_sweeper, sweep_idle_runs};
pub use sse::event_stream;

use axum::extract::Multipart;

use crate::error::{ApiError, ApiResult};
use crate::models::{Photo, PhotoError};

/// Multipart field carrying the photo
pub const PHOTO_FIELD: &str = "image";

/// Read the `image` field of a multipart upload
pub async fn read_photo(mut multipart: Multipart) -> ApiResult<Photo> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;

        tracing::debug!(
            bytes = bytes.len(),
            content_type = ?content_type,
            "Received photo upload"
        );
        return Ok(Photo::new(bytes.to_vec(), content_type.as_deref())?);
    }

    Err(PhotoError::Empty.into())
}
