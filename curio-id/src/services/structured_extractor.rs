//! Photo to structured record extraction
//!
//! The vision model is asked for a JSON object but answers are often wrapped
//! in a Markdown fence, carry years as strings or are not JSON at all.
//! [`parse_vision_response`] absorbs all of that and always yields a record
//! with a title.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::vision_client::{PromptVariant, VisionBackend, VisionError};
use crate::models::{Photo, VisionRecord};

/// Title used when the model names nothing
pub const GENERIC_TITLE: &str = "Collectible Item";

/// Description of the record returned when no vision backend is configured
pub const PLACEHOLDER_DESCRIPTION: &str = "A collectible item from your collection";

/// Characters of raw model output kept as description when parsing fails
const FALLBACK_DESCRIPTION_CHARS: usize = 200;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("valid fence regex")
});

#[derive(Clone)]
pub struct StructuredExtractor {
    backend: Option<Arc<dyn VisionBackend>>,
}

impl StructuredExtractor {
    pub fn new(backend: Option<Arc<dyn VisionBackend>>) -> Self {
        Self { backend }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Read a [`VisionRecord`] from the photo
    ///
    /// An unconfigured backend gives the placeholder record. Transport,
    /// status and empty-content errors are returned to the caller; malformed
    /// content is not an error.
    pub async fn extract(&self, photo: &Photo) -> Result<VisionRecord, VisionError> {
        let Some(backend) = &self.backend else {
            tracing::warn!("Vision backend not configured, returning placeholder record");
            return Ok(placeholder_record());
        };

        let raw = backend.describe(photo, PromptVariant::StructuredRecord).await?;
        let record = parse_vision_response(&raw);

        tracing::info!(
            title = %record.title,
            brand = ?record.brand,
            year = ?record.year_released,
            tags = record.tags.len(),
            "Vision extraction complete"
        );
        Ok(record)
    }
}

pub fn placeholder_record() -> VisionRecord {
    VisionRecord {
        title: GENERIC_TITLE.to_string(),
        description: Some(PLACEHOLDER_DESCRIPTION.to_string()),
        ..Default::default()
    }
}

/// Lenient parse of the model's answer
pub fn parse_vision_response(raw: &str) -> VisionRecord {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::Object(fields)) => record_from_fields(&fields),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "Vision response is not a JSON object");
            fallback_record(raw)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Vision response is not valid JSON");
            fallback_record(raw)
        }
    }
}

fn record_from_fields(fields: &Map<String, Value>) -> VisionRecord {
    VisionRecord {
        title: text_field(fields, "title").unwrap_or_else(|| GENERIC_TITLE.to_string()),
        description: text_field(fields, "description"),
        brand: text_field(fields, "brand"),
        series_name: text_field(fields, "series_name"),
        year_released: year_field(fields.get("year_released")),
        condition: text_field(fields, "condition"),
        tags: tags_field(fields.get("tags")),
    }
}

fn fallback_record(raw: &str) -> VisionRecord {
    let description: String = raw.chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
    VisionRecord {
        title: GENERIC_TITLE.to_string(),
        description: Some(description).filter(|d| !d.trim().is_empty()),
        ..Default::default()
    }
}

/// Non-blank string value; the literal `"null"` counts as missing
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    }
}

/// Number or numeric string
fn year_field(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn tags_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
