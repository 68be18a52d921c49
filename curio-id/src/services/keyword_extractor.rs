//! Photo to search-term extraction

use std::sync::Arc;

use super::vision_client::{PromptVariant, VisionBackend};
use crate::models::Photo;

/// Upper bound on terms passed to the search backend
pub const MAX_SEARCH_TERMS: usize = 4;

/// Turns a photo into a short space-separated search string
///
/// Never fails: an absent backend, a transport error or an empty answer all
/// come back as `None` ("no terms").
#[derive(Clone)]
pub struct KeywordExtractor {
    backend: Option<Arc<dyn VisionBackend>>,
}

impl KeywordExtractor {
    pub fn new(backend: Option<Arc<dyn VisionBackend>>) -> Self {
        Self { backend }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn extract(&self, photo: &Photo) -> Option<String> {
        let Some(backend) = &self.backend else {
            tracing::warn!("Vision backend not configured, searching without keywords");
            return None;
        };

        match backend.describe(photo, PromptVariant::SearchTerms).await {
            Ok(raw) => {
                let terms = normalize_terms(&raw);
                tracing::info!(terms = ?terms, "Extracted search terms");
                terms
            }
            Err(e) => {
                tracing::warn!(error = %e, "Keyword extraction failed");
                None
            }
        }
    }
}

/// Keep at most [`MAX_SEARCH_TERMS`] whitespace-separated terms, stripped of
/// quotes and list punctuation
pub fn normalize_terms(raw: &str) -> Option<String> {
    let terms: Vec<&str> = raw
        .split_whitespace()
        .map(|term| term.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | ',' | ';' | '.')))
        .filter(|term| !term.is_empty())
        .take(MAX_SEARCH_TERMS)
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}
