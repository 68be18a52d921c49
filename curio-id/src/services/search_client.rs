//! Vendor-scoped product search
//!
//! Wraps an [`ImageSearchBackend`] with the vendor site restriction, page-URL
//! disambiguation and fail-soft diagnostics. [`ScopedSearchClient::search`]
//! never fails: every problem becomes an empty candidate list plus a message
//! for the selection step.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use curio_common::config::VendorConfig;

use super::image_search_client::{ImageSearchBackend, RawSearchItem, SearchError};
use super::page_url::resolve_page_url;
use crate::models::SearchCandidate;

/// Most candidates shown to the user
pub const MAX_CANDIDATES: usize = 6;

const ERROR_BODY_LIMIT: usize = 200;

pub const NOT_CONFIGURED_MESSAGE: &str = "Image search credentials not configured";
pub const NO_RESULTS_MESSAGE: &str = "No matching products found";

/// Result of one scoped search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub candidates: Vec<SearchCandidate>,
    pub total_results: u64,
    /// Shown in the selection step; set whenever the list is empty
    pub diagnostic: Option<String>,
}

impl SearchOutcome {
    fn failed(query: String, diagnostic: String) -> Self {
        Self {
            query,
            candidates: Vec::new(),
            total_results: 0,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Build the site-restricted query
///
/// With keywords: `(site:a OR site:b OR site:c) keywords`.
/// Without: `site:<primary>`.
pub fn build_query(vendors: &VendorConfig, keywords: Option<&str>) -> String {
    let keywords = keywords.map(str::trim).filter(|k| !k.is_empty());

    match keywords {
        Some(keywords) => {
            let sites = vendors
                .domains
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .map(|d| format!("site:{}", d))
                .collect::<Vec<_>>()
                .join(" OR ");
            format!("({}) {}", sites, keywords)
        }
        None => format!("site:{}", vendors.primary_domain.trim()),
    }
}

#[derive(Clone)]
pub struct ScopedSearchClient {
    backend: Option<Arc<dyn ImageSearchBackend>>,
    vendors: VendorConfig,
}

impl ScopedSearchClient {
    pub fn new(backend: Option<Arc<dyn ImageSearchBackend>>, vendors: VendorConfig) -> Self {
        Self { backend, vendors }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn search(&self, keywords: Option<&str>) -> SearchOutcome {
        let query = build_query(&self.vendors, keywords);

        let Some(backend) = &self.backend else {
            tracing::warn!("Image search backend not configured");
            return SearchOutcome::failed(query, NOT_CONFIGURED_MESSAGE.to_string());
        };

        tracing::info!(query = %query, "Running scoped image search");

        let response = match backend.search_images(&query, MAX_CANDIDATES).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Image search failed");
                return SearchOutcome::failed(query, diagnostic_for(&e));
            }
        };

        let total_results = response.total_results();
        let candidates: Vec<SearchCandidate> = response
            .items
            .iter()
            .take(MAX_CANDIDATES)
            .filter_map(|item| self.to_candidate(item))
            .collect();

        tracing::info!(
            found = candidates.len(),
            total = total_results,
            "Image search resolved"
        );

        let diagnostic = candidates
            .is_empty()
            .then(|| NO_RESULTS_MESSAGE.to_string());

        SearchOutcome {
            query,
            candidates,
            total_results,
            diagnostic,
        }
    }

    fn to_candidate(&self, item: &RawSearchItem) -> Option<SearchCandidate> {
        let image = item.image.as_ref();
        let resolved = resolve_page_url(
            image.and_then(|i| i.context_link.as_deref()),
            image.and_then(|i| i.link.as_deref()),
            item.link.as_deref(),
            &self.vendors,
        );

        let Some(resolved) = resolved else {
            tracing::debug!(title = ?item.title, "Dropping search hit without URL");
            return None;
        };

        let thumbnail_url = image
            .and_then(|i| i.thumbnail_link.clone())
            .filter(|t| !t.trim().is_empty())
            .or_else(|| item.link.clone())
            .unwrap_or_default();

        tracing::debug!(url = %resolved.url, source = ?resolved.source, "Resolved candidate");

        Some(SearchCandidate {
            title: item.title.clone().unwrap_or_default(),
            page_url: resolved.url,
            thumbnail_url,
            snippet: item.snippet.clone().unwrap_or_default(),
            display_domain: item.display_link.clone().unwrap_or_default(),
        })
    }
}

fn diagnostic_for(error: &SearchError) -> String {
    match error {
        SearchError::NotConfigured => NOT_CONFIGURED_MESSAGE.to_string(),
        SearchError::Api(_, body) => format!(
            "Search failed: {}",
            body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
        ),
        SearchError::Network(message) => format!("Search request failed: {}", message),
        SearchError::Parse(message) => format!("Unreadable search response: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::image_search_client::{RawImageInfo, RawSearchResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeSearch {
        result: Result<RawSearchResponse, u16>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl FakeSearch {
        fn new(result: Result<RawSearchResponse, u16>) -> Arc<Self> {
            Arc::new(Self {
                result,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ImageSearchBackend for FakeSearch {
        async fn search_images(
            &self,
            query: &str,
            count: usize,
        ) -> Result<RawSearchResponse, SearchError> {
            self.queries.lock().unwrap().push((query.to_string(), count));
            match &self.result {
                Ok(response) => Ok(response.clone()),
                Err(status) => Err(SearchError::Api(*status, "x".repeat(300))),
            }
        }
    }

    fn item(n: usize) -> RawSearchItem {
        RawSearchItem {
            title: Some(format!("Ornament {}", n)),
            link: Some(format!("https://www.hallmark.com/img/{}.jpg", n)),
            snippet: Some("snippet".to_string()),
            display_link: Some("www.hallmark.com".to_string()),
            image: Some(RawImageInfo {
                context_link: Some(format!("https://www.hallmark.com/products/{}", n)),
                link: None,
                thumbnail_link: Some(format!("https://thumbs.example.com/{}", n)),
            }),
        }
    }

    #[test]
    fn test_build_query() {
        let vendors = VendorConfig::default();
        assert_eq!(
            build_query(&vendors, Some("snowy owl")),
            "(site:hallmark.com OR site:hookedonhallmark.com OR site:www.ornamentmall.com) snowy owl"
        );
        assert_eq!(build_query(&vendors, None), "site:hallmark.com");
        assert_eq!(build_query(&vendors, Some("   ")), "site:hallmark.com");
    }

    #[tokio::test]
    async fn test_unconfigured_backend() {
        let client = ScopedSearchClient::new(None, VendorConfig::default());
        let outcome = client.search(Some("owl")).await;

        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.diagnostic.as_deref(), Some(NOT_CONFIGURED_MESSAGE));
    }

    #[tokio::test]
    async fn test_caps_candidates_and_maps_fields() {
        let backend = FakeSearch::new(Ok(RawSearchResponse {
            items: (0..8).map(item).collect(),
            search_information: None,
        }));
        let client = ScopedSearchClient::new(Some(backend.clone()), VendorConfig::default());
        let outcome = client.search(Some("owl")).await;

        assert_eq!(outcome.candidates.len(), MAX_CANDIDATES);
        assert_eq!(outcome.diagnostic, None);

        let first = &outcome.candidates[0];
        assert_eq!(first.title, "Ornament 0");
        assert_eq!(first.page_url, "https://www.hallmark.com/products/0");
        assert_eq!(first.thumbnail_url, "https://thumbs.example.com/0");
        assert_eq!(first.display_domain, "www.hallmark.com");

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries[0].1, MAX_CANDIDATES);
        assert!(queries[0].0.ends_with(" owl"));
    }

    #[tokio::test]
    async fn test_thumbnail_falls_back_to_link() {
        let mut hit = item(1);
        hit.image.as_mut().unwrap().thumbnail_link = None;
        let backend = FakeSearch::new(Ok(RawSearchResponse {
            items: vec![hit],
            search_information: None,
        }));
        let client = ScopedSearchClient::new(Some(backend), VendorConfig::default());
        let outcome = client.search(None).await;

        assert_eq!(
            outcome.candidates[0].thumbnail_url,
            "https://www.hallmark.com/img/1.jpg"
        );
    }

    #[tokio::test]
    async fn test_zero_items_has_diagnostic() {
        let backend = FakeSearch::new(Ok(RawSearchResponse::default()));
        let client = ScopedSearchClient::new(Some(backend), VendorConfig::default());
        let outcome = client.search(None).await;

        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.query, "site:hallmark.com");
        assert_eq!(outcome.diagnostic.as_deref(), Some(NO_RESULTS_MESSAGE));
    }

    #[tokio::test]
    async fn test_api_error_body_truncated() {
        let backend = FakeSearch::new(Err(403));
        let client = ScopedSearchClient::new(Some(backend), VendorConfig::default());
        let outcome = client.search(Some("owl")).await;

        let diagnostic = outcome.diagnostic.unwrap();
        assert!(diagnostic.starts_with("Search failed: "));
        assert_eq!(diagnostic.len(), "Search failed: ".len() + 200);
    }
}
