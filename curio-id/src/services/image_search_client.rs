//! Google Custom Search client (image mode)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const USER_AGENT: &str = concat!("curio-id/", env!("CARGO_PKG_VERSION"));

/// Image search errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx answer; carries the raw response body
    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Raw search response as returned by the backend
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResponse {
    #[serde(default)]
    pub items: Vec<RawSearchItem>,
    #[serde(default)]
    pub search_information: Option<SearchInformation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInformation {
    /// Reported as a decimal string by the API
    #[serde(default)]
    pub total_results: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub display_link: Option<String>,
    #[serde(default)]
    pub image: Option<RawImageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImageInfo {
    /// Page the image was found on
    #[serde(default)]
    pub context_link: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

impl RawSearchResponse {
    pub fn total_results(&self) -> u64 {
        self.search_information
            .as_ref()
            .and_then(|info| info.total_results.as_deref())
            .and_then(|total| total.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Image search backend
#[async_trait]
pub trait ImageSearchBackend: Send + Sync {
    async fn search_images(&self, query: &str, count: usize)
        -> Result<RawSearchResponse, SearchError>;
}

/// Google Custom Search JSON API client
pub struct GoogleImageSearchClient {
    http_client: reqwest::Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl GoogleImageSearchClient {
    pub fn new(api_key: String, engine_id: String) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            engine_id,
            endpoint: CUSTOM_SEARCH_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageSearchBackend for GoogleImageSearchClient {
    async fn search_images(
        &self,
        query: &str,
        count: usize,
    ) -> Result<RawSearchResponse, SearchError> {
        tracing::debug!(query = %query, count, "Querying Custom Search API");

        let count = count.to_string();
        let params = [
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("searchType", "image"),
            ("q", query),
            ("num", count.as_str()),
        ];

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Custom Search response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(status.as_u16(), body));
        }

        response
            .json::<RawSearchResponse>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_custom_search_response() {
        let raw = r#"{
            "searchInformation": {"totalResults": "1234"},
            "items": [{
                "title": "Snowy Owl Ornament",
                "link": "https://www.hallmark.com/dw/image/owl.jpg",
                "displayLink": "www.hallmark.com",
                "snippet": "Snowy Owl",
                "image": {
                    "contextLink": "https://www.hallmark.com/products/1KOB1234",
                    "thumbnailLink": "https://encrypted-tbn0.gstatic.com/images?q=owl"
                }
            }]
        }"#;

        let parsed: RawSearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.total_results(), 1234);
        assert_eq!(parsed.items.len(), 1);

        let item = &parsed.items[0];
        assert_eq!(item.display_link.as_deref(), Some("www.hallmark.com"));
        let image = item.image.as_ref().unwrap();
        assert_eq!(
            image.context_link.as_deref(),
            Some("https://www.hallmark.com/products/1KOB1234")
        );
        assert_eq!(image.link, None);
    }

    #[test]
    fn test_parse_empty_response() {
        let parsed: RawSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.total_results(), 0);
    }
}
