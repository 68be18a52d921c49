//! Vendor product page scraper
//!
//! Checks the URL against the vendor domain set, fetches the page and runs
//! the field cascades from [`crate::extractors`]. Failures never escape:
//! they come back as an unsuccessful [`ScrapeOutcome`] with an empty record.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use curio_common::config::VendorConfig;

use super::page_fetcher::PageFetcher;
use crate::extractors::{extract_product, ExtractionContext};
use crate::models::ScrapedRecord;

/// Why a URL is not scraped at all
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("URL is required")]
    Missing,

    #[error("Invalid URL: {0}")]
    Malformed(String),

    #[error("URL must use http or https")]
    UnsupportedScheme,

    #[error("URL must be from one of: {0}")]
    ForeignHost(String),
}

/// Result of one scrape attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub data: ScrapedRecord,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            data: ScrapedRecord::default(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// Record to hand to the merge step; `None` when the attempt failed
    pub fn record(&self) -> Option<&ScrapedRecord> {
        self.success.then_some(&self.data)
    }
}

#[derive(Clone)]
pub struct PageScraper {
    fetcher: Arc<dyn PageFetcher>,
    vendors: VendorConfig,
}

impl PageScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, vendors: VendorConfig) -> Self {
        Self { fetcher, vendors }
    }

    /// Accept only http(s) URLs on a vendor domain or one of its subdomains
    pub fn check_url(&self, url: &str) -> Result<reqwest::Url, UrlRejection> {
        let url = url.trim();
        if url.is_empty() {
            return Err(UrlRejection::Missing);
        }

        let parsed = reqwest::Url::parse(url).map_err(|e| UrlRejection::Malformed(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UrlRejection::UnsupportedScheme);
        }

        match parsed.host_str() {
            Some(host) if self.vendors.contains_host(host) => Ok(parsed),
            _ => Err(UrlRejection::ForeignHost(self.vendors.domains.join(", "))),
        }
    }

    pub async fn scrape(&self, url: &str) -> ScrapeOutcome {
        let parsed = match self.check_url(url) {
            Ok(parsed) => parsed,
            Err(rejection) => {
                tracing::warn!(url = %url, reason = %rejection, "Refusing to scrape URL");
                return ScrapeOutcome::failed(rejection.to_string());
            }
        };

        tracing::info!(url = %parsed, "Scraping product page");

        let html = match self.fetcher.fetch(parsed.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %parsed, error = %e, "Product page fetch failed");
                return ScrapeOutcome::failed(e.to_string());
            }
        };

        let data = extract_product(&html, &self.extraction_context());
        tracing::info!(
            url = %parsed,
            title = ?data.title,
            sku = ?data.sku,
            year = ?data.year_released,
            "Scraped product page"
        );

        ScrapeOutcome {
            data,
            success: true,
            error: None,
        }
    }

    fn extraction_context(&self) -> ExtractionContext {
        ExtractionContext {
            current_year: chrono::Utc::now().year(),
            default_brand: self.vendors.default_brand.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::page_fetcher::FetchError;
    use async_trait::async_trait;

    struct StaticPage(Result<&'static str, u16>);

    #[async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            match self.0 {
                Ok(html) => Ok(html.to_string()),
                Err(status) => Err(FetchError::Status(status)),
            }
        }
    }

    fn scraper(page: Result<&'static str, u16>) -> PageScraper {
        PageScraper::new(Arc::new(StaticPage(page)), VendorConfig::default())
    }

    #[test]
    fn test_check_url() {
        let scraper = scraper(Ok(""));

        assert!(scraper.check_url("https://www.hallmark.com/products/1").is_ok());
        assert!(scraper.check_url("http://shop.hookedonhallmark.com/x").is_ok());
        assert!(scraper.check_url("https://ornamentmall.com/x").is_ok());

        assert_eq!(scraper.check_url("  "), Err(UrlRejection::Missing));
        assert!(matches!(
            scraper.check_url("not a url"),
            Err(UrlRejection::Malformed(_))
        ));
        assert_eq!(
            scraper.check_url("ftp://www.hallmark.com/x"),
            Err(UrlRejection::UnsupportedScheme)
        );
        assert!(matches!(
            scraper.check_url("https://evil-hallmark.com.example.org/"),
            Err(UrlRejection::ForeignHost(_))
        ));
        assert!(matches!(
            scraper.check_url("https://nothallmark.com/"),
            Err(UrlRejection::ForeignHost(_))
        ));
    }

    #[tokio::test]
    async fn test_successful_scrape() {
        let scraper = scraper(Ok(r#"<h1 class="product-title">Snowy Owl</h1>"#));
        let outcome = scraper.scrape("https://www.hallmark.com/products/1").await;

        assert!(outcome.success);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.data.title.as_deref(), Some("Snowy Owl"));
        assert_eq!(outcome.data.brand.as_deref(), Some("Hallmark"));
        assert!(outcome.record().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_null_record() {
        let scraper = scraper(Err(404));
        let outcome = scraper.scrape("https://www.hallmark.com/products/1").await;

        assert!(!outcome.success);
        assert!(outcome.data.is_empty());
        assert_eq!(outcome.error.as_deref(), Some("Failed to fetch page: 404"));
        assert!(outcome.record().is_none());
    }

    #[tokio::test]
    async fn test_foreign_url_not_fetched() {
        let scraper = scraper(Ok("<h1>Should not be read</h1>"));
        let outcome = scraper.scrape("https://example.com/owl").await;

        assert!(!outcome.success);
        assert!(outcome.data.is_empty());
    }

    #[test]
    fn test_outcome_wire_shape() {
        let json = serde_json::to_value(ScrapeOutcome::failed("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json["data"]["title"].is_null());
    }
}
