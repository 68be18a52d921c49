//! Pipeline components and their backend clients
//!
//! Components (keyword extractor, scoped search, page scraper, structured
//! extractor) absorb their own failures and return degraded results. Backend
//! clients sit behind traits so tests and alternative providers can swap in.

pub mod image_search_client;
pub mod image_store;
pub mod keyword_extractor;
pub mod page_fetcher;
pub mod page_scraper;
pub mod page_url;
pub mod search_client;
pub mod structured_extractor;
pub mod vision_client;

pub use image_search_client::{GoogleImageSearchClient, ImageSearchBackend, SearchError};
pub use image_store::{ImageStore, LocalImageStore};
pub use keyword_extractor::KeywordExtractor;
pub use page_fetcher::{FetchError, HttpPageFetcher, PageFetcher};
pub use page_scraper::{PageScraper, ScrapeOutcome, UrlRejection};
pub use search_client::{ScopedSearchClient, SearchOutcome};
pub use structured_extractor::StructuredExtractor;
pub use vision_client::{OpenAiVisionClient, PromptVariant, VisionBackend, VisionError};
