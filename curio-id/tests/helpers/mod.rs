//! Fake collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use curio_common::config::VendorConfig;
use curio_common::events::EventBus;
use curio_id::models::Photo;
use curio_id::services::image_search_client::{RawImageInfo, RawSearchItem, RawSearchResponse};
use curio_id::services::{
    FetchError, ImageSearchBackend, ImageStore, KeywordExtractor, PageFetcher, PageScraper,
    PromptVariant, ScopedSearchClient, SearchError, StructuredExtractor, VisionBackend,
    VisionError,
};
use curio_id::workflow::{ItemRepository, NewItem, PipelineController};

pub const OWL_PAGE_URL: &str = "https://www.hallmark.com/products/1KOB1234";

pub const OWL_PAGE: &str = r#"
<html>
  <head>
    <meta property="og:title" content="Snowy Owl 2021 Keepsake Ornament">
    <meta property="og:description" content="A wise owl perched on a frosted branch.">
  </head>
  <body>
    <nav aria-label="breadcrumb">Home / Ornaments / Keepsake Ornaments</nav>
    <h1 class="product-title">Snowy Owl 2021 Keepsake Ornament</h1>
    <p>Item number: 1KOB1234 Collectible</p>
  </body>
</html>
"#;

pub const OWL_VISION_JSON: &str = "```json\n{\"title\": \"White Owl Ornament\", \
\"description\": \"Owl on a branch\", \"brand\": null, \"series_name\": null, \
\"year_released\": \"2020\", \"condition\": \"Mint\", \"tags\": [\"owl\", \"winter\"]}\n```";

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Status(u16),
}

impl Reply {
    fn into_result(self) -> Result<String, VisionError> {
        match self {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Status(status) => Err(VisionError::Api(status, "upstream failure".to_string())),
        }
    }
}

pub struct FakeVision {
    pub terms: Reply,
    pub record: Reply,
    pub calls: AtomicUsize,
}

impl FakeVision {
    pub fn new(terms: Reply, record: Reply) -> Arc<Self> {
        Arc::new(Self {
            terms,
            record,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn owl() -> Arc<Self> {
        Self::new(Reply::Text("Snowy Owl Keepsake"), Reply::Text(OWL_VISION_JSON))
    }
}

#[async_trait]
impl VisionBackend for FakeVision {
    async fn describe(&self, _photo: &Photo, variant: PromptVariant) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match variant {
            PromptVariant::SearchTerms => self.terms.clone().into_result(),
            PromptVariant::StructuredRecord => self.record.clone().into_result(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub struct FakeSearch {
    /// `None` answers every query with a 500
    pub response: Option<RawSearchResponse>,
    pub delay: Option<Duration>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn returning(items: Vec<RawSearchItem>) -> Arc<Self> {
        Arc::new(Self {
            response: Some(RawSearchResponse {
                items,
                search_information: None,
            }),
            delay: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: Some(RawSearchResponse::default()),
            delay: Some(delay),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSearchBackend for FakeSearch {
    async fn search_images(
        &self,
        query: &str,
        _count: usize,
    ) -> Result<RawSearchResponse, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .ok_or_else(|| SearchError::Api(500, "backend exploded".to_string()))
    }
}

pub fn owl_hit() -> RawSearchItem {
    RawSearchItem {
        title: Some("Snowy Owl 2021 Keepsake Ornament".to_string()),
        link: Some("https://www.hallmark.com/dw/image/owl.jpg".to_string()),
        snippet: Some("Snowy Owl".to_string()),
        display_link: Some("www.hallmark.com".to_string()),
        image: Some(RawImageInfo {
            context_link: Some(OWL_PAGE_URL.to_string()),
            link: None,
            thumbnail_link: Some("https://thumbs.example.com/owl".to_string()),
        }),
    }
}

pub fn missing_page_hit() -> RawSearchItem {
    RawSearchItem {
        title: Some("Retired Ornament".to_string()),
        link: None,
        snippet: None,
        display_link: Some("www.hallmark.com".to_string()),
        image: Some(RawImageInfo {
            context_link: Some("https://www.hallmark.com/products/GONE0001".to_string()),
            link: None,
            thumbnail_link: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePages {
    pages: HashMap<String, String>,
}

impl FakePages {
    pub fn with_owl() -> Self {
        let mut pages = HashMap::new();
        pages.insert(OWL_PAGE_URL.to_string(), OWL_PAGE.to_string());
        Self { pages }
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }
}

// ---------------------------------------------------------------------------
// Items and images
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryItems {
    pub fail_create: bool,
    pub created: Mutex<Vec<(Uuid, NewItem)>>,
    pub attached: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryItems {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_create: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl ItemRepository for MemoryItems {
    async fn create_item(&self, item: &NewItem) -> curio_common::Result<Uuid> {
        if self.fail_create {
            return Err(curio_common::Error::Internal("database is locked".to_string()));
        }
        let id = Uuid::new_v4();
        self.created.lock().unwrap().push((id, item.clone()));
        Ok(id)
    }

    async fn attach_image(&self, item_id: Uuid, url: &str) -> curio_common::Result<()> {
        self.attached.lock().unwrap().push((item_id, url.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryImages {
    pub fail: bool,
    pub stored: AtomicUsize,
}

impl MemoryImages {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl ImageStore for MemoryImages {
    async fn store(&self, _photo: &Photo, item_id: Uuid) -> curio_common::Result<String> {
        if self.fail {
            return Err(curio_common::Error::Internal("disk full".to_string()));
        }
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(format!("http://test/images/{}/photo.jpg", item_id))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub vision: Option<Arc<FakeVision>>,
    pub search: Option<Arc<FakeSearch>>,
    pub pages: FakePages,
    pub items: Arc<MemoryItems>,
    pub images: Arc<MemoryImages>,
    pub event_bus: EventBus,
}

impl Fixture {
    /// Everything configured, owl page available
    pub fn owl() -> Self {
        Self {
            vision: Some(FakeVision::owl()),
            search: Some(FakeSearch::returning(vec![owl_hit(), missing_page_hit()])),
            pages: FakePages::with_owl(),
            items: Arc::new(MemoryItems::default()),
            images: Arc::new(MemoryImages::default()),
            event_bus: EventBus::new(100),
        }
    }

    pub fn controller(self) -> PipelineController {
        let vision = self.vision.map(|v| v as Arc<dyn VisionBackend>);
        let search = self.search.map(|s| s as Arc<dyn ImageSearchBackend>);
        let vendors = VendorConfig::default();

        PipelineController::new(
            KeywordExtractor::new(vision.clone()),
            ScopedSearchClient::new(search, vendors.clone()),
            PageScraper::new(Arc::new(self.pages), vendors),
            StructuredExtractor::new(vision),
            self.items,
            self.images,
            self.event_bus,
        )
    }
}

pub fn photo() -> Photo {
    Photo::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], Some("image/jpeg")).unwrap()
}
