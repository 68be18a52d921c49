//! Draft merging
//!
//! Merge strategy:
//! - title, description, brand, series_name, year_released: scraped value if
//!   present, else the vision value
//! - sku: scraped only
//! - condition, tags: vision only
//!
//! Presence means `Some`; an empty scraped string never reaches here because
//! [`ScrapedRecord::normalized`](crate::models::ScrapedRecord::normalized)
//! has already turned it into `None`.

use crate::models::{DraftRecord, ScrapedRecord, VisionRecord};

/// Combine an optional scraped record with a vision record
///
/// Pure and deterministic. `source_url` is left empty; the caller knows
/// which page the scraped half came from.
pub fn merge(scraped: Option<&ScrapedRecord>, vision: &VisionRecord) -> DraftRecord {
    let Some(scraped) = scraped else {
        return DraftRecord {
            title: vision.title.clone(),
            description: vision.description.clone(),
            brand: vision.brand.clone(),
            series_name: vision.series_name.clone(),
            year_released: vision.year_released,
            sku: None,
            condition: vision.condition.clone(),
            tags: vision.tags.clone(),
            source_url: None,
        };
    };

    DraftRecord {
        title: scraped
            .title
            .clone()
            .unwrap_or_else(|| vision.title.clone()),
        description: scraped.description.clone().or_else(|| vision.description.clone()),
        brand: scraped.brand.clone().or_else(|| vision.brand.clone()),
        series_name: scraped.series_name.clone().or_else(|| vision.series_name.clone()),
        year_released: scraped.year_released.or(vision.year_released),
        sku: scraped.sku.clone(),
        condition: vision.condition.clone(),
        tags: vision.tags.clone(),
        source_url: None,
    }
}
