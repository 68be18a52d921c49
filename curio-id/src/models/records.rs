//! Partial and merged metadata records

use serde::{Deserialize, Serialize};

/// One search result representing a possible product page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub title: String,
    /// HTML product page (never a raw image resource unless unrecoverable)
    pub page_url: String,
    pub thumbnail_url: String,
    pub snippet: String,
    pub display_domain: String,
}

/// What the page heuristics found
///
/// Every field is independently nullable; empty strings never survive
/// [`ScrapedRecord::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub series_name: Option<String>,
    pub year_released: Option<i32>,
    pub sku: Option<String>,
}

impl ScrapedRecord {
    /// Trim every text field and turn empty strings into `None`
    pub fn normalized(self) -> Self {
        Self {
            title: clean(self.title),
            description: clean(self.description),
            brand: clean(self.brand),
            series_name: clean(self.series_name),
            year_released: self.year_released,
            sku: clean(self.sku),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Structured record read from the photo by the vision model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionRecord {
    pub title: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub series_name: Option<String>,
    pub year_released: Option<i32>,
    pub condition: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Merged, not-yet-persisted metadata proposal used to prefill the item form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub title: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub series_name: Option<String>,
    pub year_released: Option<i32>,
    pub sku: Option<String>,
    pub condition: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Product page the scraped half came from
    #[serde(default)]
    pub source_url: Option<String>,
}

pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == v.len() {
            Some(v)
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_trims_and_nulls_empty() {
        let record = ScrapedRecord {
            title: Some("  Snowy Owl  ".to_string()),
            description: Some("   ".to_string()),
            brand: Some(String::new()),
            series_name: None,
            year_released: Some(2021),
            sku: Some("5QXD7292\n".to_string()),
        }
        .normalized();

        assert_eq!(record.title.as_deref(), Some("Snowy Owl"));
        assert_eq!(record.description, None);
        assert_eq!(record.brand, None);
        assert_eq!(record.sku.as_deref(), Some("5QXD7292"));
        assert_eq!(record.year_released, Some(2021));
    }

    #[test]
    fn test_default_record_is_empty() {
        assert!(ScrapedRecord::default().is_empty());
        let record = ScrapedRecord {
            brand: Some("Hallmark".to_string()),
            ..Default::default()
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn test_wire_names_are_snake_case() {
        let json = serde_json::to_value(ScrapedRecord::default()).unwrap();
        assert!(json.get("series_name").is_some());
        assert!(json.get("year_released").is_some());
        assert!(json["sku"].is_null());
    }
}
