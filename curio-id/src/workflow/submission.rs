//! Draft submission: validation and the item persistence seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::DraftRecord;

/// Earliest release year accepted on submission
pub const MIN_SUBMITTED_YEAR: i32 = 1000;

/// Years past the current one still accepted on submission
pub const FUTURE_YEAR_SLACK: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Collection is required")]
    MissingCollection,

    #[error("Year {year} must be between {min} and {max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },
}

/// Payload handed to the item repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub collection_id: String,
    pub draft: DraftRecord,
    /// Image the user picked from the candidates (thumbnail URL), if any
    pub image_reference: Option<String>,
}

/// Item persistence collaborator
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Create the item and return its id
    async fn create_item(&self, item: &NewItem) -> curio_common::Result<Uuid>;

    /// Record `url` as the primary image of `item_id`
    async fn attach_image(&self, item_id: Uuid, url: &str) -> curio_common::Result<()>;
}

/// Check a draft before any collaborator is called
pub fn validate_submission(
    collection_id: &str,
    draft: &DraftRecord,
    current_year: i32,
) -> Result<(), SubmissionError> {
    if collection_id.trim().is_empty() {
        return Err(SubmissionError::MissingCollection);
    }
    if draft.title.trim().is_empty() {
        return Err(SubmissionError::MissingTitle);
    }
    if let Some(year) = draft.year_released {
        let max = current_year + FUTURE_YEAR_SLACK;
        if !(MIN_SUBMITTED_YEAR..=max).contains(&year) {
            return Err(SubmissionError::YearOutOfRange {
                year,
                min: MIN_SUBMITTED_YEAR,
                max,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, year: Option<i32>) -> DraftRecord {
        DraftRecord {
            title: title.to_string(),
            year_released: year,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_submission() {
        assert_eq!(validate_submission("c1", &draft("Owl", Some(2021)), 2026), Ok(()));
        assert_eq!(validate_submission("c1", &draft("Owl", None), 2026), Ok(()));
        assert_eq!(validate_submission("c1", &draft("Owl", Some(2036)), 2026), Ok(()));
        assert_eq!(validate_submission("c1", &draft("Owl", Some(1000)), 2026), Ok(()));
    }

    #[test]
    fn test_invalid_submission() {
        assert_eq!(
            validate_submission("c1", &draft("  ", None), 2026),
            Err(SubmissionError::MissingTitle)
        );
        assert_eq!(
            validate_submission(" ", &draft("Owl", None), 2026),
            Err(SubmissionError::MissingCollection)
        );
        assert_eq!(
            validate_submission("c1", &draft("Owl", Some(2037)), 2026),
            Err(SubmissionError::YearOutOfRange {
                year: 2037,
                min: 1000,
                max: 2036
            })
        );
        assert!(validate_submission("c1", &draft("Owl", Some(999)), 2026).is_err());
    }
}
