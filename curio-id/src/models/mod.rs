//! Data model for the identification pipeline
//!
//! Records are ephemeral: nothing here is persisted by the pipeline itself.

pub mod photo;
pub mod records;

pub use photo::{Photo, PhotoError};
pub use records::{DraftRecord, ScrapedRecord, SearchCandidate, VisionRecord};
