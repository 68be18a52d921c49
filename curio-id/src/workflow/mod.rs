//! Identification workflow
//!
//! One [`PipelineRun`] per user session, driven stage by stage by the
//! [`PipelineController`]:
//! 1. Extract search terms from the photo and run the scoped search
//! 2. Let the user pick a candidate (scrape it) or skip
//! 3. Read a structured record from the photo and merge it with the scrape
//! 4. Submit the reviewed draft to the item repository and store the photo

pub mod controller;
pub mod state;
pub mod submission;

pub use controller::{PipelineController, PipelineError, SubmissionRequest};
pub use state::{next_stage, EventKind, PipelineEvent, PipelineRun, StageTransition, TransitionError};
pub use submission::{validate_submission, ItemRepository, NewItem, SubmissionError};
