//! Pipeline run state machine
//!
//! ```text
//! capture -> searching -> selecting -> scraping -> analyzing -> form -> success
//!                         selecting -(skip)------> analyzing
//! analyzing -(vision error)-> capture
//! form -(submission error)--> capture
//! success -(reset)----------> capture
//! ```
//!
//! Any stage returns to capture on cancel. [`next_stage`] is the whole
//! transition table; [`PipelineRun::apply`] validates an event against it
//! before touching the run, so a rejected event leaves the run unchanged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use curio_common::events::PipelineStage;

use crate::models::{DraftRecord, Photo, SearchCandidate};
use crate::services::{ScrapeOutcome, SearchOutcome};

/// Input that may move a run between stages
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    PhotoCaptured(Photo),
    SearchResolved(SearchOutcome),
    CandidateSelected(usize),
    SelectionSkipped,
    ScrapeFinished(ScrapeOutcome),
    AnalysisCompleted(DraftRecord),
    /// Vision call path failed; carries the user-visible message
    AnalysisFailed(String),
    SubmissionSucceeded {
        item_id: Uuid,
        image_url: Option<String>,
        /// Draft as submitted (possibly edited by the user)
        draft: DraftRecord,
    },
    SubmissionFailed(String),
    /// "Add another" after success
    Reset,
    Cancel,
}

/// Payload-free event discriminant used by the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhotoCaptured,
    SearchResolved,
    CandidateSelected,
    SelectionSkipped,
    ScrapeFinished,
    AnalysisCompleted,
    AnalysisFailed,
    SubmissionSucceeded,
    SubmissionFailed,
    Reset,
    Cancel,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::PhotoCaptured => "photo_captured",
            EventKind::SearchResolved => "search_resolved",
            EventKind::CandidateSelected => "candidate_selected",
            EventKind::SelectionSkipped => "selection_skipped",
            EventKind::ScrapeFinished => "scrape_finished",
            EventKind::AnalysisCompleted => "analysis_completed",
            EventKind::AnalysisFailed => "analysis_failed",
            EventKind::SubmissionSucceeded => "submission_succeeded",
            EventKind::SubmissionFailed => "submission_failed",
            EventKind::Reset => "reset",
            EventKind::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::PhotoCaptured(_) => EventKind::PhotoCaptured,
            PipelineEvent::SearchResolved(_) => EventKind::SearchResolved,
            PipelineEvent::CandidateSelected(_) => EventKind::CandidateSelected,
            PipelineEvent::SelectionSkipped => EventKind::SelectionSkipped,
            PipelineEvent::ScrapeFinished(_) => EventKind::ScrapeFinished,
            PipelineEvent::AnalysisCompleted(_) => EventKind::AnalysisCompleted,
            PipelineEvent::AnalysisFailed(_) => EventKind::AnalysisFailed,
            PipelineEvent::SubmissionSucceeded { .. } => EventKind::SubmissionSucceeded,
            PipelineEvent::SubmissionFailed(_) => EventKind::SubmissionFailed,
            PipelineEvent::Reset => EventKind::Reset,
            PipelineEvent::Cancel => EventKind::Cancel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot apply {event} while in {stage}")]
    Illegal {
        stage: PipelineStage,
        event: EventKind,
    },

    #[error("Candidate {index} out of range ({count} candidates)")]
    CandidateOutOfRange { index: usize, count: usize },
}

/// Transition table
pub fn next_stage(stage: PipelineStage, event: EventKind) -> Result<PipelineStage, TransitionError> {
    use EventKind as E;
    use PipelineStage as S;

    let next = match (stage, event) {
        (_, E::Cancel) => S::Capture,
        (S::Capture, E::PhotoCaptured) => S::Searching,
        (S::Searching, E::SearchResolved) => S::Selecting,
        (S::Selecting, E::CandidateSelected) => S::Scraping,
        (S::Selecting, E::SelectionSkipped) => S::Analyzing,
        (S::Scraping, E::ScrapeFinished) => S::Analyzing,
        (S::Analyzing, E::AnalysisCompleted) => S::Form,
        (S::Analyzing, E::AnalysisFailed) => S::Capture,
        (S::Form, E::SubmissionSucceeded) => S::Success,
        (S::Form, E::SubmissionFailed) => S::Capture,
        (S::Success, E::Reset) => S::Capture,
        (stage, event) => return Err(TransitionError::Illegal { stage, event }),
    };
    Ok(next)
}

/// Record of one applied transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub run_id: Uuid,
    pub old_stage: PipelineStage,
    pub new_stage: PipelineStage,
    pub event: EventKind,
    pub transitioned_at: DateTime<Utc>,
}

/// One user's identification session (in-memory only)
///
/// Serializes to the run view; photo bytes are never included.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub stage: PipelineStage,
    #[serde(skip)]
    pub photo: Option<Arc<Photo>>,
    pub query: Option<String>,
    pub candidates: Vec<SearchCandidate>,
    pub diagnostic: Option<String>,
    pub selected: Option<SearchCandidate>,
    pub scraped: Option<ScrapeOutcome>,
    pub draft: Option<DraftRecord>,
    /// Last user-visible error
    pub error: Option<String>,
    pub item_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn new(run_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            stage: PipelineStage::Capture,
            photo: None,
            query: None,
            candidates: Vec::new(),
            diagnostic: None,
            selected: None,
            scraped: None,
            draft: None,
            error: None,
            item_id: None,
            image_url: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Validate `event` against the current stage and apply it
    ///
    /// On error nothing changes.
    pub fn apply(&mut self, event: PipelineEvent) -> Result<StageTransition, TransitionError> {
        let kind = event.kind();
        let new_stage = next_stage(self.stage, kind)?;

        if let PipelineEvent::CandidateSelected(index) = &event {
            let index = *index;
            if index >= self.candidates.len() {
                return Err(TransitionError::CandidateOutOfRange {
                    index,
                    count: self.candidates.len(),
                });
            }
        }

        // Clearing arms reset `stage`, so read it first
        let old_stage = self.stage;

        match event {
            PipelineEvent::PhotoCaptured(photo) => {
                self.clear();
                self.photo = Some(Arc::new(photo));
            }
            PipelineEvent::SearchResolved(outcome) => {
                self.query = Some(outcome.query);
                self.candidates = outcome.candidates;
                self.diagnostic = outcome.diagnostic;
            }
            PipelineEvent::CandidateSelected(index) => {
                self.selected = self.candidates.get(index).cloned();
                self.scraped = None;
            }
            PipelineEvent::SelectionSkipped => {
                self.selected = None;
                self.scraped = None;
            }
            PipelineEvent::ScrapeFinished(outcome) => {
                self.scraped = Some(outcome);
            }
            PipelineEvent::AnalysisCompleted(draft) => {
                self.draft = Some(draft);
                self.error = None;
            }
            PipelineEvent::SubmissionSucceeded {
                item_id,
                image_url,
                draft,
            } => {
                self.item_id = Some(item_id);
                self.image_url = image_url;
                self.draft = Some(draft);
                self.error = None;
                self.photo = None;
            }
            PipelineEvent::AnalysisFailed(message) | PipelineEvent::SubmissionFailed(message) => {
                self.clear();
                self.error = Some(message);
            }
            PipelineEvent::Reset | PipelineEvent::Cancel => {
                self.clear();
            }
        }

        let transition = StageTransition {
            run_id: self.run_id,
            old_stage,
            new_stage,
            event: kind,
            transitioned_at: Utc::now(),
        };
        self.stage = new_stage;
        self.updated_at = transition.transitioned_at;

        Ok(transition)
    }

    /// Drop everything captured so far, keeping the identity
    fn clear(&mut self) {
        *self = Self {
            started_at: self.started_at,
            ..Self::new(self.run_id)
        };
    }

    /// Scraped record usable for merging (successful scrape only)
    pub fn scraped_record(&self) -> Option<&crate::models::ScrapedRecord> {
        self.scraped.as_ref().and_then(ScrapeOutcome::record)
    }
}
