//! Pipeline controller
//!
//! Sequences the pipeline components for one run and feeds their results to
//! [`PipelineRun::apply`]. Components never fail outright (they return
//! degraded outcomes), so the only ways a stage ends early are a rejected
//! transition, a cancelled token, a validation error on submission, or a
//! vision/submission failure that sends the run back to capture.

use chrono::{Datelike, Utc};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use curio_common::events::{CurioEvent, EventBus};

use super::state::{PipelineEvent, PipelineRun, StageTransition, TransitionError};
use super::submission::{validate_submission, ItemRepository, NewItem, SubmissionError};
use crate::fusion::merge;
use crate::models::{DraftRecord, Photo};
use crate::services::{ImageStore, KeywordExtractor, PageScraper, ScopedSearchClient, StructuredExtractor};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] SubmissionError),
}

/// Submission input; `draft` replaces the run's draft when the user edited it
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SubmissionRequest {
    pub collection_id: String,
    #[serde(default)]
    pub draft: Option<DraftRecord>,
}

pub struct PipelineController {
    keywords: KeywordExtractor,
    search: ScopedSearchClient,
    scraper: PageScraper,
    vision: StructuredExtractor,
    items: Arc<dyn ItemRepository>,
    images: Arc<dyn ImageStore>,
    event_bus: EventBus,
}

impl PipelineController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        keywords: KeywordExtractor,
        search: ScopedSearchClient,
        scraper: PageScraper,
        vision: StructuredExtractor,
        items: Arc<dyn ItemRepository>,
        images: Arc<dyn ImageStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            keywords,
            search,
            scraper,
            vision,
            items,
            images,
            event_bus,
        }
    }

    pub fn keywords(&self) -> &KeywordExtractor {
        &self.keywords
    }

    pub fn search(&self) -> &ScopedSearchClient {
        &self.search
    }

    pub fn scraper(&self) -> &PageScraper {
        &self.scraper
    }

    pub fn vision(&self) -> &StructuredExtractor {
        &self.vision
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// capture -> searching -> selecting
    pub async fn start(
        &self,
        run: &mut PipelineRun,
        photo: Photo,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        self.apply(run, PipelineEvent::PhotoCaptured(photo))?;
        let photo = self.photo_of(run);

        let keywords = match &photo {
            Some(photo) => guarded(cancel, self.keywords.extract(photo)).await?,
            None => None,
        };
        let outcome = guarded(cancel, self.search.search(keywords.as_deref())).await?;

        let count = outcome.candidates.len();
        let diagnostic = outcome.diagnostic.clone();
        self.apply(run, PipelineEvent::SearchResolved(outcome))?;

        self.event_bus.emit_lossy(CurioEvent::CandidatesFound {
            run_id: run.run_id,
            count,
            diagnostic,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// selecting -> scraping -> analyzing -> form (or capture)
    pub async fn select(
        &self,
        run: &mut PipelineRun,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        self.apply(run, PipelineEvent::CandidateSelected(index))?;

        let url = run
            .selected
            .as_ref()
            .map(|candidate| candidate.page_url.clone())
            .unwrap_or_default();
        let outcome = guarded(cancel, self.scraper.scrape(&url)).await?;

        self.event_bus.emit_lossy(CurioEvent::ScrapeCompleted {
            run_id: run.run_id,
            url,
            success: outcome.success,
            timestamp: Utc::now(),
        });
        self.apply(run, PipelineEvent::ScrapeFinished(outcome))?;

        self.analyze(run, cancel).await
    }

    /// selecting -> analyzing -> form (or capture)
    pub async fn skip(
        &self,
        run: &mut PipelineRun,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        self.apply(run, PipelineEvent::SelectionSkipped)?;
        self.analyze(run, cancel).await
    }

    async fn analyze(
        &self,
        run: &mut PipelineRun,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let Some(photo) = self.photo_of(run) else {
            return self.fail(run, PipelineEvent::AnalysisFailed("No photo captured".to_string()));
        };

        match guarded(cancel, self.vision.extract(&photo)).await? {
            Ok(vision) => {
                let mut draft = merge(run.scraped_record(), &vision);
                if run.scraped_record().is_some() {
                    draft.source_url = run.selected.as_ref().map(|c| c.page_url.clone());
                }
                let title = draft.title.clone();
                self.apply(run, PipelineEvent::AnalysisCompleted(draft))?;

                self.event_bus.emit_lossy(CurioEvent::DraftReady {
                    run_id: run.run_id,
                    title: Some(title),
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(run_id = %run.run_id, error = %e, "Vision extraction failed");
                self.fail(
                    run,
                    PipelineEvent::AnalysisFailed(format!("Failed to analyze image: {}", e)),
                )
            }
        }
    }

    /// form -> success (or capture)
    ///
    /// Validation errors leave the run in `form`. Once the item exists the
    /// photo upload is best effort: a storage or attach failure is logged and
    /// the run still succeeds.
    pub async fn submit(
        &self,
        run: &mut PipelineRun,
        request: SubmissionRequest,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        super::state::next_stage(run.stage, super::state::EventKind::SubmissionSucceeded)?;

        let draft = request
            .draft
            .or_else(|| run.draft.clone())
            .unwrap_or_default();
        validate_submission(&request.collection_id, &draft, Utc::now().year())?;

        let item = NewItem {
            collection_id: request.collection_id.trim().to_string(),
            draft,
            image_reference: run.selected.as_ref().map(|c| c.thumbnail_url.clone()),
        };

        let item_id = match guarded(cancel, self.items.create_item(&item)).await? {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(run_id = %run.run_id, error = %e, "Item creation failed");
                return self.fail(
                    run,
                    PipelineEvent::SubmissionFailed(format!("Failed to create item: {}", e)),
                );
            }
        };

        // Not raced against `cancel`: the item already exists and is never rolled back
        let image_url = match self.photo_of(run) {
            Some(photo) => self.store_photo(&photo, item_id).await,
            None => None,
        };

        self.apply(
            run,
            PipelineEvent::SubmissionSucceeded {
                item_id,
                image_url: image_url.clone(),
                draft: item.draft,
            },
        )?;

        self.event_bus.emit_lossy(CurioEvent::ItemCreated {
            run_id: run.run_id,
            item_id,
            image_url,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// any -> capture
    pub fn cancel(&self, run: &mut PipelineRun) -> Result<StageTransition, PipelineError> {
        self.apply(run, PipelineEvent::Cancel)
    }

    /// success -> capture
    pub fn reset(&self, run: &mut PipelineRun) -> Result<StageTransition, PipelineError> {
        self.apply(run, PipelineEvent::Reset)
    }

    async fn store_photo(&self, photo: &Photo, item_id: Uuid) -> Option<String> {
        let url = match self.images.store(photo, item_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "Photo storage failed");
                return None;
            }
        };

        if let Err(e) = self.items.attach_image(item_id, &url).await {
            tracing::warn!(item_id = %item_id, error = %e, "Failed to attach photo to item");
        }
        Some(url)
    }

    fn photo_of(&self, run: &PipelineRun) -> Option<Arc<Photo>> {
        run.photo.clone()
    }

    fn fail(&self, run: &mut PipelineRun, event: PipelineEvent) -> Result<(), PipelineError> {
        let message = match &event {
            PipelineEvent::AnalysisFailed(m) | PipelineEvent::SubmissionFailed(m) => m.clone(),
            _ => String::new(),
        };
        self.apply(run, event)?;

        self.event_bus.emit_lossy(CurioEvent::PipelineFailed {
            run_id: run.run_id,
            message,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Apply an event, then log and broadcast the transition
    fn apply(
        &self,
        run: &mut PipelineRun,
        event: PipelineEvent,
    ) -> Result<StageTransition, PipelineError> {
        let transition = run.apply(event).map_err(|e| {
            tracing::warn!(run_id = %run.run_id, stage = %run.stage, error = %e, "Rejected pipeline event");
            e
        })?;

        tracing::info!(
            run_id = %transition.run_id,
            from = %transition.old_stage,
            to = %transition.new_stage,
            event = %transition.event,
            "Pipeline stage changed"
        );

        self.event_bus.emit_lossy(CurioEvent::PipelineStageChanged {
            run_id: transition.run_id,
            old_stage: transition.old_stage,
            new_stage: transition.new_stage,
            timestamp: transition.transitioned_at,
        });

        Ok(transition)
    }
}

/// Race `work` against the run's cancellation token
async fn guarded<F: Future>(cancel: &CancellationToken, work: F) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        output = work => Ok(output),
    }
}
