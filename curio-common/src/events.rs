//! Event types for the Curio event system
//!
//! Provides shared event definitions and the EventBus used to fan pipeline
//! progress out to SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Identification pipeline stage
///
/// `Capture` is both the initial stage and the stage every cancelled or
/// failed run falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Waiting for a photo
    Capture,
    /// Keyword extraction + scoped image search
    Searching,
    /// Candidate list shown, waiting for pick or skip
    Selecting,
    /// Fetching and scraping the chosen product page
    Scraping,
    /// Vision structured extraction + merge
    Analyzing,
    /// Draft ready for review and submission
    Form,
    /// Item created
    Success,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Capture => "capture",
            PipelineStage::Searching => "searching",
            PipelineStage::Selecting => "selecting",
            PipelineStage::Scraping => "scraping",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Form => "form",
            PipelineStage::Success => "success",
        };
        f.write_str(name)
    }
}

/// Curio event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CurioEvent {
    /// A pipeline run moved between stages
    PipelineStageChanged {
        run_id: Uuid,
        old_stage: PipelineStage,
        new_stage: PipelineStage,
        timestamp: DateTime<Utc>,
    },

    /// Scoped search resolved (possibly with zero candidates)
    CandidatesFound {
        run_id: Uuid,
        count: usize,
        /// Diagnostic shown alongside the candidate list
        diagnostic: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Product page scrape attempt finished
    ScrapeCompleted {
        run_id: Uuid,
        url: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// Merged draft is ready for review
    DraftReady {
        run_id: Uuid,
        title: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted back to capture with a user-visible message
    PipelineFailed {
        run_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Draft submitted and item created
    ItemCreated {
        run_id: Uuid,
        item_id: Uuid,
        image_url: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl CurioEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            CurioEvent::PipelineStageChanged { .. } => "PipelineStageChanged",
            CurioEvent::CandidatesFound { .. } => "CandidatesFound",
            CurioEvent::ScrapeCompleted { .. } => "ScrapeCompleted",
            CurioEvent::DraftReady { .. } => "DraftReady",
            CurioEvent::PipelineFailed { .. } => "PipelineFailed",
            CurioEvent::ItemCreated { .. } => "ItemCreated",
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            CurioEvent::PipelineStageChanged { run_id, .. }
            | CurioEvent::CandidatesFound { run_id, .. }
            | CurioEvent::ScrapeCompleted { run_id, .. }
            | CurioEvent::DraftReady { run_id, .. }
            | CurioEvent::PipelineFailed { run_id, .. }
            | CurioEvent::ItemCreated { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for CurioEvent
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CurioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering `capacity` events per subscriber
    ///
    /// ```
    /// use curio_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CurioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CurioEvent,
    ) -> Result<usize, broadcast::error::SendError<CurioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CurioEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
