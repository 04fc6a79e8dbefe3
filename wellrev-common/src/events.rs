//! Review event types and EventBus
//!
//! The review controller emits a [`ReviewEvent`] for every visible change:
//! the loading indicator, phase changes, labels and splits sent to the
//! clustering service. Subscribers (the SSE endpoint, tests) receive them
//! through a `tokio::sync::broadcast` channel.

use crate::review_types::{ComparisonMode, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Review event types
///
/// Serialized with a `type` tag so SSE clients can dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    /// A file was submitted to the clustering service
    UploadStarted {
        file_name: String,
        timestamp: DateTime<Utc>,
    },

    /// The service accepted the upload and chose the expected graph
    ReviewStarted {
        expected_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A request to the clustering service started or finished
    LoadingChanged {
        loading: bool,
        timestamp: DateTime<Utc>,
    },

    /// A candidate graph is ready to be judged
    CandidateLoaded {
        cluster: usize,
        mode: ComparisonMode,
        candidate_index: usize,
        distance: f64,
        timestamp: DateTime<Utc>,
    },

    /// A terminal judgment was recorded for a cluster
    ClusterLabelled {
        cluster: usize,
        matches: bool,
        timestamp: DateTime<Utc>,
    },

    /// The service was asked to split a cluster
    ClusterSplitRequested {
        cluster: usize,
        num_clusters: u32,
        timestamp: DateTime<Utc>,
    },

    /// The service reported no more clusters to review
    ReviewCompleted {
        questions_answered: u32,
        num_clusters: u32,
        timestamp: DateTime<Utc>,
    },

    /// The session went back to its initial state
    SessionReset {
        previous_phase: Phase,
        timestamp: DateTime<Utc>,
    },
}

impl ReviewEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ReviewEvent::UploadStarted { .. } => "UploadStarted",
            ReviewEvent::ReviewStarted { .. } => "ReviewStarted",
            ReviewEvent::LoadingChanged { .. } => "LoadingChanged",
            ReviewEvent::CandidateLoaded { .. } => "CandidateLoaded",
            ReviewEvent::ClusterLabelled { .. } => "ClusterLabelled",
            ReviewEvent::ClusterSplitRequested { .. } => "ClusterSplitRequested",
            ReviewEvent::ReviewCompleted { .. } => "ReviewCompleted",
            ReviewEvent::SessionReset { .. } => "SessionReset",
        }
    }
}

/// Broadcast bus for review events
///
/// Cloning is cheap; all clones share the same channel.
///
/// # Examples
///
/// ```
/// use wellrev_common::events::{EventBus, ReviewEvent};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ReviewEvent::LoadingChanged {
///     loading: true,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(ReviewEvent::LoadingChanged { loading: true, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReviewEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Slow subscribers lag and lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReviewEvent,
    ) -> Result<usize, broadcast::error::SendError<ReviewEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReviewEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
