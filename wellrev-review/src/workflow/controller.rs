//! Review workflow controller
//!
//! Owns the [`SessionState`] and drives it with the pure functions in
//! [`transition`]. Each operation is a two-phase step: plan and dispatch the
//! network calls, then resolve and apply the result under the state lock.
//!
//! # Concurrency
//! One operation at a time. A busy flag is taken with `compare_exchange`
//! before dispatch and released by a guard on every exit path; a second
//! `start`/`answer`/`refresh`/`export` while busy fails with
//! [`WorkflowError::Busy`] and changes nothing. `reset` does not wait for
//! the flag: it bumps a generation counter so that a result arriving for an
//! older generation is discarded instead of applied.
//!
//! # Failures
//! - Upload failure returns the session to `Idle`.
//! - Acknowledgement failures (labels, split) are logged and do not block
//!   the transition.
//! - Fetch failure leaves the committed state untouched. The planned
//!   transition is kept, and answering the same way again resumes with the
//!   fetch only, so its acknowledgement is not sent twice.

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use wellrev_common::events::{EventBus, ReviewEvent};
use wellrev_common::{ComparisonMode, Phase};

use crate::dataset::Dataset;
use crate::export::{self, ExportRow};
use crate::models::{GraphRef, SessionState};
use crate::services::{ClusterGateway, FetchError, FetchOutcome, UploadError, UploadFile};
use crate::workflow::transition::{
    self, Acknowledgement, Answer, FetchRequest, Rejection, Transition,
};

/// Errors returned by controller operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("another request is still in flight")]
    Busy,

    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("review is not complete (phase {0})")]
    NotCompleted(Phase),

    #[error("no dataset loaded")]
    NoDataset,

    #[error("session was reset while the request was in flight")]
    Superseded,
}

/// Session snapshot paired with the series the presentation layer draws
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub state: SessionState,
    pub expected_series: Option<Vec<f64>>,
    pub candidate_series: Option<Vec<f64>>,
    pub busy: bool,
}

/// Answer whose acknowledgement was sent but whose fetch failed
///
/// Keyed on the generation and the position it was planned from. The
/// candidate distance is not part of the key: the service may report NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StalledAnswer {
    generation: u64,
    cluster_cursor: usize,
    mode: ComparisonMode,
    questions_answered: u32,
    acknowledgement: Option<Acknowledgement>,
    fetch: FetchRequest,
}

impl StalledAnswer {
    fn of(generation: u64, origin: &SessionState, planned: &Transition) -> Self {
        Self {
            generation,
            cluster_cursor: origin.cluster_cursor,
            mode: origin.mode,
            questions_answered: origin.questions_answered,
            acknowledgement: planned.acknowledgement,
            fetch: planned.fetch,
        }
    }
}

/// Holds the busy flag for the duration of one operation
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    event_bus: &'a EventBus,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, event_bus: &'a EventBus) -> Result<Self, WorkflowError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::Busy)?;

        event_bus.emit_lossy(ReviewEvent::LoadingChanged {
            loading: true,
            timestamp: Utc::now(),
        });
        Ok(Self { flag, event_bus })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.event_bus.emit_lossy(ReviewEvent::LoadingChanged {
            loading: false,
            timestamp: Utc::now(),
        });
    }
}

/// Review workflow controller service
pub struct WorkflowController {
    gateway: Arc<dyn ClusterGateway>,
    event_bus: EventBus,
    baseline_clusters: u32,
    state: RwLock<SessionState>,
    dataset: RwLock<Option<Arc<Dataset>>>,
    busy: AtomicBool,
    generation: AtomicU64,
    stalled: Mutex<Option<StalledAnswer>>,
}

impl WorkflowController {
    /// Create a controller in the initial `Idle` state
    ///
    /// # Arguments
    /// * `gateway` - Clustering service gateway
    /// * `event_bus` - Bus for loading/progress events
    /// * `baseline_clusters` - Cluster count the service starts with
    pub fn new(gateway: Arc<dyn ClusterGateway>, event_bus: EventBus, baseline_clusters: u32) -> Self {
        Self {
            gateway,
            event_bus,
            baseline_clusters,
            state: RwLock::new(SessionState::new(baseline_clusters)),
            dataset: RwLock::new(None),
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            stalled: Mutex::new(None),
        }
    }

    /// Current session snapshot
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Dataset of the current session, if a file was uploaded
    pub async fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.read().await.clone()
    }

    /// Check if a request is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Session snapshot with the expected and candidate series resolved
    pub async fn view(&self) -> ReviewView {
        let state = self.state().await;
        let dataset = self.dataset().await;

        ReviewView {
            expected_series: series_for(dataset.as_deref(), state.expected_ref.as_ref()),
            candidate_series: series_for(dataset.as_deref(), state.candidate_ref.as_ref()),
            busy: self.is_busy(),
            state,
        }
    }

    /// Submit the dataset and load the first candidate
    ///
    /// Accepted only from `Idle`. If the first fetch fails the session stays
    /// `Reviewing` without a candidate; [`refresh`](Self::refresh) retries it.
    pub async fn start(&self, file: UploadFile) -> Result<SessionState, WorkflowError> {
        let _guard = BusyGuard::acquire(&self.busy, &self.event_bus)?;
        let generation = self.current_generation();

        {
            let mut state = self.state.write().await;
            *state = transition::begin_upload(&state)?;
        }

        info!(
            file_name = %file.file_name,
            bytes = file.bytes.len(),
            "Submitting dataset to clustering service"
        );
        self.event_bus.emit_lossy(ReviewEvent::UploadStarted {
            file_name: file.file_name.clone(),
            timestamp: Utc::now(),
        });

        let expected = match self.gateway.upload(&file).await {
            Ok(expected) => expected,
            Err(e) => {
                error!(file_name = %file.file_name, error = %e, "Upload failed");
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    *state = transition::upload_failed(&state);
                }
                return Err(WorkflowError::Upload(e));
            }
        };

        let dataset = Arc::new(Dataset::from_bytes(&file.bytes));
        let expected_index = expected.index;
        if dataset.row_at(expected_index).is_none() {
            warn!(
                expected = expected_index,
                rows = dataset.row_count(),
                "Expected graph is not a readable row of the uploaded file"
            );
        }

        let (seeded, fetch) = {
            let mut state = self.state.write().await;
            if !self.is_current(generation) {
                return Err(WorkflowError::Superseded);
            }
            let (seeded, fetch) = transition::begin_review(&state, expected);
            *state = seeded.clone();
            *self.dataset.write().await = Some(dataset);
            (seeded, fetch)
        };

        info!(expected = expected_index, "Review started");
        self.event_bus.emit_lossy(ReviewEvent::ReviewStarted {
            expected_index,
            timestamp: Utc::now(),
        });

        match self.gateway.fetch(fetch.mode, fetch.cluster).await {
            Ok(outcome) => self.commit(generation, seeded, fetch, outcome).await,
            Err(e) => {
                warn!(
                    cluster = fetch.cluster,
                    mode = %fetch.mode,
                    error = %e,
                    "First candidate fetch failed; refresh to retry"
                );
                Ok(self.state().await)
            }
        }
    }

    /// Apply the reviewer's judgment of the candidate on screen
    pub async fn answer(&self, matches: bool) -> Result<SessionState, WorkflowError> {
        let _guard = BusyGuard::acquire(&self.busy, &self.event_bus)?;
        let generation = self.current_generation();
        let snapshot = self.state().await;

        let answer = Answer::from(matches);
        let planned = transition::plan_answer(&snapshot, answer).map_err(|e| {
            debug!(?answer, reason = %e, "Answer rejected");
            e
        })?;

        let key = StalledAnswer::of(generation, &snapshot, &planned);
        let resumed = self
            .stalled
            .lock()
            .await
            .take()
            .is_some_and(|stalled| stalled == key);

        if resumed {
            info!(
                cluster = snapshot.cluster_cursor,
                "Resuming stalled answer, acknowledgement already sent"
            );
        } else if let Some(ack) = planned.acknowledgement {
            self.acknowledge(ack, &planned.pending).await;
        }

        let fetch = planned.fetch;
        match self.gateway.fetch(fetch.mode, fetch.cluster).await {
            Ok(outcome) => self.commit(generation, planned.pending, fetch, outcome).await,
            Err(e) => {
                error!(
                    cluster = fetch.cluster,
                    mode = %fetch.mode,
                    error = %e,
                    "Candidate fetch failed, state unchanged"
                );
                self.park(key).await;
                Err(WorkflowError::Fetch(e))
            }
        }
    }

    /// Re-fetch the candidate for the current cluster and mode
    pub async fn refresh(&self) -> Result<SessionState, WorkflowError> {
        let _guard = BusyGuard::acquire(&self.busy, &self.event_bus)?;
        let generation = self.current_generation();
        let snapshot = self.state().await;
        let fetch = transition::plan_refresh(&snapshot)?;

        let outcome = self.gateway.fetch(fetch.mode, fetch.cluster).await?;
        self.commit(generation, snapshot, fetch, outcome).await
    }

    /// Return to the initial state, discarding any in-flight result
    pub async fn reset(&self) -> SessionState {
        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);

        let previous_phase = state.phase;
        *state = SessionState::new(self.baseline_clusters);
        *self.dataset.write().await = None;
        *self.stalled.lock().await = None;
        let snapshot = state.clone();
        drop(state);

        info!(%previous_phase, "Session reset");
        self.event_bus.emit_lossy(ReviewEvent::SessionReset {
            previous_phase,
            timestamp: Utc::now(),
        });
        snapshot
    }

    /// Final per-row labels, available once the review is complete
    pub async fn export(&self) -> Result<Vec<ExportRow>, WorkflowError> {
        let _guard = BusyGuard::acquire(&self.busy, &self.event_bus)?;

        let phase = self.state.read().await.phase;
        if phase != Phase::Completed {
            return Err(WorkflowError::NotCompleted(phase));
        }
        let dataset = self.dataset().await.ok_or(WorkflowError::NoDataset)?;

        let assignments = self.gateway.fetch_label_assignments().await?;
        let rows = export::build(&assignments, &dataset);

        info!(
            rows = rows.len(),
            assigned = assignments.rows.len(),
            "Export assembled"
        );
        Ok(rows)
    }

    /// Number of clusters the service currently holds
    pub async fn service_cluster_count(&self) -> Result<u32, WorkflowError> {
        Ok(self.gateway.cluster_count().await?)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Remember a stalled answer unless a reset has superseded it
    ///
    /// The generation check and the store happen under the state read lock;
    /// `reset` bumps the generation and clears `stalled` under the write
    /// lock, so a stale answer is never parked after a reset.
    async fn park(&self, stalled: StalledAnswer) {
        let _state = self.state.read().await;
        if self.is_current(stalled.generation) {
            *self.stalled.lock().await = Some(stalled);
        }
    }

    /// Send the acknowledgement for a terminal answer or a split
    ///
    /// Local state is optimistic: failures are logged, not retried.
    async fn acknowledge(&self, ack: Acknowledgement, pending: &SessionState) {
        let (result, event) = match ack {
            Acknowledgement::LabelTrue(cluster) => (
                self.gateway.label_true(cluster).await,
                ReviewEvent::ClusterLabelled {
                    cluster,
                    matches: true,
                    timestamp: Utc::now(),
                },
            ),
            Acknowledgement::LabelFalse(cluster) => (
                self.gateway.label_false(cluster).await,
                ReviewEvent::ClusterLabelled {
                    cluster,
                    matches: false,
                    timestamp: Utc::now(),
                },
            ),
            Acknowledgement::Split(cluster) => (
                self.gateway.request_split(cluster).await,
                ReviewEvent::ClusterSplitRequested {
                    cluster,
                    num_clusters: pending.num_clusters,
                    timestamp: Utc::now(),
                },
            ),
        };

        match result {
            Ok(()) => info!(?ack, "Acknowledgement sent"),
            Err(e) => warn!(?ack, error = %e, "Acknowledgement failed, continuing"),
        }
        self.event_bus.emit_lossy(event);
    }

    /// Apply a fetch result unless a reset happened in the meantime
    async fn commit(
        &self,
        generation: u64,
        pending: SessionState,
        fetch: FetchRequest,
        outcome: FetchOutcome,
    ) -> Result<SessionState, WorkflowError> {
        let next = {
            let mut state = self.state.write().await;
            if !self.is_current(generation) {
                debug!(cluster = fetch.cluster, "Discarding result of superseded request");
                return Err(WorkflowError::Superseded);
            }
            let next = transition::apply_fetch(pending, outcome);
            *state = next.clone();
            next
        };

        self.announce(&next, fetch);
        Ok(next)
    }

    fn announce(&self, state: &SessionState, fetch: FetchRequest) {
        match &state.candidate_ref {
            Some(candidate) => {
                info!(
                    cluster = fetch.cluster,
                    mode = %fetch.mode,
                    candidate = candidate.index,
                    distance = state.distance,
                    "Candidate loaded"
                );
                self.event_bus.emit_lossy(ReviewEvent::CandidateLoaded {
                    cluster: fetch.cluster,
                    mode: fetch.mode,
                    candidate_index: candidate.index,
                    distance: state.distance,
                    timestamp: Utc::now(),
                });
            }
            None if state.phase == Phase::Completed => {
                info!(
                    cluster = fetch.cluster,
                    questions_answered = state.questions_answered,
                    num_clusters = state.num_clusters,
                    "Review completed"
                );
                self.event_bus.emit_lossy(ReviewEvent::ReviewCompleted {
                    questions_answered: state.questions_answered,
                    num_clusters: state.num_clusters,
                    timestamp: Utc::now(),
                });
            }
            None => {}
        }
    }
}

fn series_for(dataset: Option<&Dataset>, graph: Option<&GraphRef>) -> Option<Vec<f64>> {
    let row = dataset?.row_at(graph?.index)?;
    Some(row.to_vec())
}
