//! Review decision procedure
//!
//! Pure functions from `(state, event)` to the next state. Nothing here does
//! I/O: planning an answer yields the acknowledgement to send, the fetch to
//! issue and the pending state, and [`apply_fetch`] commits the fetch result.
//! The controller performs the network calls in between.
//!
//! | Mode | Answer | Acknowledgement | Cursor | Next fetch |
//! |---|---|---|---|---|
//! | Farthest | matches | labelTrue(cursor) | +1 | farthest |
//! | Farthest | mismatch | - | same | closest |
//! | Closest | matches | requestSplit(cursor), clusters +1 | same | farthest |
//! | Closest | mismatch | labelFalse(cursor) | +1 | farthest |
//!
//! A farthest match means even the least similar member matches, so the
//! whole cluster does. A farthest mismatch is ambiguous and is narrowed with
//! the closest member. A closest mismatch rejects the cluster. A closest match
//! after a farthest mismatch means the cluster disagrees with itself and is split.

use thiserror::Error;
use wellrev_common::{ComparisonMode, Phase};

use crate::models::{GraphRef, SessionState};
use crate::services::FetchOutcome;

/// Reviewer judgment of the candidate on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Candidate matches the expected graph
    Matches,
    /// Candidate does not match the expected graph
    Mismatch,
}

impl From<bool> for Answer {
    fn from(matches: bool) -> Self {
        if matches {
            Answer::Matches
        } else {
            Answer::Mismatch
        }
    }
}

/// Fire-and-forget call sent before the next fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    LabelTrue(usize),
    LabelFalse(usize),
    Split(usize),
}

/// Candidate query to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub mode: ComparisonMode,
    pub cluster: usize,
}

/// Planned effect of one answer
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub acknowledgement: Option<Acknowledgement>,
    pub fetch: FetchRequest,
    /// State to commit once the fetch resolves (candidate still the old one)
    pub pending: SessionState,
}

/// Event not allowed in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("review already started (phase {0})")]
    AlreadyStarted(Phase),

    #[error("not reviewing (phase {0})")]
    NotReviewing(Phase),

    #[error("no candidate loaded")]
    NoCandidate,
}

/// Accept a new upload only from a fresh session
pub fn begin_upload(state: &SessionState) -> Result<SessionState, Rejection> {
    if state.phase != Phase::Idle {
        return Err(Rejection::AlreadyStarted(state.phase));
    }

    Ok(SessionState {
        phase: Phase::Uploading,
        ..state.clone()
    })
}

/// Return to the last good state after a failed upload
pub fn upload_failed(state: &SessionState) -> SessionState {
    SessionState {
        phase: Phase::Idle,
        ..state.clone()
    }
}

/// Seed the review once the service picked the expected graph
pub fn begin_review(state: &SessionState, expected: GraphRef) -> (SessionState, FetchRequest) {
    let next = SessionState {
        expected_ref: Some(expected),
        cluster_cursor: 0,
        mode: ComparisonMode::Farthest,
        candidate_ref: None,
        distance: 0.0,
        phase: Phase::Reviewing,
        ..state.clone()
    };
    let fetch = FetchRequest {
        mode: ComparisonMode::Farthest,
        cluster: 0,
    };
    (next, fetch)
}

/// Plan the effect of an answer
pub fn plan_answer(state: &SessionState, answer: Answer) -> Result<Transition, Rejection> {
    if state.phase != Phase::Reviewing {
        return Err(Rejection::NotReviewing(state.phase));
    }
    if state.candidate_ref.is_none() {
        return Err(Rejection::NoCandidate);
    }

    let cluster = state.cluster_cursor;
    let mut pending = state.clone();
    pending.questions_answered = pending.questions_answered.saturating_add(1);

    let acknowledgement = match (state.mode, answer) {
        (ComparisonMode::Farthest, Answer::Matches) => {
            pending.cluster_cursor += 1;
            pending.mode = ComparisonMode::Farthest;
            Some(Acknowledgement::LabelTrue(cluster))
        }
        (ComparisonMode::Farthest, Answer::Mismatch) => {
            pending.mode = ComparisonMode::Closest;
            None
        }
        (ComparisonMode::Closest, Answer::Matches) => {
            pending.num_clusters = pending.num_clusters.saturating_add(1);
            pending.mode = ComparisonMode::Farthest;
            Some(Acknowledgement::Split(cluster))
        }
        (ComparisonMode::Closest, Answer::Mismatch) => {
            pending.cluster_cursor += 1;
            pending.mode = ComparisonMode::Farthest;
            Some(Acknowledgement::LabelFalse(cluster))
        }
    };

    let fetch = FetchRequest {
        mode: pending.mode,
        cluster: pending.cluster_cursor,
    };

    Ok(Transition {
        acknowledgement,
        fetch,
        pending,
    })
}

/// Plan a re-fetch of the candidate for the current cluster and mode
pub fn plan_refresh(state: &SessionState) -> Result<FetchRequest, Rejection> {
    if state.phase != Phase::Reviewing {
        return Err(Rejection::NotReviewing(state.phase));
    }

    Ok(FetchRequest {
        mode: state.mode,
        cluster: state.cluster_cursor,
    })
}

/// Commit a fetch result onto the pending state
///
/// The sentinel completes the review and clears the candidate; a candidate
/// keeps the session reviewing.
pub fn apply_fetch(pending: SessionState, outcome: FetchOutcome) -> SessionState {
    match outcome {
        FetchOutcome::Candidate { graph, distance } => SessionState {
            candidate_ref: Some(graph),
            distance,
            phase: Phase::Reviewing,
            ..pending
        },
        FetchOutcome::Exhausted => SessionState {
            candidate_ref: None,
            distance: 0.0,
            phase: Phase::Completed,
            ..pending
        },
    }
}
