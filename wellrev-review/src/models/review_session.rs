//! Review session state
//!
//! One value records where the reviewer is: which cluster is under review,
//! whether its farthest or closest member is on screen, the graphs being
//! compared and the running counters. Only the workflow controller mutates it;
//! everything else reads snapshots.
//!
//! # Phase Progression
//! IDLE → UPLOADING → REVIEWING → COMPLETED (reset returns to IDLE)

use serde::Serialize;
use wellrev_common::config::DEFAULT_BASELINE_CLUSTERS;
use wellrev_common::{ComparisonMode, Phase};

use crate::models::GraphRef;

/// Review session (in-memory state)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Reference graph chosen by the service at upload, fixed afterwards
    pub expected_ref: Option<GraphRef>,

    /// Index of the cluster under review
    pub cluster_cursor: usize,

    /// Which member of the cluster is being compared
    pub mode: ComparisonMode,

    /// Candidate on screen; `None` before the first fetch and after the sentinel
    pub candidate_ref: Option<GraphRef>,

    /// Service-reported distance between candidate and expected graph
    pub distance: f64,

    /// Local count of clusters, starting at the configured baseline
    pub num_clusters: u32,

    /// Answers given so far
    pub questions_answered: u32,

    /// Lifecycle phase
    pub phase: Phase,
}

impl SessionState {
    /// Initial state for a service that starts with `baseline_clusters` clusters
    pub fn new(baseline_clusters: u32) -> Self {
        Self {
            expected_ref: None,
            cluster_cursor: 0,
            mode: ComparisonMode::Farthest,
            candidate_ref: None,
            distance: 0.0,
            num_clusters: baseline_clusters.max(1),
            questions_answered: 0,
            phase: Phase::Idle,
        }
    }

    /// Check if the reviewer can answer right now
    pub fn awaiting_answer(&self) -> bool {
        self.phase == Phase::Reviewing && self.candidate_ref.is_some()
    }

    /// Check if the review finished
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_CLUSTERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GraphAnnotation;

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.mode, ComparisonMode::Farthest);
        assert_eq!(state.num_clusters, DEFAULT_BASELINE_CLUSTERS);
        assert_eq!(state.cluster_cursor, 0);
        assert!(state.expected_ref.is_none());
        assert!(state.candidate_ref.is_none());
        assert!(!state.awaiting_answer());
    }

    #[test]
    fn test_zero_baseline_is_clamped() {
        assert_eq!(SessionState::new(0).num_clusters, 1);
    }

    #[test]
    fn test_awaiting_answer_needs_candidate() {
        let mut state = SessionState::default();
        state.phase = Phase::Reviewing;
        assert!(!state.awaiting_answer());

        state.candidate_ref = Some(GraphRef::new(2, GraphAnnotation::default()));
        assert!(state.awaiting_answer());
    }
}
