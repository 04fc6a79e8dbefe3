//! Review enums shared between the session model and the event stream

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which member of the current cluster is being compared with the expected graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Least similar member of the cluster
    #[default]
    Farthest,
    /// Most similar member of the cluster
    Closest,
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonMode::Farthest => write!(f, "farthest"),
            ComparisonMode::Closest => write!(f, "closest"),
        }
    }
}

/// Review session lifecycle
///
/// Idle → Uploading → Reviewing → Completed. Only `reset` goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    /// No file submitted yet
    #[default]
    Idle,
    /// File submitted, waiting for the clustering service
    Uploading,
    /// Reviewer is answering comparisons
    Reviewing,
    /// The service reported there is nothing left to review
    Completed,
}

impl Phase {
    /// Check if the session reached its terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "IDLE",
            Phase::Uploading => "UPLOADING",
            Phase::Reviewing => "REVIEWING",
            Phase::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(ComparisonMode::default(), ComparisonMode::Farthest);
        assert_eq!(Phase::default(), Phase::Idle);
    }

    #[test]
    fn test_phase_serializes_uppercase() {
        let json = serde_json::to_string(&Phase::Reviewing).unwrap();
        assert_eq!(json, "\"REVIEWING\"");
        assert_eq!(Phase::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(Phase::Completed.is_terminal());
        assert!(!Phase::Reviewing.is_terminal());
        assert!(!Phase::Idle.is_terminal());
    }
}
