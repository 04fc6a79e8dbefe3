//! Clustering service gateway
//!
//! The only seam through which the review workflow talks to the remote
//! clustering service. Implementations are stateless request/response
//! wrappers; the workflow controller owns all session state.
//!
//! The service signals "no such candidate / no more clusters" with a
//! negative index. Implementations convert that sentinel into
//! [`FetchOutcome::Exhausted`] (and unassigned rows into `None`) so no other
//! code has to know the magic number.

use async_trait::async_trait;
use thiserror::Error;
use wellrev_common::ComparisonMode;

use crate::models::GraphRef;

/// Failure submitting the dataset file
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service rejected upload ({0}): {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed upload response: {0}")]
    Malformed(String),
}

/// Failure fetching a candidate or sending an acknowledgement
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// The dataset file as submitted by the reviewer
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Result of a farthest/closest query
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A member of the cluster, with its distance to the expected graph
    Candidate { graph: GraphRef, distance: f64 },
    /// The service returned the sentinel: nothing left to review
    Exhausted,
}

/// Cluster membership of one dataset row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAssignment {
    pub row_index: usize,
    /// `None` when the service never assigned the row (filtered out or outlier)
    pub cluster: Option<usize>,
}

/// Final labelling reported by the service once review is complete
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelAssignments {
    /// Label per cluster id
    pub cluster_labels: Vec<i64>,
    /// Assignment per row, in row order
    pub rows: Vec<RowAssignment>,
}

/// Request/response interface of the clustering service
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Submit the dataset; returns the expected (reference) graph
    async fn upload(&self, file: &UploadFile) -> Result<GraphRef, UploadError>;

    /// Least similar member of `cluster`
    async fn fetch_farthest(&self, cluster: usize) -> Result<FetchOutcome, FetchError>;

    /// Most similar member of `cluster`
    async fn fetch_closest(&self, cluster: usize) -> Result<FetchOutcome, FetchError>;

    /// Record that `cluster` matches the expected pattern
    async fn label_true(&self, cluster: usize) -> Result<(), FetchError>;

    /// Record that `cluster` does not match the expected pattern
    async fn label_false(&self, cluster: usize) -> Result<(), FetchError>;

    /// Ask the service to partition `cluster` further
    ///
    /// The split must be visible to the next fetch for the same cluster.
    async fn request_split(&self, cluster: usize) -> Result<(), FetchError>;

    /// Per-row cluster assignment and per-cluster labels
    async fn fetch_label_assignments(&self) -> Result<LabelAssignments, FetchError>;

    /// Number of distinct clusters the service currently holds
    async fn cluster_count(&self) -> Result<u32, FetchError>;

    /// Fetch the candidate for `mode`
    async fn fetch(&self, mode: ComparisonMode, cluster: usize) -> Result<FetchOutcome, FetchError> {
        match mode {
            ComparisonMode::Farthest => self.fetch_farthest(cluster).await,
            ComparisonMode::Closest => self.fetch_closest(cluster).await,
        }
    }
}
