//! Results export
//!
//! Once the review is complete the clustering service reports, for every
//! row, which cluster it ended up in and, for every cluster, the label the
//! reviewer's answers gave it. [`build`] joins that with the dataset so the
//! export has exactly one row per dataset row; [`to_csv`] renders the download.

use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;

use crate::dataset::Dataset;
use crate::services::LabelAssignments;

/// Value written for rows that were never assigned a cluster
pub const UNASSIGNED_LABEL: i64 = -1;

/// Header line of the results file
pub const CSV_HEADER: &str = "Well ID,Label";

/// Label of one exported row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportLabel {
    /// Label of the cluster the row belongs to
    Cluster(i64),
    /// The service never assigned the row to a cluster
    Unassigned,
}

impl ExportLabel {
    pub fn value(&self) -> i64 {
        match self {
            ExportLabel::Cluster(label) => *label,
            ExportLabel::Unassigned => UNASSIGNED_LABEL,
        }
    }
}

impl fmt::Display for ExportLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One line of the results file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub row_index: usize,
    pub label: ExportLabel,
}

/// Assemble one export row per dataset row, in dataset order
///
/// A row resolves to `cluster_labels[cluster]` when the service assigned it
/// to `cluster`; rows without an assignment, or whose cluster has no label,
/// are [`ExportLabel::Unassigned`]. Assignments for rows past the end of the
/// dataset are ignored.
pub fn build(assignments: &LabelAssignments, dataset: &Dataset) -> Vec<ExportRow> {
    let row_count = dataset.row_count();
    let mut clusters: Vec<Option<usize>> = vec![None; row_count];

    for assignment in &assignments.rows {
        match clusters.get_mut(assignment.row_index) {
            Some(slot) => *slot = assignment.cluster,
            None => tracing::debug!(
                row = assignment.row_index,
                row_count,
                "Ignoring assignment for row outside the dataset"
            ),
        }
    }

    clusters
        .into_iter()
        .enumerate()
        .map(|(row_index, cluster)| ExportRow {
            row_index,
            label: resolve_label(row_index, cluster, &assignments.cluster_labels),
        })
        .collect()
}

fn resolve_label(row_index: usize, cluster: Option<usize>, cluster_labels: &[i64]) -> ExportLabel {
    let Some(cluster) = cluster else {
        return ExportLabel::Unassigned;
    };

    match cluster_labels.get(cluster) {
        Some(&label) => ExportLabel::Cluster(label),
        None => {
            tracing::warn!(
                row = row_index,
                cluster,
                known_clusters = cluster_labels.len(),
                "Row refers to a cluster without a label, exporting as unassigned"
            );
            ExportLabel::Unassigned
        }
    }
}

/// Render rows as the results file (`Well ID,Label` header, one line per row)
pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + rows.len() * 8);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{},{}", row.row_index, row.label);
    }
    out
}
