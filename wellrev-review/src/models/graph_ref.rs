//! Graph references returned by the clustering service
//!
//! A [`GraphRef`] names one dataset row and carries the peak/valley
//! annotation the service computed for it. Peaks and their heights (and
//! valleys and their heights) are parallel sequences; construction rejects
//! annotations where the lengths disagree.

use serde::Serialize;
use thiserror::Error;

/// Annotation whose parallel sequences have different lengths
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("{peaks} peaks but {heights} peak heights")]
    PeakHeights { peaks: usize, heights: usize },

    #[error("{valleys} valleys but {heights} valley heights")]
    ValleyHeights { valleys: usize, heights: usize },
}

/// Peak and valley annotation of one series
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GraphAnnotation {
    peaks: Vec<usize>,
    peak_heights: Vec<f64>,
    valleys: Vec<usize>,
    valley_heights: Vec<f64>,
}

impl GraphAnnotation {
    pub fn new(
        peaks: Vec<usize>,
        peak_heights: Vec<f64>,
        valleys: Vec<usize>,
        valley_heights: Vec<f64>,
    ) -> Result<Self, AnnotationError> {
        if peaks.len() != peak_heights.len() {
            return Err(AnnotationError::PeakHeights {
                peaks: peaks.len(),
                heights: peak_heights.len(),
            });
        }
        if valleys.len() != valley_heights.len() {
            return Err(AnnotationError::ValleyHeights {
                valleys: valleys.len(),
                heights: valley_heights.len(),
            });
        }

        Ok(Self {
            peaks,
            peak_heights,
            valleys,
            valley_heights,
        })
    }

    pub fn peaks(&self) -> &[usize] {
        &self.peaks
    }

    pub fn peak_heights(&self) -> &[f64] {
        &self.peak_heights
    }

    pub fn valleys(&self) -> &[usize] {
        &self.valleys
    }

    pub fn valley_heights(&self) -> &[f64] {
        &self.valley_heights
    }

    /// (sample index, height) pairs for the peaks
    pub fn peak_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.peaks.iter().copied().zip(self.peak_heights.iter().copied())
    }

    /// (sample index, height) pairs for the valleys
    pub fn valley_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.valleys
            .iter()
            .copied()
            .zip(self.valley_heights.iter().copied())
    }
}

/// A dataset row index plus its annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRef {
    pub index: usize,
    pub annotation: GraphAnnotation,
}

impl GraphRef {
    pub fn new(index: usize, annotation: GraphAnnotation) -> Self {
        Self { index, annotation }
    }
}
