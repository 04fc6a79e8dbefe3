//! Data models for wellrev-review
//!
//! - Graph references returned by the clustering service
//! - Review session state machine data

pub mod graph_ref;
pub mod review_session;

pub use graph_ref::{AnnotationError, GraphAnnotation, GraphRef};
pub use review_session::SessionState;
pub use wellrev_common::{ComparisonMode, Phase};
