//! Services for wellrev-review
//!
//! - Clustering service gateway trait and its HTTP implementation

pub mod cluster_client;
pub mod cluster_gateway;

pub use cluster_client::ClusterServiceClient;
pub use cluster_gateway::{
    ClusterGateway, FetchError, FetchOutcome, LabelAssignments, RowAssignment, UploadError,
    UploadFile,
};
