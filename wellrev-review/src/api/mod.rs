//! HTTP API handlers for wellrev-review
//!
//! The reviewer-facing surface: every handler delegates to the workflow
//! controller and never touches session state directly.

pub mod export;
pub mod health;
pub mod session;
pub mod sse;

pub use export::{download_results, export_routes};
pub use health::health_routes;
pub use session::{
    answer, cluster_counts, get_session, refresh_session, reset_session, session_routes,
    start_session,
};
pub use sse::event_stream;
