//! wellrev-review library interface
//!
//! Human-in-the-loop review of a well clustering: the reviewer compares
//! candidates chosen by the clustering service against an expected graph, and
//! the workflow decides whether to accept, reject or split each cluster.
//!
//! Exposes public APIs for integration testing.

pub mod api;
pub mod dataset;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wellrev_common::events::EventBus;

use crate::workflow::WorkflowController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Review workflow controller (owns the session state)
    pub controller: Arc<WorkflowController>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// File name offered for the results download
    pub export_filename: String,
}

impl AppState {
    pub fn new(controller: Arc<WorkflowController>, export_filename: impl Into<String>) -> Self {
        let event_bus = controller.event_bus().clone();
        Self {
            controller,
            event_bus,
            export_filename: export_filename.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::session_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .route("/api/events", axum::routing::get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
