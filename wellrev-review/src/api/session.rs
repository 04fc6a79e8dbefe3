//! Review session API handlers
//!
//! GET /api/session, POST /api/session/start, POST /api/session/answer,
//! POST /api/session/refresh, POST /api/session/reset, GET /api/clusters

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::SessionState,
    services::UploadFile,
    workflow::ReviewView,
    AppState,
};

/// Largest dataset file accepted by POST /api/session/start
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Multipart field carrying the dataset file
const FILE_FIELD: &str = "file";

/// POST /api/session/answer request
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Whether the candidate matches the expected graph
    pub matches: bool,
}

/// GET /api/clusters response
#[derive(Debug, Serialize)]
pub struct ClusterCountsResponse {
    /// Cluster count tracked by the session (baseline plus splits)
    pub num_clusters: u32,
    /// Cluster count reported by the clustering service
    pub service_clusters: u32,
}

/// GET /api/session
///
/// Current state plus the expected and candidate series for drawing.
pub async fn get_session(State(state): State<AppState>) -> Json<ReviewView> {
    Json(state.controller.view().await)
}

/// POST /api/session/start
///
/// Multipart upload with a `file` part; submits it to the clustering
/// service and loads the first candidate.
pub async fn start_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionState>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
        upload = Some(UploadFile::new(file_name, bytes.to_vec()));
    }

    let file = upload.ok_or_else(|| {
        ApiError::BadRequest(format!("Missing multipart field '{}'", FILE_FIELD))
    })?;

    let session = state.controller.start(file).await?;
    Ok(Json(session))
}

/// POST /api/session/answer
pub async fn answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> ApiResult<Json<SessionState>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let session = state.controller.answer(request.matches).await?;
    Ok(Json(session))
}

/// POST /api/session/refresh
///
/// Retry the candidate fetch for the current cluster.
pub async fn refresh_session(State(state): State<AppState>) -> ApiResult<Json<SessionState>> {
    Ok(Json(state.controller.refresh().await?))
}

/// POST /api/session/reset
pub async fn reset_session(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.controller.reset().await)
}

/// GET /api/clusters
pub async fn cluster_counts(
    State(state): State<AppState>,
) -> ApiResult<Json<ClusterCountsResponse>> {
    let num_clusters = state.controller.state().await.num_clusters;
    let service_clusters = state.controller.service_cluster_count().await?;

    Ok(Json(ClusterCountsResponse {
        num_clusters,
        service_clusters,
    }))
}

/// Build review session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(get_session))
        .route(
            "/api/session/start",
            post(start_session).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/session/answer", post(answer))
        .route("/api/session/refresh", post(refresh_session))
        .route("/api/session/reset", post(reset_session))
        .route("/api/clusters", get(cluster_counts))
}
