//! Results download
//!
//! GET /api/export - one `Well ID,Label` line per dataset row, once the
//! review is complete.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{error::ApiResult, export, AppState};

/// GET /api/export
pub async fn download_results(State(state): State<AppState>) -> ApiResult<Response> {
    let rows = state.controller.export().await?;
    let body = export::to_csv(&rows);

    tracing::info!(
        rows = rows.len(),
        filename = %state.export_filename,
        "Serving results download"
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.export_filename.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export", get(download_results))
}
