//! Server-Sent Events for review progress
//!
//! Streams every `ReviewEvent` (loading indicator, candidates, labels,
//! splits, completion) to connected clients.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE stream of review events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    wellrev_common::sse::create_event_sse_stream("wellrev-review", &state.event_bus)
}
