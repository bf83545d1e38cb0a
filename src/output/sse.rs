//! Server-Sent Events for real-time frame updates

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::animation::FrameReport;
use crate::AppState;

/// Create an SSE stream of frame reports
pub fn create_frame_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_frames();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(report) => frame_to_event(&report).map(Ok),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert a frame report to an SSE event
fn frame_to_event(report: &FrameReport) -> Option<Event> {
    match serde_json::to_string(report) {
        Ok(data) => Some(Event::default().event("frame").data(data)),
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            None
        }
    }
}
