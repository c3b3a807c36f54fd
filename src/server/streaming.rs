//! SSE (Server-Sent Events) framing for streamed chat.
//!
//! Each relay event becomes one `data:` frame. Successful events carry the
//! full event object; a failed event is reduced to `{"error": ...}`. A final
//! `{"done": true}` frame is always appended after the relay's sequence ends,
//! even when its last event already had `done = true`.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::relay::{EventStream, StreamEvent};

#[derive(Debug, Serialize)]
struct ErrorFrame<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct DoneFrame {
    done: bool,
}

/// Serialize one relay event into the JSON payload of its frame.
pub fn frame_payload(event: &StreamEvent) -> String {
    let payload = if event.success {
        serde_json::to_string(event)
    } else {
        serde_json::to_string(&ErrorFrame {
            error: event.error.as_deref().unwrap_or("Unknown error"),
        })
    };
    payload.unwrap_or_default()
}

/// Convert a relay event stream into an SSE stream.
pub fn relay_to_sse_stream(
    events: EventStream,
    request_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    events
        .map(move |event| {
            if event.done {
                debug!(
                    request_id = request_id.as_str(),
                    success = event.success,
                    "Relay stream finished"
                );
            }
            Ok(Event::default().data(frame_payload(&event)))
        })
        // Append the end signal after all events.
        .chain(tokio_stream::once(Ok(Event::default().data(
            serde_json::to_string(&DoneFrame { done: true }).unwrap_or_default(),
        ))))
}
