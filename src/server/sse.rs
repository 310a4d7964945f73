//! Event Stream Responses
//!
//! Frames `AdvisorEvent`s for the wire and guards the stream shape: nothing
//! is sent after the first terminal event and the body always ends with
//! exactly one `[DONE]` sentinel.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use visa_advisor_core::{encode_frame, AdvisorEvent, DONE_FRAME};

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Closing,
    Finished,
}

fn frame_bytes(event: &AdvisorEvent) -> Bytes {
    match encode_frame(event) {
        Ok(frame) => Bytes::from(frame),
        Err(e) => {
            tracing::warn!("[Server] dropping unencodable {} event: {}", event.type_name(), e);
            Bytes::new()
        }
    }
}

/// Wire frames for an event stream.
pub fn guarded_frames<S>(events: S) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = AdvisorEvent> + Send + Unpin + 'static,
{
    stream::unfold((events, Phase::Streaming), |(mut events, phase)| async move {
        match phase {
            Phase::Finished => None,
            Phase::Closing => Some((
                Ok(Bytes::from_static(DONE_FRAME.as_bytes())),
                (events, Phase::Finished),
            )),
            Phase::Streaming => match events.next().await {
                Some(event) => {
                    let next = if event.is_terminal() {
                        Phase::Closing
                    } else {
                        Phase::Streaming
                    };
                    Some((Ok(frame_bytes(&event)), (events, next)))
                }
                None => Some((
                    Ok(Bytes::from_static(DONE_FRAME.as_bytes())),
                    (events, Phase::Finished),
                )),
            },
        }
    })
}

/// Streaming response with the event-stream headers.
pub fn sse_response<S>(events: S) -> AppResult<Response>
where
    S: Stream<Item = AdvisorEvent> + Send + Unpin + 'static,
{
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(guarded_frames(events)))
        .map_err(|e| AppError::internal(format!("building stream response: {}", e)))
}
