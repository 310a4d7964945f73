//! Wire Framing
//!
//! Events travel as server-sent-event frames: `data: <json>\n\n`. A
//! sentinel frame `data: [DONE]\n\n` marks the end of the stream and is
//! never confused with an event.
//!
//! [`FrameDecoder`] is the consumer side. It tolerates chunks that split a
//! frame anywhere, and a malformed frame is logged and skipped rather than
//! failing the whole stream.

use crate::error::CoreResult;
use crate::events::AdvisorEvent;

/// Payload of the end-of-stream sentinel.
pub const DONE_MARKER: &str = "[DONE]";

/// Complete end-of-stream sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Encode one event as a frame.
pub fn encode_frame(event: &AdvisorEvent) -> CoreResult<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("data: {}\n\n", json))
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(AdvisorEvent),
    Done,
}

/// Incremental frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    skipped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completed.
    ///
    /// Bytes after the last frame boundary stay buffered until the next call.
    pub fn push(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = self.decode_block(&raw) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Whether a partial trailing frame is still buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    /// Number of malformed frames skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_block(&mut self, block: &str) -> Option<Frame> {
        // Multiple data lines in one frame are joined with newlines.
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| {
                line.strip_prefix("data:")
                    .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            })
            .collect();
        if data.is_empty() {
            // comments, event:, id:, retry:
            return None;
        }
        let payload = data.join("\n");
        let payload = payload.trim();
        if payload == DONE_MARKER {
            return Some(Frame::Done);
        }

        match serde_json::from_str::<AdvisorEvent>(payload) {
            Ok(event) => Some(Frame::Event(event)),
            Err(e) => {
                self.skipped += 1;
                tracing::warn!("[FrameDecoder] Skipping malformed frame: {}", e);
                None
            }
        }
    }
}
