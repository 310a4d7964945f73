//! Backend Streaming Inside a Task
//!
//! Wraps a [`StreamingCall`] so a task sees only growth of the response
//! text, while thinking deltas are turned into progress events on the way.

use std::sync::Arc;

use visa_advisor_core::streaming::UnifiedStreamEvent;
use visa_advisor_llm::{CompletionRequest, LlmProvider, LlmResponse, StreamingCall};

use super::thinking::ThinkingTracker;
use super::{EventEmitter, TaskError, TaskResult};

pub struct BackendStream {
    call: StreamingCall,
    tracker: ThinkingTracker,
    text: String,
}

impl BackendStream {
    pub fn start(
        provider: Arc<dyn LlmProvider>,
        request: CompletionRequest,
        capacity: usize,
        tracker: ThinkingTracker,
    ) -> Self {
        Self {
            call: StreamingCall::start(provider, request, capacity),
            tracker,
            text: String::new(),
        }
    }

    /// Wait until the response text grows. Returns `false` when the stream
    /// has ended or the request was cancelled.
    pub async fn advance(&mut self, emitter: &EventEmitter) -> bool {
        loop {
            if emitter.is_cancelled() {
                self.call.abort();
                return false;
            }
            let event = tokio::select! {
                event = self.call.next_event() => event,
                _ = emitter.cancellation().cancelled() => {
                    self.call.abort();
                    return false;
                }
            };
            match event {
                None => {
                    emitter.emit_all(self.tracker.flush()).await;
                    return false;
                }
                Some(UnifiedStreamEvent::TextDelta { content }) => {
                    self.text.push_str(&content);
                    return true;
                }
                Some(UnifiedStreamEvent::ThinkingDelta { content }) => {
                    emitter.emit_all(self.tracker.push(&content)).await;
                }
                Some(UnifiedStreamEvent::ThinkingEnd { .. }) => {
                    emitter.emit_all(self.tracker.flush()).await;
                }
                Some(_) => {}
            }
        }
    }

    /// Text received so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Drain the rest of the stream and return the full text and response.
    pub async fn finish(mut self, emitter: &EventEmitter) -> TaskResult<(String, LlmResponse)> {
        while self.advance(emitter).await {}
        if emitter.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        let response = self.call.finish().await?;
        // The final response is authoritative if it saw text we did not.
        let text = if response.content.len() > self.text.len() {
            response.content.clone()
        } else {
            self.text
        };
        Ok((text, response))
    }
}

/// Stream a request to completion, surfacing only thinking progress.
pub async fn complete_with_thinking(
    provider: Arc<dyn LlmProvider>,
    request: CompletionRequest,
    capacity: usize,
    tracker: ThinkingTracker,
    emitter: &EventEmitter,
) -> TaskResult<String> {
    let stream = BackendStream::start(provider, request, capacity, tracker);
    let (text, _) = stream.finish(emitter).await?;
    Ok(text)
}
