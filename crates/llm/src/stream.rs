//! Spawned Streaming Call
//!
//! Runs `LlmProvider::stream_message` on its own task so callers can consume
//! events while the call is still in flight, then collect the final
//! response.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::provider::LlmProvider;
use crate::types::{CompletionRequest, LlmError, LlmResponse, LlmResult};
use visa_advisor_core::streaming::UnifiedStreamEvent;

/// An in-flight backend call.
pub struct StreamingCall {
    events: mpsc::Receiver<UnifiedStreamEvent>,
    handle: JoinHandle<LlmResult<LlmResponse>>,
}

impl StreamingCall {
    /// Spawn the call. `capacity` bounds the event buffer.
    pub fn start(
        provider: Arc<dyn LlmProvider>,
        request: CompletionRequest,
        capacity: usize,
    ) -> Self {
        let (tx, events) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(async move { provider.stream_message(request, tx).await });
        Self { events, handle }
    }

    /// Next streamed event, or `None` once the provider is done sending.
    pub async fn next_event(&mut self) -> Option<UnifiedStreamEvent> {
        self.events.recv().await
    }

    /// Wait for the final response.
    pub async fn finish(self) -> LlmResult<LlmResponse> {
        let Self { events, handle } = self;
        drop(events);
        handle.await.map_err(|e| LlmError::Other {
            message: format!("backend call did not finish: {}", e),
        })?
    }

    /// Stop the call without waiting for it.
    pub fn abort(&self) {
        self.handle.abort();
    }
}
