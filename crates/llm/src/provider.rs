//! LLM Provider Trait
//!
//! Defines the common interface for reasoning backends.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CompletionRequest, LlmError, LlmResponse, LlmResult, ProviderConfig};
use visa_advisor_core::streaming::UnifiedStreamEvent;

/// Trait that all reasoning backends implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether this provider streams thinking blocks.
    fn supports_thinking(&self) -> bool;

    /// Returns whether this provider accepts image content.
    fn supports_multimodal(&self) -> bool {
        false
    }

    /// Stream a response via a channel.
    ///
    /// Events are forwarded as they arrive; a closed receiver does not abort
    /// the call. Returns the complete response after the stream ends.
    async fn stream_message(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse>;

    /// Send a request and wait for the complete response.
    async fn send_message(&self, request: CompletionRequest) -> LlmResult<LlmResponse> {
        let (tx, mut rx) = mpsc::channel(64);
        let (result, _) = tokio::join!(self.stream_message(request, tx), async {
            while rx.recv().await.is_some() {}
        });
        result
    }

    /// Check if the provider is usable.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
