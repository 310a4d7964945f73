//! Anthropic Messages API Provider
//!
//! Streams responses over SSE with optional extended thinking.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::http_client::build_http_client;
use crate::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use crate::streaming_adapters::ClaudeApiAdapter;
use crate::types::{
    CompletionRequest, LlmError, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, UsageStats,
};
use visa_advisor_core::streaming::{StreamAdapter, UnifiedStreamEvent};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Minimum budget the API accepts for extended thinking
const MIN_THINKING_BUDGET: u32 = 1024;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Get the API URL
    fn api_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
    }

    /// Effective thinking budget for a request, if thinking is on
    fn thinking_budget(&self, request: &CompletionRequest, max_tokens: u32) -> Option<u32> {
        if !self.config.enable_thinking {
            return None;
        }
        let budget = request.thinking_budget.or(self.config.thinking_budget)?;
        let budget = budget.max(MIN_THINKING_BUDGET);
        // budget_tokens must stay below max_tokens
        if budget >= max_tokens {
            return None;
        }
        Some(budget)
    }

    fn message_to_json(message: &Message) -> Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        let content: Vec<Value> = message
            .content
            .iter()
            .map(|block| match block {
                MessageContent::Text { text } => json!({ "type": "text", "text": text }),
                MessageContent::Image { media_type, data } => json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": media_type,
                        "data": data,
                    }
                }),
            })
            .collect();
        json!({ "role": role, "content": content })
    }

    /// Build the request body for the API
    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        let messages: Vec<Value> = request.messages.iter().map(Self::message_to_json).collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "messages": messages,
            "stream": stream,
        });

        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        match self.thinking_budget(request, max_tokens) {
            Some(budget) => {
                body["thinking"] = json!({ "type": "enabled", "budget_tokens": budget });
            }
            None => {
                body["temperature"] = json!(self.config.temperature);
            }
        }

        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_thinking(&self) -> bool {
        self.config.enable_thinking
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    async fn stream_message(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("anthropic"))?;

        let body = self.build_request_body(&request, true);

        tracing::debug!(
            "[Anthropic] streaming request model={} messages={}",
            self.config.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.api_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "anthropic"));
        }

        // Process SSE stream
        let mut adapter = ClaudeApiAdapter::new();
        let mut accumulated_content = String::new();
        let mut accumulated_thinking = String::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;
        let mut stream_error: Option<LlmError> = None;

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

            pending.extend_from_slice(&chunk);
            buffer.push_str(&drain_utf8(&mut pending));

            // Process complete lines
            while let Some(line_end) = buffer.find('\n') {
                let line: String = buffer.drain(..=line_end).collect();

                if line.trim().is_empty() {
                    continue;
                }

                match adapter.adapt(&line) {
                    Ok(events) => {
                        for event in events {
                            match &event {
                                UnifiedStreamEvent::TextDelta { content } => {
                                    accumulated_content.push_str(content);
                                }
                                UnifiedStreamEvent::ThinkingDelta { content } => {
                                    accumulated_thinking.push_str(content);
                                }
                                UnifiedStreamEvent::Usage {
                                    input_tokens,
                                    output_tokens,
                                } => {
                                    usage.input_tokens = *input_tokens;
                                    usage.output_tokens = *output_tokens;
                                }
                                UnifiedStreamEvent::Complete {
                                    stop_reason: Some(reason),
                                } => {
                                    stop_reason = StopReason::from(reason.as_str());
                                }
                                UnifiedStreamEvent::Error { message, .. } => {
                                    stream_error = Some(LlmError::ServerError {
                                        message: message.clone(),
                                        status: None,
                                    });
                                }
                                _ => {}
                            }

                            // A closed receiver only means nobody is watching.
                            let _ = tx.send(event).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("[Anthropic] skipping unparseable stream line: {}", e);
                    }
                }
            }
        }

        if let Some(err) = stream_error {
            return Err(err);
        }

        Ok(LlmResponse {
            content: accumulated_content,
            thinking: if accumulated_thinking.is_empty() {
                None
            } else {
                Some(accumulated_thinking)
            },
            stop_reason,
            usage,
            model: self.config.model.clone(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(missing_api_key_error("anthropic")),
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Decode the valid UTF-8 prefix of `pending`, keeping a character split
/// across chunks for the next call. Bytes that can never become valid are
/// replaced.
fn drain_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => String::from_utf8_lossy(&std::mem::take(pending)).into_owned(),
    }
}
