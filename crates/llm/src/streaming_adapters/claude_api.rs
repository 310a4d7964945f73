//! Claude API Adapter
//!
//! Handles the SSE format from the Messages API with content_block_delta
//! parsing. Thinking blocks are surfaced as their own start/delta/end events.

use serde::Deserialize;
use visa_advisor_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};

/// Internal event types from Claude API SSE format
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeApiEvent {
    MessageStart {
        message: MessageInfo,
    },
    ContentBlockStart {
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        delta: Delta,
    },
    ContentBlockStop,
    MessageDelta {
        delta: MessageDelta,
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Thinking,
    RedactedThinking,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    ThinkingDelta {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Adapter for Claude API SSE format
#[derive(Debug, Default)]
pub struct ClaudeApiAdapter {
    /// Whether the open content block is a thinking block
    in_thinking: bool,
    /// Input tokens reported by message_start, carried into later usage events
    input_tokens: u32,
}

impl ClaudeApiAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamAdapter for ClaudeApiAdapter {
    fn provider_name(&self) -> &'static str {
        "claude-api"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // SSE streams may include event:, id:, retry:, and comment lines.
        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            return Ok(vec![]);
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let event: ClaudeApiEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let events = match event {
            ClaudeApiEvent::MessageStart { message } => match message.usage {
                Some(usage) => {
                    self.input_tokens = usage.input_tokens;
                    vec![UnifiedStreamEvent::Usage {
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                    }]
                }
                None => vec![],
            },
            ClaudeApiEvent::ContentBlockStart { content_block } => match content_block {
                ContentBlock::Thinking | ContentBlock::RedactedThinking => {
                    self.in_thinking = true;
                    vec![UnifiedStreamEvent::ThinkingStart { thinking_id: None }]
                }
                ContentBlock::Other => vec![],
            },
            ClaudeApiEvent::ContentBlockDelta { delta } => match delta {
                Delta::TextDelta { text } => {
                    vec![UnifiedStreamEvent::TextDelta { content: text }]
                }
                Delta::ThinkingDelta { thinking } => {
                    vec![UnifiedStreamEvent::ThinkingDelta { content: thinking }]
                }
                Delta::Other => vec![],
            },
            ClaudeApiEvent::ContentBlockStop => {
                if std::mem::take(&mut self.in_thinking) {
                    vec![UnifiedStreamEvent::ThinkingEnd { thinking_id: None }]
                } else {
                    vec![]
                }
            }
            ClaudeApiEvent::MessageDelta { delta, usage } => {
                let mut events = vec![];
                if let Some(u) = usage {
                    events.push(UnifiedStreamEvent::Usage {
                        input_tokens: self.input_tokens,
                        output_tokens: u.output_tokens,
                    });
                }
                if delta.stop_reason.is_some() {
                    events.push(UnifiedStreamEvent::Complete {
                        stop_reason: delta.stop_reason,
                    });
                }
                events
            }
            ClaudeApiEvent::MessageStop => {
                vec![UnifiedStreamEvent::Complete { stop_reason: None }]
            }
            ClaudeApiEvent::Error { error } => {
                vec![UnifiedStreamEvent::Error {
                    message: error.message,
                    code: error.error_type,
                }]
            }
            ClaudeApiEvent::Ping | ClaudeApiEvent::Unknown => vec![],
        };

        Ok(events)
    }

    fn reset(&mut self) {
        self.in_thinking = false;
        self.input_tokens = 0;
    }
}
