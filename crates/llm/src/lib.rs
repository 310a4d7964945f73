//! Visa Advisor LLM
//!
//! Reasoning backend interface for the advisory engine:
//! - `LlmProvider` trait and the Anthropic Messages API implementation
//! - Claude SSE stream adapter
//! - `StreamingCall` for consuming events while a call is in flight

pub mod anthropic;
pub mod http_client;
pub mod provider;
pub mod stream;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use stream::StreamingCall;
pub use streaming_adapters::ClaudeApiAdapter;
pub use types::*;
