//! Settings Models
//!
//! Application configuration loaded from `config.toml`. Every field has a
//! default so a partial (or missing) file is always valid input.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use visa_advisor_llm::{ProviderConfig, ProviderType};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub corridors: CorridorConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "127.0.0.1:8787"
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Wall-clock bound on one streamed request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Allow any origin
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_permissive: true,
        }
    }
}

/// Reasoning backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    /// Usually supplied through `ANTHROPIC_API_KEY` instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_true")]
    pub enable_thinking: bool,
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_provider() -> ProviderType {
    ProviderType::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    16_000
}

fn default_thinking_budget() -> u32 {
    8_000
}

fn default_http_timeout_secs() -> u64 {
    240
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            enable_thinking: true,
            thinking_budget: default_thinking_budget(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Whether a usable API key is present
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    /// Provider configuration for the backend crate
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            enable_thinking: self.enable_thinking,
            thinking_budget: Some(self.thinking_budget),
            timeout_secs: self.http_timeout_secs,
            ..Default::default()
        }
    }
}

/// Task and fan-in settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Bound on each task's event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Delay between narrated steps on the cached research path
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Use stored corridor data before calling the backend
    #[serde(default = "default_true")]
    pub prefer_cached: bool,
}

fn default_event_channel_capacity() -> usize {
    64
}

fn default_pacing_ms() -> u64 {
    120
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            pacing_ms: default_pacing_ms(),
            prefer_cached: true,
        }
    }
}

/// Per-client admission settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_requests_per_minute() -> u32 {
    20
}

fn default_burst() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Corridor data settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorridorConfig {
    /// Extra corridor JSON merged over the built-in set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_file: Option<PathBuf>,
}

impl AppConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind.trim().is_empty() {
            return Err("server.bind must not be empty".to_string());
        }
        if self.server.request_timeout_secs == 0 {
            return Err("server.request_timeout_secs must be greater than 0".to_string());
        }
        if self.orchestrator.event_channel_capacity == 0 {
            return Err("orchestrator.event_channel_capacity must be greater than 0".to_string());
        }
        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.burst == 0 {
            return Err("rate_limit values must be greater than 0".to_string());
        }
        if self.backend.max_tokens == 0 {
            return Err("backend.max_tokens must be greater than 0".to_string());
        }
        if self.backend.enable_thinking && self.backend.thinking_budget >= self.backend.max_tokens
        {
            return Err(format!(
                "backend.thinking_budget ({}) must be below backend.max_tokens ({})",
                self.backend.thinking_budget, self.backend.max_tokens
            ));
        }
        Ok(())
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.backend.api_key = Some(key);
        }
        if let Some(bind) = lookup("VISA_ADVISOR_BIND").filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(model) = lookup("VISA_ADVISOR_MODEL").filter(|v| !v.trim().is_empty()) {
            self.backend.model = model;
        }
    }
}
