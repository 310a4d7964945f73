//! Application State
//!
//! Shared state handed to every request handler. Everything inside is
//! immutable after startup, so cloning the state is cheap.

use std::sync::Arc;

use visa_advisor_llm::{AnthropicProvider, LlmProvider};

use crate::models::settings::AppConfig;
use crate::services::{ClientRateLimiter, Orchestrator, PassthroughTranslator, Translator};
use crate::storage::CorridorStore;
use crate::utils::error::AppResult;

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    orchestrator: Arc<Orchestrator>,
    rate_limiter: Arc<ClientRateLimiter>,
    corridors: Arc<CorridorStore>,
}

impl AppState {
    /// Build the production state: built-in corridors plus the configured
    /// extra file, the Anthropic backend when an API key is available.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let mut corridors = CorridorStore::builtin()?;
        if let Some(path) = &config.corridors.extra_file {
            corridors.merge_file(path)?;
        }

        let provider: Option<Arc<dyn LlmProvider>> = if config.backend.has_api_key() {
            let provider = AnthropicProvider::new(config.backend.to_provider_config())?;
            tracing::info!("[State] reasoning backend: {}", config.backend.model);
            Some(Arc::new(provider))
        } else {
            tracing::warn!(
                "[State] no API key configured; serving stored corridors and the general checklist only"
            );
            None
        };

        Self::with_parts(
            config,
            provider,
            Arc::new(corridors),
            Arc::new(PassthroughTranslator),
        )
    }

    /// Assemble state from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        corridors: Arc<CorridorStore>,
        translator: Arc<dyn Translator>,
    ) -> AppResult<Self> {
        let rate_limiter = ClientRateLimiter::new(&config.rate_limit)?;
        let orchestrator = Orchestrator::new(&config, provider, corridors.clone(), translator);
        tracing::info!(
            "[State] {} corridors available, backend configured: {}",
            corridors.len(),
            orchestrator.has_backend()
        );
        Ok(Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            rate_limiter: Arc::new(rate_limiter),
            corridors,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn rate_limiter(&self) -> &ClientRateLimiter {
        &self.rate_limiter
    }

    pub fn corridors(&self) -> &CorridorStore {
        &self.corridors
    }
}
