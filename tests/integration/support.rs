//! Shared fixtures: an in-memory reasoning backend that answers by system
//! prompt, travel details, and orchestrator construction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use visa_advisor::models::request::{TravelDates, TravelDetails};
use visa_advisor::models::settings::AppConfig;
use visa_advisor::services::{Orchestrator, PassthroughTranslator};
use visa_advisor::storage::CorridorStore;
use visa_advisor_core::{AdvisorEvent, AgentKind, UnifiedStreamEvent};
use visa_advisor_llm::{
    CompletionRequest, LlmError, LlmProvider, LlmResponse, LlmResult, ProviderConfig, StopReason,
    UsageStats,
};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

/// Backend that answers each system prompt with a fixed reply, streamed in
/// small pieces after a short thinking block. Every call's system prompt is
/// recorded in order.
pub struct ScriptedProvider {
    replies: HashMap<&'static str, Reply>,
    calls: Arc<Mutex<Vec<String>>>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            config: ProviderConfig::default(),
        }
    }

    /// Handle on the call log; take it before `shared()`.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    pub fn reply(mut self, system: &'static str, text: impl Into<String>) -> Self {
        self.replies.insert(system, Reply::Text(text.into()));
        self
    }

    pub fn fail(mut self, system: &'static str, message: impl Into<String>) -> Self {
        self.replies.insert(system, Reply::Fail(message.into()));
        self
    }

    pub fn shared(self) -> Arc<dyn LlmProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    fn supports_thinking(&self) -> bool {
        true
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    async fn stream_message(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        let system = request.system.clone().unwrap_or_default();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(system.clone());
        }
        let reply = self
            .replies
            .iter()
            .find(|(key, _)| **key == system.as_str())
            .map(|(_, reply)| reply.clone());

        let _ = tx
            .send(UnifiedStreamEvent::ThinkingStart { thinking_id: None })
            .await;
        let _ = tx
            .send(UnifiedStreamEvent::ThinkingDelta {
                content: "Considering the request.".to_string(),
            })
            .await;
        let _ = tx
            .send(UnifiedStreamEvent::ThinkingEnd { thinking_id: None })
            .await;

        match reply {
            Some(Reply::Text(text)) => {
                let chars: Vec<char> = text.chars().collect();
                for piece in chars.chunks(16) {
                    let _ = tx
                        .send(UnifiedStreamEvent::TextDelta {
                            content: piece.iter().collect(),
                        })
                        .await;
                    tokio::task::yield_now().await;
                }
                Ok(LlmResponse {
                    content: text,
                    thinking: Some("Considering the request.".to_string()),
                    stop_reason: StopReason::EndTurn,
                    usage: UsageStats::default(),
                    model: "scripted-1".to_string(),
                })
            }
            Some(Reply::Fail(message)) => Err(LlmError::ServerError {
                message,
                status: Some(500),
            }),
            None => Err(LlmError::InvalidRequest {
                message: "no scripted reply for this prompt".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

pub fn travel(origin: &str, destination: &str) -> TravelDetails {
    TravelDetails {
        passports: vec![origin.to_string()],
        destination: destination.to_string(),
        purpose: "business".to_string(),
        dates: TravelDates {
            depart: "2026-05-01".to_string(),
            return_date: "2026-05-20".to_string(),
        },
        travelers: 1,
        event: None,
    }
}

/// Config with pacing switched off so tests run quickly.
pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.orchestrator.pacing_ms = 0;
    config.orchestrator.event_channel_capacity = 4;
    config
}

pub fn orchestrator(config: &AppConfig, provider: Option<Arc<dyn LlmProvider>>) -> Orchestrator {
    let corridors = CorridorStore::builtin().expect("built-in corridors parse");
    Orchestrator::new(
        config,
        provider,
        Arc::new(corridors),
        Arc::new(PassthroughTranslator),
    )
}

pub async fn collect(stream: ReceiverStream<AdvisorEvent>) -> Vec<AdvisorEvent> {
    stream.collect().await
}

pub fn position(events: &[AdvisorEvent], wanted: &AdvisorEvent) -> Option<usize> {
    events.iter().position(|e| e == wanted)
}

pub fn agent_events(events: &[AdvisorEvent], agent: AgentKind) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| match e {
            AdvisorEvent::Orchestrator(o) => o.agent == agent,
            AdvisorEvent::Thinking(t) => t.agent == agent,
            AdvisorEvent::ThinkingDepth(t) => t.agent == agent,
            _ => false,
        })
        .map(|(i, _)| i)
        .collect()
}

/// Exactly one terminal event, and it is the last one.
pub fn assert_single_terminal(events: &[AdvisorEvent]) {
    let terminals: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(terminals, vec![events.len() - 1], "events: {:#?}", events);
}
