//! Generative Source
//!
//! Streams requirements from the reasoning backend. Items are emitted as
//! soon as the partial-output extractor can read them; once the stream
//! ends the full text is parsed as the authoritative checklist and only
//! the items not yet surfaced are emitted. Ids are positional so streamed
//! and final items agree.

use std::sync::Arc;

use async_trait::async_trait;
use visa_advisor_core::models::requirement_id_for;
use visa_advisor_core::{
    extract_json_object, AdvisorEvent, AgentKind, IncrementalExtractor, PartialArrayExtractor,
    RequirementItem, RequirementsChecklist, SearchPhase,
};
use visa_advisor_llm::{CompletionRequest, LlmProvider, Message};

use super::source::{emit_requirements, personalize, personalize_item, RequirementsSource};
use crate::models::request::TravelDetails;
use crate::services::prompts;
use crate::services::tasks::{BackendStream, EventEmitter, TaskError, TaskResult, ThinkingTracker};

pub struct GenerativeSource {
    provider: Option<Arc<dyn LlmProvider>>,
    capacity: usize,
    thinking_budget: u32,
}

impl GenerativeSource {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, capacity: usize, thinking_budget: u32) -> Self {
        Self {
            provider,
            capacity,
            thinking_budget,
        }
    }
}

#[async_trait]
impl RequirementsSource for GenerativeSource {
    fn name(&self) -> &'static str {
        "live research"
    }

    fn phase(&self) -> SearchPhase {
        SearchPhase::Live
    }

    fn is_available(&self, _travel: &TravelDetails) -> bool {
        self.provider.is_some()
    }

    fn status_message(&self, travel: &TravelDetails) -> String {
        format!("Researching current requirements for {}", travel.corridor_label())
    }

    async fn fetch(
        &self,
        travel: &TravelDetails,
        emitter: &EventEmitter,
    ) -> TaskResult<RequirementsChecklist> {
        let provider = self.provider.clone().ok_or(TaskError::NoBackend)?;

        let request = CompletionRequest::new(
            prompts::RESEARCH_SYSTEM,
            vec![Message::user(prompts::research_prompt(travel))],
        )
        .with_thinking_budget(self.thinking_budget);
        let tracker = ThinkingTracker::new(
            AgentKind::Research,
            self.thinking_budget,
            "Researching visa requirements",
        );

        let mut stream = BackendStream::start(provider, request, self.capacity, tracker);
        let mut extractor = IncrementalExtractor::new(PartialArrayExtractor::new("requirements"));

        while stream.advance(emitter).await {
            let start = extractor.emitted();
            let fresh = extractor.poll(stream.text());
            for (offset, value) in fresh.into_iter().enumerate() {
                match serde_json::from_value::<RequirementItem>(value) {
                    Ok(mut item) => {
                        item.id = requirement_id_for(start + offset);
                        personalize_item(&mut item, travel);
                        emitter.emit(AdvisorEvent::Requirement(item)).await;
                    }
                    Err(e) => tracing::debug!("[Research] skipping partial item: {}", e),
                }
            }
        }

        let surfaced = extractor.emitted();
        let (text, response) = stream.finish(emitter).await?;
        tracing::info!(
            "[Research] backend finished: {} chars, {} output tokens, {} surfaced early",
            text.len(),
            response.usage.output_tokens,
            surfaced
        );

        let json = extract_json_object(&text)
            .ok_or_else(|| TaskError::parse("research output contains no JSON object"))?;
        let mut checklist: RequirementsChecklist = serde_json::from_str(json)
            .map_err(|e| TaskError::parse(format!("research output: {}", e)))?;
        if checklist.requirements.is_empty() {
            return Err(TaskError::parse("research output lists no requirements"));
        }
        checklist.renumber_ids();
        personalize(&mut checklist, travel);

        emit_requirements(emitter, checklist.requirements.iter().skip(surfaced)).await;
        Ok(checklist)
    }
}
