//! Research Task
//!
//! Resolves a travel corridor into a requirements checklist by trying each
//! configured [`RequirementsSource`] in order. A failed source is followed
//! by a `search_status/fallback` announcement before the next one starts,
//! and when nothing works a general checklist is returned flagged as
//! degraded.
//!
//! Running out of sources does not emit an `error` event: the stream stays
//! successful and the degraded status line carries `code: "degraded"` so
//! clients can tell it apart without reading the message.

pub mod cached;
pub mod generative;
pub mod source;

use std::sync::Arc;

use async_trait::async_trait;
use visa_advisor_core::{
    AdvisorEvent, AgentKind, Confidence, RequirementItem, RequirementsChecklist, SearchPhase,
};

use crate::models::request::TravelDetails;
use crate::services::tasks::{EventEmitter, ReasoningTask, TaskError, TaskResult};

pub use cached::CachedCorridorSource;
pub use generative::GenerativeSource;
pub use source::{emit_requirements, personalize, personalize_item, RequirementsSource};

/// Code carried by the degraded status line.
pub const DEGRADED_CODE: &str = "degraded";

pub struct ResearchTask {
    travel: TravelDetails,
    sources: Vec<Arc<dyn RequirementsSource>>,
}

impl ResearchTask {
    pub fn new(travel: TravelDetails) -> Self {
        Self {
            travel,
            sources: Vec::new(),
        }
    }

    /// Add a source; sources are tried in the order added.
    pub fn with_source(mut self, source: Arc<dyn RequirementsSource>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl ReasoningTask for ResearchTask {
    type Output = RequirementsChecklist;

    fn agent(&self) -> AgentKind {
        AgentKind::Research
    }

    async fn run(self, emitter: EventEmitter) -> TaskResult<RequirementsChecklist> {
        let travel = &self.travel;
        emitter
            .emit(AdvisorEvent::search_status(
                SearchPhase::Searching,
                format!("Looking up requirements for {}", travel.corridor_label()),
            ))
            .await;

        let mut last_failure: Option<(&'static str, TaskError)> = None;

        for source in self.sources.iter().filter(|s| s.is_available(travel)) {
            if let Some((failed, err)) = &last_failure {
                emitter
                    .emit(AdvisorEvent::search_status(
                        SearchPhase::Fallback,
                        format!("{} failed ({}); switching to {}", failed, err, source.name()),
                    ))
                    .await;
            }
            emitter
                .emit(AdvisorEvent::search_status(
                    source.phase(),
                    source.status_message(travel),
                ))
                .await;

            match source.fetch(travel, &emitter).await {
                Ok(checklist) => {
                    emitter
                        .emit(AdvisorEvent::search_status(
                            SearchPhase::Done,
                            format!("Found {} requirements", checklist.requirements.len()),
                        ))
                        .await;
                    return Ok(checklist);
                }
                Err(TaskError::Cancelled) => return Err(TaskError::Cancelled),
                Err(err) => {
                    tracing::warn!("[Research] {} failed: {}", source.name(), err);
                    last_failure = Some((source.name(), err));
                }
            }
        }

        let reason = match &last_failure {
            Some((failed, err)) => format!("{} failed ({})", failed, err),
            None => "no research source is available".to_string(),
        };
        tracing::warn!("[Research] returning general checklist: {}", reason);
        emitter
            .emit(AdvisorEvent::search_status_with_code(
                SearchPhase::Degraded,
                format!("{}; showing a general checklist", reason),
                DEGRADED_CODE,
            ))
            .await;

        let checklist = minimal_checklist(travel);
        emit_requirements(&emitter, &checklist.requirements).await;
        emitter
            .emit(AdvisorEvent::search_status(
                SearchPhase::Done,
                format!("Found {} requirements", checklist.requirements.len()),
            ))
            .await;
        Ok(checklist)
    }
}

/// Corridor-independent checklist used when no source could answer.
pub fn minimal_checklist(travel: &TravelDetails) -> RequirementsChecklist {
    let low = |item: RequirementItem| RequirementItem {
        confidence: Confidence::Low,
        ..item
    };
    let mut checklist = RequirementsChecklist {
        corridor: travel.corridor_label(),
        visa_type: format!("{} visa", travel.purpose),
        requirements: vec![
            low(RequirementItem::new(
                "Passport",
                "Passport valid for at least 6 months beyond the return date",
            )
            .uploadable()),
            low(RequirementItem::new(
                "Visa Application Form",
                "Completed application form for the destination's consulate",
            )),
            low(RequirementItem::new(
                "Passport Photographs",
                "Recent photographs meeting the destination's specifications",
            )),
            low(RequirementItem::new(
                "Bank Statement",
                "Recent statements showing funds for the whole stay",
            )
            .uploadable()),
            low(RequirementItem::new(
                "Travel Itinerary",
                "Flight reservation and accommodation for the whole stay",
            )
            .uploadable()),
        ],
        important_notes: vec![
            "General checklist only. Confirm with the destination's official visa authority."
                .to_string(),
        ],
        degraded: true,
        ..Default::default()
    };
    checklist.assign_ids();
    personalize(&mut checklist, travel);
    checklist
}
