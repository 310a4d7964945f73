//! Cached Corridor Source
//!
//! Replays stored corridor data as a narrated trace: each narration line
//! becomes a `thinking` event and each requirement is emitted after a short
//! pacing delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use visa_advisor_core::{AdvisorEvent, AgentKind, RequirementsChecklist, SearchPhase};

use super::source::{personalize, RequirementsSource};
use crate::models::request::TravelDetails;
use crate::services::tasks::{EventEmitter, TaskError, TaskResult};
use crate::storage::CorridorStore;

pub struct CachedCorridorSource {
    store: Arc<CorridorStore>,
    pacing: Duration,
}

impl CachedCorridorSource {
    pub fn new(store: Arc<CorridorStore>, pacing: Duration) -> Self {
        Self { store, pacing }
    }
}

#[async_trait]
impl RequirementsSource for CachedCorridorSource {
    fn name(&self) -> &'static str {
        "stored corridor data"
    }

    fn phase(&self) -> SearchPhase {
        SearchPhase::CacheHit
    }

    fn is_available(&self, travel: &TravelDetails) -> bool {
        self.store
            .lookup(&travel.passports, &travel.destination)
            .is_some()
    }

    fn status_message(&self, travel: &TravelDetails) -> String {
        match self.store.lookup(&travel.passports, &travel.destination) {
            Some((key, _)) => format!("Using stored requirements for {}", key),
            None => "No stored requirements for this corridor".to_string(),
        }
    }

    async fn fetch(
        &self,
        travel: &TravelDetails,
        emitter: &EventEmitter,
    ) -> TaskResult<RequirementsChecklist> {
        let (key, record) = self
            .store
            .lookup(&travel.passports, &travel.destination)
            .ok_or_else(|| TaskError::unavailable(format!("no stored data for {}", travel.corridor_label())))?;

        tracing::debug!("[Research] cache hit for {}", key);

        let mut checklist = record.checklist.clone();
        checklist.assign_ids();
        personalize(&mut checklist, travel);

        let total = record.narration.len();
        for (index, line) in record.narration.iter().enumerate() {
            emitter
                .emit(AdvisorEvent::thinking(
                    AgentKind::Research,
                    line.clone(),
                    format!("Reviewing corridor data ({}/{})", index + 1, total),
                ))
                .await;
            if !emitter.pause(self.pacing).await {
                return Err(TaskError::Cancelled);
            }
        }

        for item in &checklist.requirements {
            emitter.emit(AdvisorEvent::Requirement(item.clone())).await;
            if !emitter.pause(self.pacing / 2).await {
                return Err(TaskError::Cancelled);
            }
        }

        Ok(checklist)
    }
}
