//! Requirements Source Strategy
//!
//! Interchangeable ways of producing a requirements checklist. Every source
//! follows the same emission contract: each requirement of the returned
//! checklist is emitted exactly once, in list order, carrying its id.

use async_trait::async_trait;
use visa_advisor_core::{AdvisorEvent, RequirementItem, RequirementsChecklist, SearchPhase};

use crate::models::request::TravelDetails;
use crate::services::tasks::{EventEmitter, TaskResult};

#[async_trait]
pub trait RequirementsSource: Send + Sync {
    /// Short name used in status messages and logs
    fn name(&self) -> &'static str;

    /// Phase announced when this source starts
    fn phase(&self) -> SearchPhase;

    /// Whether this source can serve the corridor at all
    fn is_available(&self, travel: &TravelDetails) -> bool;

    /// Status line announced when this source starts
    fn status_message(&self, travel: &TravelDetails) -> String;

    async fn fetch(
        &self,
        travel: &TravelDetails,
        emitter: &EventEmitter,
    ) -> TaskResult<RequirementsChecklist>;
}

/// Fill in request-specific details the stored or generated data lacks.
pub fn personalize(checklist: &mut RequirementsChecklist, travel: &TravelDetails) {
    if checklist.corridor.trim().is_empty() {
        checklist.corridor = travel.corridor_label();
    }
    for item in checklist.requirements.iter_mut() {
        personalize_item(item, travel);
    }
}

/// Per-item part of [`personalize`], applied to items streamed before the
/// full checklist exists.
pub fn personalize_item(item: &mut RequirementItem, travel: &TravelDetails) {
    if travel.travelers > 1
        && item.required
        && item.uploadable
        && item.personalized_detail.is_none()
    {
        item.personalized_detail = Some(format!(
            "{}. Needed for each of the {} travelers.",
            item.description.trim_end_matches('.'),
            travel.travelers
        ));
    }
}

/// Emit requirement events in order; `false` if the consumer went away.
pub async fn emit_requirements<'a>(
    emitter: &EventEmitter,
    items: impl IntoIterator<Item = &'a RequirementItem>,
) -> bool {
    emitter
        .emit_all(items.into_iter().cloned().map(AdvisorEvent::Requirement))
        .await
}
