//! Test-Mode Playback
//!
//! A fixed event sequence served when a request sets `testMode`, so clients
//! can exercise the transport without a backend or valid input.

use serde_json::json;
use visa_advisor_core::{
    AdvisorEvent, AgentKind, ApplicationAssessment, CompletionResult, RequirementItem, SearchPhase,
};

/// The scripted sequence for one endpoint. Always ends with `complete`.
pub fn scripted_events(endpoint: &str) -> Vec<AdvisorEvent> {
    let agent = match endpoint {
        "advisory" => AgentKind::Advisory,
        "analyze" => AgentKind::DocumentAnalyzer,
        _ => AgentKind::Research,
    };
    vec![
        AdvisorEvent::agent_start(agent),
        AdvisorEvent::search_status(SearchPhase::Searching, "Test mode: scripted playback"),
        AdvisorEvent::thinking(agent, "Replaying a fixed sequence.", "Test mode"),
        AdvisorEvent::Requirement(
            RequirementItem::new("Passport", "Valid passport").uploadable().with_id("req-1"),
        ),
        AdvisorEvent::Requirement(
            RequirementItem::new("Bank Statement", "Three months of statements").with_id("req-2"),
        ),
        AdvisorEvent::search_status(SearchPhase::Done, "Test mode: 2 requirements"),
        AdvisorEvent::assessment(ApplicationAssessment::AdditionalDocumentsNeeded),
        AdvisorEvent::agent_complete(agent),
        AdvisorEvent::complete(CompletionResult::Scripted(json!({
            "testMode": true,
            "endpoint": endpoint,
        }))),
    ]
}
