//! Partial-Output Extraction Over a Live Stream
//!
//! Feeds the extractor from a real `StreamingCall` whose text arrives in
//! small pieces, the way the research and analysis tasks use it.

use serde_json::Value;
use visa_advisor::services::prompts::RESEARCH_SYSTEM;
use visa_advisor_core::{IncrementalExtractor, PartialArrayExtractor, RequirementItem, UnifiedStreamEvent};
use visa_advisor_llm::{CompletionRequest, Message, StreamingCall};

use super::support::ScriptedProvider;

const STREAMED: &str = r#"Sure. {"visaType":"Schengen C","requirements":[
  {"name":"Passport","description":"Valid {at least} 6 months","uploadable":true},
  {"name":"Übersetzung","description":"Certified \"sworn\" translation","notes":{"lang":"de"}},
  {"name":"Invitation"},
  {"name":"Bank Statement","description":"Three months"}
],"importantNotes":["Book early"]}"#;

fn names(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v["name"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_incomplete_element_is_returned_after_completion() {
    let extractor = PartialArrayExtractor::new("items");
    let partial = r#"{"items":[{"name":"A","description":"d1"},{"name":"B","desc"#;
    let first = extractor.extract(partial, 0);
    assert_eq!(names(&first), vec!["A"]);

    let complete = r#"{"items":[{"name":"A","description":"d1"},{"name":"B","description":"d2"}]}"#;
    let second = extractor.extract(complete, 1);
    assert_eq!(names(&second), vec!["B"]);
}

#[tokio::test]
async fn test_streamed_elements_surface_once_in_order() {
    let provider = ScriptedProvider::new().reply(RESEARCH_SYSTEM, STREAMED).shared();
    let request = CompletionRequest::new(RESEARCH_SYSTEM, vec![Message::user("go")]);
    let mut call = StreamingCall::start(provider, request, 2);

    let mut extractor = IncrementalExtractor::new(PartialArrayExtractor::new("requirements"));
    let mut buffer = String::new();
    let mut surfaced: Vec<Value> = Vec::new();
    let mut polls_with_output = 0;

    while let Some(event) = call.next_event().await {
        if let UnifiedStreamEvent::TextDelta { content } = event {
            buffer.push_str(&content);
            let fresh = extractor.poll(&buffer);
            if !fresh.is_empty() {
                polls_with_output += 1;
            }
            surfaced.extend(fresh);
        }
    }
    let response = call.finish().await.unwrap();

    assert_eq!(response.content, buffer);
    assert_eq!(
        names(&surfaced),
        vec!["Passport", "Übersetzung", "Bank Statement"]
    );
    assert_eq!(extractor.emitted(), 3);
    assert!(polls_with_output >= 2, "elements should surface while streaming");

    // The rest of the buffer is only notes; nothing more is extracted.
    assert!(extractor.poll(&buffer).is_empty());

    let typed: Vec<RequirementItem> = PartialArrayExtractor::new("requirements").extract_as(&buffer, 0);
    assert_eq!(typed.len(), 3);
    assert_eq!(typed[0].description, "Valid {at least} 6 months");
    assert_eq!(typed[1].description, "Certified \"sworn\" translation");
}

#[tokio::test]
async fn test_custom_required_fields_filter_streamed_elements() {
    let text = r#"{"compliance":[{"requirement":"Passport","status":"met"},{"name":"x","description":"y"}]}"#;
    let provider = ScriptedProvider::new().reply(RESEARCH_SYSTEM, text).shared();
    let request = CompletionRequest::new(RESEARCH_SYSTEM, vec![Message::user("go")]);
    let mut call = StreamingCall::start(provider, request, 4);

    let mut extractor = IncrementalExtractor::new(
        PartialArrayExtractor::new("compliance").require(&["requirement", "status"]),
    );
    let mut buffer = String::new();
    let mut surfaced = Vec::new();
    while let Some(event) = call.next_event().await {
        if let UnifiedStreamEvent::TextDelta { content } = event {
            buffer.push_str(&content);
            surfaced.extend(extractor.poll(&buffer));
        }
    }

    assert_eq!(surfaced.len(), 1);
    assert_eq!(surfaced[0]["requirement"], "Passport");
}
