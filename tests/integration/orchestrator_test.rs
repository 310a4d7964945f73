//! Orchestrator Integration Tests
//!
//! Full request pipelines driven through `Orchestrator` with the scripted
//! backend: research source selection and fallback, fan-in ordering, partial
//! failure, advisory synthesis and the request timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use visa_advisor::models::request::{AdvisoryRequest, AnalyzeRequest, DocumentUpload};
use visa_advisor::services::prompts::{ANALYZER_SYSTEM, READER_SYSTEM, RESEARCH_SYSTEM};
use visa_advisor_core::{
    AdvisorEvent, AgentKind, ApplicationAssessment, ComplianceItem, ComplianceStatus,
    CompletionResult, RequirementItem, SearchPhase, Severity,
};

use super::support::{
    agent_events, assert_single_terminal, collect, fast_config, orchestrator, position, travel,
    ScriptedProvider,
};

const RESEARCH_REPLY: &str = r#"{"requirements":[
  {"name":"Passport","description":"Valid passport","uploadable":true},
  {"name":"Visa Form","description":"Signed application form"},
  {"name":"Bank Statement","description":"Three months of statements","uploadable":true}
],"visaType":"Schengen C","importantNotes":["Apply at least 15 days ahead"]}"#;

const READER_REPLY: &str = r#"{"documentType":"passport","language":"en",
"holderName":"Asha Rao","expiryDate":"2026-05-10","fields":{"number":"Z1234567"},
"summary":"Indian passport"}"#;

const ANALYZER_REPLY: &str = r#"{"compliance":[
  {"requirementId":"req-1","requirement":"Passport","status":"critical","detail":"Renew the passport before applying","documentRef":"doc-1"},
  {"requirement":"Bank Statement","status":"met"}
],"findings":[{"severity":"warning","title":"Photo quality","detail":"Scan is slightly blurred"}],
"narrative":"The passport expires during the trip."}"#;

fn phases(events: &[AdvisorEvent]) -> Vec<SearchPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            AdvisorEvent::SearchStatus(s) => Some(s.phase),
            _ => None,
        })
        .collect()
}

fn requirement_ids(events: &[AdvisorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            AdvisorEvent::Requirement(r) => Some(r.id.clone()),
            _ => None,
        })
        .collect()
}

fn completion(events: &[AdvisorEvent]) -> &CompletionResult {
    match events.last() {
        Some(AdvisorEvent::Complete(c)) => &c.result,
        other => panic!("expected complete, got {:?}", other),
    }
}

fn passport_upload() -> DocumentUpload {
    DocumentUpload {
        id: "doc-1".to_string(),
        filename: "passport.png".to_string(),
        mime_type: "image/png".to_string(),
        base64: "aGVsbG8=".to_string(),
        size_bytes: 5,
    }
}

// ============================================================================
// Research
// ============================================================================

#[tokio::test]
async fn test_research_uses_stored_corridor_without_backend() {
    let config = fast_config();
    let events = collect(orchestrator(&config, None).run_research(travel("India", "Germany"))).await;

    assert_single_terminal(&events);
    assert_eq!(
        phases(&events),
        vec![SearchPhase::Searching, SearchPhase::CacheHit, SearchPhase::Done]
    );
    let ids = requirement_ids(&events);
    assert_eq!(ids.len(), 7);
    assert_eq!(ids[0], "req-1");
    assert_eq!(ids[6], "req-7");

    match completion(&events) {
        CompletionResult::Checklist(checklist) => {
            assert_eq!(checklist.requirements.len(), 7);
            assert!(!checklist.degraded);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_research_degrades_without_backend_or_corridor() {
    let config = fast_config();
    let events =
        collect(orchestrator(&config, None).run_research(travel("Atlantis", "Germany"))).await;

    assert_single_terminal(&events);
    assert_eq!(
        phases(&events),
        vec![SearchPhase::Searching, SearchPhase::Degraded, SearchPhase::Done]
    );
    assert!(!events.iter().any(|e| matches!(e, AdvisorEvent::Error(_))));
    let degraded = events
        .iter()
        .find_map(|e| match e {
            AdvisorEvent::SearchStatus(s) if s.phase == SearchPhase::Degraded => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!(degraded.code.as_deref(), Some("degraded"));
    assert!(events.iter().all(|e| match e {
        AdvisorEvent::SearchStatus(s) if s.phase != SearchPhase::Degraded => s.code.is_none(),
        _ => true,
    }));
    match completion(&events) {
        CompletionResult::Checklist(checklist) => assert!(checklist.degraded),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_research_streams_generated_requirements_once() {
    let config = fast_config();
    let provider = ScriptedProvider::new()
        .reply(RESEARCH_SYSTEM, RESEARCH_REPLY)
        .shared();
    let events = collect(
        orchestrator(&config, Some(provider)).run_research(travel("Atlantis", "Germany")),
    )
    .await;

    assert_single_terminal(&events);
    assert!(phases(&events).contains(&SearchPhase::Live));
    assert_eq!(requirement_ids(&events), vec!["req-1", "req-2", "req-3"]);
    assert!(events
        .iter()
        .any(|e| matches!(e, AdvisorEvent::Thinking(t) if t.agent == AgentKind::Research)));

    match completion(&events) {
        CompletionResult::Checklist(checklist) => {
            assert_eq!(checklist.visa_type, "Schengen C");
            assert_eq!(checklist.requirements[2].id, "req-3");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_streamed_requirements_match_final_checklist_for_group() {
    let config = fast_config();
    let reply = RESEARCH_REPLY.replacen(r#"{"name":"Passport""#, r#"{"id":"passport","name":"Passport""#, 1);
    let provider = ScriptedProvider::new().reply(RESEARCH_SYSTEM, reply).shared();
    let mut travel = travel("Atlantis", "Germany");
    travel.travelers = 3;
    let events = collect(orchestrator(&config, Some(provider)).run_research(travel)).await;

    assert_single_terminal(&events);
    let streamed: Vec<RequirementItem> = events
        .iter()
        .filter_map(|e| match e {
            AdvisorEvent::Requirement(r) => Some(r.clone()),
            _ => None,
        })
        .collect();

    match completion(&events) {
        CompletionResult::Checklist(checklist) => {
            assert_eq!(streamed, checklist.requirements);
            assert_eq!(checklist.requirements[0].id, "req-1");
            assert_eq!(
                checklist.requirements[0].personalized_detail.as_deref(),
                Some("Valid passport. Needed for each of the 3 travelers.")
            );
            assert!(checklist.requirements[1].personalized_detail.is_none());
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_research_announces_fallback_before_stored_data() {
    let mut config = fast_config();
    config.orchestrator.prefer_cached = false;
    let provider = ScriptedProvider::new()
        .fail(RESEARCH_SYSTEM, "overloaded")
        .shared();
    let events =
        collect(orchestrator(&config, Some(provider)).run_research(travel("India", "Germany")))
            .await;

    assert_single_terminal(&events);
    assert_eq!(
        phases(&events),
        vec![
            SearchPhase::Searching,
            SearchPhase::Live,
            SearchPhase::Fallback,
            SearchPhase::CacheHit,
            SearchPhase::Done,
        ]
    );
    assert_eq!(requirement_ids(&events).len(), 7);
    assert!(matches!(completion(&events), CompletionResult::Checklist(_)));
}

// ============================================================================
// Analysis (fan-in)
// ============================================================================

#[tokio::test]
async fn test_analysis_without_documents_is_research_only() {
    let config = fast_config();
    let request = AnalyzeRequest {
        travel_details: travel("India", "Germany"),
        documents: Vec::new(),
        prior_extractions: Vec::new(),
    };
    let events = collect(orchestrator(&config, None).run_analysis(request)).await;

    assert_single_terminal(&events);
    assert!(agent_events(&events, AgentKind::DocumentReader).is_empty());
    match completion(&events) {
        CompletionResult::Analysis(aggregate) => {
            assert_eq!(aggregate.requirements.requirements.len(), 7);
            assert!(aggregate.extractions.is_empty());
            assert!(aggregate.analysis.is_none());
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_analysis_runs_dependent_task_after_both_finish() {
    let config = fast_config();
    let provider = ScriptedProvider::new()
        .reply(READER_SYSTEM, READER_REPLY)
        .reply(ANALYZER_SYSTEM, ANALYZER_REPLY)
        .shared();
    let request = AnalyzeRequest {
        travel_details: travel("India", "Germany"),
        documents: vec![passport_upload()],
        prior_extractions: Vec::new(),
    };
    let events = collect(orchestrator(&config, Some(provider)).run_analysis(request)).await;

    assert_single_terminal(&events);

    let research_done = position(&events, &AdvisorEvent::agent_complete(AgentKind::Research)).unwrap();
    let reader_done =
        position(&events, &AdvisorEvent::agent_complete(AgentKind::DocumentReader)).unwrap();
    let analyzer = agent_events(&events, AgentKind::DocumentAnalyzer);
    assert!(!analyzer.is_empty());
    assert!(analyzer.iter().all(|&i| i > research_done && i > reader_done));

    let first_compliance = events
        .iter()
        .position(|e| matches!(e, AdvisorEvent::Compliance(_)))
        .unwrap();
    assert!(first_compliance > research_done && first_compliance > reader_done);

    assert!(events.iter().any(|e| matches!(
        e,
        AdvisorEvent::DocumentRead(d) if d.document_id == "doc-1" && d.document_type == "passport"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        AdvisorEvent::Forensic(f) if f.severity == Severity::Critical
    )));

    match completion(&events) {
        CompletionResult::Analysis(aggregate) => {
            assert_eq!(aggregate.extractions.len(), 1);
            let analysis = aggregate.analysis.as_ref().unwrap();
            assert_eq!(analysis.findings[0].severity, Severity::Critical);
            assert_eq!(analysis.findings.len(), 2);

            let bank = analysis
                .compliance
                .iter()
                .find(|c| c.requirement == "Bank Statement")
                .unwrap();
            assert_eq!(bank.requirement_id.as_deref(), Some("req-3"));

            let not_checked: Vec<&str> = analysis
                .compliance
                .iter()
                .filter(|c| c.status == ComplianceStatus::NotChecked)
                .map(|c| c.requirement.as_str())
                .collect();
            assert_eq!(
                not_checked,
                vec!["Employer Cover Letter", "Business Invitation", "Travel Insurance"]
            );
            assert_eq!(
                analysis.narrative.as_deref(),
                Some("The passport expires during the trip.")
            );
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_reader_failure_keeps_research_events_and_skips_analysis() {
    let config = fast_config();
    let provider = ScriptedProvider::new()
        .fail(READER_SYSTEM, "vision model unavailable")
        .reply(ANALYZER_SYSTEM, ANALYZER_REPLY)
        .shared();
    let request = AnalyzeRequest {
        travel_details: travel("India", "Germany"),
        documents: vec![passport_upload()],
        prior_extractions: Vec::new(),
    };
    let events = collect(orchestrator(&config, Some(provider)).run_analysis(request)).await;

    assert_single_terminal(&events);
    assert_eq!(requirement_ids(&events).len(), 7);
    assert!(position(&events, &AdvisorEvent::agent_complete(AgentKind::Research)).is_some());
    assert!(agent_events(&events, AgentKind::DocumentAnalyzer).is_empty());

    match events.last() {
        Some(AdvisorEvent::Error(e)) => {
            assert!(e.message.contains("Document reading failed"), "{}", e.message);
            assert!(!e.message.contains("Requirements research"));
            assert_eq!(e.code.as_deref(), Some("backend_error"));
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_documents_without_backend_fail_reader_stage() {
    let config = fast_config();
    let request = AnalyzeRequest {
        travel_details: travel("India", "Germany"),
        documents: vec![passport_upload()],
        prior_extractions: Vec::new(),
    };
    let events = collect(orchestrator(&config, None).run_analysis(request)).await;

    assert_single_terminal(&events);
    match events.last() {
        Some(AdvisorEvent::Error(e)) => assert_eq!(e.code.as_deref(), Some("no_backend")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_abort_stops_tasks_before_analysis() {
    let mut config = fast_config();
    config.orchestrator.pacing_ms = 5_000;
    let scripted = ScriptedProvider::new()
        .reply(READER_SYSTEM, READER_REPLY)
        .reply(ANALYZER_SYSTEM, ANALYZER_REPLY);
    let calls = scripted.calls();
    let provider = scripted.shared();
    let backend = Arc::downgrade(&provider);
    let request = AnalyzeRequest {
        travel_details: travel("India", "Germany"),
        documents: vec![passport_upload()],
        prior_extractions: Vec::new(),
    };

    let mut stream = orchestrator(&config, Some(provider)).run_analysis(request);
    assert!(stream.next().await.is_some());
    drop(stream);

    // Paced research would hold the backend for tens of seconds if it kept running.
    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.upgrade().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tasks still running after the client went away");

    let calls = calls.lock().unwrap();
    assert!(!calls.iter().any(|system| system == ANALYZER_SYSTEM), "{:?}", calls);
}

// ============================================================================
// Advisory
// ============================================================================

#[tokio::test]
async fn test_advisory_streams_revisions_and_final_report() {
    let config = fast_config();
    let research = collect(orchestrator(&config, None).run_research(travel("India", "Germany"))).await;
    let checklist = match completion(&research) {
        CompletionResult::Checklist(c) => c.clone(),
        other => panic!("unexpected result {:?}", other),
    };

    let request = AdvisoryRequest {
        checklist,
        compliance: vec![
            ComplianceItem::new("Passport", ComplianceStatus::Critical)
                .with_requirement_id("req-1")
                .with_detail("Renew before applying"),
            ComplianceItem::new("Bank Statement", ComplianceStatus::Met).with_requirement_id("req-3"),
        ],
        prior_fixes: None,
        travel_details: None,
    };
    let events = collect(orchestrator(&config, None).run_advisory(request)).await;

    assert_single_terminal(&events);
    let assessments: Vec<ApplicationAssessment> = events
        .iter()
        .filter_map(|e| match e {
            AdvisorEvent::Assessment(a) => Some(a.overall),
            _ => None,
        })
        .collect();
    assert_eq!(
        assessments,
        vec![
            ApplicationAssessment::AdditionalDocumentsNeeded,
            ApplicationAssessment::SignificantIssues,
        ]
    );

    match completion(&events) {
        CompletionResult::Advisory(report) => {
            assert_eq!(report.overall, ApplicationAssessment::SignificantIssues);
            assert_eq!(report.fixes[0].requirement, "Passport");
            assert_eq!(report.fixes[0].severity, Severity::Critical);
            assert_eq!(report.fixes[0].fix, "Renew before applying");
            let priorities: Vec<u32> = report.fixes.iter().map(|f| f.priority).collect();
            assert_eq!(priorities, (1..=report.fixes.len() as u32).collect::<Vec<_>>());
        }
        other => panic!("unexpected result {:?}", other),
    }
}

// ============================================================================
// Timeout
// ============================================================================

#[tokio::test]
async fn test_request_timeout_ends_with_timeout_error() {
    let mut config = fast_config();
    config.orchestrator.pacing_ms = 5_000;
    let orchestrator =
        orchestrator(&config, None).with_request_timeout(Duration::from_millis(50));
    let events = collect(orchestrator.run_research(travel("India", "Germany"))).await;

    assert_single_terminal(&events);
    match events.last() {
        Some(AdvisorEvent::Error(e)) => assert_eq!(e.code.as_deref(), Some("timeout")),
        other => panic!("expected timeout error, got {:?}", other),
    }
}
