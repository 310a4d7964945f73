//! Advisory Integration Tests
//!
//! The advisory stream end to end: template report, compliance revisions,
//! the optional refinement pass and continuation from earlier fixes.

use visa_advisor::models::request::AdvisoryRequest;
use visa_advisor::services::prompts::ADVISORY_SYSTEM;
use visa_advisor_core::{
    AdvisorEvent, AdvisoryReport, ApplicationAssessment, ComplianceItem, ComplianceStatus,
    CompletionResult, RemediationItem, RequirementItem, RequirementsChecklist, Severity,
};

use super::support::{assert_single_terminal, collect, fast_config, orchestrator, ScriptedProvider};

fn checklist() -> RequirementsChecklist {
    let mut checklist = RequirementsChecklist {
        visa_type: "Schengen C".to_string(),
        requirements: vec![
            RequirementItem::new("Passport", "Valid passport").uploadable(),
            RequirementItem::new("Bank Statement", "Three months of statements").uploadable(),
            RequirementItem::new("Travel Insurance", "Cover of at least 30,000 EUR").uploadable(),
        ],
        ..Default::default()
    };
    checklist.assign_ids();
    checklist
}

fn request(compliance: Vec<ComplianceItem>) -> AdvisoryRequest {
    AdvisoryRequest {
        checklist: checklist(),
        compliance,
        prior_fixes: None,
        travel_details: None,
    }
}

fn report(events: &[AdvisorEvent]) -> AdvisoryReport {
    assert_single_terminal(events);
    match events.last() {
        Some(AdvisorEvent::Complete(c)) => match &c.result {
            CompletionResult::Advisory(report) => report.clone(),
            other => panic!("unexpected result {:?}", other),
        },
        other => panic!("expected complete, got {:?}", other),
    }
}

#[tokio::test]
async fn test_template_report_without_compliance() {
    let config = fast_config();
    let events = collect(orchestrator(&config, None).run_advisory(request(Vec::new()))).await;
    let report = report(&events);

    assert_eq!(report.overall, ApplicationAssessment::AdditionalDocumentsNeeded);
    assert_eq!(report.fixes.len(), 3);
    assert!(report.fixes.iter().all(|f| f.severity == Severity::Info));
    let recommendations = events
        .iter()
        .filter(|e| matches!(e, AdvisorEvent::Recommendation(_)))
        .count();
    assert_eq!(recommendations, 3);
}

#[tokio::test]
async fn test_all_met_proceeds() {
    let config = fast_config();
    let compliance = checklist()
        .requirements
        .iter()
        .map(|r| ComplianceItem::new(r.name.clone(), ComplianceStatus::Met).with_requirement_id(r.id.clone()))
        .collect();
    let events = collect(orchestrator(&config, None).run_advisory(request(compliance))).await;
    let report = report(&events);

    assert_eq!(report.overall, ApplicationAssessment::ApplicationProceeds);
    assert!(report.fixes.iter().all(|f| f.issue.ends_with("verified")));
    assert!(events.contains(&AdvisorEvent::assessment(ApplicationAssessment::ApplicationProceeds)));
}

#[tokio::test]
async fn test_final_verdict_does_not_depend_on_arrival_order() {
    let items = vec![
        ComplianceItem::new("Bank Statement", ComplianceStatus::Warning).with_detail("Only two months"),
        ComplianceItem::new("Passport", ComplianceStatus::Met),
        ComplianceItem::new("Travel Insurance", ComplianceStatus::Critical).with_detail("Cover too low"),
    ];
    let mut reversed = items.clone();
    reversed.reverse();

    let config = fast_config();
    let forward = report(&collect(orchestrator(&config, None).run_advisory(request(items))).await);
    let backward =
        report(&collect(orchestrator(&config, None).run_advisory(request(reversed))).await);

    assert_eq!(forward.overall, ApplicationAssessment::SignificantIssues);
    assert_eq!(forward.overall, backward.overall);
    let severities = |r: &AdvisoryReport| r.fixes.iter().map(|f| f.severity).collect::<Vec<_>>();
    assert_eq!(severities(&forward), severities(&backward));
    assert_eq!(
        severities(&forward),
        vec![Severity::Critical, Severity::Warning, Severity::Info]
    );
    assert_eq!(forward.fixes[0].requirement, "Travel Insurance");
}

#[tokio::test]
async fn test_refinement_rewrites_wording_only() {
    let config = fast_config();
    let provider = ScriptedProvider::new()
        .reply(
            ADVISORY_SYSTEM,
            r#"{"fixes":[{"priority":1,"fix":"Buy a policy covering 30,000 EUR","severity":"info"}],
                "interviewTips":["Carry the policy certificate"]}"#,
        )
        .shared();
    let compliance = vec![
        ComplianceItem::new("Travel Insurance", ComplianceStatus::Critical).with_detail("Cover too low"),
    ];
    let events =
        collect(orchestrator(&config, Some(provider)).run_advisory(request(compliance))).await;
    let report = report(&events);

    assert_eq!(report.fixes[0].fix, "Buy a policy covering 30,000 EUR");
    assert_eq!(report.fixes[0].severity, Severity::Critical);
    assert_eq!(report.overall, ApplicationAssessment::SignificantIssues);
    assert_eq!(report.interview_tips, vec!["Carry the policy certificate".to_string()]);

    let last_recommendation = events
        .iter()
        .rev()
        .find_map(|e| match e {
            AdvisorEvent::Recommendation(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_recommendation.fix, "Buy a policy covering 30,000 EUR");
}

#[tokio::test]
async fn test_refinement_failure_keeps_synthesized_report() {
    let config = fast_config();
    let provider = ScriptedProvider::new()
        .fail(ADVISORY_SYSTEM, "overloaded")
        .shared();
    let compliance = vec![ComplianceItem::new("Passport", ComplianceStatus::Warning)];
    let events =
        collect(orchestrator(&config, Some(provider)).run_advisory(request(compliance))).await;
    let report = report(&events);

    assert_eq!(report.overall, ApplicationAssessment::AdditionalDocumentsNeeded);
    assert_eq!(report.fixes[0].requirement, "Passport");
    assert_eq!(report.fixes[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_continues_from_prior_fixes() {
    let config = fast_config();
    let prior = vec![RemediationItem {
        priority: 1,
        severity: Severity::Warning,
        requirement_id: Some("req-2".to_string()),
        requirement: "Bank Statement".to_string(),
        issue: "Bank Statement needs attention".to_string(),
        fix: "Add the missing month".to_string(),
        document_ref: Some("doc-2".to_string()),
    }];
    let request = AdvisoryRequest {
        checklist: RequirementsChecklist::default(),
        compliance: vec![
            ComplianceItem::new("Bank Statement", ComplianceStatus::Met).with_requirement_id("req-2"),
        ],
        prior_fixes: Some(prior),
        travel_details: None,
    };
    let events = collect(orchestrator(&config, None).run_advisory(request)).await;
    let report = report(&events);

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
            ApplicationAssessment::ApplicationProceeds,
        ]
    );
    assert_eq!(report.fixes.len(), 1);
    assert_eq!(report.fixes[0].severity, Severity::Info);
    assert_eq!(report.fixes[0].document_ref.as_deref(), Some("doc-2"));
}
