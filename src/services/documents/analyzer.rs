//! Document Analyzer Task
//!
//! Checks document extractions against the requirements checklist. The
//! backend's `compliance` array is streamed item by item; the complete
//! answer then decides the final list and adds findings plus a narrative.

use std::sync::Arc;

use async_trait::async_trait;
use visa_advisor_core::{
    extract_json_object, AdvisorEvent, AgentKind, AnalysisResult, ComplianceItem, ComplianceStatus,
    DocumentExtraction, IncrementalExtractor, PartialArrayExtractor, RequirementsChecklist,
};
use visa_advisor_llm::{CompletionRequest, LlmProvider, Message};

use crate::models::request::TravelDetails;
use crate::services::prompts;
use crate::services::tasks::{BackendStream, EventEmitter, ReasoningTask, TaskError, TaskResult, ThinkingTracker};

/// Correlate a compliance item with a checklist requirement by name when the
/// backend left out the id.
pub fn attach_requirement_id(item: &mut ComplianceItem, checklist: &RequirementsChecklist) {
    if item.requirement_id.as_deref().is_some_and(|id| !id.is_empty()) {
        return;
    }
    let name = item.requirement.trim().to_lowercase();
    if name.is_empty() {
        return;
    }
    item.requirement_id = checklist
        .requirements
        .iter()
        .find(|r| {
            let candidate = r.name.trim().to_lowercase();
            !candidate.is_empty() && (candidate.contains(&name) || name.contains(&candidate))
        })
        .map(|r| r.id.clone())
        .filter(|id| !id.is_empty());
}

/// `not_checked` entries for required uploadable requirements that no
/// compliance item covers.
pub fn uncovered_requirements(
    checklist: &RequirementsChecklist,
    compliance: &[ComplianceItem],
) -> Vec<ComplianceItem> {
    checklist
        .required_items()
        .filter(|r| r.uploadable)
        .filter(|r| {
            !compliance.iter().any(|c| match &c.requirement_id {
                Some(id) if !r.id.is_empty() => id == &r.id,
                _ => c.requirement.trim().eq_ignore_ascii_case(r.name.trim()),
            })
        })
        .map(|r| {
            let item = ComplianceItem::new(r.name.clone(), ComplianceStatus::NotChecked)
                .with_detail(format!("No uploaded document covers {}", r.name));
            if r.id.is_empty() {
                item
            } else {
                item.with_requirement_id(r.id.clone())
            }
        })
        .collect()
}

fn parse_analysis(text: &str) -> Result<AnalysisResult, String> {
    let json = extract_json_object(text).ok_or("analysis output contains no JSON object")?;
    serde_json::from_str(json).map_err(|e| format!("analysis output: {}", e))
}

pub struct DocumentAnalyzerTask {
    travel: TravelDetails,
    checklist: RequirementsChecklist,
    extractions: Vec<DocumentExtraction>,
    provider: Option<Arc<dyn LlmProvider>>,
    capacity: usize,
    thinking_budget: u32,
}

impl DocumentAnalyzerTask {
    pub fn new(
        travel: TravelDetails,
        checklist: RequirementsChecklist,
        extractions: Vec<DocumentExtraction>,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            travel,
            checklist,
            extractions,
            provider,
            capacity: 64,
            thinking_budget: 8000,
        }
    }

    pub fn with_limits(mut self, capacity: usize, thinking_budget: u32) -> Self {
        self.capacity = capacity;
        self.thinking_budget = thinking_budget;
        self
    }
}

#[async_trait]
impl ReasoningTask for DocumentAnalyzerTask {
    type Output = AnalysisResult;

    fn agent(&self) -> AgentKind {
        AgentKind::DocumentAnalyzer
    }

    async fn run(self, emitter: EventEmitter) -> TaskResult<AnalysisResult> {
        let provider = self.provider.clone().ok_or(TaskError::NoBackend)?;

        let summary = format!(
            "Checking {} documents against {} requirements",
            self.extractions.len(),
            self.checklist.requirements.len()
        );
        emitter
            .emit(AdvisorEvent::thinking(
                AgentKind::DocumentAnalyzer,
                summary.clone(),
                "Verifying documents",
            ))
            .await;

        let request = CompletionRequest::new(
            prompts::ANALYZER_SYSTEM,
            vec![Message::user(prompts::analyzer_prompt(
                &self.travel,
                &self.checklist,
                &self.extractions,
            ))],
        )
        .with_thinking_budget(self.thinking_budget);
        let tracker = ThinkingTracker::new(AgentKind::DocumentAnalyzer, self.thinking_budget, summary);

        let mut stream = BackendStream::start(provider, request, self.capacity, tracker);
        let mut extractor = IncrementalExtractor::new(
            PartialArrayExtractor::new("compliance").require(&["requirement", "status"]),
        );
        let mut surfaced: Vec<ComplianceItem> = Vec::new();

        while stream.advance(&emitter).await {
            for value in extractor.poll(stream.text()) {
                match serde_json::from_value::<ComplianceItem>(value) {
                    Ok(mut item) => {
                        attach_requirement_id(&mut item, &self.checklist);
                        emitter.emit(AdvisorEvent::Compliance(item.clone())).await;
                        surfaced.push(item);
                    }
                    Err(e) => tracing::debug!("[DocumentAnalyzer] skipping partial item: {}", e),
                }
            }
        }

        let emitted = extractor.emitted();
        let (text, _) = stream.finish(&emitter).await?;

        let mut result = match parse_analysis(&text) {
            Ok(result) => result,
            Err(e) if !surfaced.is_empty() => {
                tracing::warn!("[DocumentAnalyzer] {}; keeping {} streamed items", e, surfaced.len());
                AnalysisResult {
                    compliance: surfaced.clone(),
                    ..Default::default()
                }
            }
            Err(e) => return Err(TaskError::parse(e)),
        };

        for item in result.compliance.iter_mut() {
            attach_requirement_id(item, &self.checklist);
        }
        for item in result.compliance.iter().skip(emitted) {
            emitter.emit(AdvisorEvent::Compliance(item.clone())).await;
        }

        let uncovered = uncovered_requirements(&self.checklist, &result.compliance);
        for item in &uncovered {
            emitter.emit(AdvisorEvent::Compliance(item.clone())).await;
        }
        result.compliance.extend(uncovered);

        result.findings.sort_by_key(|f| f.severity.rank());
        for finding in &result.findings {
            emitter.emit(AdvisorEvent::Forensic(finding.clone())).await;
        }
        if let Some(narrative) = result.narrative.as_deref().filter(|n| !n.trim().is_empty()) {
            emitter.emit(AdvisorEvent::narrative(narrative)).await;
        }

        tracing::info!(
            "[DocumentAnalyzer] {} compliance items, {} findings",
            result.compliance.len(),
            result.findings.len()
        );
        Ok(result)
    }
}
