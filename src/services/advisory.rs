//! Advisory Task
//!
//! Streams the advisory report as it is built: the time-zero report from the
//! checklist (or from prior fixes), one revision per compliance result, and
//! finally an optional backend pass that rewrites fix wording and interview
//! tips. Severities and the overall verdict only ever come from the
//! synthesizer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use visa_advisor_core::advisory::{self, MAX_INTERVIEW_TIPS};
use visa_advisor_core::{
    extract_json_object, AdvisorEvent, AdvisoryReport, AgentKind, ComplianceItem, RemediationItem,
    RequirementsChecklist,
};
use visa_advisor_llm::{CompletionRequest, LlmProvider, Message};

use crate::models::request::TravelDetails;
use crate::services::prompts;
use crate::services::tasks::backend::complete_with_thinking;
use crate::services::tasks::{EventEmitter, ReasoningTask, TaskError, TaskResult, ThinkingTracker};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Refinement {
    fixes: Vec<RefinedFix>,
    interview_tips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RefinedFix {
    priority: u32,
    #[serde(default)]
    fix: String,
}

/// Apply a backend refinement to a report.
///
/// Only `fix` text (matched by priority) and interview tips are taken.
/// Returns `None` when the text holds no usable refinement.
pub fn apply_refinement(report: &AdvisoryReport, text: &str) -> Option<AdvisoryReport> {
    let json = extract_json_object(text)?;
    let refinement: Refinement = serde_json::from_str(json).ok()?;

    let mut refined = report.clone();
    let mut changed = false;
    for update in refinement.fixes {
        let wording = update.fix.trim();
        if wording.is_empty() {
            continue;
        }
        if let Some(fix) = refined.fixes.iter_mut().find(|f| f.priority == update.priority) {
            if fix.fix != wording {
                fix.fix = wording.to_string();
                changed = true;
            }
        }
    }

    let tips: Vec<String> = refinement
        .interview_tips
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_INTERVIEW_TIPS)
        .collect();
    if !tips.is_empty() && tips != refined.interview_tips {
        refined.interview_tips = tips;
        changed = true;
    }

    changed.then_some(refined)
}

pub struct AdvisoryTask {
    checklist: RequirementsChecklist,
    compliance: Vec<ComplianceItem>,
    prior_fixes: Option<Vec<RemediationItem>>,
    travel: Option<TravelDetails>,
    provider: Option<Arc<dyn LlmProvider>>,
    capacity: usize,
    thinking_budget: u32,
}

impl AdvisoryTask {
    pub fn new(checklist: RequirementsChecklist, compliance: Vec<ComplianceItem>) -> Self {
        Self {
            checklist,
            compliance,
            prior_fixes: None,
            travel: None,
            provider: None,
            capacity: 64,
            thinking_budget: 4000,
        }
    }

    pub fn with_prior_fixes(mut self, fixes: Option<Vec<RemediationItem>>) -> Self {
        self.prior_fixes = fixes.filter(|f| !f.is_empty());
        self
    }

    pub fn with_travel(mut self, travel: Option<TravelDetails>) -> Self {
        self.travel = travel;
        self
    }

    /// Enable the refinement pass.
    pub fn with_provider(mut self, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_limits(mut self, capacity: usize, thinking_budget: u32) -> Self {
        self.capacity = capacity;
        self.thinking_budget = thinking_budget;
        self
    }

    async fn refine(
        &self,
        provider: Arc<dyn LlmProvider>,
        report: &AdvisoryReport,
        emitter: &EventEmitter,
    ) -> TaskResult<Option<AdvisoryReport>> {
        let request = CompletionRequest::new(
            prompts::ADVISORY_SYSTEM,
            vec![Message::user(prompts::advisory_prompt(
                report,
                self.travel.as_ref(),
            ))],
        )
        .with_thinking_budget(self.thinking_budget);
        let tracker = ThinkingTracker::new(
            AgentKind::Advisory,
            self.thinking_budget,
            "Tailoring recommendations",
        );
        let text = complete_with_thinking(provider, request, self.capacity, tracker, emitter).await?;
        Ok(apply_refinement(report, &text))
    }
}

#[async_trait]
impl ReasoningTask for AdvisoryTask {
    type Output = AdvisoryReport;

    fn agent(&self) -> AgentKind {
        AgentKind::Advisory
    }

    async fn run(self, emitter: EventEmitter) -> TaskResult<AdvisoryReport> {
        let mut report = match self.prior_fixes.clone() {
            Some(prior) => advisory::seed_with_fixes(&self.checklist, prior),
            None => advisory::initialize(&self.checklist),
        };

        emitter
            .emit_all(report.fixes.iter().cloned().map(AdvisorEvent::Recommendation))
            .await;
        emitter.emit(AdvisorEvent::assessment(report.overall)).await;

        for item in &self.compliance {
            let next = advisory::merge(&report, item);
            for fix in next
                .fixes
                .iter()
                .filter(|f| advisory::matches_compliance(f, item))
            {
                emitter.emit(AdvisorEvent::Recommendation(fix.clone())).await;
            }
            if next.overall != report.overall {
                emitter.emit(AdvisorEvent::assessment(next.overall)).await;
            }
            report = next;
        }
        tracing::info!(
            "[Advisory] {} fixes after {} compliance results, overall {}",
            report.fixes.len(),
            self.compliance.len(),
            report.overall
        );

        if let Some(provider) = self.provider.clone().filter(|_| !report.fixes.is_empty()) {
            match self.refine(provider, &report, &emitter).await {
                Ok(Some(refined)) => {
                    for (before, after) in report.fixes.iter().zip(&refined.fixes) {
                        if before.fix != after.fix {
                            emitter.emit(AdvisorEvent::Recommendation(after.clone())).await;
                        }
                    }
                    report = refined;
                }
                Ok(None) => tracing::debug!("[Advisory] refinement produced no changes"),
                Err(TaskError::Cancelled) => return Err(TaskError::Cancelled),
                Err(e) => tracing::warn!("[Advisory] refinement failed, keeping report: {}", e),
            }
        }

        Ok(report)
    }
}
