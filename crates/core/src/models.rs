//! Domain Model
//!
//! Requirement, compliance, remediation and report types shared by every
//! layer. Field names serialize in camelCase because they travel to the
//! browser client unchanged inside stream events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How sure the research step is about a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

/// One document or condition needed for an application.
///
/// Produced once by research and immutable afterwards. `id` is stable for
/// the lifetime of a checklist and is threaded through compliance checking
/// and remediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Whether this corresponds to a document the applicant must supply
    #[serde(default)]
    pub uploadable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized_detail: Option<String>,
}

fn default_required() -> bool {
    true
}

impl RequirementItem {
    /// Create a required item with medium confidence.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
            required: true,
            confidence: Confidence::Medium,
            source: None,
            uploadable: false,
            personalized_detail: None,
        }
    }

    /// Builder: mark as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Builder: mark as a document the applicant uploads.
    pub fn uploadable(mut self) -> Self {
        self.uploadable = true;
        self
    }

    /// Builder: set the stable identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: set the applicant-specific detail.
    pub fn with_personalized_detail(mut self, detail: impl Into<String>) -> Self {
        self.personalized_detail = Some(detail.into());
        self
    }
}

/// Identifier for the requirement at `index` in a checklist.
pub fn requirement_id_for(index: usize) -> String {
    format!("req-{}", index + 1)
}

/// Full research output for one corridor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsChecklist {
    #[serde(default)]
    pub corridor: String,
    #[serde(default)]
    pub visa_type: String,
    #[serde(default)]
    pub requirements: Vec<RequirementItem>,
    #[serde(default)]
    pub important_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_window: Option<String>,
    #[serde(default)]
    pub rejection_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_arrival_registration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_warning: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Set when the checklist is the minimal built-in one
    #[serde(default)]
    pub degraded: bool,
}

impl RequirementsChecklist {
    /// Fill in missing requirement ids from list position.
    pub fn assign_ids(&mut self) {
        for (index, item) in self.requirements.iter_mut().enumerate() {
            if item.id.is_empty() {
                item.id = requirement_id_for(index);
            }
        }
    }

    /// Replace every requirement id with its positional id.
    pub fn renumber_ids(&mut self) {
        for (index, item) in self.requirements.iter_mut().enumerate() {
            item.id = requirement_id_for(index);
        }
    }

    /// Iterate over required items only.
    pub fn required_items(&self) -> impl Iterator<Item = &RequirementItem> {
        self.requirements.iter().filter(|r| r.required)
    }
}

/// Verification outcome for one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Met,
    Warning,
    Critical,
    NotChecked,
}

/// One verified document/requirement pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    /// Free-text requirement name, matched against fixes when no id is present
    pub requirement: String,
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
}

impl ComplianceItem {
    pub fn new(requirement: impl Into<String>, status: ComplianceStatus) -> Self {
        Self {
            requirement_id: None,
            requirement: requirement.into(),
            status,
            detail: None,
            document_ref: None,
        }
    }

    /// Builder: correlate by requirement id.
    pub fn with_requirement_id(mut self, id: impl Into<String>) -> Self {
        self.requirement_id = Some(id.into());
        self
    }

    /// Builder: set the verification detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Builder: set the document reference.
    pub fn with_document_ref(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }
}

/// Ordinal classification driving sort order and the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Sort rank: critical first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One actionable entry in the advisory report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationItem {
    /// 1-based, dense, reassigned after every update
    pub priority: u32,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    /// Requirement name this fix tracks
    pub requirement: String,
    pub issue: String,
    pub fix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
}

/// Overall verdict for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationAssessment {
    AdditionalDocumentsNeeded,
    SignificantIssues,
    ApplicationProceeds,
}

impl ApplicationAssessment {
    /// Decision weight: SIGNIFICANT_ISSUES > ADDITIONAL_DOCUMENTS_NEEDED > APPLICATION_PROCEEDS.
    pub fn weight(self) -> u8 {
        match self {
            ApplicationAssessment::SignificantIssues => 2,
            ApplicationAssessment::AdditionalDocumentsNeeded => 1,
            ApplicationAssessment::ApplicationProceeds => 0,
        }
    }
}

impl std::fmt::Display for ApplicationAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationAssessment::AdditionalDocumentsNeeded => {
                write!(f, "ADDITIONAL_DOCUMENTS_NEEDED")
            }
            ApplicationAssessment::SignificantIssues => write!(f, "SIGNIFICANT_ISSUES"),
            ApplicationAssessment::ApplicationProceeds => write!(f, "APPLICATION_PROCEEDS"),
        }
    }
}

/// Synthesized, prioritized list of fixes plus an overall verdict.
///
/// `overall` is always derived from `fixes`; only the synthesizer writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryReport {
    pub overall: ApplicationAssessment,
    pub fixes: Vec<RemediationItem>,
    #[serde(default)]
    pub interview_tips: Vec<String>,
    #[serde(default)]
    pub corridor_warnings: Vec<String>,
}

/// A discrepancy or observation surfaced while reading documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
}

/// Structured data read from one uploaded document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    pub document_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub document_type: String,
    /// ISO 639-1 code of the document's primary language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    /// ISO calendar date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Output of document analysis against a checklist.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub compliance: Vec<ComplianceItem>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

/// Aggregate carried by the final event of a full analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAggregate {
    pub requirements: RequirementsChecklist,
    #[serde(default)]
    pub extractions: Vec<DocumentExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}
