//! Document Reader Task
//!
//! Reads each uploaded document image through the multimodal backend,
//! announces it with a `document_read` event, then runs the cross-document
//! checks over everything read in this request plus any prior extractions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use visa_advisor_core::events::DocumentReadEvent;
use visa_advisor_core::{
    extract_json_object, AdvisorEvent, AgentKind, DocumentExtraction, Finding, Severity,
};
use visa_advisor_llm::{CompletionRequest, LlmProvider, Message};

use super::cross_check::{cross_check, CrossCheck};
use crate::models::request::{DocumentUpload, TravelDetails};
use crate::services::prompts;
use crate::services::tasks::backend::complete_with_thinking;
use crate::services::tasks::{EventEmitter, ReasoningTask, TaskError, TaskResult, ThinkingTracker};
use crate::services::translation::Translator;

/// Document type recorded when the backend's answer cannot be parsed
pub const UNKNOWN_DOCUMENT_TYPE: &str = "unknown";

/// What the reader hands to the analyzer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderOutput {
    /// Prior extractions first, then documents read in this request
    pub extractions: Vec<DocumentExtraction>,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReaderReply {
    document_type: Option<String>,
    language: Option<String>,
    holder_name: Option<String>,
    expiry_date: Option<String>,
    fields: BTreeMap<String, Value>,
    summary: Option<String>,
}

impl ReaderReply {
    fn into_extraction(self, upload: &DocumentUpload) -> DocumentExtraction {
        let fields = self
            .fields
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();
        DocumentExtraction {
            document_id: upload.id.clone(),
            filename: upload.filename.clone(),
            document_type: self
                .document_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_DOCUMENT_TYPE.to_string()),
            language: self.language.filter(|l| !l.trim().is_empty()),
            holder_name: self.holder_name.filter(|n| !n.trim().is_empty()),
            expiry_date: self.expiry_date.filter(|d| !d.trim().is_empty()),
            fields,
            summary: self.summary,
        }
    }
}

/// Turn the backend's answer into an extraction, or `None` if it is not JSON.
pub fn parse_extraction(text: &str, upload: &DocumentUpload) -> Option<DocumentExtraction> {
    let json = extract_json_object(text)?;
    let reply: ReaderReply = serde_json::from_str(json).ok()?;
    Some(reply.into_extraction(upload))
}

fn unreadable(upload: &DocumentUpload) -> (DocumentExtraction, Finding) {
    let extraction = DocumentExtraction {
        document_id: upload.id.clone(),
        filename: upload.filename.clone(),
        document_type: UNKNOWN_DOCUMENT_TYPE.to_string(),
        ..Default::default()
    };
    let finding = Finding {
        severity: Severity::Warning,
        title: "Document could not be read".to_string(),
        detail: format!(
            "{} could not be interpreted. Upload a sharper, uncropped scan.",
            upload.filename
        ),
        document_ref: Some(upload.id.clone()),
    };
    (extraction, finding)
}

pub struct DocumentReaderTask {
    travel: TravelDetails,
    documents: Vec<DocumentUpload>,
    prior_extractions: Vec<DocumentExtraction>,
    provider: Option<Arc<dyn LlmProvider>>,
    translator: Arc<dyn Translator>,
    capacity: usize,
    thinking_budget: u32,
}

impl DocumentReaderTask {
    pub fn new(
        travel: TravelDetails,
        documents: Vec<DocumentUpload>,
        provider: Option<Arc<dyn LlmProvider>>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            travel,
            documents,
            prior_extractions: Vec::new(),
            provider,
            translator,
            capacity: 64,
            thinking_budget: 4000,
        }
    }

    /// Extractions from earlier requests; these take part in cross-checks
    /// but are not read again.
    pub fn with_prior_extractions(mut self, prior: Vec<DocumentExtraction>) -> Self {
        self.prior_extractions = prior;
        self
    }

    pub fn with_limits(mut self, capacity: usize, thinking_budget: u32) -> Self {
        self.capacity = capacity;
        self.thinking_budget = thinking_budget;
        self
    }
}

#[async_trait]
impl ReasoningTask for DocumentReaderTask {
    type Output = ReaderOutput;

    fn agent(&self) -> AgentKind {
        AgentKind::DocumentReader
    }

    async fn run(self, emitter: EventEmitter) -> TaskResult<ReaderOutput> {
        let pending: Vec<&DocumentUpload> = self
            .documents
            .iter()
            .filter(|d| !self.prior_extractions.iter().any(|p| p.document_id == d.id))
            .collect();

        let provider = match (&self.provider, pending.is_empty()) {
            (Some(provider), _) => Some(provider.clone()),
            (None, true) => None,
            (None, false) => return Err(TaskError::NoBackend),
        };

        let mut output = ReaderOutput {
            extractions: self.prior_extractions.clone(),
            findings: Vec::new(),
        };

        let total = pending.len();
        for (index, upload) in pending.into_iter().enumerate() {
            let Some(provider) = provider.clone() else {
                break;
            };
            let summary = format!("Reading documents ({}/{})", index + 1, total);
            emitter
                .emit(AdvisorEvent::thinking(
                    AgentKind::DocumentReader,
                    format!("Reading {}", upload.filename),
                    summary.clone(),
                ))
                .await;

            let request = CompletionRequest::new(
                prompts::READER_SYSTEM,
                vec![Message::user_with_image(
                    upload.mime_type.clone(),
                    upload.base64.trim(),
                    prompts::reader_prompt(&upload.filename),
                )],
            )
            .with_thinking_budget(self.thinking_budget);
            let tracker = ThinkingTracker::new(AgentKind::DocumentReader, self.thinking_budget, summary);

            let text =
                complete_with_thinking(provider, request, self.capacity, tracker, &emitter).await?;

            let extraction = match parse_extraction(&text, upload) {
                Some(extraction) => extraction,
                None => {
                    tracing::warn!("[DocumentReader] unparseable reply for {}", upload.filename);
                    let (extraction, finding) = unreadable(upload);
                    emitter.emit(AdvisorEvent::Forensic(finding.clone())).await;
                    output.findings.push(finding);
                    extraction
                }
            };

            emitter
                .emit(AdvisorEvent::DocumentRead(DocumentReadEvent {
                    document_id: extraction.document_id.clone(),
                    filename: extraction.filename.clone(),
                    document_type: extraction.document_type.clone(),
                    language: extraction.language.clone(),
                }))
                .await;
            output.extractions.push(extraction);
        }

        let checks = cross_check(
            &output.extractions,
            self.travel.return_date(),
            self.translator.as_ref(),
        )
        .await;
        tracing::info!(
            "[DocumentReader] {} documents, {} cross-check findings",
            output.extractions.len(),
            checks.len()
        );
        for check in checks {
            let event = match &check {
                CrossCheck::Forensic(f) => AdvisorEvent::Forensic(f.clone()),
                CrossCheck::CrossLingual(f) => AdvisorEvent::CrossLingual(f.clone()),
            };
            emitter.emit(event).await;
            output.findings.push(check.finding().clone());
        }

        Ok(output)
    }
}
