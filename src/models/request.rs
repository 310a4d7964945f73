//! Request Models
//!
//! Bodies accepted by the streaming endpoints and the validation rules
//! applied before any stream is opened.

use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use visa_advisor_core::{ComplianceItem, DocumentExtraction, RemediationItem, RequirementsChecklist};

/// Accepted travel purposes
pub const TRAVEL_PURPOSES: &[&str] = &[
    "tourism", "business", "study", "work", "family", "transit", "event",
];

/// Accepted document image types
pub const DOCUMENT_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Most documents accepted in one request
pub const MAX_DOCUMENTS: usize = 10;

/// Largest accepted document
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

const MIN_TRAVELERS: u32 = 1;
const MAX_TRAVELERS: u32 = 100;

/// Departure and return dates as ISO calendar dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelDates {
    pub depart: String,
    #[serde(rename = "return")]
    pub return_date: String,
}

/// Travel corridor descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDetails {
    pub passports: Vec<String>,
    pub destination: String,
    pub purpose: String,
    pub dates: TravelDates,
    #[serde(default = "default_travelers")]
    pub travelers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

fn default_travelers() -> u32 {
    1
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

impl TravelDetails {
    pub fn depart_date(&self) -> Option<NaiveDate> {
        parse_date(&self.dates.depart)
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        parse_date(&self.dates.return_date)
    }

    /// Primary passport, used in prompts and corridor labels
    pub fn primary_passport(&self) -> &str {
        self.passports.first().map(String::as_str).unwrap_or("")
    }

    /// Human-readable corridor label, e.g. "India → Germany"
    pub fn corridor_label(&self) -> String {
        format!("{} → {}", self.passports.join(" / "), self.destination)
    }

    /// Collect every violated rule
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.passports.is_empty() {
            errors.push("passports must contain at least one country".to_string());
        } else if self.passports.iter().any(|p| p.trim().is_empty()) {
            errors.push("passports must not contain blank entries".to_string());
        }
        if self.destination.trim().is_empty() {
            errors.push("destination is required".to_string());
        }
        if !TRAVEL_PURPOSES.contains(&self.purpose.as_str()) {
            errors.push(format!(
                "purpose must be one of: {}",
                TRAVEL_PURPOSES.join(", ")
            ));
        }

        match (self.depart_date(), self.return_date()) {
            (Some(depart), Some(ret)) => {
                if ret <= depart {
                    errors.push("dates.return must be after dates.depart".to_string());
                }
            }
            (depart, ret) => {
                if depart.is_none() {
                    errors.push("dates.depart must be an ISO date (YYYY-MM-DD)".to_string());
                }
                if ret.is_none() {
                    errors.push("dates.return must be an ISO date (YYYY-MM-DD)".to_string());
                }
            }
        }

        if !(MIN_TRAVELERS..=MAX_TRAVELERS).contains(&self.travelers) {
            errors.push(format!(
                "travelers must be between {} and {}",
                MIN_TRAVELERS, MAX_TRAVELERS
            ));
        }

        errors
    }
}

/// One uploaded document image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    /// Base64 image payload
    pub base64: String,
    pub size_bytes: u64,
}

impl DocumentUpload {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let label = if self.filename.trim().is_empty() {
            self.id.clone()
        } else {
            self.filename.clone()
        };

        if self.id.trim().is_empty() {
            errors.push("document id is required".to_string());
        }
        if self.filename.trim().is_empty() {
            errors.push(format!("document {}: filename is required", self.id));
        }
        if !DOCUMENT_MIME_TYPES.contains(&self.mime_type.as_str()) {
            errors.push(format!(
                "document {}: mimeType must be one of: {}",
                label,
                DOCUMENT_MIME_TYPES.join(", ")
            ));
        }
        if self.size_bytes == 0 {
            errors.push(format!("document {}: sizeBytes must be positive", label));
        } else if self.size_bytes > MAX_DOCUMENT_BYTES {
            errors.push(format!(
                "document {}: sizeBytes exceeds {} bytes",
                label, MAX_DOCUMENT_BYTES
            ));
        }
        if self.base64.trim().is_empty()
            || base64::engine::general_purpose::STANDARD
                .decode(self.base64.trim())
                .is_err()
        {
            errors.push(format!("document {}: base64 payload is not valid", label));
        }

        errors
    }
}

/// Body of `POST /api/research`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub travel_details: TravelDetails,
}

impl ResearchRequest {
    pub fn validate(&self) -> Vec<String> {
        self.travel_details.validate()
    }
}

/// Body of `POST /api/analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub travel_details: TravelDetails,
    #[serde(default)]
    pub documents: Vec<DocumentUpload>,
    /// Extractions from an earlier request, used for cross-checks only
    #[serde(default)]
    pub prior_extractions: Vec<DocumentExtraction>,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.travel_details.validate();
        if self.documents.len() > MAX_DOCUMENTS {
            errors.push(format!("at most {} documents per request", MAX_DOCUMENTS));
        }
        for document in &self.documents {
            errors.extend(document.validate());
        }
        errors
    }
}

/// Body of `POST /api/advisory`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub checklist: RequirementsChecklist,
    #[serde(default)]
    pub compliance: Vec<ComplianceItem>,
    /// Fixes from an earlier advisory run to continue from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_fixes: Option<Vec<RemediationItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_details: Option<TravelDetails>,
}

impl AdvisoryRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.checklist.requirements.is_empty() && self.prior_fixes.is_none() {
            errors.push("checklist.requirements must not be empty".to_string());
        }
        if self
            .checklist
            .requirements
            .iter()
            .any(|r| r.name.trim().is_empty())
        {
            errors.push("checklist requirement names must not be blank".to_string());
        }
        if let Some(details) = &self.travel_details {
            errors.extend(details.validate());
        }
        errors
    }
}
