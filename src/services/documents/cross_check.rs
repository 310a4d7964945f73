//! Document Cross-Checks
//!
//! Consistency checks across every extraction in a request: holder names,
//! passport validity against the return date, and document language.

use chrono::{Months, NaiveDate};
use visa_advisor_core::{DocumentExtraction, Finding, Severity};

use crate::services::translation::{is_english, Translator};

/// Months a passport must remain valid after the return date
pub const PASSPORT_VALIDITY_MONTHS: u32 = 6;

/// Finding and which event it should travel as
#[derive(Debug, Clone, PartialEq)]
pub enum CrossCheck {
    Forensic(Finding),
    CrossLingual(Finding),
}

impl CrossCheck {
    pub fn finding(&self) -> &Finding {
        match self {
            CrossCheck::Forensic(f) | CrossCheck::CrossLingual(f) => f,
        }
    }
}

/// Canonical form of a person's name: uppercase words in sorted order, so
/// "Doe, John" and "JOHN DOE" compare equal.
pub fn normalize_name(name: &str) -> String {
    let mut words: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_uppercase)
        .collect();
    words.sort();
    words.join(" ")
}

fn is_passport(extraction: &DocumentExtraction) -> bool {
    extraction.document_type.to_lowercase().contains("passport")
}

/// Documents whose holder differs from the reference holder.
///
/// The reference is the first passport with a name, else the first
/// document with a name.
pub fn name_mismatches(extractions: &[DocumentExtraction]) -> Vec<Finding> {
    let named: Vec<(&DocumentExtraction, String)> = extractions
        .iter()
        .filter_map(|e| {
            e.holder_name
                .as_deref()
                .map(normalize_name)
                .filter(|n| !n.is_empty())
                .map(|n| (e, n))
        })
        .collect();

    let Some((reference, reference_name)) = named
        .iter()
        .find(|(e, _)| is_passport(e))
        .or_else(|| named.first())
    else {
        return Vec::new();
    };

    named
        .iter()
        .filter(|(e, name)| e.document_id != reference.document_id && name != reference_name)
        .map(|(e, _)| Finding {
            severity: Severity::Warning,
            title: "Name mismatch".to_string(),
            detail: format!(
                "{} is issued to {} but {} is issued to {}",
                e.filename,
                e.holder_name.as_deref().unwrap_or_default(),
                reference.filename,
                reference.holder_name.as_deref().unwrap_or_default(),
            ),
            document_ref: Some(e.document_id.clone()),
        })
        .collect()
}

/// Passport expiry against the return date.
pub fn passport_validity(extractions: &[DocumentExtraction], return_date: NaiveDate) -> Vec<Finding> {
    let required_until = return_date
        .checked_add_months(Months::new(PASSPORT_VALIDITY_MONTHS))
        .unwrap_or(return_date);

    extractions
        .iter()
        .filter(|e| is_passport(e))
        .filter_map(|e| {
            let expiry = e
                .expiry_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())?;
            if expiry < return_date {
                Some(Finding {
                    severity: Severity::Critical,
                    title: "Passport expires before return".to_string(),
                    detail: format!(
                        "{} expires on {}, before the return date {}",
                        e.filename, expiry, return_date
                    ),
                    document_ref: Some(e.document_id.clone()),
                })
            } else if expiry < required_until {
                Some(Finding {
                    severity: Severity::Warning,
                    title: "Passport validity under 6 months".to_string(),
                    detail: format!(
                        "{} expires on {}; many consulates expect validity until {}",
                        e.filename, expiry, required_until
                    ),
                    document_ref: Some(e.document_id.clone()),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Non-English documents, with their summary translated to English.
pub async fn language_findings(
    extractions: &[DocumentExtraction],
    translator: &dyn Translator,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for extraction in extractions {
        let Some(language) = extraction.language.as_deref() else {
            continue;
        };
        if is_english(language) {
            continue;
        }
        let original = extraction
            .summary
            .clone()
            .unwrap_or_else(|| format!("{} document", extraction.document_type));
        let detail = match translator.translate(&original, "en").await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[DocumentReader] translation failed: {}", e);
                original
            }
        };
        findings.push(Finding {
            severity: Severity::Info,
            title: format!(
                "{} is written in '{}'; a certified translation may be required",
                extraction.filename, language
            ),
            detail,
            document_ref: Some(extraction.document_id.clone()),
        });
    }
    findings
}

/// Run every check. Forensic findings come first, ordered by severity.
pub async fn cross_check(
    extractions: &[DocumentExtraction],
    return_date: Option<NaiveDate>,
    translator: &dyn Translator,
) -> Vec<CrossCheck> {
    let mut forensic = name_mismatches(extractions);
    if let Some(date) = return_date {
        forensic.extend(passport_validity(extractions, date));
    }
    forensic.sort_by_key(|f| f.severity.rank());

    let mut checks: Vec<CrossCheck> = forensic.into_iter().map(CrossCheck::Forensic).collect();
    checks.extend(
        language_findings(extractions, translator)
            .await
            .into_iter()
            .map(CrossCheck::CrossLingual),
    );
    checks
}
