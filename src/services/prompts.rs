//! Prompt Builders
//!
//! System prompts and user messages for each reasoning task. Every prompt
//! asks for one JSON object so the partial-output extractor can pick
//! array elements out of the stream before the object is complete.

use visa_advisor_core::{AdvisoryReport, DocumentExtraction, RequirementsChecklist};

use crate::models::request::TravelDetails;

pub const RESEARCH_SYSTEM: &str = "You are an immigration research assistant. \
Answer with a single JSON object and nothing else. Put the `requirements` array first \
so it can be read while you are still writing.";

pub const READER_SYSTEM: &str = "You read identity and supporting documents for visa \
applications. Answer with a single JSON object describing the document shown.";

pub const ANALYZER_SYSTEM: &str = "You verify visa application documents against a \
requirements checklist. Answer with a single JSON object. Put the `compliance` array \
first, one element per requirement you could check.";

pub const ADVISORY_SYSTEM: &str = "You polish remediation advice for a visa applicant. \
Never change severities or add items. Answer with a single JSON object.";

pub fn research_prompt(travel: &TravelDetails) -> String {
    let mut prompt = format!(
        "Passports: {}\nDestination: {}\nPurpose: {}\nTravel dates: {} to {}\nTravelers: {}\n",
        travel.passports.join(", "),
        travel.destination,
        travel.purpose,
        travel.dates.depart,
        travel.dates.return_date,
        travel.travelers,
    );
    if let Some(event) = &travel.event {
        prompt.push_str(&format!("Event: {}\n", event));
    }
    prompt.push_str(
        "\nReturn JSON with fields: requirements (array of {name, description, required, \
confidence: high|medium|low, source, uploadable, personalizedDetail}), visaType, \
importantNotes, processingTime, applyAt, applicationWindow, rejectionReasons, \
financialThreshold, postArrivalRegistration, transitWarning, sources.",
    );
    prompt
}

pub fn reader_prompt(filename: &str) -> String {
    format!(
        "File name: {}\nReturn JSON with fields: documentType, language (ISO 639-1), \
holderName, expiryDate (YYYY-MM-DD), fields (flat string map of what you can read), summary.",
        filename
    )
}

pub fn analyzer_prompt(
    travel: &TravelDetails,
    checklist: &RequirementsChecklist,
    extractions: &[DocumentExtraction],
) -> String {
    let requirements = serde_json::to_string(&checklist.requirements).unwrap_or_default();
    let documents = serde_json::to_string(extractions).unwrap_or_default();
    format!(
        "Corridor: {}\nVisa type: {}\nReturn date: {}\n\nRequirements:\n{}\n\nDocuments:\n{}\n\n\
Return JSON with fields: compliance (array of {{requirementId, requirement, status: \
met|warning|critical|not_checked, detail, documentRef}}), findings (array of {{severity: \
critical|warning|info, title, detail, documentRef}}), narrative.",
        travel.corridor_label(),
        checklist.visa_type,
        travel.dates.return_date,
        requirements,
        documents,
    )
}

pub fn advisory_prompt(report: &AdvisoryReport, travel: Option<&TravelDetails>) -> String {
    let fixes = serde_json::to_string(&report.fixes).unwrap_or_default();
    let context = travel
        .map(|t| format!("Corridor: {} ({})\n", t.corridor_label(), t.purpose))
        .unwrap_or_default();
    format!(
        "{}Current fixes:\n{}\n\nReturn JSON with fields: fixes (array of {{priority, fix}} \
rewriting only the fix text to be specific and actionable), interviewTips (at most 4 strings).",
        context, fixes
    )
}
