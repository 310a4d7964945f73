//! Advisory Synthesizer
//!
//! Builds a complete recommendation report straight from a requirements
//! checklist, then revises it one compliance result at a time. Both
//! operations are pure: they take the previous report by reference and
//! return a new one.
//!
//! `overall` is never set directly; it is recomputed from the fixes on
//! every change.

use crate::models::{
    AdvisoryReport, ApplicationAssessment, ComplianceItem, ComplianceStatus, RemediationItem,
    RequirementsChecklist, Severity,
};

/// Upper bound on template-generated interview tips.
pub const MAX_INTERVIEW_TIPS: usize = 4;

const FINANCIAL_KEYWORDS: &[&str] = &["bank", "financial", "fund", "income", "salary", "sponsor"];
const ACCOMMODATION_KEYWORDS: &[&str] = &["accommodation", "hotel", "lodging", "housing"];
const BUSINESS_KEYWORDS: &[&str] = &["business", "employer", "employment", "invitation", "company"];

/// Build the time-zero report for a checklist.
///
/// Every required item becomes an `info` fix; optional items are left out.
pub fn initialize(checklist: &RequirementsChecklist) -> AdvisoryReport {
    let mut fixes: Vec<RemediationItem> = checklist
        .required_items()
        .map(|item| RemediationItem {
            priority: 0,
            severity: Severity::Info,
            requirement_id: (!item.id.is_empty()).then(|| item.id.clone()),
            requirement: item.name.clone(),
            issue: format!(
                "{} — required for your {} application",
                item.name, checklist.visa_type
            ),
            fix: item
                .personalized_detail
                .clone()
                .unwrap_or_else(|| item.description.clone()),
            document_ref: None,
        })
        .collect();
    sort_and_renumber(&mut fixes);

    AdvisoryReport {
        overall: ApplicationAssessment::AdditionalDocumentsNeeded,
        fixes,
        interview_tips: interview_tips(checklist),
        corridor_warnings: corridor_warnings(checklist),
    }
}

/// Start from fixes produced by an earlier run instead of the checklist's
/// required items. Tips and warnings still come from the checklist.
pub fn seed_with_fixes(
    checklist: &RequirementsChecklist,
    prior: Vec<RemediationItem>,
) -> AdvisoryReport {
    let mut fixes = prior;
    sort_and_renumber(&mut fixes);
    AdvisoryReport {
        overall: derive_overall(&fixes),
        fixes,
        interview_tips: interview_tips(checklist),
        corridor_warnings: corridor_warnings(checklist),
    }
}

/// Apply one compliance result.
pub fn merge(report: &AdvisoryReport, item: &ComplianceItem) -> AdvisoryReport {
    let mut fixes = report.fixes.clone();

    if let Some((severity, suffix)) = status_outcome(item.status) {
        for fix in fixes.iter_mut().filter(|fix| matches_compliance(fix, item)) {
            fix.severity = severity;
            fix.issue = format!("{} — {}", fix.requirement, suffix);
            if let Some(detail) = &item.detail {
                fix.fix = detail.clone();
            }
            if item.document_ref.is_some() {
                fix.document_ref = item.document_ref.clone();
            }
        }
    }

    sort_and_renumber(&mut fixes);
    AdvisoryReport {
        overall: derive_overall(&fixes),
        fixes,
        interview_tips: report.interview_tips.clone(),
        corridor_warnings: report.corridor_warnings.clone(),
    }
}

/// Overall verdict as a function of the fixes alone.
pub fn derive_overall(fixes: &[RemediationItem]) -> ApplicationAssessment {
    if fixes.iter().any(|f| f.severity == Severity::Critical) {
        return ApplicationAssessment::SignificantIssues;
    }
    let outstanding = fixes.iter().any(|f| match f.severity {
        Severity::Warning => true,
        Severity::Info => !f.issue.ends_with("verified"),
        Severity::Critical => false,
    });
    if outstanding {
        ApplicationAssessment::AdditionalDocumentsNeeded
    } else {
        ApplicationAssessment::ApplicationProceeds
    }
}

/// Whether a compliance result applies to a fix.
///
/// Ids win when both sides carry one; otherwise a case-insensitive
/// substring match in either direction.
pub fn matches_compliance(fix: &RemediationItem, item: &ComplianceItem) -> bool {
    if let (Some(fix_id), Some(item_id)) = (&fix.requirement_id, &item.requirement_id) {
        return fix_id == item_id;
    }
    let fix_name = fix.requirement.trim().to_lowercase();
    let item_name = item.requirement.trim().to_lowercase();
    if fix_name.is_empty() || item_name.is_empty() {
        return false;
    }
    fix_name.contains(&item_name) || item_name.contains(&fix_name)
}

fn status_outcome(status: ComplianceStatus) -> Option<(Severity, &'static str)> {
    match status {
        ComplianceStatus::Met => Some((Severity::Info, "verified")),
        ComplianceStatus::Warning => Some((Severity::Warning, "needs attention")),
        ComplianceStatus::Critical => Some((Severity::Critical, "action required")),
        ComplianceStatus::NotChecked => None,
    }
}

/// Stable sort by severity rank, then dense 1-based priorities.
fn sort_and_renumber(fixes: &mut [RemediationItem]) {
    fixes.sort_by_key(|f| f.severity.rank());
    for (index, fix) in fixes.iter_mut().enumerate() {
        fix.priority = index as u32 + 1;
    }
}

fn corridor_warnings(checklist: &RequirementsChecklist) -> Vec<String> {
    let mut warnings = checklist.important_notes.clone();

    match (&checklist.processing_time, &checklist.apply_at) {
        (Some(time), Some(place)) => {
            warnings.push(format!("Processing takes {}. Apply at {}.", time, place))
        }
        (Some(time), None) => warnings.push(format!("Processing takes {}.", time)),
        (None, Some(place)) => warnings.push(format!("Apply at {}.", place)),
        (None, None) => {}
    }
    if let Some(window) = &checklist.application_window {
        warnings.push(format!("Application window: {}", window));
    }
    if !checklist.rejection_reasons.is_empty() {
        warnings.push(format!(
            "Common rejection reasons: {}",
            checklist.rejection_reasons.join("; ")
        ));
    }
    if let Some(threshold) = &checklist.financial_threshold {
        warnings.push(format!("Financial requirement: {}", threshold));
    }
    if let Some(registration) = &checklist.post_arrival_registration {
        warnings.push(format!("After arrival: {}", registration));
    }
    if let Some(transit) = &checklist.transit_warning {
        warnings.push(transit.clone());
    }
    warnings
}

fn interview_tips(checklist: &RequirementsChecklist) -> Vec<String> {
    let names: Vec<String> = checklist
        .requirements
        .iter()
        .map(|r| r.name.to_lowercase())
        .collect();
    let mentions = |keywords: &[&str]| {
        names
            .iter()
            .any(|name| keywords.iter().any(|k| name.contains(k)))
    };

    let mut tips = Vec::new();
    if mentions(FINANCIAL_KEYWORDS) {
        tips.push(
            "Bring originals of your bank statements and be ready to explain any large recent deposits."
                .to_string(),
        );
        tips.push(
            "Know your total trip budget and how each day of the stay will be paid for.".to_string(),
        );
    }
    if mentions(ACCOMMODATION_KEYWORDS) {
        tips.push(
            "Carry your accommodation bookings and be able to give the address where you will stay."
                .to_string(),
        );
    }
    if mentions(BUSINESS_KEYWORDS) {
        tips.push(
            "Be prepared to describe your role, your employer and the purpose of any meetings."
                .to_string(),
        );
        tips.push(
            "Bring a letter from your employer confirming approved leave and your return date."
                .to_string(),
        );
    }
    tips.truncate(MAX_INTERVIEW_TIPS);
    tips
}
