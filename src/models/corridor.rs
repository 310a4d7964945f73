//! Corridor Models
//!
//! Precomputed requirement data for one origin → destination pairing.

use serde::{Deserialize, Serialize};
use visa_advisor_core::RequirementsChecklist;

/// Stored research result for a corridor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorRecord {
    /// Reasoning steps replayed as `thinking` events on the cached path
    #[serde(default)]
    pub narration: Vec<String>,
    pub checklist: RequirementsChecklist,
}

/// Normalize an origin/destination pair into a store key.
///
/// `"United Kingdom"` + `"Germany"` → `"united_kingdom-germany"`.
pub fn corridor_key(origin: &str, destination: &str) -> String {
    format!("{}-{}", normalize_part(origin), normalize_part(destination))
}

fn normalize_part(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
