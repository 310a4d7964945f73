//! Visa Advisor Core
//!
//! Protocol, domain model and pure algorithms for the Visa Advisor
//! workspace. Nothing in here performs I/O; the backend and application
//! crates build on top of it.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `models` - Requirements, compliance, remediation and report types
//! - `events` - Client-facing progress events (`AdvisorEvent`)
//! - `wire` - Event framing and the incremental `FrameDecoder`
//! - `extractor` - Partial-output extraction from still-growing JSON text
//! - `advisory` - Report initialization and incremental merge
//! - `streaming` - Backend stream event types and adapter trait

pub mod advisory;
pub mod error;
pub mod events;
pub mod extractor;
pub mod models;
pub mod streaming;
pub mod wire;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Domain Model ───────────────────────────────────────────────────────
pub use models::{
    AdvisoryReport, AnalysisAggregate, AnalysisResult, ApplicationAssessment, ComplianceItem,
    ComplianceStatus, Confidence, DocumentExtraction, Finding, RemediationItem, RequirementItem,
    RequirementsChecklist, Severity,
};

// ── Event Protocol ─────────────────────────────────────────────────────
pub use events::{AdvisorEvent, AgentKind, CompletionResult, SearchPhase};
pub use wire::{encode_frame, Frame, FrameDecoder, DONE_FRAME};

// ── Extraction ─────────────────────────────────────────────────────────
pub use extractor::{extract_json_object, IncrementalExtractor, PartialArrayExtractor};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
