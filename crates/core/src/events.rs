//! Advisor Event Protocol
//!
//! The closed set of progress events pushed to clients while a request is
//! being worked on. Every event serializes with a `type` tag; payload
//! fields are camelCase.
//!
//! A well-formed stream contains at most one terminal event (`complete` or
//! `error`) and it is always the last one.

use serde::{Deserialize, Serialize};

use crate::models::{
    AdvisoryReport, AnalysisAggregate, ApplicationAssessment, ComplianceItem, Finding,
    RemediationItem, RequirementItem, RequirementsChecklist,
};

/// Progress event sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvisorEvent {
    /// A reasoning task started or finished
    Orchestrator(OrchestratorEvent),

    /// Research lookup progress
    SearchStatus(SearchStatusEvent),

    /// One requirement surfaced by research
    Requirement(RequirementItem),

    /// Free-text reasoning excerpt
    Thinking(ThinkingEvent),

    /// Reasoning token counters
    ThinkingDepth(ThinkingDepthEvent),

    /// A document finished reading
    DocumentRead(DocumentReadEvent),

    /// Language-related observation on a document
    CrossLingual(Finding),

    /// Consistency or authenticity observation on a document
    Forensic(Finding),

    /// One verified requirement
    Compliance(ComplianceItem),

    /// Prose assessment of the application
    Narrative(NarrativeEvent),

    /// A new or revised remediation fix
    Recommendation(RemediationItem),

    /// Current overall verdict
    Assessment(AssessmentEvent),

    /// Final aggregated result (terminal)
    Complete(CompleteEvent),

    /// Unrecoverable failure (terminal)
    Error(ErrorEvent),
}

impl AdvisorEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdvisorEvent::Complete(_) | AdvisorEvent::Error(_))
    }

    /// The `type` tag this event serializes with.
    pub fn type_name(&self) -> &'static str {
        match self {
            AdvisorEvent::Orchestrator(_) => "orchestrator",
            AdvisorEvent::SearchStatus(_) => "search_status",
            AdvisorEvent::Requirement(_) => "requirement",
            AdvisorEvent::Thinking(_) => "thinking",
            AdvisorEvent::ThinkingDepth(_) => "thinking_depth",
            AdvisorEvent::DocumentRead(_) => "document_read",
            AdvisorEvent::CrossLingual(_) => "cross_lingual",
            AdvisorEvent::Forensic(_) => "forensic",
            AdvisorEvent::Compliance(_) => "compliance",
            AdvisorEvent::Narrative(_) => "narrative",
            AdvisorEvent::Recommendation(_) => "recommendation",
            AdvisorEvent::Assessment(_) => "assessment",
            AdvisorEvent::Complete(_) => "complete",
            AdvisorEvent::Error(_) => "error",
        }
    }

    pub fn agent_start(agent: AgentKind) -> Self {
        AdvisorEvent::Orchestrator(OrchestratorEvent {
            action: AgentAction::AgentStart,
            agent,
            message: None,
        })
    }

    pub fn agent_complete(agent: AgentKind) -> Self {
        AdvisorEvent::Orchestrator(OrchestratorEvent {
            action: AgentAction::AgentComplete,
            agent,
            message: None,
        })
    }

    pub fn search_status(phase: SearchPhase, message: impl Into<String>) -> Self {
        AdvisorEvent::SearchStatus(SearchStatusEvent {
            phase,
            message: message.into(),
            code: None,
        })
    }

    /// Status line carrying a machine-readable code for clients that branch
    /// on it instead of the message text.
    pub fn search_status_with_code(
        phase: SearchPhase,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        AdvisorEvent::SearchStatus(SearchStatusEvent {
            phase,
            message: message.into(),
            code: Some(code.into()),
        })
    }

    pub fn thinking(agent: AgentKind, excerpt: impl Into<String>, summary: impl Into<String>) -> Self {
        AdvisorEvent::Thinking(ThinkingEvent {
            agent,
            excerpt: excerpt.into(),
            summary: summary.into(),
        })
    }

    pub fn narrative(text: impl Into<String>) -> Self {
        AdvisorEvent::Narrative(NarrativeEvent { text: text.into() })
    }

    pub fn assessment(overall: ApplicationAssessment) -> Self {
        AdvisorEvent::Assessment(AssessmentEvent { overall })
    }

    pub fn complete(result: CompletionResult) -> Self {
        AdvisorEvent::Complete(CompleteEvent { result })
    }

    pub fn error(message: impl Into<String>) -> Self {
        AdvisorEvent::Error(ErrorEvent {
            message: message.into(),
            code: None,
        })
    }

    pub fn error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        AdvisorEvent::Error(ErrorEvent {
            message: message.into(),
            code: Some(code.into()),
        })
    }
}

/// Which reasoning task an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Research,
    DocumentReader,
    DocumentAnalyzer,
    Advisory,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Research => write!(f, "research"),
            AgentKind::DocumentReader => write!(f, "document_reader"),
            AgentKind::DocumentAnalyzer => write!(f, "document_analyzer"),
            AgentKind::Advisory => write!(f, "advisory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    AgentStart,
    AgentComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorEvent {
    pub action: AgentAction,
    pub agent: AgentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Research lookup phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Searching,
    CacheHit,
    Live,
    Fallback,
    Degraded,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatusEvent {
    pub phase: SearchPhase,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingEvent {
    pub agent: AgentKind,
    /// Most recent slice of reasoning text
    pub excerpt: String,
    /// Coarse label for what the agent is doing
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingDepthEvent {
    pub agent: AgentKind,
    pub tokens: u32,
    pub budget: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReadEvent {
    pub document_id: String,
    pub filename: String,
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeEvent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentEvent {
    pub overall: ApplicationAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEvent {
    pub result: CompletionResult,
}

/// Payload of the `complete` event, tagged by what produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CompletionResult {
    Checklist(RequirementsChecklist),
    Analysis(AnalysisAggregate),
    Advisory(AdvisoryReport),
    /// Test-mode playback
    Scripted(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
