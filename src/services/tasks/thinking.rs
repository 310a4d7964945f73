//! Thinking Tracker
//!
//! Turns a stream of backend thinking deltas into throttled `thinking`
//! excerpts and `thinking_depth` counters.

use visa_advisor_core::events::ThinkingDepthEvent;
use visa_advisor_core::{AdvisorEvent, AgentKind};

/// Characters of reasoning shown per excerpt
pub const EXCERPT_CHARS: usize = 240;

/// New characters required between excerpts
pub const EXCERPT_INTERVAL_CHARS: usize = 400;

/// Rough characters-per-token ratio used for the depth counter
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone)]
pub struct ThinkingTracker {
    agent: AgentKind,
    budget: u32,
    summary: String,
    tail: String,
    tail_chars: usize,
    total_chars: usize,
    reported_chars: usize,
}

impl ThinkingTracker {
    pub fn new(agent: AgentKind, budget: u32, summary: impl Into<String>) -> Self {
        Self {
            agent,
            budget,
            summary: summary.into(),
            tail: String::new(),
            tail_chars: 0,
            total_chars: 0,
            reported_chars: 0,
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// Estimated tokens of reasoning seen so far
    pub fn tokens(&self) -> u32 {
        u32::try_from(self.total_chars / CHARS_PER_TOKEN).unwrap_or(u32::MAX)
    }

    /// Record a delta; returns events when enough new text accumulated.
    pub fn push(&mut self, delta: &str) -> Vec<AdvisorEvent> {
        let count = delta.chars().count();
        if count == 0 {
            return Vec::new();
        }
        self.tail.push_str(delta);
        self.tail_chars += count;
        self.total_chars += count;

        if self.tail_chars > EXCERPT_CHARS * 2 {
            self.tail = last_chars(&self.tail, self.tail_chars, EXCERPT_CHARS);
            self.tail_chars = EXCERPT_CHARS;
        }

        if self.total_chars - self.reported_chars >= EXCERPT_INTERVAL_CHARS {
            self.report()
        } else {
            Vec::new()
        }
    }

    /// Report whatever is unreported, e.g. when a thinking block ends.
    pub fn flush(&mut self) -> Vec<AdvisorEvent> {
        if self.total_chars > self.reported_chars {
            self.report()
        } else {
            Vec::new()
        }
    }

    fn report(&mut self) -> Vec<AdvisorEvent> {
        self.reported_chars = self.total_chars;
        let excerpt = last_chars(&self.tail, self.tail_chars, EXCERPT_CHARS);
        vec![
            AdvisorEvent::thinking(self.agent, excerpt.trim(), self.summary.clone()),
            AdvisorEvent::ThinkingDepth(ThinkingDepthEvent {
                agent: self.agent,
                tokens: self.tokens(),
                budget: self.budget,
            }),
        ]
    }
}

fn last_chars(text: &str, char_count: usize, keep: usize) -> String {
    text.chars().skip(char_count.saturating_sub(keep)).collect()
}
