//! Services
//!
//! Reasoning tasks, the fan-in orchestrator and their collaborators.
//! The HTTP layer only talks to the orchestrator and the rate limiter.

pub mod advisory;
pub mod documents;
pub mod orchestrator;
pub mod prompts;
pub mod rate_limit;
pub mod research;
pub mod scripted;
pub mod tasks;
pub mod translation;

pub use orchestrator::{fan_in, forward_single, Orchestrator};
pub use rate_limit::ClientRateLimiter;
pub use translation::{PassthroughTranslator, Translator};
