//! Reasoning Tasks
//!
//! A reasoning task streams progress events while it works and resolves to
//! exactly one typed result. Each spawned task gets two channels:
//! a bounded event channel the caller drains, and a `JoinHandle` carrying
//! the result once the task returns.
//!
//! Tasks never emit `complete` or `error`; whoever owns the outward stream
//! turns the result (or the `TaskError`) into the terminal event.

pub mod backend;
pub mod thinking;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use visa_advisor_core::{AdvisorEvent, AgentKind};
use visa_advisor_llm::LlmError;

pub use backend::BackendStream;
pub use thinking::ThinkingTracker;

// ── Error Types ────────────────────────────────────────────────────────

/// Why a reasoning task produced no result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The reasoning backend failed
    #[error("Reasoning backend error: {0}")]
    Backend(#[from] LlmError),

    /// Backend output could not be turned into a result
    #[error("Could not parse backend output: {0}")]
    Parse(String),

    /// The task needs a backend and none is configured
    #[error("No reasoning backend configured")]
    NoBackend,

    /// Required input data is missing
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// The request was abandoned
    #[error("Task cancelled")]
    Cancelled,

    /// The task panicked
    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// Result type alias for reasoning tasks
pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Machine-readable code carried on the `error` event
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::Backend(_) => "backend_error",
            TaskError::Parse(_) => "parse_error",
            TaskError::NoBackend => "no_backend",
            TaskError::Unavailable(_) => "unavailable",
            TaskError::Cancelled => "cancelled",
            TaskError::Panicked(_) => "internal",
        }
    }
}

impl From<JoinError> for TaskError {
    fn from(err: JoinError) -> Self {
        if err.is_cancelled() {
            TaskError::Cancelled
        } else {
            TaskError::Panicked(err.to_string())
        }
    }
}

// ── Event Emitter ──────────────────────────────────────────────────────

/// Sending half of a task's event channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    agent: AgentKind,
    tx: mpsc::Sender<AdvisorEvent>,
    cancel: CancellationToken,
}

impl EventEmitter {
    pub fn new(agent: AgentKind, tx: mpsc::Sender<AdvisorEvent>, cancel: CancellationToken) -> Self {
        Self { agent, tx, cancel }
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    /// Push one event. Returns `false` once nobody is listening any more;
    /// callers may keep working but should stop producing.
    pub async fn emit(&self, event: AdvisorEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// Push several events, stopping at the first failed send.
    pub async fn emit_all(&self, events: impl IntoIterator<Item = AdvisorEvent>) -> bool {
        for event in events {
            if !self.emit(event).await {
                return false;
            }
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Sleep for a pacing delay. Returns `false` if cancelled first.
    pub async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

// ── Task Trait ─────────────────────────────────────────────────────────

/// A unit of work that streams events and resolves to one result.
#[async_trait]
pub trait ReasoningTask: Send + Sized + 'static {
    type Output: Send + 'static;

    /// Which agent this task reports as
    fn agent(&self) -> AgentKind;

    /// Do the work, emitting progress through `emitter`.
    async fn run(self, emitter: EventEmitter) -> TaskResult<Self::Output>;
}

/// A running task: its event receiver plus its pending result.
#[derive(Debug)]
pub struct TaskHandle<T> {
    agent: AgentKind,
    events: mpsc::Receiver<AdvisorEvent>,
    result: JoinHandle<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    /// Next event, or `None` once the task has finished emitting.
    pub async fn next_event(&mut self) -> Option<AdvisorEvent> {
        self.events.recv().await
    }

    /// Split into the event receiver and the result handle.
    pub fn into_parts(self) -> (mpsc::Receiver<AdvisorEvent>, JoinHandle<TaskResult<T>>) {
        (self.events, self.result)
    }

    /// Wait for the result, discarding any events not yet drained.
    pub async fn join(self) -> TaskResult<T> {
        let (events, result) = self.into_parts();
        drop(events);
        join_result(result).await
    }

    pub fn abort(&self) {
        self.result.abort();
    }
}

/// Await a task's result handle, mapping join failures.
pub async fn join_result<T>(handle: JoinHandle<TaskResult<T>>) -> TaskResult<T> {
    handle.await?
}

/// Start a task on the runtime.
///
/// `agent_start` is emitted before the task body runs and `agent_complete`
/// after it returns successfully. `capacity` bounds the event channel, so a
/// slow consumer throttles the task.
pub fn spawn_task<T: ReasoningTask>(
    task: T,
    capacity: usize,
    cancel: CancellationToken,
) -> TaskHandle<T::Output> {
    let agent = task.agent();
    let (tx, events) = mpsc::channel(capacity.max(1));
    let emitter = EventEmitter::new(agent, tx, cancel);

    let result = tokio::spawn(async move {
        emitter.emit(AdvisorEvent::agent_start(agent)).await;
        tracing::info!("[Task] {} started", agent);

        let outcome = task.run(emitter.clone()).await;
        match &outcome {
            Ok(_) => {
                emitter.emit(AdvisorEvent::agent_complete(agent)).await;
                tracing::info!("[Task] {} completed", agent);
            }
            Err(e) => tracing::warn!("[Task] {} failed: {}", agent, e),
        }
        outcome
    });

    TaskHandle {
        agent,
        events,
        result,
    }
}
