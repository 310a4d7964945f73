//! Fan-in Orchestrator
//!
//! Owns the outward event stream of a request. Task events are forwarded as
//! they arrive; concurrent tasks are merged with `stream::select`, so order
//! is preserved within a task and follows arrival across tasks. The stream
//! always ends with exactly one `complete` or `error` event, emitted here
//! and nowhere else.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use visa_advisor_core::{AdvisorEvent, AgentKind, AnalysisAggregate, CompletionResult};
use visa_advisor_llm::LlmProvider;

use crate::models::request::{AdvisoryRequest, AnalyzeRequest, TravelDetails};
use crate::models::settings::{AppConfig, OrchestratorConfig};
use crate::services::advisory::AdvisoryTask;
use crate::services::documents::{DocumentAnalyzerTask, DocumentReaderTask};
use crate::services::research::{CachedCorridorSource, GenerativeSource, ResearchTask};
use crate::services::tasks::{join_result, spawn_task, TaskError, TaskHandle, TaskResult};
use crate::services::translation::Translator;
use crate::storage::CorridorStore;

// ── Stage Failures ─────────────────────────────────────────────────────

/// Why a pipeline ended without a result; becomes the `error` event.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub message: String,
    pub code: String,
}

impl StageFailure {
    fn from_task(agent: AgentKind, err: &TaskError) -> Self {
        Self {
            message: format!("{} failed: {}", stage_label(agent), err),
            code: err.code().to_string(),
        }
    }

    fn cancelled() -> Self {
        Self::from_task(AgentKind::Research, &TaskError::Cancelled)
    }

    /// Combine failures of concurrent stages into one, naming each stage.
    fn combine(failures: Vec<StageFailure>) -> Option<Self> {
        let code = failures.first()?.code.clone();
        let message = failures
            .into_iter()
            .map(|f| f.message)
            .collect::<Vec<_>>()
            .join("; ");
        Some(Self { message, code })
    }
}

fn stage_label(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::Research => "Requirements research",
        AgentKind::DocumentReader => "Document reading",
        AgentKind::DocumentAnalyzer => "Document analysis",
        AgentKind::Advisory => "Advisory synthesis",
    }
}

type PipelineResult = Result<CompletionResult, StageFailure>;

// ── Forwarding ─────────────────────────────────────────────────────────

/// Forward one task's events, then join its result.
pub async fn forward_single<T>(
    handle: TaskHandle<T>,
    out: &mpsc::Sender<AdvisorEvent>,
) -> TaskResult<T> {
    let (events, result) = handle.into_parts();
    let mut events = ReceiverStream::new(events);
    while let Some(event) = events.next().await {
        if out.send(event).await.is_err() {
            break;
        }
    }
    drop(events);
    join_result(result).await
}

/// Forward the events of two concurrent tasks as they arrive, then join
/// both results once both event channels have closed.
pub async fn fan_in<A, B>(
    a: TaskHandle<A>,
    b: TaskHandle<B>,
    out: &mpsc::Sender<AdvisorEvent>,
) -> (TaskResult<A>, TaskResult<B>) {
    let (a_events, a_result) = a.into_parts();
    let (b_events, b_result) = b.into_parts();

    let mut merged = stream::select(ReceiverStream::new(a_events), ReceiverStream::new(b_events));
    while let Some(event) = merged.next().await {
        if out.send(event).await.is_err() {
            break;
        }
    }
    drop(merged);

    tokio::join!(join_result(a_result), join_result(b_result))
}

// ── Orchestrator ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    request_timeout: Duration,
    thinking_budget: u32,
    provider: Option<Arc<dyn LlmProvider>>,
    corridors: Arc<CorridorStore>,
    translator: Arc<dyn Translator>,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        corridors: Arc<CorridorStore>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config: config.orchestrator.clone(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
            thinking_budget: if config.backend.enable_thinking {
                config.backend.thinking_budget
            } else {
                0
            },
            provider,
            corridors,
            translator,
        }
    }

    /// Override the outer request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.provider.is_some()
    }

    fn capacity(&self) -> usize {
        self.config.event_channel_capacity.max(1)
    }

    /// Research a corridor; completes with the checklist.
    pub fn run_research(&self, travel: TravelDetails) -> ReceiverStream<AdvisorEvent> {
        let this = self.clone();
        self.drive("research", move |out, cancel| async move {
            let handle = spawn_task(this.research_task(travel), this.capacity(), cancel);
            forward_single(handle, &out)
                .await
                .map(CompletionResult::Checklist)
                .map_err(|e| StageFailure::from_task(AgentKind::Research, &e))
        })
    }

    /// Research and document reading side by side, then analysis of the
    /// documents against the researched checklist.
    pub fn run_analysis(&self, request: AnalyzeRequest) -> ReceiverStream<AdvisorEvent> {
        let this = self.clone();
        self.drive("analysis", move |out, cancel| async move {
            this.analysis_pipeline(request, out, cancel).await
        })
    }

    /// Synthesize the advisory report from a checklist and compliance results.
    pub fn run_advisory(&self, request: AdvisoryRequest) -> ReceiverStream<AdvisorEvent> {
        let this = self.clone();
        self.drive("advisory", move |out, cancel| async move {
            let task = AdvisoryTask::new(request.checklist, request.compliance)
                .with_prior_fixes(request.prior_fixes)
                .with_travel(request.travel_details)
                .with_provider(this.provider.clone())
                .with_limits(this.capacity(), this.thinking_budget);
            let handle = spawn_task(task, this.capacity(), cancel);
            forward_single(handle, &out)
                .await
                .map(CompletionResult::Advisory)
                .map_err(|e| StageFailure::from_task(AgentKind::Advisory, &e))
        })
    }

    fn research_task(&self, travel: TravelDetails) -> ResearchTask {
        let cached = Arc::new(CachedCorridorSource::new(
            self.corridors.clone(),
            Duration::from_millis(self.config.pacing_ms),
        ));
        let generative = Arc::new(GenerativeSource::new(
            self.provider.clone(),
            self.capacity(),
            self.thinking_budget,
        ));
        let task = ResearchTask::new(travel);
        if self.config.prefer_cached {
            task.with_source(cached).with_source(generative)
        } else {
            task.with_source(generative).with_source(cached)
        }
    }

    async fn analysis_pipeline(
        &self,
        request: AnalyzeRequest,
        out: mpsc::Sender<AdvisorEvent>,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let AnalyzeRequest {
            travel_details: travel,
            documents,
            prior_extractions,
        } = request;

        let research = spawn_task(self.research_task(travel.clone()), self.capacity(), cancel.clone());

        if documents.is_empty() && prior_extractions.is_empty() {
            tracing::info!("[Orchestrator] no documents supplied; research only");
            let checklist = forward_single(research, &out)
                .await
                .map_err(|e| StageFailure::from_task(AgentKind::Research, &e))?;
            return Ok(CompletionResult::Analysis(AnalysisAggregate {
                requirements: checklist,
                extractions: Vec::new(),
                analysis: None,
            }));
        }

        let reader = DocumentReaderTask::new(
            travel.clone(),
            documents,
            self.provider.clone(),
            self.translator.clone(),
        )
        .with_prior_extractions(prior_extractions)
        .with_limits(self.capacity(), self.thinking_budget);
        let reader = spawn_task(reader, self.capacity(), cancel.clone());

        let (checklist, reading) = fan_in(research, reader, &out).await;

        let mut failures = Vec::new();
        if let Err(e) = &checklist {
            failures.push(StageFailure::from_task(AgentKind::Research, e));
        }
        if let Err(e) = &reading {
            failures.push(StageFailure::from_task(AgentKind::DocumentReader, e));
        }
        if let Some(failure) = StageFailure::combine(failures) {
            tracing::warn!("[Orchestrator] fan-in failed: {}", failure.message);
            return Err(failure);
        }
        let (Ok(checklist), Ok(reading)) = (checklist, reading) else {
            return Err(StageFailure::cancelled());
        };

        if out.is_closed() || cancel.is_cancelled() {
            return Err(StageFailure::cancelled());
        }

        let analyzer = DocumentAnalyzerTask::new(
            travel,
            checklist.clone(),
            reading.extractions.clone(),
            self.provider.clone(),
        )
        .with_limits(self.capacity(), self.thinking_budget);
        let analyzer = spawn_task(analyzer, self.capacity(), cancel);
        let mut analysis = forward_single(analyzer, &out)
            .await
            .map_err(|e| StageFailure::from_task(AgentKind::DocumentAnalyzer, &e))?;

        let mut findings = reading.findings;
        findings.append(&mut analysis.findings);
        analysis.findings = findings;

        Ok(CompletionResult::Analysis(AnalysisAggregate {
            requirements: checklist,
            extractions: reading.extractions,
            analysis: Some(analysis),
        }))
    }

    /// Run a pipeline behind the request timeout and append the single
    /// terminal event.
    fn drive<F, Fut>(&self, name: &'static str, pipeline: F) -> ReceiverStream<AdvisorEvent>
    where
        F: FnOnce(mpsc::Sender<AdvisorEvent>, CancellationToken) -> Fut,
        Fut: Future<Output = PipelineResult> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.capacity());
        let cancel = CancellationToken::new();
        let work = pipeline(tx.clone(), cancel.clone());
        let timeout = self.request_timeout;
        let request_id = Uuid::new_v4();

        tokio::spawn(async move {
            tracing::info!("[Orchestrator] {} request {} started", name, request_id);
            let outcome = tokio::select! {
                outcome = tokio::time::timeout(timeout, work) => Some(outcome),
                _ = tx.closed() => None,
            };
            cancel.cancel();

            let terminal = match outcome {
                None => {
                    tracing::info!("[Orchestrator] {} request {}: client went away", name, request_id);
                    return;
                }
                Some(Ok(Ok(result))) => {
                    tracing::info!("[Orchestrator] {} request {} complete", name, request_id);
                    AdvisorEvent::complete(result)
                }
                Some(Ok(Err(failure))) => {
                    tracing::warn!(
                        "[Orchestrator] {} request {} failed: {}",
                        name,
                        request_id,
                        failure.message
                    );
                    AdvisorEvent::error_with_code(failure.message, failure.code)
                }
                Some(Err(_)) => {
                    tracing::warn!(
                        "[Orchestrator] {} request {} timed out after {:?}",
                        name,
                        request_id,
                        timeout
                    );
                    AdvisorEvent::error_with_code(
                        format!("Request timed out after {:?}", timeout),
                        "timeout",
                    )
                }
            };
            let _ = tx.send(terminal).await;
        });

        ReceiverStream::new(rx)
    }
}
