use crate::llm::client::LLMClient;
use crate::research::aggregator::aggregate;
use crate::research::events::{PipelineState, ProgressEvent, Stage};
use crate::research::executor::SearchExecutor;
use crate::research::planner::SearchPlanner;
use crate::research::types::ResearchOutput;
use crate::research::writer::ReportWriter;
use crate::tools::registry::ToolRegistry;
use crate::types::ResearchError;
use crate::utils::toml_config::{ResearchConfig, SearchMode};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Live progress feed of one run. Finite, lazy and not restartable.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Knobs of one run, taken from the `[research]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchSettings {
    pub searches_per_query: usize,
    pub results_per_search: usize,
    pub content_budget: usize,
    pub search_timeout: Duration,
    pub search_mode: SearchMode,
    pub site_filter: Option<String>,
    pub max_tool_iterations: usize,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self::from(&ResearchConfig::default())
    }
}

impl From<&ResearchConfig> for ResearchSettings {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            searches_per_query: config.searches_per_query,
            results_per_search: config.results_per_search,
            content_budget: config.content_budget,
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            search_mode: config.search_mode,
            site_filter: config.site_filter.clone(),
            max_tool_iterations: config.max_tool_iterations,
        }
    }
}

/// Runs plan, search, aggregate and write for one query at a time.
///
/// A pipeline holds no per-run state, so one instance can serve many runs
/// concurrently; each `run` call gets its own stream and its own tasks.
#[derive(Clone)]
pub struct ResearchPipeline {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    settings: ResearchSettings,
}

impl ResearchPipeline {
    pub fn new(llm: Arc<dyn LLMClient>, tools: Arc<ToolRegistry>, settings: ResearchSettings) -> Self {
        Self {
            llm,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Start a run and return its progress feed.
    ///
    /// Nothing happens until the stream is polled. The last item is always
    /// a terminal event (`ReportReady`, `SearchesExhausted` or
    /// `StageFailed`). Dropping the stream cancels the run, including any
    /// searches still in flight.
    pub fn run(&self, query: impl Into<String>) -> ProgressStream {
        let query = query.into();
        let run_id = new_run_id();
        let span = tracing::info_span!("research", run_id = %run_id);

        let planner = SearchPlanner::new(self.llm.clone(), self.settings.searches_per_query);
        let executor = SearchExecutor::new(self.llm.clone(), self.tools.clone(), self.settings.clone());
        let writer = ReportWriter::new(self.llm.clone(), self.settings.content_budget);

        Box::pin(async_stream::stream! {
            let mut state = PipelineState::Init;
            tracing::info!(parent: &span, query = %query, "Starting research");
            yield ProgressEvent::Started {
                run_id: run_id.clone(),
                query: query.clone(),
            };

            state.advance(PipelineState::Planning);
            let plan = match planner.plan(&query).instrument(span.clone()).await {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::warn!(parent: &span, error = %e, "Planning failed");
                    state.fail(Stage::Planning.to_string(), e.to_string());
                    yield ProgressEvent::StageFailed {
                        stage: Stage::Planning,
                        cause: e.to_string(),
                    };
                    return;
                }
            };
            tracing::info!(parent: &span, searches = plan.len(), "Searches planned");
            yield ProgressEvent::PlanReady {
                count: plan.len(),
                queries: plan.queries(),
            };

            state.advance(PipelineState::Searching);
            let total = plan.len();
            let mut outcomes = Vec::with_capacity(total);
            let mut settlements = executor.execute(plan).boxed();

            while let Some(settlement) = settlements.next().instrument(span.clone()).await {
                match settlement.result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => {
                        tracing::warn!(
                            parent: &span,
                            query = %settlement.item.query,
                            cause = %e,
                            "Search failed"
                        );
                        yield ProgressEvent::SearchFailed {
                            query_text: settlement.item.query.clone(),
                            cause: e.to_string(),
                        };
                    }
                }
                yield ProgressEvent::SearchProgress {
                    completed: settlement.completed,
                    total: settlement.total,
                };
            }
            drop(settlements);

            if outcomes.is_empty() {
                let cause = format!("all {} searches failed", total);
                tracing::warn!(parent: &span, %cause, "No search succeeded");
                state.fail("SEARCHING", cause.clone());
                yield ProgressEvent::SearchesExhausted { cause };
                return;
            }

            state.advance(PipelineState::Aggregating);
            let findings = aggregate(outcomes);

            state.advance(PipelineState::Writing);
            tracing::info!(
                parent: &span,
                findings = findings.contents.len(),
                sources = findings.sources.len(),
                "Writing report"
            );
            yield ProgressEvent::WritingReport {
                findings: findings.contents.len(),
                sources: findings.sources.len(),
            };

            match writer.write(&query, &findings).instrument(span.clone()).await {
                Ok(report) => {
                    state.advance(PipelineState::Done);
                    tracing::info!(parent: &span, "Report ready");
                    yield ProgressEvent::ReportReady {
                        report,
                        sources: findings.sources,
                    };
                }
                Err(e) => {
                    tracing::warn!(parent: &span, error = %e, "Writing failed");
                    state.fail(Stage::Writing.to_string(), e.to_string());
                    yield ProgressEvent::StageFailed {
                        stage: Stage::Writing,
                        cause: e.to_string(),
                    };
                }
            }
        })
    }

    /// Run to the terminal event and return the report.
    pub async fn run_to_completion(&self, query: &str) -> Result<ResearchOutput, ResearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }

        let mut events = self.run(query);
        let mut run_id = String::new();

        while let Some(event) = events.next().await {
            match event {
                ProgressEvent::Started { run_id: id, .. } => run_id = id,
                ProgressEvent::ReportReady { report, sources } => {
                    return Ok(ResearchOutput {
                        run_id,
                        report,
                        sources,
                    });
                }
                ProgressEvent::SearchesExhausted { cause } => {
                    return Err(ResearchError::SearchesExhausted(cause));
                }
                ProgressEvent::StageFailed {
                    stage: Stage::Planning,
                    cause,
                } => return Err(ResearchError::Planning(cause)),
                ProgressEvent::StageFailed {
                    stage: Stage::Writing,
                    cause,
                } => return Err(ResearchError::Writing(cause)),
                _ => {}
            }
        }

        Err(ResearchError::Writing(
            "progress stream ended without a terminal event".to_string(),
        ))
    }
}

/// Short run identifier: the first 8 hex digits of a v4 UUID.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}
