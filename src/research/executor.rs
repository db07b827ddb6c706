//! Concurrent search stage.
//!
//! All plan items are spawned at once into a `JoinSet` owned by the
//! settlement stream. Settlements come out in completion order; dropping the
//! stream drops the set, which aborts whatever is still running.

use crate::llm::client::LLMClient;
use crate::llm::coordinator::{FinishReason, ToolCallingConfig, ToolCoordinator};
use crate::llm::structured::{
    generate_structured, parse_structured, schema_of, with_schema_instruction,
};
use crate::research::pipeline::ResearchSettings;
use crate::research::prompts::{prefetched_search_prompt, search_instructions, search_prompt};
use crate::research::types::{SearchOutcome, SearchPlan, SearchPlanItem, SearchSummary};
use crate::tools::registry::ToolRegistry;
use crate::types::ResearchError;
use crate::utils::toml_config::SearchMode;
use futures::{FutureExt, Stream};
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;

/// One finished search task, as seen by the stage's single consumer.
#[derive(Debug, Clone)]
pub struct SearchSettlement {
    pub item: SearchPlanItem,
    /// How many tasks have settled, this one included
    pub completed: usize,
    pub total: usize,
    pub result: Result<SearchOutcome, ResearchError>,
}

#[derive(Clone)]
pub struct SearchExecutor {
    llm: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    settings: ResearchSettings,
}

impl SearchExecutor {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            settings,
        }
    }

    /// Run every plan item concurrently and yield one settlement per item.
    ///
    /// The stream is lazy: nothing is spawned until it is first polled.
    /// Every task races one deadline shared by the whole stage, so the
    /// stream always ends after exactly `plan.len()` settlements.
    pub fn execute(&self, plan: SearchPlan) -> impl Stream<Item = SearchSettlement> + Send + 'static {
        debug_assert!(!plan.is_empty(), "search stage started with an empty plan");

        let executor = self.clone();
        async_stream::stream! {
            let total = plan.len();
            // A timeout too large to represent means no deadline
            let deadline = Instant::now().checked_add(executor.settings.search_timeout);
            let mut tasks = JoinSet::new();

            for (index, item) in plan.searches.iter().cloned().enumerate() {
                let executor = executor.clone();
                tasks.spawn(async move {
                    let search = AssertUnwindSafe(executor.search_one(&item)).catch_unwind();
                    let settled = match deadline {
                        Some(deadline) => timeout_at(deadline, search).await,
                        None => Ok(search.await),
                    };
                    let result = match settled {
                        Ok(Ok(result)) => result,
                        Ok(Err(panic)) => Err(ResearchError::SearchTask(format!(
                            "search task panicked: {}",
                            panic_message(panic.as_ref())
                        ))),
                        Err(_) => Err(ResearchError::SearchTask(
                            "search stage timed out".to_string(),
                        )),
                    };
                    (index, result)
                }.in_current_span());
            }

            let mut settled = vec![false; total];
            let mut completed = 0;

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => {
                        settled[index] = true;
                        completed += 1;
                        yield SearchSettlement {
                            item: plan.searches[index].clone(),
                            completed,
                            total,
                            result,
                        };
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Search task could not be joined");
                    }
                }
            }

            // Tasks lost to a join error still settle, as failures
            for index in (0..total).filter(|i| !settled[*i]) {
                completed += 1;
                yield SearchSettlement {
                    item: plan.searches[index].clone(),
                    completed,
                    total,
                    result: Err(ResearchError::SearchTask("search task was lost".to_string())),
                };
            }
        }
    }

    async fn search_one(&self, item: &SearchPlanItem) -> Result<SearchOutcome, ResearchError> {
        let summary = match self.settings.search_mode {
            SearchMode::Tool => self.search_with_tools(item).await?,
            SearchMode::Prefetch => self.search_prefetched(item).await?,
        };

        if summary.summary.trim().is_empty() {
            return Err(ResearchError::SearchTask(
                "model returned an empty summary".to_string(),
            ));
        }

        Ok(SearchOutcome::from(summary))
    }

    /// Let the model drive `web_search` and finish with a `SearchSummary`.
    async fn search_with_tools(&self, item: &SearchPlanItem) -> Result<SearchSummary, ResearchError> {
        let system = with_schema_instruction(
            &search_instructions(self.settings.site_filter.as_deref()),
            &schema_of::<SearchSummary>(),
        );

        let coordinator = ToolCoordinator::new(
            self.llm.clone(),
            self.tools.clone(),
            ToolCallingConfig {
                max_iterations: self.settings.max_tool_iterations,
                ..Default::default()
            },
        );

        let result = coordinator
            .execute(Some(&system), &search_prompt(item))
            .await
            .map_err(|e| ResearchError::SearchTask(e.to_string()))?;

        if result.finish_reason != FinishReason::Stop {
            return Err(ResearchError::SearchTask(format!(
                "search ended without an answer ({})",
                result.finish_reason
            )));
        }

        parse_structured(&result.content).map_err(|e| ResearchError::SearchTask(e.to_string()))
    }

    /// Run `web_search` directly and hand the results to the model.
    async fn search_prefetched(
        &self,
        item: &SearchPlanItem,
    ) -> Result<SearchSummary, ResearchError> {
        let results = self
            .tools
            .execute(
                "web_search",
                json!({
                    "query": item.query,
                    "num_results": self.settings.results_per_search
                }),
            )
            .await
            .map_err(|e| ResearchError::SearchTask(e.to_string()))?;

        generate_structured(
            self.llm.as_ref(),
            &search_instructions(self.settings.site_filter.as_deref()),
            &prefetched_search_prompt(item, &results),
        )
        .await
        .map_err(|e| ResearchError::SearchTask(e.to_string()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
