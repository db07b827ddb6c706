use crate::llm::client::LLMClient;
use crate::llm::structured::generate_structured;
use crate::research::prompts::{planner_instructions, planner_prompt};
use crate::research::types::SearchPlan;
use crate::types::ResearchError;
use std::sync::Arc;

/// Turns a query into a bounded list of sub-queries.
pub struct SearchPlanner {
    llm: Arc<dyn LLMClient>,
    max_searches: usize,
}

impl SearchPlanner {
    pub fn new(llm: Arc<dyn LLMClient>, max_searches: usize) -> Self {
        Self { llm, max_searches }
    }

    /// Ask the model for a plan and check it.
    ///
    /// Any failure (transport, malformed output, empty plan, blank query
    /// items) comes back as [`ResearchError::Planning`].
    pub async fn plan(&self, query: &str) -> Result<SearchPlan, ResearchError> {
        let plan: SearchPlan = generate_structured(
            self.llm.as_ref(),
            &planner_instructions(self.max_searches),
            &planner_prompt(query),
        )
        .await
        .map_err(|e| ResearchError::Planning(e.to_string()))?;

        check_plan(plan, self.max_searches)
    }
}

/// Validate a plan and cut it to `max_searches` items, keeping plan order.
pub fn check_plan(mut plan: SearchPlan, max_searches: usize) -> Result<SearchPlan, ResearchError> {
    if plan.is_empty() {
        return Err(ResearchError::Planning(
            "Planner returned no searches".to_string(),
        ));
    }

    if let Some(pos) = plan.searches.iter().position(|s| s.query.trim().is_empty()) {
        return Err(ResearchError::Planning(format!(
            "Planned search {} has an empty query",
            pos + 1
        )));
    }

    if plan.len() > max_searches {
        tracing::debug!(
            planned = plan.len(),
            kept = max_searches,
            "Truncating search plan"
        );
        plan.searches.truncate(max_searches);
    }

    for item in &mut plan.searches {
        item.query = item.query.trim().to_string();
    }

    Ok(plan)
}
