//! Data passed between pipeline stages.
//!
//! Types the model produces derive `JsonSchema`; their doc comments end up
//! in the schema as field descriptions, so they are written for the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One planned web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchPlanItem {
    /// Your reasoning for why this search is important to the query.
    pub reason: String,
    /// The search term to use for the web search.
    pub query: String,
}

/// Ordered list of searches derived from the user's query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchPlan {
    /// A list of web searches to perform to best answer the query.
    pub searches: Vec<SearchPlanItem>,
}

impl SearchPlan {
    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }

    pub fn queries(&self) -> Vec<String> {
        self.searches.iter().map(|s| s.query.clone()).collect()
    }
}

/// A source cited by one search, numbered within that search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    /// 1-based position inside its outcome
    pub local_id: usize,
}

/// What a successful search contributes to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub content: String,
    pub sources: Vec<SourceRef>,
}

/// Source as reported by the model for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarySource {
    /// Title of the page or post.
    pub title: String,
    /// Full URL of the page or post.
    pub url: String,
}

/// Structured reply of a search task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchSummary {
    /// Concise summary of the results, 2-3 paragraphs and less than 300 words.
    pub summary: String,
    /// The pages the summary draws on, most relevant first.
    #[serde(default)]
    pub sources: Vec<SummarySource>,
}

impl From<SearchSummary> for SearchOutcome {
    fn from(summary: SearchSummary) -> Self {
        let sources = summary
            .sources
            .into_iter()
            .enumerate()
            .map(|(i, s)| SourceRef {
                title: s.title,
                url: s.url,
                local_id: i + 1,
            })
            .collect();

        SearchOutcome {
            content: summary.summary,
            sources,
        }
    }
}

/// A source under the run-wide numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GlobalSource {
    /// Contiguous from 1 across the whole run
    pub global_id: usize,
    pub title: String,
    pub url: String,
    /// Number the source had inside its own search
    pub local_id: usize,
}

/// Merged output of the search stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFindings {
    pub contents: Vec<String>,
    pub sources: Vec<GlobalSource>,
}

/// Final research report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct Report {
    /// A short 2-3 sentence summary of the findings.
    pub short_summary: String,
    /// The final report in markdown.
    pub markdown_report: String,
    /// Suggested topics to research further.
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// Result of a run that reached `ReportReady`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub run_id: String,
    pub report: Report,
    pub sources: Vec<GlobalSource>,
}
