//! Search tool implementation using daedra
//!
//! This module provides web search capabilities via the daedra crate,
//! which uses DuckDuckGo as the search backend. It is the lookup side of
//! every research run: the model calls it in `tool` search mode, and the
//! executor calls it directly in `prefetch` mode.

use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Upper bound for the `num_results` argument a model may request.
const MAX_RESULTS_CAP: usize = 20;

/// Snippets are clipped so several result pages fit in one prompt.
const SNIPPET_CHARS: usize = 200;

/// Web search tool powered by daedra
#[derive(Debug, Clone)]
pub struct SearchTool {
    /// Restrict results to one site, e.g. `reddit.com`
    site_filter: Option<String>,
    /// Result count used when the caller does not ask for one
    default_results: usize,
}

impl SearchTool {
    pub fn new() -> Self {
        Self {
            site_filter: None,
            default_results: 5,
        }
    }

    /// Scope every query to `site`.
    pub fn with_site_filter(mut self, site: impl Into<String>) -> Self {
        let site = site.into();
        self.site_filter = (!site.trim().is_empty()).then(|| site.trim().to_string());
        self
    }

    pub fn with_default_results(mut self, n: usize) -> Self {
        self.default_results = n.clamp(1, MAX_RESULTS_CAP);
        self
    }

    /// Apply the site filter unless the query already carries one.
    pub fn scoped_query(&self, query: &str) -> String {
        match &self.site_filter {
            Some(site) if !query.contains("site:") => format!("site:{} {}", site, query),
            _ => query.to_string(),
        }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(max_chars).collect();
        clipped.push_str("...");
        clipped
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information using DuckDuckGo. Returns ranked results with title, url and a short description."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": format!("Maximum number of results to return (default: {})", self.default_results),
                    "default": self.default_results
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::InvalidInput("Missing 'query' parameter".to_string()))?;

        let num_results = args
            .get("num_results")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).clamp(1, MAX_RESULTS_CAP))
            .unwrap_or(self.default_results);

        let scoped = self.scoped_query(query);
        tracing::debug!(query = %scoped, num_results, "web_search");

        let search_args = daedra::SearchArgs {
            query: scoped.clone(),
            options: Some(daedra::SearchOptions {
                num_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Tool(format!("Search failed: {}", e)))?;

        let results: Vec<Value> = response
            .data
            .iter()
            .take(num_results)
            .map(|r| {
                json!({
                    "title": r.title,
                    "url": r.url,
                    "description": clip(&r.description, SNIPPET_CHARS)
                })
            })
            .collect();

        Ok(json!({
            "query": scoped,
            "results": results,
            "count": results.len()
        }))
    }
}
