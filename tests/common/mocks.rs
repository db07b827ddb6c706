//! Mock implementations for testing.
//!
//! This module provides a scripted LLM client and a fake `web_search` tool
//! that the pipeline and API tests share.
//!
//! The mock tells pipeline stages apart by their prompts: planner prompts
//! start with `Query:`, search prompts with `Search term:` and writer prompts
//! with `Original query:`.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use scribe::llm::{ConversationMessage, LLMClient, LLMResponse, MessageRole};
use scribe::tools::registry::{Tool, ToolRegistry};
use scribe::types::{AppError, Result, ToolCall, ToolDefinition};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How the mock answers one search term
#[derive(Clone, Debug)]
pub enum SearchScript {
    Summary {
        summary: String,
        sources: Vec<(String, String)>,
    },
    Fail(String),
    Panic,
}

#[derive(Clone, Debug)]
struct SearchEntry {
    script: SearchScript,
    delay: Duration,
}

/// Scripted LLM client.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new()
///     .with_plan(&["q1", "q2", "q3"])
///     .with_search("q1", "summary", &[("A", "https://a")])
///     .failing_search("q2");
/// ```
pub struct MockLLMClient {
    plan: std::result::Result<String, String>,
    searches: HashMap<String, SearchEntry>,
    report: std::result::Result<String, String>,
    /// Answer the first tool-mode turn with a `web_search` call
    call_tools: bool,
    planner_calls: AtomicUsize,
    search_calls: AtomicUsize,
    finished_searches: AtomicUsize,
    writer_prompts: Mutex<Vec<String>>,
    search_prompts: Mutex<Vec<String>>,
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLLMClient {
    /// Three searches `q1..q3`, one source each, plain report.
    pub fn new() -> Self {
        let client = Self {
            plan: Ok(String::new()),
            searches: HashMap::new(),
            report: Ok(report_json("# Report\n\nFindings [1].", &["Follow up?"])),
            call_tools: false,
            planner_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            finished_searches: AtomicUsize::new(0),
            writer_prompts: Mutex::new(Vec::new()),
            search_prompts: Mutex::new(Vec::new()),
        };

        let mut client = client.with_plan(&["q1", "q2", "q3"]);
        for q in ["q1", "q2", "q3"] {
            let url = format!("https://example.com/{}", q);
            client = client.with_search(q, &format!("summary of {}", q), &[(q, &url)]);
        }
        client
    }

    pub fn with_plan(mut self, queries: &[&str]) -> Self {
        let searches: Vec<Value> = queries
            .iter()
            .map(|q| json!({"reason": format!("look up {}", q), "query": q}))
            .collect();
        self.plan = Ok(json!({ "searches": searches }).to_string());
        self
    }

    pub fn with_raw_plan(mut self, raw: &str) -> Self {
        self.plan = Ok(raw.to_string());
        self
    }

    pub fn failing_plan(mut self) -> Self {
        self.plan = Err("planner unavailable".to_string());
        self
    }

    pub fn with_search(mut self, query: &str, summary: &str, sources: &[(&str, &str)]) -> Self {
        let script = SearchScript::Summary {
            summary: summary.to_string(),
            sources: sources
                .iter()
                .map(|(t, u)| (t.to_string(), u.to_string()))
                .collect(),
        };
        self.set_script(query, script);
        self
    }

    pub fn failing_search(mut self, query: &str) -> Self {
        self.set_script(query, SearchScript::Fail(format!("oracle error for {}", query)));
        self
    }

    pub fn panicking_search(mut self, query: &str) -> Self {
        self.set_script(query, SearchScript::Panic);
        self
    }

    pub fn with_search_delay(mut self, query: &str, delay: Duration) -> Self {
        self.searches
            .entry(query.to_string())
            .or_insert(SearchEntry {
                script: SearchScript::Fail("unscripted".to_string()),
                delay: Duration::ZERO,
            })
            .delay = delay;
        self
    }

    pub fn with_report(mut self, markdown: &str) -> Self {
        self.report = Ok(report_json(markdown, &[]));
        self
    }

    pub fn failing_report(mut self) -> Self {
        self.report = Err("writer unavailable".to_string());
        self
    }

    pub fn calling_tools(mut self) -> Self {
        self.call_tools = true;
        self
    }

    fn set_script(&mut self, query: &str, script: SearchScript) {
        let entry = self.searches.entry(query.to_string()).or_insert(SearchEntry {
            script: script.clone(),
            delay: Duration::ZERO,
        });
        entry.script = script;
    }

    pub fn planner_calls(&self) -> usize {
        self.planner_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Searches that got past their delay
    pub fn finished_searches(&self) -> usize {
        self.finished_searches.load(Ordering::SeqCst)
    }

    pub fn writer_calls(&self) -> usize {
        self.writer_prompts.lock().len()
    }

    pub fn writer_prompts(&self) -> Vec<String> {
        self.writer_prompts.lock().clone()
    }

    pub fn search_prompts(&self) -> Vec<String> {
        self.search_prompts.lock().clone()
    }

    async fn answer_search(&self, prompt: &str) -> Result<String> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_prompts.lock().push(prompt.to_string());

        let term = search_term(prompt);
        let entry = self
            .searches
            .get(&term)
            .cloned()
            .ok_or_else(|| AppError::LLM(format!("no script for search term '{}'", term)))?;

        if !entry.delay.is_zero() {
            tokio::time::sleep(entry.delay).await;
        }
        self.finished_searches.fetch_add(1, Ordering::SeqCst);

        match entry.script {
            SearchScript::Summary { summary, sources } => {
                let sources: Vec<Value> = sources
                    .iter()
                    .map(|(title, url)| json!({"title": title, "url": url}))
                    .collect();
                Ok(json!({"summary": summary, "sources": sources}).to_string())
            }
            SearchScript::Fail(cause) => Err(AppError::LLM(cause)),
            SearchScript::Panic => panic!("scripted search panic for {}", term),
        }
    }

    async fn answer(&self, prompt: &str) -> Result<String> {
        if prompt.starts_with("Query:") {
            self.planner_calls.fetch_add(1, Ordering::SeqCst);
            return self.plan.clone().map_err(AppError::LLM);
        }
        if prompt.starts_with("Search term:") {
            return self.answer_search(prompt).await;
        }
        if prompt.starts_with("Original query:") {
            self.writer_prompts.lock().push(prompt.to_string());
            return self.report.clone().map_err(AppError::LLM);
        }
        Err(AppError::LLM(format!("unexpected prompt: {}", prompt)))
    }
}

fn search_term(prompt: &str) -> String {
    prompt
        .lines()
        .next()
        .and_then(|l| l.strip_prefix("Search term: "))
        .unwrap_or_default()
        .to_string()
}

pub fn report_json(markdown: &str, follow_ups: &[&str]) -> String {
    json!({
        "short_summary": "Short summary.",
        "markdown_report": markdown,
        "follow_up_questions": follow_ups
    })
    .to_string()
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.answer(prompt).await
    }

    async fn generate_json(&self, _system: &str, prompt: &str, _schema: &Value) -> Result<String> {
        self.answer(prompt).await
    }

    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let prompt = messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let has_tool_result = messages.iter().any(|m| m.role == MessageRole::Tool);
        if self.call_tools && !has_tool_result {
            return Ok(LLMResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "web_search".to_string(),
                    arguments: json!({"query": search_term(&prompt)}),
                }],
                finish_reason: "tool_calls".to_string(),
            });
        }

        Ok(LLMResponse {
            content: self.answer(&prompt).await?,
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Stand-in for `web_search` that returns one fixed result per query
#[derive(Default)]
pub struct MockSearchTool {
    queries: Mutex<Vec<String>>,
}

impl MockSearchTool {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Tool for MockSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Mock web search"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args["query"].as_str().unwrap_or_default().to_string();
        self.queries.lock().push(query.clone());
        Ok(json!({
            "query": query,
            "results": [{
                "title": format!("Result for {}", query),
                "url": format!("https://search.example/{}", query),
                "description": "mock result"
            }],
            "count": 1
        }))
    }
}

/// Registry holding a shared `MockSearchTool`
pub fn mock_registry(tool: Arc<MockSearchTool>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(tool);
    Arc::new(registry)
}
