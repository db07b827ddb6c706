//! Generic Tool Coordinator for Multi-Turn Tool Calling
//!
//! This module provides a provider-agnostic `ToolCoordinator` that works with any
//! `LLMClient` implementation. It handles the complete tool calling loop:
//!
//! 1. Send prompt with available tools to the LLM
//! 2. If the model requests tool calls, execute them
//! 3. Send tool results back to the model
//! 4. Repeat until completion or max iterations
//!
//! The search stage runs one coordinator per sub-query with `web_search`
//! registered, so the model decides what to look up and when it has enough.

use crate::llm::client::{ConversationMessage, LLMClient};
use crate::tools::registry::ToolRegistry;
use crate::types::{Result, ToolCall};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Configuration for tool calling coordination behavior.
#[derive(Debug, Clone)]
pub struct ToolCallingConfig {
    /// Maximum number of LLM round-trips before stopping.
    pub max_iterations: usize,

    /// Whether to execute multiple tool calls in parallel.
    pub parallel_execution: bool,

    /// Timeout for individual tool execution.
    pub tool_timeout: Duration,
}

impl Default for ToolCallingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            parallel_execution: true,
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Record of a single tool call execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Identifier of this tool call (from the LLM).
    pub id: String,
    /// Name of the tool that was called.
    pub name: String,
    /// Arguments passed to the tool.
    pub arguments: serde_json::Value,
    /// Result returned by the tool (or error object).
    pub result: serde_json::Value,
    /// Whether the tool execution was successful.
    pub success: bool,
    /// Time taken to execute the tool in milliseconds.
    pub duration_ms: u64,
    /// Error message if the tool failed.
    pub error: Option<String>,
}

/// Reason why a tool coordination session ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishReason {
    /// Model decided to stop (no more tool calls).
    Stop,
    /// Hit the maximum iterations limit.
    MaxIterations,
    /// Model tried to call an unknown tool.
    UnknownTool(String),
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::MaxIterations => write!(f, "max_iterations"),
            FinishReason::UnknownTool(t) => write!(f, "unknown_tool: {}", t),
        }
    }
}

/// Result of a complete tool coordination session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorResult {
    /// Final text response from the model.
    pub content: String,

    /// All tool calls made during the session.
    pub tool_calls: Vec<ToolCallRecord>,

    /// Number of LLM iterations (round-trips) performed.
    pub iterations: usize,

    /// Why the session ended.
    pub finish_reason: FinishReason,
}

/// Generic tool coordinator that works with any LLMClient.
pub struct ToolCoordinator {
    client: Arc<dyn LLMClient>,
    registry: Arc<ToolRegistry>,
    config: ToolCallingConfig,
}

impl ToolCoordinator {
    /// Create a new ToolCoordinator with the given client, registry, and config.
    pub fn new(
        client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: ToolCallingConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    /// Execute a complete tool-calling conversation loop.
    ///
    /// # Arguments
    ///
    /// * `system` - Optional system prompt
    /// * `prompt` - The user's prompt
    pub async fn execute(&self, system: Option<&str>, prompt: &str) -> Result<CoordinatorResult> {
        let tools = self.registry.get_tool_definitions();
        let mut messages: Vec<ConversationMessage> = Vec::new();
        let mut all_tool_calls: Vec<ToolCallRecord> = Vec::new();

        if let Some(sys) = system {
            messages.push(ConversationMessage::system(sys));
        }
        messages.push(ConversationMessage::user(prompt));

        for iteration in 0..self.config.max_iterations {
            let response = self
                .client
                .generate_with_tools_and_history(&messages, &tools)
                .await?;

            messages.push(ConversationMessage::assistant(
                &response.content,
                response.tool_calls.clone(),
            ));

            if response.tool_calls.is_empty() {
                return Ok(CoordinatorResult {
                    content: response.content,
                    tool_calls: all_tool_calls,
                    iterations: iteration + 1,
                    finish_reason: FinishReason::Stop,
                });
            }

            for tool_call in &response.tool_calls {
                if !self.registry.has_tool(&tool_call.name) {
                    return Ok(CoordinatorResult {
                        content: response.content,
                        tool_calls: all_tool_calls,
                        iterations: iteration + 1,
                        finish_reason: FinishReason::UnknownTool(tool_call.name.clone()),
                    });
                }
            }

            let records = self.execute_tool_calls(&response.tool_calls).await;
            for record in records {
                tracing::debug!(
                    tool = %record.name,
                    success = record.success,
                    duration_ms = record.duration_ms,
                    "Tool call finished"
                );
                messages.push(ConversationMessage::tool_result(&record.id, &record.result));
                all_tool_calls.push(record);
            }
        }

        Ok(CoordinatorResult {
            content: messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            tool_calls: all_tool_calls,
            iterations: self.config.max_iterations,
            finish_reason: FinishReason::MaxIterations,
        })
    }

    /// Execute tool calls, either in parallel or sequentially based on config.
    async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolCallRecord> {
        if self.config.parallel_execution {
            join_all(calls.iter().map(|call| self.execute_single_tool(call))).await
        } else {
            let mut records = Vec::with_capacity(calls.len());
            for call in calls {
                records.push(self.execute_single_tool(call).await);
            }
            records
        }
    }

    /// Execute a single tool call with timeout. Failures become error records
    /// the model can read.
    async fn execute_single_tool(&self, call: &ToolCall) -> ToolCallRecord {
        let start = Instant::now();

        let result = timeout(
            self.config.tool_timeout,
            self.registry.execute(&call.name, call.arguments.clone()),
        )
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        let (result, error) = match result {
            Ok(Ok(value)) => (value, None),
            Ok(Err(e)) => (serde_json::json!({"error": e.to_string()}), Some(e.to_string())),
            Err(_) => (
                serde_json::json!({"error": "Tool execution timed out"}),
                Some("Tool execution timed out".to_string()),
            ),
        };

        ToolCallRecord {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            success: error.is_none(),
            duration_ms,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::LLMResponse;
    use crate::tools::registry::Tool;
    use crate::types::{AppError, ToolDefinition};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Replays a fixed list of responses, one per round-trip
    struct ScriptedClient {
        responses: Mutex<Vec<LLMResponse>>,
        seen_messages: Mutex<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(mut responses: Vec<LLMResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen_messages: Mutex::new(Vec::new()),
            }
        }
    }

    fn reply(content: &str, tool_calls: Vec<ToolCall>) -> LLMResponse {
        LLMResponse {
            content: content.to_string(),
            tool_calls,
            finish_reason: "stop".to_string(),
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{}", name),
            name: name.to_string(),
            arguments: json!({"query": "q"}),
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            Err(AppError::LLM("not scripted".to_string()))
        }

        async fn generate_json(&self, _s: &str, _p: &str, _schema: &Value) -> Result<String> {
            Err(AppError::LLM("not scripted".to_string()))
        }

        async fn generate_with_tools_and_history(
            &self,
            messages: &[ConversationMessage],
            _tools: &[ToolDefinition],
        ) -> Result<LLMResponse> {
            self.seen_messages.lock().push(messages.len());
            self.responses
                .lock()
                .pop()
                .ok_or_else(|| AppError::LLM("script exhausted".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(json!({"echo": args}))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_runs_tool_then_stops() {
        let client = Arc::new(ScriptedClient::new(vec![
            reply("", vec![call("echo")]),
            reply("final answer", vec![]),
        ]));
        let coordinator =
            ToolCoordinator::new(client.clone(), registry(), ToolCallingConfig::default());

        let result = coordinator.execute(Some("sys"), "go").await.unwrap();
        assert_eq!(result.content, "final answer");
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.tool_calls[0].success);
        // system + user, then + assistant + tool result
        assert_eq!(*client.seen_messages.lock(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_session() {
        let client = Arc::new(ScriptedClient::new(vec![reply("", vec![call("missing")])]));
        let coordinator = ToolCoordinator::new(client, registry(), ToolCallingConfig::default());

        let result = coordinator.execute(None, "go").await.unwrap();
        assert_eq!(
            result.finish_reason,
            FinishReason::UnknownTool("missing".to_string())
        );
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let client = Arc::new(ScriptedClient::new(vec![
            reply("", vec![call("echo")]),
            reply("", vec![call("echo")]),
        ]));
        let config = ToolCallingConfig {
            max_iterations: 2,
            ..Default::default()
        };
        let coordinator = ToolCoordinator::new(client, registry(), config);

        let result = coordinator.execute(None, "go").await.unwrap();
        assert_eq!(result.finish_reason, FinishReason::MaxIterations);
        assert_eq!(result.tool_calls.len(), 2);
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let coordinator = ToolCoordinator::new(client, registry(), ToolCallingConfig::default());
        assert!(coordinator.execute(None, "go").await.is_err());
    }

    #[test]
    fn test_finish_reason_display() {
        assert_eq!(FinishReason::Stop.to_string(), "stop");
        assert_eq!(FinishReason::MaxIterations.to_string(), "max_iterations");
        assert_eq!(
            FinishReason::UnknownTool("x".to_string()).to_string(),
            "unknown_tool: x"
        );
    }
}
