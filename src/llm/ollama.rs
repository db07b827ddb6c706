use crate::llm::client::{
    http_client, ConversationMessage, LLMClient, LLMResponse, MessageRole, ModelParams,
};
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    params: ModelParams,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, params: ModelParams) -> Result<Self> {
        Ok(Self {
            http: http_client(&params)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn request_body(&self, messages: Vec<Value>) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.params.temperature
            }
        })
    }

    async fn chat(&self, body: Value) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "Ollama request failed ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse Ollama response: {}", e)))?;

        parse_chat_response(&json)
    }
}

fn to_ollama_message(message: &ConversationMessage) -> Value {
    match message.role {
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments
                        }
                    })
                })
                .collect();

            json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": tool_calls
            })
        }
        role => json!({
            "role": role.as_str(),
            "content": message.content
        }),
    }
}

fn to_ollama_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters
        }
    })
}

/// Parse an `/api/chat` response body
fn parse_chat_response(json: &Value) -> Result<LLMResponse> {
    let message = json
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in Ollama response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    let mut finish_reason = "stop".to_string();

    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            if let Some(function) = call.get("function") {
                let name = function
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = function.get("arguments").cloned().unwrap_or(json!({}));

                // Ollama does not assign call ids
                tool_calls.push(ToolCall {
                    id: uuid::Uuid::new_v4().to_string(),
                    name,
                    arguments,
                });
            }
        }
        if !tool_calls.is_empty() {
            finish_reason = "tool_calls".to_string();
        }
    }

    if tool_calls.is_empty() {
        if let Some(reason) = json.get("done_reason").and_then(|v| v.as_str()) {
            finish_reason = reason.to_string();
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = self.request_body(vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ]);

        Ok(self.chat(body).await?.content)
    }

    async fn generate_json(&self, system: &str, prompt: &str, schema: &Value) -> Result<String> {
        let mut body = self.request_body(vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ]);
        body["format"] = schema.clone();

        Ok(self.chat(body).await?.content)
    }

    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut body = self.request_body(messages.iter().map(to_ollama_message).collect());
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(to_ollama_tool).collect());
        }

        self.chat(body).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
