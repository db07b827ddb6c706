use crate::llm::client::{
    http_client, ConversationMessage, LLMClient, LLMResponse, MessageRole, ModelParams,
};
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: ModelParams,
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(&params)?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn request_body(&self, messages: Vec<Value>) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.params.temperature
        })
    }

    async fn chat(&self, body: Value) -> Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("OpenAI API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLM(format!(
                "OpenAI API error ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse OpenAI response: {}", e)))?;

        parse_completion(&json)
    }
}

fn to_openai_message(message: &ConversationMessage) -> Value {
    match message.role {
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            // OpenAI expects arguments as a JSON-encoded string
                            "arguments": tc.arguments.to_string()
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
        MessageRole::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content
        }),
        role => json!({
            "role": role.as_str(),
            "content": message.content
        }),
    }
}

fn to_openai_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters
        }
    })
}

/// Parse a `/chat/completions` response body
fn parse_completion(json: &Value) -> Result<LLMResponse> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in OpenAI response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let arguments = function
                        .get("arguments")
                        .and_then(|a| a.as_str())
                        .and_then(|a| serde_json::from_str(a).ok())
                        .unwrap_or(json!({}));

                    Some(ToolCall {
                        id: call.get("id")?.as_str()?.to_string(),
                        name: function.get("name")?.as_str()?.to_string(),
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = self.request_body(vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ]);

        Ok(self.chat(body).await?.content)
    }

    async fn generate_json(&self, system: &str, prompt: &str, _schema: &Value) -> Result<String> {
        // json_object mode; the schema itself travels in the system prompt
        let mut body = self.request_body(vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": prompt}),
        ]);
        body["response_format"] = json!({"type": "json_object"});

        Ok(self.chat(body).await?.content)
    }

    async fn generate_with_tools_and_history(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut body = self.request_body(messages.iter().map(to_openai_message).collect());
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(to_openai_tool).collect());
            body["tool_choice"] = json!("auto");
        }

        self.chat(body).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_tool_calls() {
        let json = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"query\":\"tokio joinset\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let response = parse_completion(&json).unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.finish_reason, "tool_calls");
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].arguments["query"], "tokio joinset");
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let msg = ConversationMessage::tool_result("call_abc", &json!({"results": []}));
        let value = to_openai_message(&msg);
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_abc");
    }

    #[tokio::test]
    async fn test_generate_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "pong"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new(
            "sk-test".to_string(),
            format!("{}/v1/", server.uri()),
            "gpt-4o-mini".to_string(),
            ModelParams::default(),
        )
        .unwrap();

        let out = client.generate_with_system("sys", "ping").await.unwrap();
        assert_eq!(out, "pong");
    }
}
