//! Schema-constrained generation
//!
//! Pipeline stages ask the model for values of a declared Rust type. The JSON
//! schema comes from `schemars`, goes to the provider's JSON mode, and is
//! repeated in the system prompt for models that ignore that mode. Replies
//! are parsed leniently (code fences and chatter around the object are
//! tolerated) but must deserialize into the target type.

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// JSON schema for `T`
pub fn schema_of<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Instruction appended to a system prompt when a schema is declared
pub fn with_schema_instruction(system: &str, schema: &Value) -> String {
    format!(
        "{}\n\nRespond only with valid JSON matching this schema:\n{}",
        system, schema
    )
}

/// Locate the outermost JSON object in a model reply.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model reply into `T`.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text).ok_or_else(|| {
        AppError::LLM(format!(
            "No JSON object found in model output: {}",
            preview(text)
        ))
    })?;

    serde_json::from_str(json)
        .map_err(|e| AppError::LLM(format!("Model output does not match schema: {}", e)))
}

/// Ask the model for a value of type `T`.
pub async fn generate_structured<T>(client: &dyn LLMClient, system: &str, prompt: &str) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = schema_of::<T>();
    let system = with_schema_instruction(system, &schema);
    let raw = client.generate_json(&system, prompt, &schema).await?;
    parse_structured(&raw)
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    }
}
