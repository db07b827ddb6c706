use crate::research::types::{GlobalSource, Report};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    /// The research question, 1 to `research.max_query_chars` characters
    pub query: String,
}

impl ResearchRequest {
    /// Trim the query and check it against the configured length bound.
    ///
    /// The bound is inclusive: a query of exactly `max_chars` characters is
    /// accepted. Length is counted in `char`s after trimming.
    ///
    /// Runs before the pipeline starts; a rejected query never reaches `run`.
    pub fn validated_query(&self, max_chars: usize) -> Result<String> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let len = query.chars().count();
        if len > max_chars {
            return Err(AppError::InvalidInput(format!(
                "Query is {} characters long, maximum is {}",
                len, max_chars
            )));
        }

        Ok(query.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchResponse {
    pub run_id: String,
    pub report: Report,
    pub sources: Vec<GlobalSource>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Error Types =============

/// Failures of the research pipeline, classified by stage.
///
/// Only `SearchTask` is recoverable: it drops one outcome and the stage
/// carries on. The others end the run with a terminal event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResearchError {
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Search task failed: {0}")]
    SearchTask(String),

    #[error("All searches failed: {0}")]
    SearchesExhausted(String),

    #[error("Report writing failed: {0}")]
    Writing(String),

    #[error("Invalid research query: {0}")]
    InvalidInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidInput(_) | AppError::Research(ResearchError::InvalidInput(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            AppError::LLM(_) | AppError::Tool(_) | AppError::Research(_) => {
                axum::http::StatusCode::BAD_GATEWAY
            }
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::Configuration(_) | AppError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
