//! # S.C.R.I.B.E - Streaming Concurrent Research, Indexed By Evidence
//!
//! A deep-research server built in Rust. Given a natural-language question it
//! plans a few web searches, runs them concurrently, merges their citations
//! under one numbering and writes a structured markdown report, streaming
//! progress the whole way.
//!
//! ## Overview
//!
//! S.C.R.I.B.E can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `scribe-server` binary
//! 2. **As a library** - Embed the pipeline in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use scribe::{Provider, ResearchPipeline, ResearchSettings, ScribeConfig, ToolRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScribeConfig::load("scribe.toml")?;
//!     let llm = Provider::from_config(&config.llm)?.create_client()?;
//!     let tools = Arc::new(ToolRegistry::with_default_tools());
//!
//!     let pipeline = ResearchPipeline::new(llm, tools, ResearchSettings::from(&config.research));
//!     let mut events = pipeline.run("How do people keep sourdough starters alive?");
//!     while let Some(event) = events.next().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `swagger-ui` | Serve interactive API docs at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`api`] - REST and SSE handlers and routes
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM client implementations
//! - [`research`] - The research pipeline
//! - [`tools`] - Tool definitions and registry
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Deep research pipeline.
pub mod research;
/// Built-in tools (web search).
pub mod tools;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, LLMResponse, Provider};
pub use research::{ProgressEvent, ResearchPipeline, ResearchSettings};
pub use tools::registry::ToolRegistry;
pub use types::{AppError, ResearchError, Result};
pub use utils::toml_config::{ScribeConfig, ScribeConfigManager};

use crate::tools::search::SearchTool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<ScribeConfigManager>,
    /// Tools available to search tasks
    pub tool_registry: Arc<ToolRegistry>,
    /// Fixed LLM client. When unset, each request builds one from the
    /// current `[llm]` section.
    pub llm: Option<Arc<dyn LLMClient>>,
}

impl AppState {
    /// State whose tools follow the loaded `[research]` section
    pub fn new(config_manager: Arc<ScribeConfigManager>) -> Self {
        let config = config_manager.config();
        let tool_registry = Arc::new(tool_registry_for(&config));

        Self {
            config_manager,
            tool_registry,
            llm: None,
        }
    }

    /// Use `llm` for every request instead of building clients from config
    pub fn with_llm(mut self, llm: Arc<dyn LLMClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tool_registry = tools;
        self
    }

    /// Build a pipeline for one request from a config snapshot
    pub fn pipeline(&self, config: &ScribeConfig) -> Result<ResearchPipeline> {
        let llm = match &self.llm {
            Some(llm) => llm.clone(),
            None => Provider::from_config(&config.llm)?.create_client()?,
        };

        Ok(ResearchPipeline::new(
            llm,
            self.tool_registry.clone(),
            ResearchSettings::from(&config.research),
        ))
    }

    /// Model the next request will use
    pub fn model_name(&self) -> String {
        match &self.llm {
            Some(llm) => llm.model_name().to_string(),
            None => self.config_manager.config().llm.model.clone(),
        }
    }
}

/// Registry holding `web_search`, scoped by the `[research]` settings
pub fn tool_registry_for(config: &ScribeConfig) -> ToolRegistry {
    let mut search = SearchTool::new().with_default_results(config.research.results_per_search);
    if let Some(site) = &config.research.site_filter {
        search = search.with_site_filter(site.clone());
    }
    ToolRegistry::with_search(search)
}
