//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with the language
//! models that plan searches, summarize results and write reports. It
//! abstracts provider-specific wire formats behind one trait.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection built from `[llm]` config
//! - [`structured`] - Schema-constrained generation into Rust types
//! - [`coordinator`] - Multi-turn tool calling loop
//!
//! # Example
//!
//! ```ignore
//! use scribe::llm::{Provider, structured::generate_structured};
//!
//! let client = Provider::from_config(&config.llm)?.create_client()?;
//! let plan: SearchPlan = generate_structured(client.as_ref(), PLANNER_INSTRUCTIONS, "Query: ...").await?;
//! ```

/// Core LLM client trait, messages and provider selection.
pub mod client;
/// Tool-calling conversation loop.
pub mod coordinator;
/// Ollama `/api/chat` client.
pub mod ollama;
/// OpenAI-compatible `/chat/completions` client.
pub mod openai;
/// Schema-constrained generation helpers.
pub mod structured;

pub use client::{ConversationMessage, LLMClient, LLMResponse, MessageRole, ModelParams, Provider};
