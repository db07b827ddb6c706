//! Tools the models can call
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search through DuckDuckGo (daedra)
//! - [`registry`](crate::tools::registry) - Tool registration and dispatch
//!
//! # Tool Registry
//!
//! The registry hands tool definitions to the coordinator and dispatches the
//! calls the model makes:
//! ```ignore
//! let registry = ToolRegistry::with_search(SearchTool::new().with_site_filter("reddit.com"));
//! let definitions = registry.get_tool_definitions();
//! let result = registry.execute("web_search", json!({"query": "rust async"})).await?;
//! ```

/// Tool registry for managing available tools.
pub mod registry;
/// Web search tool using DuckDuckGo.
pub mod search;
