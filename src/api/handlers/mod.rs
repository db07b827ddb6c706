//! API request handlers.

/// Health check handler.
pub mod health;
/// Research streaming and report handlers.
pub mod research;
