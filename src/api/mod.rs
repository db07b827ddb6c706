//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for S.C.R.I.B.E, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research` - Run research, streaming progress as SSE
//! - `POST /api/research/report` - Run research and return the final report
//!
//! ## Health (`/api/health`)
//! - `GET /api/health` - Health check endpoint
//!
//! # Streaming protocol
//!
//! ```text
//! event: started
//! data: {"type":"started","run_id":"3f9a01bc","query":"..."}
//!
//! event: search_progress
//! data: {"type":"search_progress","completed":1,"total":3}
//! ```
//!
//! # OpenAPI Documentation
//!
//! The document is served at `/api/openapi.json`. When the `swagger-ui`
//! feature is enabled, interactive API documentation is available at
//! `/swagger-ui/`.

use utoipa::OpenApi;

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

/// OpenAPI description of the HTTP surface
#[derive(OpenApi)]
#[openapi(
    info(
        title = "S.C.R.I.B.E API",
        description = "Streaming deep-research server"
    ),
    paths(
        handlers::health::health_check,
        handlers::research::research_stream,
        handlers::research::research_report,
    ),
    components(schemas(
        crate::types::ResearchRequest,
        crate::types::ResearchResponse,
        crate::types::HealthResponse,
        crate::research::types::Report,
        crate::research::types::GlobalSource,
    )),
    tags(
        (name = "research", description = "Deep research runs"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
