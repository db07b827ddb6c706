use crate::{
    research::ProgressEvent,
    types::{AppError, ResearchRequest, ResearchResponse, Result},
    AppState,
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::{Duration, Instant};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Run deep research and stream progress as server-sent events
///
/// Each SSE event is named after the progress event type (`started`,
/// `plan_ready`, `search_progress`, ...) and carries the event as JSON. The
/// last event is always `report_ready`, `searches_exhausted` or
/// `stage_failed`. Closing the connection cancels the run.
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Progress event stream", content_type = "text/event-stream"),
        (status = 400, description = "Invalid query")
    ),
    tag = "research"
)]
pub async fn research_stream(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let config = state.config_manager.config();
    let query = payload.validated_query(config.research.max_query_chars)?;
    let pipeline = state.pipeline(&config)?;

    let events = pipeline.run(query).map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}

/// Run deep research to completion and return the report
#[utoipa::path(
    post,
    path = "/api/research/report",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Research completed", body = ResearchResponse),
        (status = 400, description = "Invalid query"),
        (status = 502, description = "Planning, searching or writing failed")
    ),
    tag = "research"
)]
pub async fn research_report(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    let start = Instant::now();

    let config = state.config_manager.config();
    let query = payload.validated_query(config.research.max_query_chars)?;
    let pipeline = state.pipeline(&config)?;

    let output = pipeline
        .run_to_completion(&query)
        .await
        .map_err(AppError::from)?;

    Ok(Json(ResearchResponse {
        run_id: output.run_id,
        report: output.report,
        sources: output.sources,
        duration_ms: start.elapsed().as_millis() as u64,
        completed_at: Utc::now(),
    }))
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize progress event");
            Event::default()
                .event(event.name())
                .data(format!("{{\"type\":\"{}\"}}", event.name()))
        }
    }
}
