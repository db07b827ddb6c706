//! Progress protocol of a research run.
//!
//! Every run yields a sequence of [`ProgressEvent`]s ending in exactly one
//! terminal event. Consumers branch on the variant, never on payload text.

use crate::research::types::{GlobalSource, Report};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage a terminal `StageFailed` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Planning,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Planning => write!(f, "PLANNING"),
            Stage::Writing => write!(f, "WRITING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        run_id: String,
        query: String,
    },
    PlanReady {
        count: usize,
        queries: Vec<String>,
    },
    SearchProgress {
        completed: usize,
        total: usize,
    },
    SearchFailed {
        query_text: String,
        cause: String,
    },
    WritingReport {
        findings: usize,
        sources: usize,
    },
    SearchesExhausted {
        cause: String,
    },
    ReportReady {
        report: Report,
        sources: Vec<GlobalSource>,
    },
    StageFailed {
        stage: Stage,
        cause: String,
    },
}

impl ProgressEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::SearchesExhausted { .. }
                | ProgressEvent::ReportReady { .. }
                | ProgressEvent::StageFailed { .. }
        )
    }

    /// The serialized `type` tag, used as the SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => "started",
            ProgressEvent::PlanReady { .. } => "plan_ready",
            ProgressEvent::SearchProgress { .. } => "search_progress",
            ProgressEvent::SearchFailed { .. } => "search_failed",
            ProgressEvent::WritingReport { .. } => "writing_report",
            ProgressEvent::SearchesExhausted { .. } => "searches_exhausted",
            ProgressEvent::ReportReady { .. } => "report_ready",
            ProgressEvent::StageFailed { .. } => "stage_failed",
        }
    }
}

/// Controller state. Moves forward only; `Failed` absorbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Planning,
    Searching,
    Aggregating,
    Writing,
    Done,
    Failed { stage: String, cause: String },
}

impl PipelineState {
    fn rank(&self) -> u8 {
        match self {
            PipelineState::Init => 0,
            PipelineState::Planning => 1,
            PipelineState::Searching => 2,
            PipelineState::Aggregating => 3,
            PipelineState::Writing => 4,
            PipelineState::Done | PipelineState::Failed { .. } => 5,
        }
    }

    pub fn is_final(&self) -> bool {
        self.rank() == 5
    }

    /// Move to `next`. Going backwards, or leaving a final state, is a bug.
    pub fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            !self.is_final() && next.rank() > self.rank(),
            "invalid pipeline transition {:?} -> {:?}",
            self,
            next
        );
        tracing::trace!(from = ?self, to = ?next, "pipeline state");
        *self = next;
    }

    /// Move to `Failed` from any non-final state.
    pub fn fail(&mut self, stage: impl Into<String>, cause: impl Into<String>) {
        self.advance(PipelineState::Failed {
            stage: stage.into(),
            cause: cause.into(),
        });
    }
}
