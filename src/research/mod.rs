//! Deep Research Pipeline
//!
//! Turns one natural-language query into a cited markdown report:
//!
//! 1. **Planning** - [`planner::SearchPlanner`] derives a few sub-queries
//! 2. **Searching** - [`executor::SearchExecutor`] runs them concurrently
//! 3. **Aggregating** - [`aggregator::aggregate`] renumbers citations globally
//! 4. **Writing** - [`writer::ReportWriter`] synthesizes the report
//!
//! [`pipeline::ResearchPipeline`] sequences the stages and reports progress
//! as a stream of [`events::ProgressEvent`]s.
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//! use scribe::research::{ResearchPipeline, ResearchSettings};
//!
//! let pipeline = ResearchPipeline::new(llm, tools, ResearchSettings::default());
//! let mut events = pipeline.run("Which mechanical keyboards do people recommend?");
//! while let Some(event) = events.next().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```
//!
//! # Failure policy
//!
//! A failed search only drops its own contribution. The run fails when
//! planning fails, when every search fails, or when writing fails; each of
//! these ends the stream with a terminal event.

pub mod aggregator;
pub mod events;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod types;
pub mod writer;

pub use events::{PipelineState, ProgressEvent, Stage};
pub use pipeline::{ProgressStream, ResearchPipeline, ResearchSettings};
pub use types::{AggregatedFindings, GlobalSource, Report, ResearchOutput, SearchPlan};
