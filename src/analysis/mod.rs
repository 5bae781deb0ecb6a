//! Multi-stage document-analysis pipeline.
//!
//! Converts a [`Document`](crate::models::Document) into a
//! [`DocumentAnalysis`](crate::models::DocumentAnalysis) by issuing
//! completion calls in dependency-ordered waves, tolerating malformed
//! output from the completion service, tracking per-run usage, and
//! emitting progress events over a channel.

mod pipeline;
mod progress;
mod reconcile;
mod sections;
pub mod stages;
mod usage;

pub use pipeline::{AnalysisError, AnalysisPipeline};
pub use progress::{AnalysisStep, PartialAnalysis, ProgressUpdate};
pub use reconcile::{reconcile_relationships, EndpointField, EndpointMismatch, MismatchKind};
pub use sections::summarize_sections;
pub use usage::{UsageSnapshot, UsageTracker};
