//! Domain models: documents going in, analyses coming out.

mod analysis;
mod document;

pub use analysis::{
    AnalysisMetadata, DocumentAnalysis, DocumentMetrics, Entity, ExecutiveSummary, Kpi,
    Relationship, SectionReport, SignalAnalysis, VisualizationRecommendation,
};
pub use document::{Document, DocumentMetadata, Section};
