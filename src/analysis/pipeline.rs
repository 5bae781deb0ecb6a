//! The analysis orchestrator.
//!
//! Drives the stage functions through a fixed state machine, running
//! partially-independent stages as concurrently-joined waves. Every
//! stage other than tl;dr degrades to a deterministic fallback, so a
//! run that survives the tl;dr stage always reaches `complete`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::llm::{CompletionBackend, LlmError};
use crate::models::{AnalysisMetadata, Document, DocumentAnalysis, DocumentMetrics};

use super::progress::{AnalysisStep, PartialAnalysis, ProgressSink, ProgressUpdate};
use super::reconcile::reconcile_relationships;
use super::sections::summarize_sections;
use super::stages;
use super::usage::UsageTracker;

/// The one fatal failure mode: the tl;dr stage's transport call failed
/// on every attempt in its retry budget.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("tl;dr generation failed after {attempts} attempts: {source}")]
    TldrExhausted {
        attempts: u32,
        #[source]
        source: LlmError,
    },
}

/// Multi-stage document-analysis pipeline.
///
/// Holds no per-run state: each [`analyze`](Self::analyze) call owns a
/// fresh usage tracker, so one pipeline value can serve concurrent runs.
pub struct AnalysisPipeline {
    backend: Arc<dyn CompletionBackend>,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Create a pipeline with default stage budgets.
    pub fn with_defaults(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::new(backend, AnalysisConfig::default())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full analysis.
    ///
    /// Progress updates are sent over `progress` when given; a dropped
    /// receiver is harmless. The returned analysis is structurally
    /// complete even when individual completions were malformed; the
    /// only error is tl;dr transport exhaustion.
    pub async fn analyze(
        &self,
        document: &Document,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<DocumentAnalysis, AnalysisError> {
        let backend = self.backend.as_ref();
        let config = &self.config;
        let usage = UsageTracker::new();
        let sink = ProgressSink::new(progress);

        info!(
            "Analyzing document {} ({} words)",
            document.id, document.metadata.word_count
        );
        sink.emit(AnalysisStep::Init, "Preparing analysis").await;

        // Wave 1: the priority results.
        sink.emit(AnalysisStep::PriorityAnalysis, "Generating summaries")
            .await;
        let (tldr, executive_summary) = tokio::join!(
            stages::generate_tldr(backend, &usage, &document.content, config),
            stages::generate_executive_summary(backend, &usage, &document.content, config),
        );
        let tldr = tldr.map_err(|source| AnalysisError::TldrExhausted {
            attempts: config.tldr_retry_policy().max_attempts(),
            source,
        })?;

        sink.emit_partial(
            AnalysisStep::EarlyResults,
            "Summaries ready",
            PartialAnalysis {
                tldr: tldr.clone(),
                executive_summary: executive_summary.clone(),
            },
        )
        .await;

        // Wave 2: entities and signals.
        sink.emit(AnalysisStep::DetailedAnalysis, "Extracting entities and signals")
            .await;
        let (entities, signals) = tokio::join!(
            stages::extract_entities(backend, &usage, &document.content, config),
            stages::score_signals(backend, &usage, &document.content, config),
        );

        // Relationships depend on the entity list.
        sink.emit(AnalysisStep::Relationships, "Detecting relationships")
            .await;
        let relationships =
            stages::detect_relationships(backend, &usage, &document.content, &entities, config)
                .await;
        let mismatches = reconcile_relationships(&entities, &relationships);
        debug!(
            "Relationship reconciliation: {} mismatches across {} relationships",
            mismatches.len(),
            relationships.len()
        );

        sink.emit(AnalysisStep::Sections, "Summarizing sections").await;
        let sections = summarize_sections(
            backend,
            &usage,
            &document.structure,
            config.section_threshold,
            config,
        )
        .await;

        sink.emit(AnalysisStep::Recommendations, "Scoring visualizations")
            .await;
        let metrics = DocumentMetrics {
            word_count: document.metadata.word_count,
            section_count: document.section_count(),
            entity_count: entities.len(),
            relationship_count: relationships.len(),
        };
        let recommendations = stages::recommend_visualizations(
            backend,
            &usage,
            &document.content,
            &metrics,
            &signals,
            config,
        )
        .await;

        let snapshot = usage.snapshot();
        let analysis = DocumentAnalysis {
            document_id: document.id.clone(),
            tldr,
            executive_summary,
            entities,
            relationships,
            metrics,
            signals,
            sections,
            recommendations,
            metadata: AnalysisMetadata {
                tokens_used: snapshot.tokens_used,
                models: snapshot.models,
                generated_at: chrono::Utc::now(),
            },
        };

        sink.emit(AnalysisStep::Complete, "Analysis complete").await;
        info!(
            "Analysis of {} complete: {} entities, {} relationships, {} tokens",
            document.id,
            analysis.entities.len(),
            analysis.relationships.len(),
            analysis.metadata.tokens_used
        );
        Ok(analysis)
    }

    /// Run the quick variant: summaries, signals, and section reports
    /// only. Entity extraction, relationship detection, and the
    /// recommendation completion are skipped; their slots are filled
    /// with the same defaults the full pipeline would fall back to.
    pub async fn analyze_quick(
        &self,
        document: &Document,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<DocumentAnalysis, AnalysisError> {
        let backend = self.backend.as_ref();
        let config = &self.config;
        let usage = UsageTracker::new();
        let sink = ProgressSink::new(progress);

        info!("Quick analysis of document {}", document.id);
        sink.emit(AnalysisStep::Init, "Preparing analysis").await;

        sink.emit(AnalysisStep::PriorityAnalysis, "Generating summaries")
            .await;
        let (tldr, executive_summary, signals) = tokio::join!(
            stages::generate_tldr(backend, &usage, &document.content, config),
            stages::generate_executive_summary(backend, &usage, &document.content, config),
            stages::score_signals(backend, &usage, &document.content, config),
        );
        let tldr = tldr.map_err(|source| AnalysisError::TldrExhausted {
            attempts: config.tldr_retry_policy().max_attempts(),
            source,
        })?;

        sink.emit_partial(
            AnalysisStep::EarlyResults,
            "Summaries ready",
            PartialAnalysis {
                tldr: tldr.clone(),
                executive_summary: executive_summary.clone(),
            },
        )
        .await;

        sink.emit(AnalysisStep::Sections, "Summarizing sections").await;
        let sections = summarize_sections(
            backend,
            &usage,
            &document.structure,
            config.quick_section_threshold,
            config,
        )
        .await;

        let metrics = DocumentMetrics {
            word_count: document.metadata.word_count,
            section_count: document.section_count(),
            entity_count: 0,
            relationship_count: 0,
        };

        let snapshot = usage.snapshot();
        let analysis = DocumentAnalysis {
            document_id: document.id.clone(),
            tldr,
            executive_summary,
            entities: Vec::new(),
            relationships: Vec::new(),
            metrics,
            signals,
            sections,
            recommendations: stages::fallback_recommendations(),
            metadata: AnalysisMetadata {
                tokens_used: snapshot.tokens_used,
                models: snapshot.models,
                generated_at: chrono::Utc::now(),
            },
        };

        sink.emit(AnalysisStep::Complete, "Analysis complete").await;
        Ok(analysis)
    }
}
