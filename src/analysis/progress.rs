//! Progress events emitted while an analysis runs.
//!
//! The pipeline produces a sequence of [`ProgressUpdate`]s over a tokio
//! mpsc channel; the caller consumes them independently of the
//! pipeline's control flow. Percentages are monotonically non-decreasing
//! within one run and always end at 100.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::ExecutiveSummary;

/// The pipeline's state-machine steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStep {
    Init,
    PriorityAnalysis,
    EarlyResults,
    DetailedAnalysis,
    Relationships,
    Sections,
    Recommendations,
    Complete,
}

impl AnalysisStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PriorityAnalysis => "priority-analysis",
            Self::EarlyResults => "early-results",
            Self::DetailedAnalysis => "detailed-analysis",
            Self::Relationships => "relationships",
            Self::Sections => "sections",
            Self::Recommendations => "recommendations",
            Self::Complete => "complete",
        }
    }

    /// Completion percentage reached when this step is entered.
    pub fn percent(&self) -> u8 {
        match self {
            Self::Init => 5,
            Self::PriorityAnalysis => 10,
            Self::EarlyResults => 30,
            Self::DetailedAnalysis => 35,
            Self::Relationships => 50,
            Self::Sections => 65,
            Self::Recommendations => 85,
            Self::Complete => 100,
        }
    }
}

impl std::fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Early results attached to the `early-results` checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PartialAnalysis {
    pub tldr: String,
    pub executive_summary: ExecutiveSummary,
}

/// One progress record.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub step: AnalysisStep,
    pub percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialAnalysis>,
}

impl ProgressUpdate {
    pub fn new(step: AnalysisStep, message: impl Into<String>) -> Self {
        Self {
            step,
            percent: step.percent(),
            message: message.into(),
            partial: None,
        }
    }

    pub fn with_partial(mut self, partial: PartialAnalysis) -> Self {
        self.partial = Some(partial);
        self
    }
}

/// Optional progress sender; sends are best-effort and a dropped
/// receiver never aborts the run.
pub(crate) struct ProgressSink {
    tx: Option<mpsc::Sender<ProgressUpdate>>,
}

impl ProgressSink {
    pub(crate) fn new(tx: Option<mpsc::Sender<ProgressUpdate>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn emit(&self, step: AnalysisStep, message: &str) {
        self.send(ProgressUpdate::new(step, message)).await;
    }

    pub(crate) async fn emit_partial(
        &self,
        step: AnalysisStep,
        message: &str,
        partial: PartialAnalysis,
    ) {
        self.send(ProgressUpdate::new(step, message).with_partial(partial))
            .await;
    }

    async fn send(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(update).await;
        }
    }
}
