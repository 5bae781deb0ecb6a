//! Analysis output models.
//!
//! The aggregate [`DocumentAnalysis`] is assembled by the pipeline and is
//! immutable once returned. Every field is guaranteed structurally valid
//! even when individual completion calls misbehaved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named entity extracted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier, unique within one analysis.
    pub id: String,
    /// Display text as it appears in the document.
    pub text: String,
    /// Category tag (person, organization, concept, ...).
    #[serde(default, alias = "type")]
    pub kind: String,
}

/// A directed relationship between two extracted entities.
///
/// `source` and `target` reference [`Entity::id`] values. Endpoints that
/// fail to resolve are detected by the reconciler, never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    /// Relationship type tag (mentions, depends-on, ...).
    #[serde(default, alias = "type")]
    pub kind: String,
}

/// Qualitative signal scores, each constrained to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAnalysis {
    pub structural: f64,
    pub process: f64,
    pub quantitative: f64,
    pub technical: f64,
    pub argumentative: f64,
    pub temporal: f64,
}

impl SignalAnalysis {
    /// Clamp every score into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self {
            structural: self.structural.clamp(0.0, 1.0),
            process: self.process.clamp(0.0, 1.0),
            quantitative: self.quantitative.clamp(0.0, 1.0),
            technical: self.technical.clamp(0.0, 1.0),
            argumentative: self.argumentative.clamp(0.0, 1.0),
            temporal: self.temporal.clamp(0.0, 1.0),
        }
    }
}

/// A key performance indicator surfaced by the executive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub label: String,
    pub value: f64,
    pub unit: String,
}

impl Kpi {
    /// A KPI is retained only when its value is finite and both label
    /// and unit are non-empty.
    pub fn is_well_formed(&self) -> bool {
        self.value.is_finite() && !self.label.is_empty() && !self.unit.is_empty()
    }
}

/// Executive-level summary of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub headline: String,
    #[serde(default)]
    pub key_ideas: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub call_to_action: String,
}

/// Summary of one section, mirroring the document's section tree shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    /// Id of the section this report summarizes.
    pub section_id: String,
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub children: Vec<SectionReport>,
}

/// A suggested way to visualize the analyzed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationRecommendation {
    /// Visualization type tag (structured-view, mind-map, timeline, ...).
    #[serde(alias = "type")]
    pub kind: String,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
}

/// Locally computed counts describing the document and its analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub word_count: usize,
    pub section_count: usize,
    pub entity_count: usize,
    pub relationship_count: usize,
}

/// Per-run accounting attached to the final analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Total usage units consumed across every completion call.
    pub tokens_used: u64,
    /// Deduplicated, sorted list of model identifiers seen during the run.
    pub models: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// The aggregate analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_id: String,
    pub tldr: String,
    pub executive_summary: ExecutiveSummary,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub metrics: DocumentMetrics,
    pub signals: SignalAnalysis,
    pub sections: Vec<SectionReport>,
    pub recommendations: Vec<VisualizationRecommendation>,
    pub metadata: AnalysisMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_clamping() {
        let signals = SignalAnalysis {
            structural: 1.7,
            process: -0.2,
            quantitative: 0.4,
            technical: f64::MAX,
            argumentative: 0.0,
            temporal: 1.0,
        }
        .clamped();
        assert_eq!(signals.structural, 1.0);
        assert_eq!(signals.process, 0.0);
        assert_eq!(signals.quantitative, 0.4);
        assert_eq!(signals.technical, 1.0);
        assert_eq!(signals.temporal, 1.0);
    }

    #[test]
    fn test_kpi_well_formed() {
        let good = Kpi { label: "revenue".into(), value: 12.5, unit: "M".into() };
        assert!(good.is_well_formed());

        let nan = Kpi { label: "revenue".into(), value: f64::NAN, unit: "M".into() };
        assert!(!nan.is_well_formed());

        let no_label = Kpi { label: String::new(), value: 1.0, unit: "%".into() };
        assert!(!no_label.is_well_formed());

        let no_unit = Kpi { label: "growth".into(), value: 1.0, unit: String::new() };
        assert!(!no_unit.is_well_formed());
    }

    #[test]
    fn test_entity_accepts_type_alias() {
        let entity: Entity =
            serde_json::from_str(r#"{"id":"e1","text":"Acme","type":"organization"}"#).unwrap();
        assert_eq!(entity.kind, "organization");
    }
}
