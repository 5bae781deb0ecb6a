//! Stage functions: one completion call each, parsed leniently with a
//! deterministic fallback per stage.
//!
//! Every stage records usage into the tracker whenever a call completes,
//! whether or not its content parses. Only the tl;dr stage can fail the
//! run; all other stages absorb transport and parse failures locally so
//! the pipeline always reaches completion.

use serde::Deserialize;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::llm::{parse_completion, CompletionBackend, LlmError, PromptTemplate};
use crate::models::{
    DocumentMetrics, Entity, ExecutiveSummary, Kpi, Relationship, SignalAnalysis,
    VisualizationRecommendation,
};
use crate::utils::truncate_utf8;

use super::usage::UsageTracker;

/// Maximum characters of raw completion salvaged for the tl;dr fallback.
const TLDR_FALLBACK_CHARS: usize = 300;
/// Maximum characters of raw completion quoted as the fallback key idea.
const KEY_IDEA_FALLBACK_CHARS: usize = 200;
/// Maximum entries in the recommendation list.
const MAX_RECOMMENDATIONS: usize = 5;

pub const STRUCTURED_VIEW: &str = "structured-view";
pub const MIND_MAP: &str = "mind-map";

/// Fallback signal vector used when signal scoring cannot be parsed.
pub fn default_signals() -> SignalAnalysis {
    SignalAnalysis {
        structural: 0.5,
        process: 0.3,
        quantitative: 0.3,
        technical: 0.2,
        argumentative: 0.3,
        temporal: 0.2,
    }
}

#[derive(Debug, Deserialize)]
struct TldrWire {
    #[serde(alias = "tldr")]
    summary: String,
}

/// Generate the short summary. The one stage with a retry budget: a
/// transport failure that survives every attempt propagates and aborts
/// the whole run. Unparseable content is still recovered locally.
pub async fn generate_tldr(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    config: &AnalysisConfig,
) -> Result<String, LlmError> {
    let input = truncate_utf8(text, config.tldr_chars);
    let completion = config
        .tldr_retry_policy()
        .run("tldr", || backend.complete(PromptTemplate::Tldr, input))
        .await?;
    usage.record(completion.tokens_used, &completion.model);

    match parse_completion::<TldrWire>(&completion.content) {
        Ok(wire) => Ok(wire.summary),
        Err(failure) => {
            warn!("tldr response unparseable, salvaging raw text: {}", failure.error);
            Ok(truncate_utf8(failure.raw.trim(), TLDR_FALLBACK_CHARS).to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecutiveSummaryWire {
    headline: String,
    #[serde(default, alias = "keyIdeas")]
    key_ideas: Vec<String>,
    /// Raw values so one malformed KPI drops alone instead of failing
    /// the whole parse.
    #[serde(default)]
    kpis: Vec<serde_json::Value>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
    #[serde(default, alias = "callToAction")]
    call_to_action: String,
}

impl ExecutiveSummaryWire {
    fn into_summary(self) -> ExecutiveSummary {
        let kpis = self
            .kpis
            .into_iter()
            .filter_map(|value| serde_json::from_value::<Kpi>(value).ok())
            .filter(Kpi::is_well_formed)
            .collect();
        ExecutiveSummary {
            headline: self.headline,
            key_ideas: self.key_ideas,
            kpis,
            risks: self.risks,
            opportunities: self.opportunities,
            call_to_action: self.call_to_action,
        }
    }
}

/// The deterministic executive-summary fallback. When raw completion
/// content is available its first 200 characters become the single key
/// idea; a transport failure leaves the idea list empty.
pub fn fallback_executive_summary(raw: Option<&str>) -> ExecutiveSummary {
    let key_ideas = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| vec![truncate_utf8(raw, KEY_IDEA_FALLBACK_CHARS).to_string()])
        .unwrap_or_default();
    ExecutiveSummary {
        headline: "Document Summary".to_string(),
        key_ideas,
        kpis: Vec::new(),
        risks: Vec::new(),
        opportunities: Vec::new(),
        call_to_action: "Review the document for details".to_string(),
    }
}

/// Generate the executive summary, filtering malformed KPIs.
pub async fn generate_executive_summary(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    config: &AnalysisConfig,
) -> ExecutiveSummary {
    let input = truncate_utf8(text, config.summary_chars);
    let completion = match backend.complete(PromptTemplate::ExecutiveSummary, input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("executive-summary call failed: {}, using fallback", err);
            return fallback_executive_summary(None);
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    match parse_completion::<ExecutiveSummaryWire>(&completion.content) {
        Ok(wire) => wire.into_summary(),
        Err(failure) => {
            warn!("executive-summary response unparseable: {}", failure.error);
            fallback_executive_summary(Some(&failure.raw))
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityListWire {
    entities: Vec<Entity>,
}

/// Extract named entities. Failures of any kind yield an empty list,
/// which in turn short-circuits relationship detection.
pub async fn extract_entities(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    config: &AnalysisConfig,
) -> Vec<Entity> {
    let input = truncate_utf8(text, config.entity_chars);
    let completion = match backend.complete(PromptTemplate::Entities, input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("entity extraction call failed: {}, continuing without entities", err);
            return Vec::new();
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    let parsed = parse_completion::<Vec<Entity>>(&completion.content)
        .or_else(|_| parse_completion::<EntityListWire>(&completion.content).map(|w| w.entities));
    match parsed {
        Ok(entities) => entities,
        Err(failure) => {
            warn!("entity response unparseable: {}", failure.error);
            Vec::new()
        }
    }
}

/// Score the six qualitative signals, clamping each into [0, 1].
pub async fn score_signals(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    config: &AnalysisConfig,
) -> SignalAnalysis {
    let input = truncate_utf8(text, config.signal_chars);
    let completion = match backend.complete(PromptTemplate::Signals, input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("signal analysis call failed: {}, using defaults", err);
            return default_signals();
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    match parse_completion::<SignalAnalysis>(&completion.content) {
        Ok(signals) => signals.clamped(),
        Err(failure) => {
            warn!("signal response unparseable: {}", failure.error);
            default_signals()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelationshipListWire {
    relationships: Vec<Relationship>,
}

/// Detect relationships between already-extracted entities.
///
/// With no entities there is nothing to relate: returns empty without a
/// completion call. Endpoint validity is checked afterwards by the
/// reconciler, not here.
pub async fn detect_relationships(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    entities: &[Entity],
    config: &AnalysisConfig,
) -> Vec<Relationship> {
    if entities.is_empty() {
        return Vec::new();
    }

    let listing = entities
        .iter()
        .map(|e| format!("{}: {}", e.id, e.text))
        .collect::<Vec<_>>()
        .join("\n");
    let input = format!(
        "Known entities (id: text):\n{}\n\nDocument Content:\n{}",
        listing,
        truncate_utf8(text, config.relationship_chars)
    );

    let completion = match backend.complete(PromptTemplate::Relationships, &input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("relationship detection call failed: {}, continuing without relationships", err);
            return Vec::new();
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    let parsed = parse_completion::<Vec<Relationship>>(&completion.content).or_else(|_| {
        parse_completion::<RelationshipListWire>(&completion.content).map(|w| w.relationships)
    });
    match parsed {
        Ok(relationships) => relationships,
        Err(failure) => {
            warn!("relationship response unparseable: {}", failure.error);
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationListWire {
    recommendations: Vec<VisualizationRecommendation>,
}

fn structured_view_default() -> VisualizationRecommendation {
    VisualizationRecommendation {
        kind: STRUCTURED_VIEW.to_string(),
        score: 1.0,
        rationale: "A structured view works for any analyzed document".to_string(),
    }
}

/// Fixed recommendation pair used when the completion cannot be parsed.
pub fn fallback_recommendations() -> Vec<VisualizationRecommendation> {
    vec![
        structured_view_default(),
        VisualizationRecommendation {
            kind: MIND_MAP.to_string(),
            score: 0.8,
            rationale: "Mind maps surface the document's main topics".to_string(),
        },
    ]
}

/// Enforce the recommendation invariants: exactly one structured-view
/// entry (first parsed occurrence wins, one is inserted when absent)
/// and at most five entries total.
pub fn normalize_recommendations(
    mut list: Vec<VisualizationRecommendation>,
) -> Vec<VisualizationRecommendation> {
    let mut seen_structured = false;
    list.retain(|rec| {
        if rec.kind == STRUCTURED_VIEW {
            if seen_structured {
                return false;
            }
            seen_structured = true;
        }
        true
    });
    list.truncate(MAX_RECOMMENDATIONS);
    if !list.iter().any(|rec| rec.kind == STRUCTURED_VIEW) {
        list.insert(0, structured_view_default());
        list.truncate(MAX_RECOMMENDATIONS);
    }
    list
}

/// Recommend visualizations from the analysis-wide numeric context and
/// a short text sample.
pub async fn recommend_visualizations(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    text: &str,
    metrics: &DocumentMetrics,
    signals: &SignalAnalysis,
    config: &AnalysisConfig,
) -> Vec<VisualizationRecommendation> {
    let sample = truncate_utf8(text, config.recommendation_chars);
    let input = format!(
        "Statistics:\n\
         - words: {}\n\
         - sections: {}\n\
         - entities: {}\n\
         - relationships: {}\n\
         - signals: structural {:.2}, process {:.2}, quantitative {:.2}, technical {:.2}, argumentative {:.2}, temporal {:.2}\n\n\
         Text Sample:\n{}",
        metrics.word_count,
        metrics.section_count,
        metrics.entity_count,
        metrics.relationship_count,
        signals.structural,
        signals.process,
        signals.quantitative,
        signals.technical,
        signals.argumentative,
        signals.temporal,
        sample
    );

    let completion = match backend.complete(PromptTemplate::Recommendations, &input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("recommendation call failed: {}, using fallback", err);
            return fallback_recommendations();
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    let parsed = parse_completion::<Vec<VisualizationRecommendation>>(&completion.content)
        .or_else(|_| {
            parse_completion::<RecommendationListWire>(&completion.content)
                .map(|w| w.recommendations)
        });
    match parsed {
        Ok(list) => normalize_recommendations(list),
        Err(failure) => {
            warn!("recommendation response unparseable: {}", failure.error);
            fallback_recommendations()
        }
    }
}
