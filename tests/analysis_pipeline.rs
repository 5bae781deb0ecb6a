//! End-to-end pipeline contract tests against a scripted backend.

use std::sync::Arc;

use tokio::sync::mpsc;

use docsight::analysis::{AnalysisPipeline, ProgressUpdate};
use docsight::config::AnalysisConfig;
use docsight::llm::{MockBackend, PromptTemplate, ScriptedResponse};
use docsight::models::Document;

const SIGNALS_JSON: &str = r#"{"structural": 0.9, "process": 0.1, "quantitative": 0.7,
                               "technical": 0.6, "argumentative": 0.2, "temporal": 0.3}"#;

fn healthy_backend() -> MockBackend {
    MockBackend::new()
        .with_default(PromptTemplate::Tldr, ScriptedResponse::ok(r#"{"summary": "gist"}"#))
        .with_default(
            PromptTemplate::ExecutiveSummary,
            ScriptedResponse::ok(
                r#"{"headline": "Findings", "key_ideas": ["a", "b"],
                    "kpis": [{"label": "uptime", "value": 99.9, "unit": "%"}],
                    "risks": ["r1"], "opportunities": [], "call_to_action": "go"}"#,
            ),
        )
        .with_default(
            PromptTemplate::Entities,
            ScriptedResponse::ok(
                r#"[{"id": "e1", "text": "Acme", "kind": "organization"},
                    {"id": "e2", "text": "Widget", "kind": "product"}]"#,
            ),
        )
        .with_default(PromptTemplate::Signals, ScriptedResponse::ok(SIGNALS_JSON))
        .with_default(
            PromptTemplate::Relationships,
            ScriptedResponse::ok(r#"[{"source": "e1", "target": "e2", "kind": "produces"}]"#),
        )
        .with_default(
            PromptTemplate::SectionSummary,
            ScriptedResponse::ok(r#"{"summary": "section gist", "keywords": ["k1"]}"#),
        )
        .with_default(
            PromptTemplate::Recommendations,
            ScriptedResponse::ok(
                r#"[{"kind": "network-graph", "score": 0.9, "rationale": "entities"},
                    {"kind": "bar-chart", "score": 0.6, "rationale": "kpis"}]"#,
            ),
        )
}

fn sample_document() -> Document {
    let body = "word ".repeat(40);
    let text = format!("# Intro\n{body}\n## Detail\n{body}\n# Wrap-up\nshort tail");
    Document::from_text(text, Some("sample".into()))
}

fn fast_config() -> AnalysisConfig {
    AnalysisConfig {
        retry_base_delay_ms: 1,
        ..AnalysisConfig::default()
    }
}

/// Run an analysis while collecting every progress update.
async fn analyze_collecting(
    pipeline: &AnalysisPipeline,
    document: &Document,
    quick: bool,
) -> (
    Result<docsight::models::DocumentAnalysis, docsight::analysis::AnalysisError>,
    Vec<ProgressUpdate>,
) {
    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(64);
    let collector = tokio::spawn(async move {
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        updates
    });

    let result = if quick {
        pipeline.analyze_quick(document, Some(tx)).await
    } else {
        pipeline.analyze(document, Some(tx)).await
    };

    let updates = collector.await.expect("collector task");
    (result, updates)
}

#[tokio::test]
async fn progress_is_monotone_and_ends_at_100() {
    let pipeline = AnalysisPipeline::new(Arc::new(healthy_backend()), fast_config());
    let document = sample_document();

    let (result, updates) = analyze_collecting(&pipeline, &document, false).await;
    assert!(result.is_ok());

    let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
    assert_eq!(percents, vec![5, 10, 30, 35, 50, 65, 85, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(updates.last().unwrap().step.as_str(), "complete");
}

#[tokio::test]
async fn early_results_carry_partial_summaries() {
    let pipeline = AnalysisPipeline::new(Arc::new(healthy_backend()), fast_config());
    let document = sample_document();

    let (_, updates) = analyze_collecting(&pipeline, &document, false).await;
    let early = updates
        .iter()
        .find(|u| u.step.as_str() == "early-results")
        .expect("early-results update");
    let partial = early.partial.as_ref().expect("partial result");
    assert_eq!(partial.tldr, "gist");
    assert_eq!(partial.executive_summary.headline, "Findings");

    // No other update carries a partial
    assert_eq!(updates.iter().filter(|u| u.partial.is_some()).count(), 1);
}

#[tokio::test]
async fn degraded_backend_still_yields_complete_analysis() {
    // Everything except tl;dr returns garbage; the analysis must still
    // assemble with the documented fallbacks.
    let backend = MockBackend::new()
        .with_default(PromptTemplate::Tldr, ScriptedResponse::ok(r#"{"summary": "gist"}"#))
        .with_default(PromptTemplate::ExecutiveSummary, ScriptedResponse::ok("<<garbage>>"))
        .with_default(PromptTemplate::Entities, ScriptedResponse::ok("also garbage"))
        .with_default(PromptTemplate::Signals, ScriptedResponse::ok("not a vector"))
        .with_default(PromptTemplate::SectionSummary, ScriptedResponse::ok("plain prose"))
        .with_default(PromptTemplate::Recommendations, ScriptedResponse::ok("nothing"));
    let backend = Arc::new(backend);
    let pipeline = AnalysisPipeline::new(backend.clone(), fast_config());
    let document = sample_document();

    let analysis = pipeline.analyze(&document, None).await.unwrap();

    assert_eq!(analysis.tldr, "gist");
    assert_eq!(analysis.executive_summary.headline, "Document Summary");
    assert_eq!(analysis.executive_summary.key_ideas, vec!["<<garbage>>".to_string()]);
    assert_eq!(analysis.executive_summary.call_to_action, "Review the document for details");
    assert!(analysis.entities.is_empty());
    assert!(analysis.relationships.is_empty());
    // zero entities => the relationship template is never called
    assert_eq!(backend.call_count(PromptTemplate::Relationships), 0);
    // fallback signal vector
    assert_eq!(analysis.signals.structural, 0.5);
    assert_eq!(analysis.signals.process, 0.3);
    assert_eq!(analysis.signals.quantitative, 0.3);
    assert_eq!(analysis.signals.technical, 0.2);
    assert_eq!(analysis.signals.argumentative, 0.3);
    assert_eq!(analysis.signals.temporal, 0.2);
    // recommendation fallback pair, structured-view first
    assert_eq!(analysis.recommendations.len(), 2);
    assert_eq!(analysis.recommendations[0].kind, "structured-view");
    assert_eq!(analysis.recommendations[0].score, 1.0);
}

#[tokio::test]
async fn recommendations_always_contain_one_structured_view() {
    let backend = healthy_backend();
    backend.set_default(
        PromptTemplate::Recommendations,
        ScriptedResponse::ok(
            r#"[{"kind": "timeline", "score": 0.9, "rationale": "a"},
                {"kind": "network-graph", "score": 0.8, "rationale": "b"},
                {"kind": "bar-chart", "score": 0.7, "rationale": "c"},
                {"kind": "flow-diagram", "score": 0.6, "rationale": "d"},
                {"kind": "mind-map", "score": 0.5, "rationale": "e"},
                {"kind": "heatmap", "score": 0.4, "rationale": "f"}]"#,
        ),
    );
    let pipeline = AnalysisPipeline::new(Arc::new(backend), fast_config());
    let document = sample_document();

    let analysis = pipeline.analyze(&document, None).await.unwrap();
    assert!(analysis.recommendations.len() <= 5);
    assert_eq!(
        analysis
            .recommendations
            .iter()
            .filter(|r| r.kind == "structured-view")
            .count(),
        1
    );
}

#[tokio::test]
async fn kpis_are_filtered_for_well_formedness() {
    let backend = healthy_backend();
    backend.set_default(
        PromptTemplate::ExecutiveSummary,
        ScriptedResponse::ok(
            r#"{"headline": "h",
                "kpis": [{"label": "good", "value": 1.0, "unit": "x"},
                         {"label": "bad", "value": null, "unit": "x"},
                         {"label": "worse", "value": 2.0}]}"#,
        ),
    );
    let pipeline = AnalysisPipeline::new(Arc::new(backend), fast_config());
    let document = sample_document();

    let analysis = pipeline.analyze(&document, None).await.unwrap();
    assert_eq!(analysis.executive_summary.kpis.len(), 1);
    assert_eq!(analysis.executive_summary.kpis[0].label, "good");
}

#[tokio::test]
async fn short_sections_are_copied_verbatim() {
    let backend = Arc::new(healthy_backend());
    let pipeline = AnalysisPipeline::new(backend.clone(), fast_config());
    // 40-char content sits below the 50-char threshold
    let content = "exactly forty characters of content here";
    assert_eq!(content.len(), 40);
    let document = Document::from_text(content, None);

    let analysis = pipeline.analyze(&document, None).await.unwrap();
    assert_eq!(analysis.sections.len(), 1);
    assert_eq!(analysis.sections[0].summary, content);
    assert_eq!(backend.call_count(PromptTemplate::SectionSummary), 0);
}

#[tokio::test]
async fn tldr_transport_exhaustion_is_the_only_fatal_path() {
    let backend = healthy_backend();
    backend.set_default(PromptTemplate::Tldr, ScriptedResponse::error("unreachable"));
    let pipeline = AnalysisPipeline::new(Arc::new(backend), fast_config());
    let document = sample_document();

    let (result, updates) = analyze_collecting(&pipeline, &document, false).await;
    assert!(result.is_err());
    // The run aborted before completion
    assert!(updates.iter().all(|u| u.step.as_str() != "complete"));
}

#[tokio::test]
async fn usage_metadata_dedupes_models() {
    let backend = MockBackend::new()
        .with_default(
            PromptTemplate::Tldr,
            ScriptedResponse::ok_with(r#"{"summary": "gist"}"#, 100, "model-x"),
        )
        .with_default(
            PromptTemplate::ExecutiveSummary,
            ScriptedResponse::ok_with(r#"{"headline": "h"}"#, 200, "model-x"),
        )
        .with_default(PromptTemplate::Entities, ScriptedResponse::ok_with("[]", 50, "model-y"))
        .with_default(PromptTemplate::Signals, ScriptedResponse::ok_with(SIGNALS_JSON, 25, "model-y"))
        .with_default(
            PromptTemplate::Recommendations,
            ScriptedResponse::ok_with("[]", 5, "model-x"),
        );
    let pipeline = AnalysisPipeline::new(Arc::new(backend), fast_config());
    let document = Document::from_text("tiny", None);

    let analysis = pipeline.analyze(&document, None).await.unwrap();
    assert_eq!(analysis.metadata.tokens_used, 380);
    assert_eq!(analysis.metadata.models, vec!["model-x", "model-y"]);
}

#[tokio::test]
async fn quick_variant_emits_checkpoint_subset() {
    let backend = Arc::new(healthy_backend());
    let pipeline = AnalysisPipeline::new(backend.clone(), fast_config());
    let document = sample_document();

    let (result, updates) = analyze_collecting(&pipeline, &document, true).await;
    let analysis = result.unwrap();

    let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
    assert_eq!(percents, vec![5, 10, 30, 65, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));

    assert!(analysis.entities.is_empty());
    assert_eq!(analysis.recommendations[0].kind, "structured-view");
    assert_eq!(backend.call_count(PromptTemplate::Entities), 0);
    assert_eq!(backend.call_count(PromptTemplate::Recommendations), 0);
}

#[tokio::test]
async fn concurrent_runs_keep_usage_isolated() {
    let backend = Arc::new(
        MockBackend::new()
            .with_default(
                PromptTemplate::Tldr,
                ScriptedResponse::ok_with(r#"{"summary": "gist"}"#, 10, "m"),
            )
            .with_default(
                PromptTemplate::ExecutiveSummary,
                ScriptedResponse::ok_with(r#"{"headline": "h"}"#, 10, "m"),
            )
            .with_default(PromptTemplate::Entities, ScriptedResponse::ok_with("[]", 10, "m"))
            .with_default(PromptTemplate::Signals, ScriptedResponse::ok_with(SIGNALS_JSON, 10, "m"))
            .with_default(PromptTemplate::Recommendations, ScriptedResponse::ok_with("[]", 10, "m")),
    );
    let pipeline = Arc::new(AnalysisPipeline::new(backend, fast_config()));
    let document = Document::from_text("tiny", None);

    let (a, b) = tokio::join!(
        pipeline.analyze(&document, None),
        pipeline.analyze(&document, None),
    );
    // Each run owns its tracker: totals match a single run's spend.
    assert_eq!(a.unwrap().metadata.tokens_used, 50);
    assert_eq!(b.unwrap().metadata.tokens_used, 50);
}
