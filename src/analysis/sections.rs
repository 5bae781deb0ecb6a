//! Section-tree walker.
//!
//! Produces a [`SectionReport`] tree mirroring the document's section
//! structure. The walk is a post-order build: the input tree is read,
//! never mutated. Sibling subtrees fan out concurrently, and a node's
//! own summary call runs alongside its children's walks; everything is
//! joined before the stage completes.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::Deserialize;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::llm::{parse_completion, CompletionBackend, PromptTemplate};
use crate::models::{Section, SectionReport};
use crate::utils::truncate_utf8;

use super::usage::UsageTracker;

/// Maximum characters of section content used as the fallback summary.
const SECTION_FALLBACK_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SectionSummaryWire {
    summary: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Summarize every section tree in `sections`, preserving shape.
///
/// `threshold` is the verbatim cutoff: nodes whose content is at most
/// this long become their own summary without a completion call.
pub async fn summarize_sections(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    sections: &[Section],
    threshold: usize,
    config: &AnalysisConfig,
) -> Vec<SectionReport> {
    join_all(
        sections
            .iter()
            .map(|section| walk(backend, usage, section, threshold, config)),
    )
    .await
}

/// Recursively summarize one subtree.
fn walk<'a>(
    backend: &'a dyn CompletionBackend,
    usage: &'a UsageTracker,
    section: &'a Section,
    threshold: usize,
    config: &'a AnalysisConfig,
) -> BoxFuture<'a, SectionReport> {
    async move {
        let children = section
            .children
            .iter()
            .map(|child| walk(backend, usage, child, threshold, config));

        let (own, children) = tokio::join!(
            summarize_node(backend, usage, section, threshold, config),
            join_all(children),
        );

        let (summary, keywords) = own;
        SectionReport {
            section_id: section.id.clone(),
            summary,
            keywords,
            children,
        }
    }
    .boxed()
}

/// Summarize one node's own content.
async fn summarize_node(
    backend: &dyn CompletionBackend,
    usage: &UsageTracker,
    section: &Section,
    threshold: usize,
    config: &AnalysisConfig,
) -> (String, Vec<String>) {
    if section.content.len() <= threshold {
        return (section.content.clone(), Vec::new());
    }

    let input = truncate_utf8(&section.content, config.section_chars);
    let completion = match backend.complete(PromptTemplate::SectionSummary, input).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!("section summary call failed for {}: {}", section.id, err);
            return fallback(section);
        }
    };
    usage.record(completion.tokens_used, &completion.model);

    match parse_completion::<SectionSummaryWire>(&completion.content) {
        Ok(wire) => (wire.summary, wire.keywords),
        Err(failure) => {
            warn!("section summary unparseable for {}: {}", section.id, failure.error);
            fallback(section)
        }
    }
}

/// Truncated section content with no keywords.
fn fallback(section: &Section) -> (String, Vec<String>) {
    (
        truncate_utf8(&section.content, SECTION_FALLBACK_CHARS).to_string(),
        Vec::new(),
    )
}
