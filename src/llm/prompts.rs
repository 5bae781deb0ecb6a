//! Prompt templates for each analysis stage.
//!
//! Every template instructs the model to answer with ONLY a JSON value so
//! the lenient parser has a fighting chance. `{content}` is replaced with
//! the (already truncated) stage input.

/// Prompt for the short tl;dr summary.
pub const TLDR_PROMPT: &str = r#"You are summarizing a document for a reader in a hurry. Read the content and produce a 2-3 sentence summary of what the document is about and what it concludes.

Document Content:
{content}

Respond with ONLY a JSON object: {"summary": "<2-3 sentence summary>"}. No formatting or preamble."#;

/// Prompt for the executive summary with KPIs, risks, and opportunities.
pub const EXECUTIVE_SUMMARY_PROMPT: &str = r#"You are preparing an executive briefing on a document. Identify the headline finding, the key ideas, any quantified indicators, and the risks and opportunities it raises.

Document Content:
{content}

Respond with ONLY a JSON object:
{"headline": "...", "key_ideas": ["..."], "kpis": [{"label": "...", "value": 0, "unit": "..."}], "risks": ["..."], "opportunities": ["..."], "call_to_action": "..."}

Every KPI value must be a plain number. No formatting or preamble."#;

/// Prompt for entity extraction.
pub const ENTITIES_PROMPT: &str = r#"Extract the named entities from this document: people, organizations, places, products, and central concepts.

Document Content:
{content}

Respond with ONLY a JSON array of objects: [{"id": "e1", "text": "<display text>", "kind": "<person|organization|place|product|concept>"}]. Assign each entity a short unique id. No formatting or preamble."#;

/// Prompt for qualitative signal scoring.
pub const SIGNALS_PROMPT: &str = r#"Score this document on six qualitative signals, each between 0 and 1:
- structural: how much hierarchical/organized structure the text exhibits
- process: how much it describes sequences, workflows, or procedures
- quantitative: how numbers-driven it is
- technical: how much specialized/technical vocabulary it uses
- argumentative: how much it argues toward a position
- temporal: how much it is organized around dates or chronology

Document Content:
{content}

Respond with ONLY a JSON object: {"structural": 0.0, "process": 0.0, "quantitative": 0.0, "technical": 0.0, "argumentative": 0.0, "temporal": 0.0}. No formatting or preamble."#;

/// Prompt for relationship detection between already-extracted entities.
///
/// The stage prepends the known-entity list to the truncated document
/// text before substitution.
pub const RELATIONSHIPS_PROMPT: &str = r#"Given a document and the entities extracted from it, identify relationships between those entities.

{content}

Respond with ONLY a JSON array: [{"source": "<entity id>", "target": "<entity id>", "kind": "<relationship type>"}]. Use entity ids, not their display text. No formatting or preamble."#;

/// Prompt for summarizing one section of the document.
pub const SECTION_SUMMARY_PROMPT: &str = r#"Summarize this section of a larger document in 1-2 sentences and pick up to 5 keywords.

Section Content:
{content}

Respond with ONLY a JSON object: {"summary": "...", "keywords": ["..."]}. No formatting or preamble."#;

/// Prompt for visualization recommendations.
///
/// The stage prepends the numeric context (word/section/entity/
/// relationship counts and the signal vector) to the text sample.
pub const RECOMMENDATIONS_PROMPT: &str = r#"Recommend up to 5 ways to visualize an analyzed document, given these statistics and a sample of the text.

{content}

Respond with ONLY a JSON array: [{"kind": "<structured-view|mind-map|timeline|network-graph|bar-chart|flow-diagram>", "score": 0.0, "rationale": "..."}] ordered by score descending. No formatting or preamble."#;

/// Named template key for one completion call.
///
/// Each analysis stage calls the backend with its own template; backends
/// use the key to select the prompt and tests use it to script responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptTemplate {
    Tldr,
    ExecutiveSummary,
    Entities,
    Signals,
    Relationships,
    SectionSummary,
    Recommendations,
}

impl PromptTemplate {
    /// Stable string key, used in logs and scripted test backends.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Tldr => "tldr",
            Self::ExecutiveSummary => "executive-summary",
            Self::Entities => "entities",
            Self::Signals => "signals",
            Self::Relationships => "relationships",
            Self::SectionSummary => "section-summary",
            Self::Recommendations => "recommendations",
        }
    }

    /// The prompt text for this template.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Tldr => TLDR_PROMPT,
            Self::ExecutiveSummary => EXECUTIVE_SUMMARY_PROMPT,
            Self::Entities => ENTITIES_PROMPT,
            Self::Signals => SIGNALS_PROMPT,
            Self::Relationships => RELATIONSHIPS_PROMPT,
            Self::SectionSummary => SECTION_SUMMARY_PROMPT,
            Self::Recommendations => RECOMMENDATIONS_PROMPT,
        }
    }

    /// Render the prompt with the stage input substituted for `{content}`.
    pub fn render(&self, content: &str) -> String {
        self.prompt().replace("{content}", content)
    }
}

impl std::fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_content() {
        let rendered = PromptTemplate::Tldr.render("THE TEXT");
        assert!(rendered.contains("THE TEXT"));
        assert!(!rendered.contains("{content}"));
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys = [
            PromptTemplate::Tldr,
            PromptTemplate::ExecutiveSummary,
            PromptTemplate::Entities,
            PromptTemplate::Signals,
            PromptTemplate::Relationships,
            PromptTemplate::SectionSummary,
            PromptTemplate::Recommendations,
        ]
        .map(|t| t.key());
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
