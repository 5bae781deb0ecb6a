//! Lenient parsing of completion output into typed shapes.
//!
//! Models wrap JSON in code fences, prepend prose, or return nothing
//! usable at all. Parsing here never panics and never loses the raw
//! content: a failed parse yields a [`ParseFailure`] that carries the
//! original text so stages can build their fallbacks from it.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// A completion that could not be parsed into the expected shape.
///
/// Keeps the raw content so the caller can still salvage something
/// (e.g., the executive-summary fallback quotes the first 200 chars).
#[derive(Debug)]
pub struct ParseFailure {
    /// The raw completion content, unmodified.
    pub raw: String,
    /// Why deserialization failed.
    pub error: serde_json::Error,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unparseable completion ({} bytes): {}", self.raw.len(), self.error)
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fence regex is valid")
    })
}

/// Extract the most plausible JSON payload from free-form model output.
///
/// Prefers a fenced code block; otherwise trims to the outermost
/// `{...}` or `[...]` span so leading/trailing prose doesn't break
/// deserialization.
fn extract_json(content: &str) -> &str {
    if let Some(caps) = fence_re().captures(content) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str();
        }
    }

    let trimmed = content.trim();
    let object = trimmed.find('{').and_then(|start| {
        trimmed.rfind('}').filter(|end| *end > start).map(|end| &trimmed[start..=end])
    });
    let array = trimmed.find('[').and_then(|start| {
        trimmed.rfind(']').filter(|end| *end > start).map(|end| &trimmed[start..=end])
    });

    // When both delimiters appear, take whichever opens first.
    match (object, array) {
        (Some(o), Some(a)) => {
            if trimmed.find('{') < trimmed.find('[') {
                o
            } else {
                a
            }
        }
        (Some(o), None) => o,
        (None, Some(a)) => a,
        (None, None) => trimmed,
    }
}

/// Parse a completion into `T`, tolerating fences and surrounding prose.
///
/// On failure the raw content travels back to the caller inside
/// [`ParseFailure`]; stages turn that into their deterministic fallbacks.
pub fn parse_completion<T: DeserializeOwned>(content: &str) -> Result<T, ParseFailure> {
    let candidate = extract_json(content);
    serde_json::from_str(candidate).map_err(|error| ParseFailure {
        raw: content.to_string(),
        error,
    })
}
