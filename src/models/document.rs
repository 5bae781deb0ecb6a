//! Document model for analysis input.
//!
//! A document carries its full text plus a recursive section structure.
//! The structure is supplied fully formed before analysis begins; the
//! pipeline never restructures it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::word_count;

/// Document-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Whitespace-separated word count of the full content.
    pub word_count: usize,
    /// Document title, if known.
    #[serde(default)]
    pub title: Option<String>,
}

/// One node in a document's section tree.
///
/// Sections nest recursively and are tree-shaped (no cycles). The
/// analysis pipeline reads them but does not modify them; per-section
/// summaries are produced as a parallel [`SectionReport`] tree.
///
/// [`SectionReport`]: crate::models::SectionReport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Identifier, unique within the document.
    pub id: String,
    /// Heading text, if the section has one.
    #[serde(default)]
    pub heading: Option<String>,
    /// Body text of this section (excluding children).
    pub content: String,
    /// Ordered child sections.
    #[serde(default)]
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            heading: None,
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Section::node_count).sum::<usize>()
    }
}

/// A document submitted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier for this document.
    pub id: String,
    /// Full text content.
    pub content: String,
    /// Ordered, recursively nested sections.
    pub structure: Vec<Section>,
    /// Document metadata.
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document with a flat single-section structure.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: DocumentMetadata {
                word_count: word_count(&content),
                title: None,
            },
            structure: vec![Section::new(content.clone())],
            content,
        }
    }

    /// Build a document from raw text, deriving the section tree from
    /// markdown-style headings.
    ///
    /// Consecutive `#`-prefixed heading lines open sections; deeper
    /// heading levels nest under shallower ones. Text before the first
    /// heading becomes a preamble section. Plain text without headings
    /// yields a single section.
    pub fn from_text(content: impl Into<String>, title: Option<String>) -> Self {
        let content = content.into();
        let structure = parse_sections(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: DocumentMetadata {
                word_count: word_count(&content),
                title,
            },
            structure,
            content,
        }
    }

    /// Total section count across the whole tree.
    pub fn section_count(&self) -> usize {
        self.structure.iter().map(Section::node_count).sum()
    }
}

/// Split markdown-ish text into a nested section tree by heading level.
fn parse_sections(text: &str) -> Vec<Section> {
    struct Open {
        level: usize,
        heading: Option<String>,
        body: String,
        children: Vec<Section>,
    }

    impl Open {
        fn close(self) -> Section {
            Section {
                id: Uuid::new_v4().to_string(),
                heading: self.heading,
                content: self.body.trim().to_string(),
                children: self.children,
            }
        }
    }

    let mut roots: Vec<Section> = Vec::new();
    // Stack of open sections, outermost first.
    let mut stack: Vec<Open> = Vec::new();

    let attach = |stack: &mut Vec<Open>, roots: &mut Vec<Section>, section: Section| {
        match stack.last_mut() {
            Some(parent) => parent.children.push(section),
            None => roots.push(section),
        }
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        let level = trimmed.bytes().take_while(|b| *b == b'#').count();
        let is_heading = level > 0 && trimmed.as_bytes().get(level) == Some(&b' ');

        if is_heading {
            // Close open sections at the same or deeper level.
            while stack.last().is_some_and(|open| open.level >= level) {
                let closed = stack.pop().expect("stack is non-empty").close();
                attach(&mut stack, &mut roots, closed);
            }
            stack.push(Open {
                level,
                heading: Some(trimmed[level..].trim().to_string()),
                body: String::new(),
                children: Vec::new(),
            });
        } else {
            match stack.last_mut() {
                Some(open) => {
                    open.body.push_str(line);
                    open.body.push('\n');
                }
                None => {
                    // Preamble before the first heading.
                    if !line.trim().is_empty() {
                        stack.push(Open {
                            level: usize::MAX,
                            heading: None,
                            body: format!("{line}\n"),
                            children: Vec::new(),
                        });
                    }
                }
            }
        }
    }

    while let Some(open) = stack.pop() {
        let closed = open.close();
        attach(&mut stack, &mut roots, closed);
    }

    if roots.is_empty() && !text.trim().is_empty() {
        roots.push(Section::new(text.trim()));
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_single_section() {
        let doc = Document::from_text("just a paragraph of text", None);
        assert_eq!(doc.structure.len(), 1);
        assert_eq!(doc.structure[0].content, "just a paragraph of text");
        assert_eq!(doc.metadata.word_count, 5);
    }

    #[test]
    fn test_headings_nest_by_level() {
        let text = "# Top\nintro\n## Inner\ndetail\n# Second\nmore";
        let doc = Document::from_text(text, Some("t".into()));
        assert_eq!(doc.structure.len(), 2);
        assert_eq!(doc.structure[0].heading.as_deref(), Some("Top"));
        assert_eq!(doc.structure[0].content, "intro");
        assert_eq!(doc.structure[0].children.len(), 1);
        assert_eq!(doc.structure[0].children[0].heading.as_deref(), Some("Inner"));
        assert_eq!(doc.structure[1].heading.as_deref(), Some("Second"));
    }

    #[test]
    fn test_preamble_before_first_heading() {
        let text = "leading words\n# Head\nbody";
        let doc = Document::from_text(text, None);
        assert_eq!(doc.structure.len(), 2);
        assert!(doc.structure[0].heading.is_none());
        assert_eq!(doc.structure[0].content, "leading words");
    }

    #[test]
    fn test_section_count_recursive() {
        let text = "# A\nx\n## B\ny\n## C\nz";
        let doc = Document::from_text(text, None);
        assert_eq!(doc.section_count(), 3);
    }

    #[test]
    fn test_hash_without_space_is_not_heading() {
        let doc = Document::from_text("#tag in plain text", None);
        assert_eq!(doc.structure.len(), 1);
        assert!(doc.structure[0].heading.is_none());
    }
}
