//! Cross-checks relationship endpoints against extracted entities.
//!
//! Completion services sometimes echo entity display text where an id
//! was asked for; that class of error is detected and classified here.
//! Relationships are never rewritten or dropped — whether a downstream
//! consumer corrects them is its own decision.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::{Entity, Relationship};

/// How many mismatches to include in the diagnostic log line.
const LOG_SAMPLE_SIZE: usize = 3;

/// Which endpoint of a relationship failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointField {
    Source,
    Target,
}

impl EndpointField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

/// Why an endpoint failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// The endpoint matches an entity's display text instead of its id.
    TextInsteadOfId,
    /// The endpoint matches nothing we extracted.
    UnknownEndpoint,
}

impl MismatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextInsteadOfId => "using text instead of id",
            Self::UnknownEndpoint => "unknown endpoint",
        }
    }
}

/// One unresolved relationship endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMismatch {
    /// Index of the offending relationship in the stage output.
    pub index: usize,
    pub field: EndpointField,
    /// The endpoint value that failed to resolve.
    pub value: String,
    pub kind: MismatchKind,
}

/// Check every relationship endpoint against the known entity ids.
///
/// Endpoints that are not known ids but match a known display text are
/// classified as [`MismatchKind::TextInsteadOfId`]; everything else
/// unresolved is [`MismatchKind::UnknownEndpoint`]. Findings are logged
/// with a bounded sample and returned for diagnostics.
pub fn reconcile_relationships(
    entities: &[Entity],
    relationships: &[Relationship],
) -> Vec<EndpointMismatch> {
    let ids: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    let texts: HashSet<&str> = entities.iter().map(|e| e.text.as_str()).collect();

    let classify = |value: &str| -> Option<MismatchKind> {
        if ids.contains(value) {
            None
        } else if texts.contains(value) {
            Some(MismatchKind::TextInsteadOfId)
        } else {
            Some(MismatchKind::UnknownEndpoint)
        }
    };

    let mut mismatches = Vec::new();
    for (index, rel) in relationships.iter().enumerate() {
        for (field, value) in [
            (EndpointField::Source, rel.source.as_str()),
            (EndpointField::Target, rel.target.as_str()),
        ] {
            if let Some(kind) = classify(value) {
                mismatches.push(EndpointMismatch {
                    index,
                    field,
                    value: value.to_string(),
                    kind,
                });
            }
        }
    }

    if mismatches.is_empty() {
        debug!(
            "All {} relationship endpoints resolve to known entities",
            relationships.len() * 2
        );
    } else {
        let sample: Vec<String> = mismatches
            .iter()
            .take(LOG_SAMPLE_SIZE)
            .map(|m| format!("#{} {} \"{}\" ({})", m.index, m.field.as_str(), m.value, m.kind.as_str()))
            .collect();
        warn!(
            "{} of {} relationships have unresolved endpoints, e.g. {}",
            mismatches.len(),
            relationships.len(),
            sample.join("; ")
        );
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, text: &str) -> Entity {
        Entity {
            id: id.to_string(),
            text: text.to_string(),
            kind: "concept".to_string(),
        }
    }

    fn relationship(source: &str, target: &str) -> Relationship {
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            kind: "mentions".to_string(),
        }
    }

    #[test]
    fn test_resolved_endpoints_produce_no_mismatches() {
        let entities = vec![entity("e1", "Acme"), entity("e2", "Bob")];
        let rels = vec![relationship("e1", "e2")];
        assert!(reconcile_relationships(&entities, &rels).is_empty());
    }

    #[test]
    fn test_text_instead_of_id_detected() {
        let entities = vec![entity("e1", "Acme"), entity("e2", "Bob")];
        let rels = vec![relationship("Acme", "e2")];

        let mismatches = reconcile_relationships(&entities, &rels);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, EndpointField::Source);
        assert_eq!(mismatches[0].kind, MismatchKind::TextInsteadOfId);
        assert_eq!(mismatches[0].kind.as_str(), "using text instead of id");
        assert_eq!(mismatches[0].value, "Acme");
    }

    #[test]
    fn test_unknown_endpoint_detected() {
        let entities = vec![entity("e1", "Acme")];
        let rels = vec![relationship("e1", "e99")];

        let mismatches = reconcile_relationships(&entities, &rels);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, EndpointField::Target);
        assert_eq!(mismatches[0].kind, MismatchKind::UnknownEndpoint);
    }

    #[test]
    fn test_both_endpoints_can_mismatch() {
        let entities = vec![entity("e1", "Acme")];
        let rels = vec![relationship("Acme", "nothing")];

        let mismatches = reconcile_relationships(&entities, &rels);
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].kind, MismatchKind::TextInsteadOfId);
        assert_eq!(mismatches[1].kind, MismatchKind::UnknownEndpoint);
    }

    #[test]
    fn test_relationships_never_dropped() {
        let entities = vec![entity("e1", "Acme")];
        let rels = vec![relationship("bogus", "also-bogus")];
        let _ = reconcile_relationships(&entities, &rels);
        assert_eq!(rels.len(), 1);
    }
}
