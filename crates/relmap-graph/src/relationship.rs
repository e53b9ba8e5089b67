//! Relationship and candidate types.
//!
//! A [`Candidate`] is an unscored proposal from a detection rule; a
//! [`Relationship`] is a scored, committed edge. Evidence travels with both
//! so a confidence can always be explained after the fact.

use relmap_core::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of relationship between two elements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Module A imports module B.
    Imports,

    /// Class A inherits from class B.
    Inherits,

    /// Function A calls function B.
    Calls,

    /// A mentions B by name (explicit doc reference).
    References,

    /// Documentation section A documents code element B.
    Documents,

    /// A uses B (composition, attribute types).
    Uses,

    /// Weak association with no more specific kind.
    RelatedTo,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Imports => "imports",
            Self::Inherits => "inherits",
            Self::Calls => "calls",
            Self::References => "references",
            Self::Documents => "documents",
            Self::Uses => "uses",
            Self::RelatedTo => "related_to",
        };
        write!(f, "{}", s)
    }
}

/// How a candidate was detected.
///
/// Each method carries a base reliability used by the default scorer:
/// exact structural resolution sits near 1.0, name co-occurrence well below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Declared import resolved by exact qualified name.
    ImportExact,
    /// Declared base class resolved through the name-resolution order.
    InheritanceResolved,
    /// Declared call resolved through the name-resolution order.
    CallResolved,
    /// Name co-occurrence in annotations; the weakest signal.
    NameCooccurrence,
    /// Doc mention matched a qualified name or trailing segment exactly.
    DocExact,
    /// Doc mention matched ignoring case.
    DocCaseInsensitive,
    /// Doc mention matched within a small edit distance.
    DocFuzzy,
}

impl DetectionMethod {
    /// Base reliability of this detection method, before ambiguity or
    /// similarity adjustments.
    pub fn reliability(&self) -> f32 {
        match self {
            Self::ImportExact => 0.95,
            Self::InheritanceResolved => 1.0,
            Self::CallResolved => 0.9,
            Self::NameCooccurrence => 0.4,
            Self::DocExact => 0.9,
            Self::DocCaseInsensitive => 0.8,
            Self::DocFuzzy => 0.6,
        }
    }

    /// True for the documentation-mention methods, which are subject to the
    /// cross-reference confidence threshold.
    pub fn is_cross_reference(&self) -> bool {
        matches!(
            self,
            Self::DocExact | Self::DocCaseInsensitive | Self::DocFuzzy
        )
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ImportExact => "import_exact",
            Self::InheritanceResolved => "inheritance_resolved",
            Self::CallResolved => "call_resolved",
            Self::NameCooccurrence => "name_cooccurrence",
            Self::DocExact => "doc_exact",
            Self::DocCaseInsensitive => "doc_case_insensitive",
            Self::DocFuzzy => "doc_fuzzy",
        };
        write!(f, "{}", s)
    }
}

/// One signal that contributed to a relationship's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Short signal name, e.g. `import-declaration` or `ambiguity-split`.
    pub signal: String,
    /// Human-readable detail for debugging.
    pub detail: String,
}

impl Evidence {
    /// Creates an evidence entry.
    pub fn new(signal: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            detail: detail.into(),
        }
    }
}

/// An unscored relationship proposal emitted by a detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: RelationshipKind,
    pub method: DetectionMethod,
    /// Number of tied targets this reference was split across (>= 1).
    pub fanout: usize,
    /// Textual similarity for cross-reference candidates, in [0, 1].
    pub similarity: Option<f32>,
    pub evidence: Vec<Evidence>,
}

impl Candidate {
    /// Creates an unambiguous candidate with no evidence yet.
    pub fn new(
        source: ElementId,
        target: ElementId,
        kind: RelationshipKind,
        method: DetectionMethod,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            method,
            fanout: 1,
            similarity: None,
            evidence: Vec::new(),
        }
    }

    /// Marks the candidate as one of `n` tied targets.
    pub fn with_fanout(mut self, n: usize) -> Self {
        self.fanout = n.max(1);
        self
    }

    /// Attaches a textual similarity score.
    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity.clamp(0.0, 1.0));
        self
    }

    /// Appends an evidence entry.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }
}

/// A committed, confidence-scored edge between two elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: ElementId,
    pub target: ElementId,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    pub confidence: f32,
    pub evidence: Vec<Evidence>,
}

impl Relationship {
    /// Creates a relationship with no evidence.
    pub fn new(
        source: ElementId,
        target: ElementId,
        kind: RelationshipKind,
        confidence: f32,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            confidence,
            evidence: Vec::new(),
        }
    }

    /// Appends an evidence entry.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{Element, ElementKind, Location};

    fn id(name: &str) -> ElementId {
        Element::new(
            ElementKind::Class,
            name,
            Location::new("a.py", 1, 1, 2, 1),
        )
        .id
    }

    #[test]
    fn test_reliability_orders_methods() {
        assert!(
            DetectionMethod::ImportExact.reliability()
                > DetectionMethod::NameCooccurrence.reliability()
        );
        assert!(
            DetectionMethod::DocExact.reliability() > DetectionMethod::DocFuzzy.reliability()
        );
    }

    #[test]
    fn test_fanout_never_below_one() {
        let c = Candidate::new(
            id("pkg.A"),
            id("pkg.B"),
            RelationshipKind::Calls,
            DetectionMethod::CallResolved,
        )
        .with_fanout(0);
        assert_eq!(c.fanout, 1);
    }

    #[test]
    fn test_similarity_is_clamped() {
        let c = Candidate::new(
            id("pkg.A"),
            id("pkg.B"),
            RelationshipKind::Documents,
            DetectionMethod::DocFuzzy,
        )
        .with_similarity(1.7);
        assert_eq!(c.similarity, Some(1.0));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&RelationshipKind::RelatedTo).unwrap();
        assert_eq!(json, "\"related_to\"");
    }
}
