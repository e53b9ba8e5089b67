//! Pass reporting.
//!
//! Recoverable conditions never abort a pass; they are collected here so
//! that nothing the pass saw can disappear untracked. Every detected
//! candidate either becomes a committed edge or shows up as a warning.

use relmap_core::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recoverable condition observed during a mapping pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassWarning {
    /// An analyzer record failed validation and was skipped.
    MalformedRecord { file: String, reason: String },

    /// A referenced name matched nothing in the index.
    UnresolvedReference {
        element: ElementId,
        name: String,
        rule: String,
    },

    /// A referenced name matched several targets; the candidate was split
    /// evenly across them.
    AmbiguousReference {
        element: ElementId,
        name: String,
        targets: usize,
    },

    /// A detection rule failed for one element and was skipped there.
    RuleFailed {
        rule: String,
        element: ElementId,
        message: String,
    },

    /// A scored cross-reference fell below the configured threshold and was
    /// dropped before commit.
    BelowThreshold {
        element: ElementId,
        target: ElementId,
        confidence: f32,
    },

    /// A candidate scored exactly zero and was treated as not detected.
    ZeroConfidence { element: ElementId, target: ElementId },
}

impl fmt::Display for PassWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord { file, reason } => {
                write!(f, "malformed record in {}: {}", file, reason)
            }
            Self::UnresolvedReference { element, name, rule } => {
                write!(f, "unresolved reference `{}` from {} ({})", name, element, rule)
            }
            Self::AmbiguousReference { element, name, targets } => {
                write!(
                    f,
                    "ambiguous reference `{}` from {}: split across {} targets",
                    name, element, targets
                )
            }
            Self::RuleFailed { rule, element, message } => {
                write!(f, "rule {} failed for {}: {}", rule, element, message)
            }
            Self::BelowThreshold { element, target, confidence } => {
                write!(
                    f,
                    "cross-reference {} -> {} below threshold at {:.2}",
                    element, target, confidence
                )
            }
            Self::ZeroConfidence { element, target } => {
                write!(f, "candidate {} -> {} scored zero, not materialized", element, target)
            }
        }
    }
}

/// Structured account of one mapping pass.
///
/// A pass that completes with warnings still yields a usable graph; the
/// report tells downstream tooling what the inference could not settle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// Candidates produced by detection and cross-reference resolution.
    pub candidates: usize,
    /// Candidates committed into the graph (merges count once each).
    pub committed: usize,
    pub warnings: Vec<PassWarning>,
}

impl PassReport {
    pub fn malformed(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::MalformedRecord { .. }))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::UnresolvedReference { .. }))
    }

    pub fn ambiguous(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::AmbiguousReference { .. }))
    }

    pub fn failed_rules(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::RuleFailed { .. }))
    }

    pub fn below_threshold(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::BelowThreshold { .. }))
    }

    pub fn zero_confidence(&self) -> usize {
        self.count(|w| matches!(w, PassWarning::ZeroConfidence { .. }))
    }

    /// One-line summary suitable for host logs.
    pub fn summary(&self) -> String {
        format!(
            "{} candidates, {} committed ({} unresolved, {} ambiguous, {} failed rules, {} below threshold, {} malformed records)",
            self.candidates,
            self.committed,
            self.unresolved(),
            self.ambiguous(),
            self.failed_rules(),
            self.below_threshold(),
            self.malformed(),
        )
    }

    fn count(&self, pred: impl Fn(&PassWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| pred(w)).count()
    }
}
