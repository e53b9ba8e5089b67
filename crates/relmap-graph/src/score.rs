//! Confidence scoring for relationship candidates.
//!
//! Scoring is pure: the same candidate always yields the same score, and
//! a corroborating signal never lowers one. Strategies are pluggable per
//! relationship kind with a shared default.

use crate::relationship::{Candidate, Evidence, RelationshipKind};
use std::collections::HashMap;

/// A pluggable scoring strategy.
///
/// Implementations must be stateless and monotonic in their inputs; the
/// determinism tests rely on both.
pub trait ScoreStrategy: Send + Sync {
    /// Scores a candidate into [0, 1].
    fn score(&self, candidate: &Candidate) -> f32;
}

/// Similarity scales a score between this fraction of its base and the
/// full base, so a perfect textual match never exceeds the detection
/// method's own reliability.
const SIMILARITY_FLOOR: f32 = 0.75;

/// Default combination: method reliability, split evenly across tied
/// targets, scaled by textual similarity when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScorer;

impl ScoreStrategy for DefaultScorer {
    fn score(&self, candidate: &Candidate) -> f32 {
        let split = candidate.method.reliability() / candidate.fanout.max(1) as f32;
        let factor = match candidate.similarity {
            Some(similarity) => {
                SIMILARITY_FLOOR + (1.0 - SIMILARITY_FLOOR) * similarity.clamp(0.0, 1.0)
            }
            None => 1.0,
        };
        (split * factor).clamp(0.0, 1.0)
    }
}

/// Scoring strategies keyed by relationship kind.
pub struct ScorerRegistry {
    default: Box<dyn ScoreStrategy>,
    by_kind: HashMap<RelationshipKind, Box<dyn ScoreStrategy>>,
}

impl ScorerRegistry {
    /// Creates a registry backed by [`DefaultScorer`].
    pub fn new() -> Self {
        Self {
            default: Box::new(DefaultScorer),
            by_kind: HashMap::new(),
        }
    }

    /// Overrides the strategy for one relationship kind.
    pub fn register(&mut self, kind: RelationshipKind, strategy: Box<dyn ScoreStrategy>) {
        self.by_kind.insert(kind, strategy);
    }

    /// The strategy that will score candidates of this kind.
    pub fn strategy_for(&self, kind: RelationshipKind) -> &dyn ScoreStrategy {
        self.by_kind
            .get(&kind)
            .map(Box::as_ref)
            .unwrap_or(self.default.as_ref())
    }

    /// Scores a candidate and returns the confidence together with the
    /// candidate's evidence extended by the scoring signals.
    pub fn score(&self, candidate: &Candidate) -> (f32, Vec<Evidence>) {
        let confidence = self.strategy_for(candidate.kind).score(candidate);

        let mut evidence = candidate.evidence.clone();
        evidence.push(Evidence::new(
            "method-reliability",
            format!(
                "{} base {:.2}",
                candidate.method,
                candidate.method.reliability()
            ),
        ));
        if candidate.fanout > 1 {
            evidence.push(Evidence::new(
                "ambiguity-split",
                format!("confidence split across {} tied targets", candidate.fanout),
            ));
        }
        if let Some(similarity) = candidate.similarity {
            evidence.push(Evidence::new(
                "similarity",
                format!("textual similarity {:.2}", similarity),
            ));
        }

        (confidence, evidence)
    }
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
