//! Relmap Graph - Relationship inference and queries
//!
//! This crate turns independently-produced analyzer facts into a scored,
//! queryable relationship graph. Relationships are not declared anywhere in
//! the input; they are inferred from weak signals (declared names, structural
//! adjacency, textual co-occurrence), given a confidence in [0, 1], and
//! committed into an immutable per-pass snapshot.
//!
//! # Architecture
//!
//! A pass runs strictly forward:
//!
//! 1. [`ElementIndex`] normalizes analyzer records into addressable elements.
//! 2. [`Detector`] rules and the [`CrossReferenceResolver`] emit candidates.
//! 3. A [`ScorerRegistry`] assigns each candidate a confidence.
//! 4. [`RelationshipGraph`] receives the committed edges and serves queries.
//!
//! # Example
//!
//! ```no_run
//! use relmap_core::{ElementKind, ElementRecord, FileAnalysis};
//! use relmap_graph::MapperPass;
//!
//! let analysis = FileAnalysis::new("pkg/a.py")
//!     .with_record(ElementRecord::new(ElementKind::Module, "pkg.a", 1, 40));
//!
//! let outcome = MapperPass::new().run(&[analysis]).unwrap();
//! println!("{}", outcome.report.summary());
//! ```

mod detect;
mod error;
mod graph;
mod index;
mod pass;
mod relationship;
mod report;
mod score;
mod xref;

pub use detect::{
    CallRule, DetectRule, Detection, Detector, ImportRule, InheritanceRule, Proposal, Resolution,
    RuleError, TypeUsageRule,
};
pub use error::MapError;
pub use graph::{
    EdgeData, EdgeDirection, GraphSnapshot, GraphStats, Neighbor, RelationshipGraph,
};
pub use index::ElementIndex;
pub use pass::{MapperPass, PassOutcome};
pub use relationship::{Candidate, DetectionMethod, Evidence, Relationship, RelationshipKind};
pub use report::{PassReport, PassWarning};
pub use score::{DefaultScorer, ScoreStrategy, ScorerRegistry};
pub use xref::{CrossReferenceResolver, ReferenceCandidate, XrefConfig};
