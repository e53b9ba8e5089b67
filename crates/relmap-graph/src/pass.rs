//! Single-pass orchestration: index, detect, resolve, score, commit.
//!
//! A pass runs to completion before any query is served. Detection fans
//! out across workers; scoring and the commit into the graph are a single
//! serial phase, so no partially-built graph is ever observable. A
//! structural error yields no graph at all.

use crate::detect::Detector;
use crate::error::MapError;
use crate::graph::RelationshipGraph;
use crate::index::ElementIndex;
use crate::relationship::Relationship;
use crate::report::{PassReport, PassWarning};
use crate::score::ScorerRegistry;
use crate::xref::CrossReferenceResolver;
use relmap_core::FileAnalysis;
use tracing::{debug, warn};

/// A completed pass: the committed graph plus its report.
#[derive(Debug)]
pub struct PassOutcome {
    pub graph: RelationshipGraph,
    pub report: PassReport,
}

/// Orchestrates one full mapping pass over analyzer output.
pub struct MapperPass {
    detector: Detector,
    resolver: CrossReferenceResolver,
    scorers: ScorerRegistry,
}

impl MapperPass {
    /// Default rules, default cross-reference tunables, default scorer.
    pub fn new() -> Self {
        Self {
            detector: Detector::with_default_rules(),
            resolver: CrossReferenceResolver::new(),
            scorers: ScorerRegistry::new(),
        }
    }

    /// Assembles a pass from explicitly configured parts.
    pub fn with_parts(
        detector: Detector,
        resolver: CrossReferenceResolver,
        scorers: ScorerRegistry,
    ) -> Self {
        Self {
            detector,
            resolver,
            scorers,
        }
    }

    /// Runs the pass.
    ///
    /// Recoverable conditions accumulate in the report; only structural
    /// errors (duplicate element identity, graph invariant violations)
    /// surface as `Err`, and then no graph is returned.
    pub fn run(&self, analyses: &[FileAnalysis]) -> Result<PassOutcome, MapError> {
        let (index, mut warnings) = ElementIndex::build(analyses)?;
        debug!(elements = index.len(), "element index built");

        let mut detection = self.detector.detect(&index);
        let xref = self.resolver.resolve(&index);
        detection.candidates.extend(xref.candidates);
        detection.warnings.extend(xref.warnings);
        warnings.extend(detection.warnings);

        // Deterministic commit order regardless of detection parallelism.
        detection.candidates.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then(a.kind.cmp(&b.kind))
                .then(a.target.cmp(&b.target))
        });

        let mut graph = RelationshipGraph::new();
        for element in index.elements() {
            graph.add_element(element.clone());
        }

        let threshold = self.resolver.config().min_confidence;
        let total = detection.candidates.len();
        let mut committed = 0usize;

        for candidate in detection.candidates {
            let (confidence, evidence) = self.scorers.score(&candidate);

            if candidate.method.is_cross_reference() && confidence < threshold {
                warn!(
                    source = %candidate.source,
                    target = %candidate.target,
                    confidence,
                    "cross-reference below threshold, dropped"
                );
                warnings.push(PassWarning::BelowThreshold {
                    element: candidate.source,
                    target: candidate.target,
                    confidence,
                });
                continue;
            }

            let relationship = Relationship {
                source: candidate.source.clone(),
                target: candidate.target.clone(),
                kind: candidate.kind,
                confidence,
                evidence,
            };
            if graph.add_relationship(relationship)? {
                committed += 1;
            } else {
                warnings.push(PassWarning::ZeroConfidence {
                    element: candidate.source,
                    target: candidate.target,
                });
            }
        }

        let report = PassReport {
            candidates: total,
            committed,
            warnings,
        };
        debug!(summary = %report.summary(), "mapping pass complete");

        Ok(PassOutcome { graph, report })
    }
}

impl Default for MapperPass {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeDirection;
    use crate::relationship::RelationshipKind;
    use relmap_core::{ElementFacts, ElementKind, ElementRecord, FileAnalysis};

    fn module(file: &str, qualified: &str, imports: &[&str]) -> FileAnalysis {
        FileAnalysis::new(file).with_record(
            ElementRecord::new(ElementKind::Module, qualified, 1, 100).with_facts(ElementFacts {
                imports: imports.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_scenario_exact_import() {
        let analyses = vec![
            module("pkg/a.py", "pkg.a", &["pkg.b"]),
            module("pkg/b.py", "pkg.b", &[]),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();
        let snapshot = outcome.graph.snapshot();

        assert_eq!(snapshot.relationships.len(), 1);
        let edge = &snapshot.relationships[0];
        assert_eq!(edge.kind, RelationshipKind::Imports);
        assert!(edge.confidence >= 0.9);
    }

    #[test]
    fn test_scenario_ambiguous_base_class_splits() {
        let analyses = vec![
            FileAnalysis::new("pkg/x.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.x.Handler", 1, 10)),
            FileAnalysis::new("pkg/y.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.y.Handler", 1, 10)),
            FileAnalysis::new("pkg/z.py").with_record(
                ElementRecord::new(ElementKind::Class, "pkg.z.Sub", 1, 10).with_facts(
                    ElementFacts {
                        bases: vec!["Handler".into()],
                        ..Default::default()
                    },
                ),
            ),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();
        let snapshot = outcome.graph.snapshot();

        let inherits: Vec<_> = snapshot
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Inherits)
            .collect();
        assert_eq!(inherits.len(), 2);
        for edge in inherits {
            assert!((edge.confidence - 0.5).abs() < 1e-6);
        }
        assert_eq!(outcome.report.ambiguous(), 1);
    }

    #[test]
    fn test_scenario_doc_reference() {
        let analyses = vec![
            FileAnalysis::new("pkg/foo.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.foo.ClassFoo", 1, 30)),
            FileAnalysis::new("docs/guide.md").with_record(
                ElementRecord::new(ElementKind::DocSection, "guide.Details", 1, 5)
                    .with_raw_text("See `ClassFoo` for details"),
            ),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();
        let snapshot = outcome.graph.snapshot();

        assert_eq!(snapshot.relationships.len(), 1);
        let edge = &snapshot.relationships[0];
        assert_eq!(edge.kind, RelationshipKind::Documents);
        assert!(edge.confidence >= 0.7);
        assert!(edge.evidence.iter().any(|e| e.signal == "similarity"));
    }

    #[test]
    fn test_scenario_unresolved_doc_mention() {
        let analyses = vec![
            FileAnalysis::new("pkg/foo.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.foo.ClassFoo", 1, 30)),
            FileAnalysis::new("docs/guide.md").with_record(
                ElementRecord::new(ElementKind::DocSection, "guide.Details", 1, 5)
                    .with_raw_text("See `NonExistentThing` for details"),
            ),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();

        assert_eq!(outcome.graph.relationship_count(), 0);
        assert_eq!(outcome.report.unresolved(), 1);
    }

    #[test]
    fn test_all_confidences_in_bounds() {
        let analyses = vec![
            module("pkg/a.py", "pkg.a", &["pkg.b", "vendor.sdk"]),
            module("pkg/b.py", "pkg.b", &[]),
            FileAnalysis::new("pkg/c.py").with_record(
                ElementRecord::new(ElementKind::Class, "pkg.c.Service", 1, 40).with_facts(
                    ElementFacts {
                        bases: vec!["Base".into()],
                        type_refs: vec!["Repo".into()],
                        ..Default::default()
                    },
                ),
            ),
            FileAnalysis::new("pkg/d.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.d.Base", 1, 10))
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.d.Repo", 12, 20)),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();
        for edge in &outcome.graph.snapshot().relationships {
            assert!(edge.confidence > 0.0 && edge.confidence <= 1.0);
        }
    }

    #[test]
    fn test_determinism_byte_identical_snapshots() {
        let analyses = vec![
            module("pkg/a.py", "pkg.a", &["pkg.b"]),
            module("pkg/b.py", "pkg.b", &[]),
            FileAnalysis::new("pkg/x.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.x.Handler", 1, 10)),
            FileAnalysis::new("pkg/y.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.y.Handler", 1, 10)),
            FileAnalysis::new("pkg/z.py").with_record(
                ElementRecord::new(ElementKind::Class, "pkg.z.Sub", 1, 10).with_facts(
                    ElementFacts {
                        bases: vec!["Handler".into()],
                        ..Default::default()
                    },
                ),
            ),
            FileAnalysis::new("docs/guide.md").with_record(
                ElementRecord::new(ElementKind::DocSection, "guide.Details", 1, 5)
                    .with_raw_text("Both `Handler` variants and `pkg.a` are covered"),
            ),
        ];

        let pass = MapperPass::new();
        let first = pass.run(&analyses).unwrap();
        let second = pass.run(&analyses).unwrap();

        let a = serde_json::to_string(&first.graph.snapshot()).unwrap();
        let b = serde_json::to_string(&second.graph.snapshot()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_candidate_disappears_untracked() {
        // One resolvable import, one unresolvable import, one unresolvable
        // doc mention: everything must land in the graph or the report.
        let analyses = vec![
            module("pkg/a.py", "pkg.a", &["pkg.b", "vendor.sdk"]),
            module("pkg/b.py", "pkg.b", &[]),
            FileAnalysis::new("docs/guide.md").with_record(
                ElementRecord::new(ElementKind::DocSection, "guide.Details", 1, 5)
                    .with_raw_text("Mentions `Ghost` only"),
            ),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();

        assert_eq!(outcome.graph.relationship_count(), 1);
        assert_eq!(outcome.report.committed, 1);
        assert_eq!(outcome.report.unresolved(), 2);
    }

    #[test]
    fn test_duplicate_identity_aborts_with_no_graph() {
        let analyses = vec![
            FileAnalysis::new("pkg/a.py")
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.a.Thing", 1, 10))
                .with_record(ElementRecord::new(ElementKind::Class, "pkg.a.Thing", 1, 10)),
        ];

        let err = MapperPass::new().run(&analyses).unwrap_err();
        assert!(matches!(err, MapError::DuplicateElement { .. }));
    }

    #[test]
    fn test_malformed_records_do_not_abort() {
        let analyses = vec![
            FileAnalysis::new("pkg/a.py")
                .with_record(ElementRecord::new(ElementKind::Function, "", 1, 2))
                .with_record(ElementRecord::new(ElementKind::Function, "pkg.a.ok", 5, 9)),
        ];

        let outcome = MapperPass::new().run(&analyses).unwrap();
        assert_eq!(outcome.graph.element_count(), 1);
        assert_eq!(outcome.report.malformed(), 1);
    }

    #[test]
    fn test_imports_queryable_in_both_directions() {
        let analyses = vec![
            module("pkg/a.py", "pkg.a", &["pkg.b"]),
            module("pkg/b.py", "pkg.b", &[]),
        ];
        let outcome = MapperPass::new().run(&analyses).unwrap();
        let snapshot = outcome.graph.snapshot();
        let edge = &snapshot.relationships[0];

        let out = outcome
            .graph
            .neighbors(&edge.source, EdgeDirection::Outgoing, None, 0.0);
        assert_eq!(out.len(), 1);

        let inbound = outcome
            .graph
            .neighbors(&edge.target, EdgeDirection::Incoming, None, 0.0);
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].element.id, edge.source);
    }
}
