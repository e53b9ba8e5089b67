//! Relationship detection over the element index.
//!
//! Rules are registered on a [`Detector`] and each proposes candidates for
//! one element at a time against the read-only index. Candidate generation
//! is embarrassingly parallel per element; merging the per-element output
//! is the only serial step. A rule failing on one element skips that
//! element only and never aborts the pass.

mod rules;

pub use rules::{CallRule, ImportRule, InheritanceRule, TypeUsageRule};

use crate::index::ElementIndex;
use crate::relationship::Candidate;
use crate::report::PassWarning;
use rayon::prelude::*;
use relmap_core::{Element, ElementId};
use thiserror::Error;
use tracing::warn;

/// Failure of a single rule for a single element.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct RuleError(pub String);

/// What one rule proposed for one element.
///
/// Unresolved and ambiguous names are carried alongside the candidates so
/// the detector can account for every reference the rule looked at.
#[derive(Debug, Default)]
pub struct Proposal {
    pub candidates: Vec<Candidate>,
    /// Names that matched nothing in the index.
    pub unresolved: Vec<String>,
    /// Names that matched several targets, with the tie width.
    pub ambiguous: Vec<(String, usize)>,
}

/// A pluggable detection rule.
///
/// New relationship types are added by registering a new rule, never by
/// extending a monolithic detector.
pub trait DetectRule: Send + Sync {
    /// Stable rule name for logs and reports.
    fn name(&self) -> &'static str;

    /// Proposes candidate relationships for one element.
    fn propose(&self, element: &Element, index: &ElementIndex) -> Result<Proposal, RuleError>;
}

/// Output of a detection run: candidates plus everything that did not
/// become one.
#[derive(Debug, Default)]
pub struct Detection {
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<PassWarning>,
}

/// Registry of detection rules.
#[derive(Default)]
pub struct Detector {
    rules: Vec<Box<dyn DetectRule>>,
}

impl Detector {
    /// Creates a detector with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rule set: imports, inheritance, calls, type usage.
    pub fn with_default_rules() -> Self {
        let mut detector = Self::new();
        detector.register(Box::new(ImportRule));
        detector.register(Box::new(InheritanceRule));
        detector.register(Box::new(CallRule));
        detector.register(Box::new(TypeUsageRule));
        detector
    }

    /// Registers a rule.
    pub fn register(&mut self, rule: Box<dyn DetectRule>) {
        self.rules.push(rule);
    }

    /// Runs every rule over every element.
    ///
    /// Elements are processed in parallel; each worker only reads the index
    /// and appends to its own buffer, so the merge below needs no
    /// coordination. Output order follows the index's stable element order.
    pub fn detect(&self, index: &ElementIndex) -> Detection {
        let elements: Vec<&Element> = index.elements().collect();

        let per_element: Vec<Detection> = elements
            .par_iter()
            .map(|element| {
                let mut out = Detection::default();
                for rule in &self.rules {
                    match rule.propose(element, index) {
                        Ok(proposal) => self.absorb(&mut out, rule.name(), &element.id, proposal),
                        Err(err) => {
                            warn!(
                                rule = rule.name(),
                                element = %element.id,
                                error = %err,
                                "detection rule failed, skipping element"
                            );
                            out.warnings.push(PassWarning::RuleFailed {
                                rule: rule.name().to_string(),
                                element: element.id.clone(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                out
            })
            .collect();

        let mut merged = Detection::default();
        for detection in per_element {
            merged.candidates.extend(detection.candidates);
            merged.warnings.extend(detection.warnings);
        }
        merged
    }

    fn absorb(&self, out: &mut Detection, rule: &str, element: &ElementId, proposal: Proposal) {
        out.candidates.extend(proposal.candidates);
        for name in proposal.unresolved {
            out.warnings.push(PassWarning::UnresolvedReference {
                element: element.clone(),
                name,
                rule: rule.to_string(),
            });
        }
        for (name, targets) in proposal.ambiguous {
            out.warnings.push(PassWarning::AmbiguousReference {
                element: element.clone(),
                name,
                targets,
            });
        }
    }
}

/// Outcome of resolving a referenced name against the index.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Exactly one plausible target.
    Unique(ElementId),
    /// Several plausible targets, in sorted id order.
    Ambiguous(Vec<ElementId>),
    /// No plausible target.
    Unresolved,
}

/// Resolves a referenced name from the point of view of `origin`.
///
/// Resolution order: an exact qualified match, then a sibling in the
/// origin's own module, then the origin file's declared imports, then a
/// project-wide search on the trailing segment. The first tier that yields
/// any target wins; remaining ties within that tier are reported as
/// ambiguous rather than guessed between.
pub(crate) fn resolve_name(
    name: &str,
    origin: &Element,
    index: &ElementIndex,
    accepts: &dyn Fn(&Element) -> bool,
) -> Resolution {
    let eligible = |ids: &[ElementId]| -> Vec<ElementId> {
        let mut out: Vec<ElementId> = ids
            .iter()
            .filter(|id| **id != origin.id)
            .filter(|id| index.get(id).is_some_and(accepts))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        out
    };

    // Qualified references skip the scoped search entirely.
    if name.contains('.') {
        return settle(eligible(index.find_qualified(name)));
    }

    // Same module first.
    if let Some(module) = origin.module_path() {
        let scoped = format!("{module}.{name}");
        let ids = eligible(index.find_qualified(&scoped));
        if !ids.is_empty() {
            return settle(ids);
        }
    }

    // Then names the file declares as imported: `import pkg.b.Thing` names
    // the symbol directly, `import pkg.b` brings `pkg.b.Thing` into scope.
    let mut imported = Vec::new();
    for import in index.file_imports(&origin.location.file) {
        if import == name || import.ends_with(&format!(".{name}")) {
            imported.extend(eligible(index.find_qualified(import)));
        }
        let scoped = format!("{import}.{name}");
        imported.extend(eligible(index.find_qualified(&scoped)));
    }
    imported.sort();
    imported.dedup();
    if !imported.is_empty() {
        return settle(imported);
    }

    // Finally a project-wide search on the trailing segment.
    settle(eligible(index.find_by_name(name)))
}

fn settle(mut ids: Vec<ElementId>) -> Resolution {
    match ids.len() {
        0 => Resolution::Unresolved,
        1 => Resolution::Unique(ids.remove(0)),
        _ => Resolution::Ambiguous(ids),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{ElementFacts, ElementKind, ElementRecord, FileAnalysis};

    fn class(qualified: &str, line: u32) -> ElementRecord {
        ElementRecord::new(ElementKind::Class, qualified, line, line + 10)
    }

    fn build(analyses: Vec<FileAnalysis>) -> ElementIndex {
        ElementIndex::build(&analyses).unwrap().0
    }

    fn any(_: &Element) -> bool {
        true
    }

    #[test]
    fn test_same_module_wins_over_global() {
        let index = build(vec![
            FileAnalysis::new("pkg/x.py")
                .with_record(class("pkg.x.Handler", 1))
                .with_record(class("pkg.x.Sub", 20)),
            FileAnalysis::new("pkg/y.py").with_record(class("pkg.y.Handler", 1)),
        ]);
        let origin = index.find_qualified("pkg.x.Sub")[0].clone();
        let origin = index.get(&origin).unwrap();

        let resolution = resolve_name("Handler", origin, &index, &any);
        let expected = index.find_qualified("pkg.x.Handler")[0].clone();
        assert_eq!(resolution, Resolution::Unique(expected));
    }

    #[test]
    fn test_imported_module_wins_over_global() {
        let index = build(vec![
            FileAnalysis::new("pkg/z.py").with_record(
                class("pkg.z.Sub", 1).with_facts(ElementFacts {
                    imports: vec!["pkg.x".into()],
                    ..Default::default()
                }),
            ),
            FileAnalysis::new("pkg/x.py").with_record(class("pkg.x.Handler", 1)),
            FileAnalysis::new("pkg/y.py").with_record(class("pkg.y.Handler", 1)),
        ]);
        let origin = index.find_qualified("pkg.z.Sub")[0].clone();
        let origin = index.get(&origin).unwrap();

        let resolution = resolve_name("Handler", origin, &index, &any);
        let expected = index.find_qualified("pkg.x.Handler")[0].clone();
        assert_eq!(resolution, Resolution::Unique(expected));
    }

    #[test]
    fn test_global_tie_is_ambiguous() {
        let index = build(vec![
            FileAnalysis::new("pkg/z.py").with_record(class("pkg.z.Sub", 1)),
            FileAnalysis::new("pkg/x.py").with_record(class("pkg.x.Handler", 1)),
            FileAnalysis::new("pkg/y.py").with_record(class("pkg.y.Handler", 1)),
        ]);
        let origin = index.find_qualified("pkg.z.Sub")[0].clone();
        let origin = index.get(&origin).unwrap();

        match resolve_name("Handler", origin, &index, &any) {
            Resolution::Ambiguous(ids) => {
                assert_eq!(ids.len(), 2);
                let mut sorted = ids.clone();
                sorted.sort();
                assert_eq!(ids, sorted);
            }
            other => panic!("expected ambiguous resolution, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_name_is_unresolved() {
        let index = build(vec![
            FileAnalysis::new("pkg/z.py").with_record(class("pkg.z.Sub", 1)),
        ]);
        let origin = index.find_qualified("pkg.z.Sub")[0].clone();
        let origin = index.get(&origin).unwrap();

        assert_eq!(
            resolve_name("Nothing", origin, &index, &any),
            Resolution::Unresolved
        );
    }

    #[test]
    fn test_failing_rule_does_not_abort_detection() {
        struct Broken;
        impl DetectRule for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn propose(&self, _: &Element, _: &ElementIndex) -> Result<Proposal, RuleError> {
                Err(RuleError("boom".into()))
            }
        }

        let index = build(vec![
            FileAnalysis::new("pkg/a.py").with_record(
                class("pkg.a.Sub", 1).with_facts(ElementFacts {
                    bases: vec!["Base".into()],
                    ..Default::default()
                }),
            ),
            FileAnalysis::new("pkg/b.py").with_record(class("pkg.a.Base", 1)),
        ]);

        let mut detector = Detector::new();
        detector.register(Box::new(Broken));
        detector.register(Box::new(InheritanceRule));
        let detection = detector.detect(&index);

        // The broken rule produced warnings for each element, the healthy
        // rule still produced its candidate.
        assert_eq!(detection.candidates.len(), 1);
        assert_eq!(
            detection
                .warnings
                .iter()
                .filter(|w| matches!(w, PassWarning::RuleFailed { .. }))
                .count(),
            2
        );
    }
}
