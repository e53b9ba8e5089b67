//! Built-in detection rules.
//!
//! Each rule covers one family of signals. Structural import resolution is
//! exact and never ambiguous; inheritance and calls go through the shared
//! name-resolution order; type usage is a deliberately weak co-occurrence
//! heuristic that the scorer keeps near the bottom of the range.

use super::{resolve_name, DetectRule, Proposal, Resolution, RuleError};
use crate::index::ElementIndex;
use crate::relationship::{Candidate, DetectionMethod, Evidence, RelationshipKind};
use relmap_core::{Element, ElementId, ElementKind};

/// Turns a resolution into candidates, splitting evenly across ties.
fn emit(
    proposal: &mut Proposal,
    source: &Element,
    name: &str,
    resolution: Resolution,
    kind: RelationshipKind,
    method: DetectionMethod,
    signal: &str,
) {
    let targets: Vec<ElementId> = match resolution {
        Resolution::Unique(id) => vec![id],
        Resolution::Ambiguous(ids) => {
            proposal.ambiguous.push((name.to_string(), ids.len()));
            ids
        }
        Resolution::Unresolved => {
            proposal.unresolved.push(name.to_string());
            return;
        }
    };

    let fanout = targets.len();
    for target in targets {
        proposal.candidates.push(
            Candidate::new(source.id.clone(), target, kind, method)
                .with_fanout(fanout)
                .with_evidence(Evidence::new(
                    signal,
                    format!("`{}` declared in {}", name, source.qualified_name),
                )),
        );
    }
}

/// Detects `imports` edges from declared import statements.
///
/// Imports resolve by exact qualified name only; when one name is declared
/// by several element kinds, module targets win.
pub struct ImportRule;

impl DetectRule for ImportRule {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn propose(&self, element: &Element, index: &ElementIndex) -> Result<Proposal, RuleError> {
        let mut proposal = Proposal::default();
        let Some(facts) = index.facts(&element.id) else {
            return Ok(proposal);
        };

        for import in &facts.imports {
            let mut ids: Vec<ElementId> = index
                .find_qualified(import)
                .iter()
                .filter(|id| **id != element.id)
                .cloned()
                .collect();
            if ids.len() > 1 {
                let modules: Vec<ElementId> = ids
                    .iter()
                    .filter(|id| {
                        index
                            .get(id)
                            .is_some_and(|e| e.kind == ElementKind::Module)
                    })
                    .cloned()
                    .collect();
                if !modules.is_empty() {
                    ids = modules;
                }
            }
            ids.sort();
            ids.dedup();

            let resolution = match ids.len() {
                0 => Resolution::Unresolved,
                1 => Resolution::Unique(ids.remove(0)),
                _ => Resolution::Ambiguous(ids),
            };
            emit(
                &mut proposal,
                element,
                import,
                resolution,
                RelationshipKind::Imports,
                DetectionMethod::ImportExact,
                "import-declaration",
            );
        }
        Ok(proposal)
    }
}

/// Detects `inherits` edges from declared base-class names.
pub struct InheritanceRule;

impl DetectRule for InheritanceRule {
    fn name(&self) -> &'static str {
        "inherits"
    }

    fn propose(&self, element: &Element, index: &ElementIndex) -> Result<Proposal, RuleError> {
        let mut proposal = Proposal::default();
        if element.kind != ElementKind::Class {
            return Ok(proposal);
        }
        let Some(facts) = index.facts(&element.id) else {
            return Ok(proposal);
        };

        for base in &facts.bases {
            let resolution = resolve_name(base, element, index, &|e: &Element| {
                e.kind == ElementKind::Class
            });
            emit(
                &mut proposal,
                element,
                base,
                resolution,
                RelationshipKind::Inherits,
                DetectionMethod::InheritanceResolved,
                "base-class",
            );
        }
        Ok(proposal)
    }
}

/// Detects `calls` edges from the analyzer's recorded call lists.
pub struct CallRule;

impl DetectRule for CallRule {
    fn name(&self) -> &'static str {
        "calls"
    }

    fn propose(&self, element: &Element, index: &ElementIndex) -> Result<Proposal, RuleError> {
        let mut proposal = Proposal::default();
        if element.kind != ElementKind::Function {
            return Ok(proposal);
        }
        let Some(facts) = index.facts(&element.id) else {
            return Ok(proposal);
        };

        for call in &facts.calls {
            let resolution = resolve_name(call, element, index, &|e: &Element| {
                e.kind == ElementKind::Function
            });
            emit(
                &mut proposal,
                element,
                call,
                resolution,
                RelationshipKind::Calls,
                DetectionMethod::CallResolved,
                "call-site",
            );
        }
        Ok(proposal)
    }
}

/// Detects `uses` edges from attribute and type annotations.
///
/// Name co-occurrence only; the low method reliability keeps these edges
/// clearly separated from structural ones.
pub struct TypeUsageRule;

impl DetectRule for TypeUsageRule {
    fn name(&self) -> &'static str {
        "type-usage"
    }

    fn propose(&self, element: &Element, index: &ElementIndex) -> Result<Proposal, RuleError> {
        let mut proposal = Proposal::default();
        if !element.is_code() {
            return Ok(proposal);
        }
        let Some(facts) = index.facts(&element.id) else {
            return Ok(proposal);
        };

        for type_ref in &facts.type_refs {
            let resolution = resolve_name(type_ref, element, index, &|e: &Element| {
                e.kind == ElementKind::Class
            });
            emit(
                &mut proposal,
                element,
                type_ref,
                resolution,
                RelationshipKind::Uses,
                DetectionMethod::NameCooccurrence,
                "type-annotation",
            );
        }
        Ok(proposal)
    }
}
