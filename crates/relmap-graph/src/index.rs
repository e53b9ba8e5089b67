//! Element index: the normalized, addressable view of analyzer output.
//!
//! The index is built once per pass and is read-only afterwards. Every
//! downstream component (detection rules, the cross-reference resolver)
//! resolves names against it; nothing here performs I/O.

use crate::error::MapError;
use crate::report::PassWarning;
use relmap_core::{Element, ElementFacts, ElementId, ElementKind, FileAnalysis};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Id-addressable collection of all elements in one snapshot, with lookup
/// tables for name resolution.
#[derive(Debug, Default)]
pub struct ElementIndex {
    /// All elements, ordered by id for deterministic iteration.
    elements: BTreeMap<ElementId, Element>,
    /// Exact qualified name -> element ids.
    by_qualified: HashMap<String, Vec<ElementId>>,
    /// Trailing name segment -> element ids.
    by_name: HashMap<String, Vec<ElementId>>,
    /// File path -> element ids declared in that file.
    by_file: HashMap<String, Vec<ElementId>>,
    /// Analyzer facts per element (absent when the record carried none).
    facts: HashMap<ElementId, ElementFacts>,
    /// Names each file declares as imported, for scoped resolution.
    file_imports: HashMap<String, Vec<String>>,
}

impl ElementIndex {
    /// Builds the index from per-file analyzer output.
    ///
    /// Malformed records are skipped and reported; two records claiming the
    /// same `(kind, qualified_name, location)` identity are a terminal
    /// [`MapError::DuplicateElement`].
    pub fn build(analyses: &[FileAnalysis]) -> Result<(Self, Vec<PassWarning>), MapError> {
        let mut index = Self::default();
        let mut warnings = Vec::new();

        for analysis in analyses {
            for record in &analysis.records {
                if let Err(reason) = record.validate() {
                    warn!(file = %analysis.file, %reason, "skipping malformed analyzer record");
                    warnings.push(PassWarning::MalformedRecord {
                        file: analysis.file.clone(),
                        reason,
                    });
                    continue;
                }
                let element = record.to_element(&analysis.file);
                index.insert(element, record.facts.clone())?;
            }
        }

        Ok((index, warnings))
    }

    fn insert(&mut self, element: Element, facts: ElementFacts) -> Result<(), MapError> {
        if let Some(existing) = self.elements.get(&element.id) {
            return Err(MapError::DuplicateElement {
                id: element.id.clone(),
                existing: existing.location.to_string(),
                incoming: element.location.to_string(),
            });
        }

        let id = element.id.clone();
        let file = element.location.file.clone();

        self.by_qualified
            .entry(element.qualified_name.clone())
            .or_default()
            .push(id.clone());
        self.by_name
            .entry(element.name().to_string())
            .or_default()
            .push(id.clone());
        self.by_file.entry(file.clone()).or_default().push(id.clone());

        // Both explicit import facts and Import elements put names into the
        // file's resolution scope.
        if !facts.imports.is_empty() {
            self.file_imports
                .entry(file.clone())
                .or_default()
                .extend(facts.imports.iter().cloned());
        }
        if element.kind == ElementKind::Import {
            self.file_imports
                .entry(file)
                .or_default()
                .push(element.qualified_name.clone());
        }

        if !facts.is_empty() {
            self.facts.insert(id.clone(), facts);
        }
        self.elements.insert(id, element);
        Ok(())
    }

    /// Looks up an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Analyzer facts for an element, if the record carried any.
    pub fn facts(&self, id: &ElementId) -> Option<&ElementFacts> {
        self.facts.get(id)
    }

    /// All elements, in stable id order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Ids of elements with this exact qualified name.
    pub fn find_qualified(&self, name: &str) -> &[ElementId] {
        self.by_qualified.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of elements whose trailing name segment is `name`.
    pub fn find_by_name(&self, name: &str) -> &[ElementId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of elements declared in `file`.
    pub fn elements_in_file(&self, file: &str) -> &[ElementId] {
        self.by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names `file` declares as imported.
    pub fn file_imports(&self, file: &str) -> &[String] {
        self.file_imports.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
