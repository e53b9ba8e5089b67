//! Analyzer-facing input records.
//!
//! The surrounding pipeline's analyzers parse source and documentation
//! files and hand Relmap one [`FileAnalysis`] per file. Records carry
//! *unresolved* names (imports, calls, base classes, type annotations);
//! resolving them against the rest of the project is Relmap's job.

use crate::element::{Element, ElementKind, Location};
use serde::{Deserialize, Serialize};

/// Unresolved names the analyzer recorded alongside a code element.
///
/// These are detection inputs, not properties of the element itself, which
/// is why they live outside [`Element`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFacts {
    /// Declared import targets, e.g. `pkg.b` or `pkg.b.Thing`.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Names invoked inside a function body.
    #[serde(default)]
    pub calls: Vec<String>,
    /// Declared base-class names.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Names appearing in attribute or type annotations.
    #[serde(default)]
    pub type_refs: Vec<String>,
}

impl ElementFacts {
    /// True when no fact list has entries.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.calls.is_empty()
            && self.bases.is_empty()
            && self.type_refs.is_empty()
    }
}

/// One raw element record as produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub kind: ElementKind,
    pub qualified_name: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub facts: ElementFacts,
}

impl ElementRecord {
    /// Creates a record spanning the given lines, columns defaulting to 1.
    pub fn new(
        kind: ElementKind,
        qualified_name: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            start_line,
            start_col: 1,
            end_line,
            end_col: 1,
            raw_text: None,
            facts: ElementFacts::default(),
        }
    }

    /// Sets the column range.
    pub fn with_cols(mut self, start_col: u32, end_col: u32) -> Self {
        self.start_col = start_col;
        self.end_col = end_col;
        self
    }

    /// Attaches docstring/heading text.
    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// Attaches the analyzer's unresolved-name lists.
    pub fn with_facts(mut self, facts: ElementFacts) -> Self {
        self.facts = facts;
        self
    }

    /// Checks the record is well-formed enough to index.
    ///
    /// Malformed records are skipped with a warning by the index builder;
    /// they never abort a pass.
    pub fn validate(&self) -> Result<(), String> {
        if self.qualified_name.trim().is_empty() {
            return Err("empty qualified name".to_string());
        }
        if self.start_line == 0 {
            return Err("line numbers are 1-based".to_string());
        }
        if self.end_line < self.start_line {
            return Err(format!(
                "inverted line range {}..{}",
                self.start_line, self.end_line
            ));
        }
        Ok(())
    }

    /// Converts the record into an [`Element`] anchored at `file`.
    pub fn to_element(&self, file: &str) -> Element {
        let location = Location::new(
            file,
            self.start_line,
            self.start_col,
            self.end_line,
            self.end_col,
        );
        let element = Element::new(self.kind, self.qualified_name.clone(), location);
        match &self.raw_text {
            Some(text) => element.with_raw_text(text.clone()),
            None => element,
        }
    }
}

/// Analyzer output for a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file: String,
    pub records: Vec<ElementRecord>,
}

impl FileAnalysis {
    /// Creates an empty analysis for `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            records: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn with_record(mut self, record: ElementRecord) -> Self {
        self.records.push(record);
        self
    }
}
