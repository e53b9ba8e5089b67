//! Element model for the relationship map.
//!
//! Elements are the nodes of the relationship graph: named, located units
//! of code or documentation structure. They are created once per analysis
//! pass and never mutated in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for an element within one analysis snapshot.
///
/// Ids are derived from `(kind, qualified_name, location)`, so re-analyzing
/// unchanged input always produces the same id, and two records claiming
/// the same identity collide instead of silently coexisting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of structural unit an element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// A module or file-level namespace.
    Module,
    /// A class, struct, or similar type definition.
    Class,
    /// A free function or method.
    Function,
    /// A module- or class-level variable.
    Variable,
    /// An import declaration.
    Import,
    /// A documentation section (heading plus body).
    DocSection,
    /// An explicit documentation reference to a named entity.
    DocReference,
}

impl ElementKind {
    /// Returns the snake_case name used in ids and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::DocSection => "doc_section",
            Self::DocReference => "doc_reference",
        }
    }

    /// True for documentation kinds, false for code kinds.
    pub fn is_doc(&self) -> bool {
        matches!(self, Self::DocSection | Self::DocReference)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source location: file path plus a 1-based line/column range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Location {
    /// Creates a location covering the given range.
    pub fn new(
        file: impl Into<String>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A range is well-formed when lines are 1-based and it ends at or
    /// after where it starts.
    pub fn is_valid(&self) -> bool {
        self.start_line >= 1
            && (self.end_line > self.start_line
                || (self.end_line == self.start_line && self.end_col >= self.start_col))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.start_line)
    }
}

/// A named, located unit of code or documentation structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Fully-qualified, dot-separated name, e.g. `pkg.module.Class`.
    pub qualified_name: String,
    pub location: Location,
    /// Docstring, heading, or comment text used for textual similarity.
    pub raw_text: Option<String>,
}

impl Element {
    /// Creates an element; the id is derived from the identity triple.
    pub fn new(kind: ElementKind, qualified_name: impl Into<String>, location: Location) -> Self {
        let qualified_name = qualified_name.into();
        let id = ElementId(format!(
            "{}:{}@{}:{}",
            kind, qualified_name, location.file, location.start_line
        ));
        Self {
            id,
            kind,
            qualified_name,
            location,
            raw_text: None,
        }
    }

    /// Attaches docstring/heading text.
    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// The trailing segment of the qualified name
    /// (`pkg.mod.Class` -> `Class`).
    pub fn name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// The qualified name minus its trailing segment
    /// (`pkg.mod.Class` -> `pkg.mod`), or `None` for top-level names.
    pub fn module_path(&self) -> Option<&str> {
        self.qualified_name.rsplit_once('.').map(|(head, _)| head)
    }

    /// True for code elements (anything that is not documentation).
    pub fn is_code(&self) -> bool {
        !self.kind.is_doc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> Location {
        Location::new("src/app.py", line, 1, line + 5, 1)
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = Element::new(ElementKind::Class, "pkg.mod.Handler", loc(10));
        let b = Element::new(ElementKind::Class, "pkg.mod.Handler", loc(10));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_id_distinguishes_kind_and_location() {
        let class = Element::new(ElementKind::Class, "pkg.Handler", loc(10));
        let func = Element::new(ElementKind::Function, "pkg.Handler", loc(10));
        let moved = Element::new(ElementKind::Class, "pkg.Handler", loc(20));
        assert_ne!(class.id, func.id);
        assert_ne!(class.id, moved.id);
    }

    #[test]
    fn test_name_and_module_path() {
        let el = Element::new(ElementKind::Function, "pkg.mod.run", loc(1));
        assert_eq!(el.name(), "run");
        assert_eq!(el.module_path(), Some("pkg.mod"));

        let top = Element::new(ElementKind::Module, "pkg", loc(1));
        assert_eq!(top.name(), "pkg");
        assert_eq!(top.module_path(), None);
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::new("a.py", 1, 1, 1, 1).is_valid());
        assert!(!Location::new("a.py", 3, 5, 3, 2).is_valid());
        assert!(!Location::new("a.py", 0, 1, 2, 1).is_valid());
        assert!(!Location::new("a.py", 5, 1, 4, 1).is_valid());
    }

    #[test]
    fn test_doc_kinds() {
        assert!(ElementKind::DocSection.is_doc());
        assert!(ElementKind::DocReference.is_doc());
        assert!(!ElementKind::Class.is_doc());
        let el = Element::new(ElementKind::DocSection, "README.Overview", loc(1));
        assert!(!el.is_code());
    }
}
