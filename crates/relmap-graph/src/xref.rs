//! Cross-reference resolution: documentation mentions to code elements.
//!
//! Mentions come from two places: `DocReference` elements, whose qualified
//! name *is* the mention, and back-ticked identifiers inside the raw text
//! of `DocSection` elements. A mention is matched exact first, then
//! case-insensitive, then within a small edit distance; ties within an
//! epsilon of the best similarity all survive as weighted candidates, the
//! resolver never guesses a single best match between them.

use crate::detect::Detection;
use crate::index::ElementIndex;
use crate::relationship::{Candidate, DetectionMethod, Evidence, RelationshipKind};
use crate::report::PassWarning;
use once_cell::sync::Lazy;
use regex::Regex;
use relmap_core::{Element, ElementId, ElementKind};

/// Back-ticked identifier inside documentation text, optionally dotted.
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)`")
        .expect("mention pattern is valid")
});

/// Tunables for cross-reference resolution.
///
/// Projects with terse naming need a different cutoff than verbose ones,
/// so the threshold is configuration, not logic.
#[derive(Debug, Clone)]
pub struct XrefConfig {
    /// Scored candidates below this confidence are dropped before commit
    /// (and reported, never silently).
    pub min_confidence: f32,
    /// Maximum edit distance for a fuzzy mention match.
    pub max_edit_distance: usize,
    /// Targets within this much of the best similarity are kept as ties.
    pub ambiguity_epsilon: f32,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            max_edit_distance: 2,
            ambiguity_epsilon: 0.05,
        }
    }
}

/// A possible (documentation mention -> code element) pairing, prior to
/// scoring and threshold filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCandidate {
    pub doc: ElementId,
    pub mention: String,
    pub target: ElementId,
    pub similarity: f32,
    pub method: DetectionMethod,
}

/// Links documentation mentions to code elements.
#[derive(Debug, Default)]
pub struct CrossReferenceResolver {
    config: XrefConfig,
}

impl CrossReferenceResolver {
    /// Creates a resolver with the default configuration.
    pub fn new() -> Self {
        Self {
            config: XrefConfig::default(),
        }
    }

    /// Creates a resolver with explicit tunables.
    pub fn with_config(config: XrefConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &XrefConfig {
        &self.config
    }

    /// Proposes candidates for every documentation element in the index.
    pub fn resolve(&self, index: &ElementIndex) -> Detection {
        let mut detection = Detection::default();

        for element in index.elements().filter(|e| !e.is_code()) {
            let kind = match element.kind {
                ElementKind::DocReference => RelationshipKind::References,
                _ => RelationshipKind::Documents,
            };

            for mention in self.mentions_of(element) {
                let matches = self.match_mention(&element.id, &mention, index);
                if matches.is_empty() {
                    detection.warnings.push(PassWarning::UnresolvedReference {
                        element: element.id.clone(),
                        name: mention,
                        rule: "cross-reference".to_string(),
                    });
                    continue;
                }

                let fanout = matches.len();
                if fanout > 1 {
                    detection.warnings.push(PassWarning::AmbiguousReference {
                        element: element.id.clone(),
                        name: mention.clone(),
                        targets: fanout,
                    });
                }
                for m in matches {
                    detection.candidates.push(
                        Candidate::new(element.id.clone(), m.target, kind, m.method)
                            .with_fanout(fanout)
                            .with_similarity(m.similarity)
                            .with_evidence(Evidence::new(
                                "doc-mention",
                                format!("`{}` in {}", mention, element.qualified_name),
                            )),
                    );
                }
            }
        }

        detection
    }

    /// Extracts the mention texts of a documentation element.
    fn mentions_of(&self, element: &Element) -> Vec<String> {
        match element.kind {
            ElementKind::DocReference => vec![element.qualified_name.clone()],
            ElementKind::DocSection => element
                .raw_text
                .as_deref()
                .map(|text| {
                    MENTION_RE
                        .captures_iter(text)
                        .map(|c| c[1].to_string())
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Matches a mention against code elements: exact qualified name, then
    /// exact trailing segment, then case-insensitive, then bounded edit
    /// distance. The first tier with any hit wins; within the winning tier,
    /// every target within `ambiguity_epsilon` of the best similarity is
    /// kept, in sorted id order.
    fn match_mention(
        &self,
        doc: &ElementId,
        mention: &str,
        index: &ElementIndex,
    ) -> Vec<ReferenceCandidate> {
        let reference = |target: ElementId, similarity: f32, method: DetectionMethod| {
            ReferenceCandidate {
                doc: doc.clone(),
                mention: mention.to_string(),
                target,
                similarity,
                method,
            }
        };

        let code_only = |ids: &[ElementId]| -> Vec<ElementId> {
            let mut out: Vec<ElementId> = ids
                .iter()
                .filter(|id| index.get(id).is_some_and(Element::is_code))
                .cloned()
                .collect();
            out.sort();
            out.dedup();
            out
        };

        // Exact: qualified name, falling back to the trailing segment.
        let mut exact = code_only(index.find_qualified(mention));
        if exact.is_empty() {
            exact = code_only(index.find_by_name(mention));
        }
        if !exact.is_empty() {
            return exact
                .into_iter()
                .map(|id| reference(id, 1.0, DetectionMethod::DocExact))
                .collect();
        }

        // Case-insensitive over qualified names and trailing segments.
        let mut relaxed: Vec<ElementId> = index
            .elements()
            .filter(|e| e.is_code())
            .filter(|e| {
                e.qualified_name.eq_ignore_ascii_case(mention)
                    || e.name().eq_ignore_ascii_case(mention)
            })
            .map(|e| e.id.clone())
            .collect();
        relaxed.sort();
        relaxed.dedup();
        if !relaxed.is_empty() {
            return relaxed
                .into_iter()
                .map(|id| reference(id, 0.9, DetectionMethod::DocCaseInsensitive))
                .collect();
        }

        // Fuzzy: bounded edit distance over trailing segments.
        let needle: Vec<char> = mention.to_ascii_lowercase().chars().collect();
        let mut fuzzy: Vec<(ElementId, f32)> = index
            .elements()
            .filter(|e| e.is_code())
            .filter_map(|e| {
                let name = e.name().to_ascii_lowercase();
                let distance =
                    levenshtein_with_max(&name, &needle, self.config.max_edit_distance);
                if distance == 0 || distance > self.config.max_edit_distance {
                    return None;
                }
                let longest = needle.len().max(name.chars().count()).max(1);
                let similarity = 1.0 - distance as f32 / longest as f32;
                Some((e.id.clone(), similarity))
            })
            .collect();
        if fuzzy.is_empty() {
            return Vec::new();
        }

        // Keep everything tied with the best similarity, then restore
        // deterministic id order.
        let best = fuzzy
            .iter()
            .map(|(_, s)| *s)
            .fold(f32::NEG_INFINITY, f32::max);
        fuzzy.retain(|(_, s)| best - *s <= self.config.ambiguity_epsilon);
        fuzzy.sort_by(|a, b| a.0.cmp(&b.0));
        fuzzy
            .into_iter()
            .map(|(id, similarity)| reference(id, similarity, DetectionMethod::DocFuzzy))
            .collect()
    }
}

/// Levenshtein distance capped at `max_dist`.
///
/// Standard two-row dynamic programming with an early exit once the row
/// minimum exceeds the cap; returns `max_dist + 1` in that case. Callers
/// normalize case beforehand.
fn levenshtein_with_max(value: &str, needle: &[char], max_dist: usize) -> usize {
    if max_dist == 0 {
        return if value.chars().eq(needle.iter().copied()) {
            0
        } else {
            1
        };
    }

    let n = needle.len();
    if n == 0 {
        return value.chars().count().min(max_dist + 1);
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = usize::from(c != needle[j - 1]);
            let d = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }

        if row_min > max_dist {
            return max_dist + 1;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
