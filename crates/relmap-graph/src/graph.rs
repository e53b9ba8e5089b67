//! The relationship graph: committed elements and scored edges.
//!
//! Wraps petgraph with an id index and an edge-key index for idempotent
//! merges. Once a pass has committed, the graph is read-only; every query
//! here takes `&self` and produces deterministically ordered output so
//! repeated runs over unchanged input serialize byte-identically.

use crate::error::MapError;
use crate::relationship::{Evidence, Relationship, RelationshipKind};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use relmap_core::{Element, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Direction of traversal relative to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeDirection {
    /// Edges leaving the element: what it depends on.
    Outgoing,
    /// Edges arriving at the element: what depends on it.
    Incoming,
}

impl EdgeDirection {
    fn petgraph(self) -> Direction {
        match self {
            Self::Outgoing => Direction::Outgoing,
            Self::Incoming => Direction::Incoming,
        }
    }
}

/// Edge payload stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub kind: RelationshipKind,
    pub confidence: f32,
    pub evidence: Vec<Evidence>,
}

/// A neighbor query hit: the adjacent element plus the connecting edge.
#[derive(Debug, Clone)]
pub struct Neighbor<'a> {
    pub element: &'a Element,
    pub kind: RelationshipKind,
    pub confidence: f32,
    pub evidence: &'a [Evidence],
}

/// All elements and scored relationships of one analysis snapshot.
#[derive(Debug, Default)]
pub struct RelationshipGraph {
    graph: DiGraph<Element, EdgeData>,
    /// Element id -> node index.
    id_index: HashMap<ElementId, NodeIndex>,
    /// `(source, target, kind)` -> edge index, for idempotent merges.
    edge_index: HashMap<(ElementId, ElementId, RelationshipKind), EdgeIndex>,
}

impl RelationshipGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element, or returns the existing node for a known id.
    pub fn add_element(&mut self, element: Element) -> NodeIndex {
        if let Some(&index) = self.id_index.get(&element.id) {
            return index;
        }
        let id = element.id.clone();
        let index = self.graph.add_node(element);
        self.id_index.insert(id, index);
        index
    }

    /// Commits a relationship.
    ///
    /// Confidence must lie in [0, 1] and both endpoints must exist;
    /// violating either is a [`MapError::InvariantViolation`]. A confidence
    /// of exactly zero means "not detected" and is not materialized
    /// (`Ok(false)`). Re-committing an existing `(source, target, kind)`
    /// merges: the confidences' maximum wins and evidence is unioned.
    pub fn add_relationship(&mut self, rel: Relationship) -> Result<bool, MapError> {
        if !rel.confidence.is_finite() || !(0.0..=1.0).contains(&rel.confidence) {
            return Err(MapError::InvariantViolation(format!(
                "confidence {} for {} -> {} outside [0, 1]",
                rel.confidence, rel.source, rel.target
            )));
        }
        let source = self.require(&rel.source)?;
        let target = self.require(&rel.target)?;

        if rel.confidence == 0.0 {
            return Ok(false);
        }

        let key = (rel.source.clone(), rel.target.clone(), rel.kind);
        if let Some(&edge) = self.edge_index.get(&key) {
            if let Some(data) = self.graph.edge_weight_mut(edge) {
                data.confidence = data.confidence.max(rel.confidence);
                for entry in rel.evidence {
                    if !data.evidence.contains(&entry) {
                        data.evidence.push(entry);
                    }
                }
            }
            return Ok(true);
        }

        let edge = self.graph.add_edge(
            source,
            target,
            EdgeData {
                kind: rel.kind,
                confidence: rel.confidence,
                evidence: rel.evidence,
            },
        );
        self.edge_index.insert(key, edge);
        Ok(true)
    }

    fn require(&self, id: &ElementId) -> Result<NodeIndex, MapError> {
        self.id_index.get(id).copied().ok_or_else(|| {
            MapError::InvariantViolation(format!("relationship endpoint {} is not in the graph", id))
        })
    }

    /// Looks up an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// True if the element is present.
    pub fn contains(&self, id: &ElementId) -> bool {
        self.id_index.contains_key(id)
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of committed relationships.
    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All elements, in stable id order.
    pub fn elements(&self) -> Vec<&Element> {
        let mut out: Vec<&Element> = self.graph.node_weights().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Adjacent elements in one direction, optionally filtered by kind and
    /// by minimum confidence. O(degree); sorted by neighbor id.
    pub fn neighbors(
        &self,
        id: &ElementId,
        direction: EdgeDirection,
        kind: Option<RelationshipKind>,
        min_confidence: f32,
    ) -> Vec<Neighbor<'_>> {
        let Some(&index) = self.id_index.get(id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for edge in self.graph.edges_directed(index, direction.petgraph()) {
            let data = edge.weight();
            if kind.is_some_and(|k| data.kind != k) {
                continue;
            }
            if data.confidence < min_confidence {
                continue;
            }
            let other = match direction {
                EdgeDirection::Outgoing => edge.target(),
                EdgeDirection::Incoming => edge.source(),
            };
            if let Some(element) = self.graph.node_weight(other) {
                out.push(Neighbor {
                    element,
                    kind: data.kind,
                    confidence: data.confidence,
                    evidence: &data.evidence,
                });
            }
        }
        out.sort_by(|a, b| a.element.id.cmp(&b.element.id).then(a.kind.cmp(&b.kind)));
        out
    }

    /// Shortest path (by hops) from `source` to `target` along outgoing
    /// edges, bounded by `max_hops`. Returns the element ids along the
    /// path, endpoints included.
    pub fn path(
        &self,
        source: &ElementId,
        target: &ElementId,
        max_hops: usize,
    ) -> Option<Vec<ElementId>> {
        let start = *self.id_index.get(source)?;
        let goal = *self.id_index.get(target)?;
        if start == goal {
            return Some(vec![source.clone()]);
        }

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::from([(start, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            // Expand in sorted-id order so tied shortest paths resolve the
            // same way on every run.
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .filter(|n| !visited.contains(n))
                .collect();
            next.sort_by(|a, b| {
                let a = self.graph.node_weight(*a).map(|e| &e.id);
                let b = self.graph.node_weight(*b).map(|e| &e.id);
                a.cmp(&b)
            });
            for neighbor in next {
                visited.insert(neighbor);
                parent.insert(neighbor, current);
                if neighbor == goal {
                    return Some(self.reconstruct(&parent, start, goal));
                }
                queue.push_back((neighbor, depth + 1));
            }
        }
        None
    }

    fn reconstruct(
        &self,
        parent: &HashMap<NodeIndex, NodeIndex>,
        start: NodeIndex,
        goal: NodeIndex,
    ) -> Vec<ElementId> {
        let mut indices = vec![goal];
        let mut current = goal;
        while current != start {
            match parent.get(&current) {
                Some(&prev) => {
                    indices.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        indices.reverse();
        indices
            .into_iter()
            .filter_map(|i| self.graph.node_weight(i).map(|e| e.id.clone()))
            .collect()
    }

    /// All elements matching `predicate`, in stable id order. Read-only.
    pub fn query(&self, predicate: impl Fn(&Element) -> bool) -> Vec<&Element> {
        let mut out: Vec<&Element> = self
            .graph
            .node_weights()
            .filter(|e| predicate(e))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Flat, deterministically ordered form for serialization and
    /// downstream chunking.
    pub fn snapshot(&self) -> GraphSnapshot {
        let elements: Vec<Element> = self.elements().into_iter().cloned().collect();

        let mut relationships: Vec<Relationship> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let source = self.graph.node_weight(edge.source())?;
                let target = self.graph.node_weight(edge.target())?;
                let data = edge.weight();
                Some(Relationship {
                    source: source.id.clone(),
                    target: target.id.clone(),
                    kind: data.kind,
                    confidence: data.confidence,
                    evidence: data.evidence.clone(),
                })
            })
            .collect();
        relationships.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then(a.kind.cmp(&b.kind))
                .then(a.target.cmp(&b.target))
        });

        GraphSnapshot {
            elements,
            relationships,
        }
    }

    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let files: HashSet<&str> = self
            .graph
            .node_weights()
            .map(|e| e.location.file.as_str())
            .collect();
        GraphStats {
            element_count: self.element_count(),
            relationship_count: self.relationship_count(),
            files: files.len(),
        }
    }
}

/// Serialized snapshot: flat element and relationship lists in stable
/// `(source, type, target)` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub elements: Vec<Element>,
    pub relationships: Vec<Relationship>,
}

/// Graph statistics for host reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub element_count: usize,
    pub relationship_count: usize,
    pub files: usize,
}
