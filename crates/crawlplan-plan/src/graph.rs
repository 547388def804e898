//! Plan graph: an arena of plan nodes joined by property-labelled edges.
//!
//! Nodes are addressed by dense [`NodeId`]s and edges by [`EdgeId`]s; each
//! node keeps its outgoing edges in declaration order. The graph is only
//! mutated during construction (including cycle splicing) and is read-only
//! once handed to a [`PlanWrapper`](crate::PlanWrapper).

use std::collections::BTreeSet;
use std::fmt;

use ahash::{AHashMap, AHashSet};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cycle::{CycleId, CycleRegistry};
use crate::description::PlanDescription;
use crate::error::{PlanError, Result};
use crate::pattern::{PatternId, PatternRegistry, SpaceId};
use crate::term::{Iri, Literal, Node, Term};
use crate::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EdgeId(u32);

impl EdgeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Mergeable node attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAttrs {
    pub spaces: RoaringBitmap,
    pub patterns: RoaringBitmap,
    pub seeds: BTreeSet<Iri>,
    pub requires_type_check: Option<bool>,
}

impl NodeAttrs {
    pub fn with_spaces(spaces: RoaringBitmap) -> Self {
        Self {
            spaces,
            ..Self::default()
        }
    }

    /// Copy used for cloned cycle nodes: seeds never travel with a clone.
    pub fn without_seeds(&self) -> Self {
        Self {
            seeds: BTreeSet::new(),
            ..self.clone()
        }
    }
}

/// Fold `incoming` into `existing`: sets are unioned, scalars keep the
/// existing value when one is set.
pub fn merge_into(existing: &mut NodeAttrs, incoming: NodeAttrs) {
    existing.spaces |= incoming.spaces;
    existing.patterns |= incoming.patterns;
    existing.seeds.extend(incoming.seeds);
    existing.requires_type_check = existing.requires_type_check.or(incoming.requires_type_check);
}

#[derive(Debug, Clone)]
pub struct PlanNode {
    pub id: NodeId,
    /// Description node this plan node stands for; `None` for cycle clones.
    pub term: Option<Node>,
    pub attrs: NodeAttrs,
}

impl PlanNode {
    pub fn search_spaces(&self) -> impl Iterator<Item = SpaceId> + '_ {
        self.attrs.spaces.iter().map(SpaceId::new)
    }

    pub fn satisfied_patterns(&self) -> impl Iterator<Item = PatternId> + '_ {
        self.attrs.patterns.iter().map(PatternId::new)
    }

    pub fn has_patterns(&self) -> bool {
        !self.attrs.patterns.is_empty()
    }

    pub fn seeds(&self) -> &BTreeSet<Iri> {
        &self.attrs.seeds
    }

    pub fn is_root(&self) -> bool {
        !self.attrs.seeds.is_empty()
    }

    pub fn requires_type_check(&self) -> bool {
        self.attrs.requires_type_check.unwrap_or(false)
    }

    pub fn is_clone(&self) -> bool {
        self.term.is_none()
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.term {
            Some(term) => write!(f, "{} {}", self.id, term),
            None => write!(f, "{} (cycle clone)", self.id),
        }
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Link property of an edge. Spliced cycle edges carry a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkProperty {
    #[default]
    None,
    One(Iri),
    Many(BTreeSet<Iri>),
}

impl LinkProperty {
    pub fn iter(&self) -> impl Iterator<Item = &Iri> {
        let (one, many) = match self {
            LinkProperty::None => (None, None),
            LinkProperty::One(iri) => (Some(iri), None),
            LinkProperty::Many(set) => (None, Some(set)),
        };
        one.into_iter().chain(many.into_iter().flatten())
    }

    /// Union of two properties. A union with any concrete property is a set.
    pub fn union(&self, other: &LinkProperty) -> LinkProperty {
        let set: BTreeSet<Iri> = self.iter().chain(other.iter()).cloned().collect();
        if set.is_empty() {
            LinkProperty::None
        } else {
            LinkProperty::Many(set)
        }
    }
}

impl fmt::Display for LinkProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkProperty::None => f.write_str("-"),
            LinkProperty::One(iri) => fmt::Display::fmt(iri, f),
            LinkProperty::Many(set) => {
                f.write_str("{")?;
                for (i, iri) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(iri, f)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Attributes supplied when adding an edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeAttrs {
    pub property: LinkProperty,
    pub expected_types: BTreeSet<Iri>,
    pub type_hierarchy: Option<Term>,
    pub is_cycle_edge: bool,
    pub cycle_starts: BTreeSet<CycleId>,
}

#[derive(Debug, Clone)]
pub struct PlanEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub property: LinkProperty,
    pub expected_types: BTreeSet<Iri>,
    pub type_hierarchy: Option<Term>,
    pub is_cycle_edge: bool,
    /// Cycles this edge is a legitimate start point for.
    pub cycle_starts: BTreeSet<CycleId>,
}

impl PlanEdge {
    /// Whether the executor should accept subtypes of the expected types.
    pub fn follows_type_hierarchy(&self) -> bool {
        match &self.type_hierarchy {
            None => false,
            Some(Term::Literal(lit)) => lit.as_bool().unwrap_or(true),
            Some(Term::Node(_)) => true,
        }
    }
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    nodes: Vec<PlanNode>,
    edges: Vec<PlanEdge>,
    out: Vec<Vec<EdgeId>>,
    by_term: AHashMap<Node, NodeId>,
    edge_keys: AHashMap<(NodeId, NodeId, LinkProperty), EdgeId>,
}

impl PlanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the traversal graph from the plan's `byPattern` nodes and the
    /// `next` chains leading into them.
    pub fn build(
        description: &PlanDescription,
        registry: &PatternRegistry,
        cycles: &CycleRegistry,
    ) -> Result<Self> {
        let mut graph = PlanGraph::new();

        let mut order: Vec<&Node> = Vec::new();
        let mut grouped: AHashMap<&Node, Vec<PatternId>> = AHashMap::new();
        for (node, tp) in description.subject_objects(vocab::BY_PATTERN) {
            let pattern = tp
                .as_node()
                .and_then(|tp| registry.by_node(tp))
                .ok_or_else(|| PlanError::malformed(node, "byPattern"))?;
            grouped
                .entry(node)
                .or_insert_with(|| {
                    order.push(node);
                    Vec::new()
                })
                .push(pattern.id);
        }

        for node in order {
            let mut attrs = NodeAttrs {
                requires_type_check: Some(
                    description
                        .object(node, vocab::CHECK_TYPE)
                        .and_then(Term::as_literal)
                        .and_then(Literal::as_bool)
                        .unwrap_or(false),
                ),
                ..NodeAttrs::default()
            };
            for &id in &grouped[node] {
                if let Some(tp) = registry.get(id) {
                    attrs.spaces.insert(tp.space.raw());
                    attrs.patterns.insert(id.raw());
                }
            }
            let spaces = attrs.spaces.clone();
            graph.add_node(node.clone(), attrs);
            graph.walk_back(description, cycles, node, &spaces);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built plan graph"
        );
        Ok(graph)
    }

    /// Walk `next` edges backwards from `start`, propagating `spaces` to every
    /// ancestor and adding one edge per predecessor link.
    fn walk_back(
        &mut self,
        description: &PlanDescription,
        cycles: &CycleRegistry,
        start: &Node,
        spaces: &RoaringBitmap,
    ) {
        let mut visited: AHashSet<Node> = AHashSet::new();
        let mut stack = vec![start.clone()];
        visited.insert(start.clone());

        while let Some(current) = stack.pop() {
            let current_term = Term::from(current.clone());
            let preds: Vec<Node> = description
                .subjects(vocab::NEXT, &current_term)
                .cloned()
                .collect();

            let mut attrs = NodeAttrs::with_spaces(spaces.clone());
            if preds.is_empty() {
                attrs.seeds = description
                    .objects(&current, vocab::HAS_SEED)
                    .filter_map(Term::as_iri)
                    .cloned()
                    .collect();
            }
            let to = self.add_node(current.clone(), attrs);
            if preds.is_empty() {
                continue;
            }

            let edge = link_attrs(description, cycles, &current);
            let mut unvisited = Vec::new();
            for pred in preds {
                let from = self.add_node(pred.clone(), NodeAttrs::with_spaces(spaces.clone()));
                self.add_edge(from, to, edge.clone());
                if visited.insert(pred.clone()) {
                    unvisited.push(pred);
                }
            }
            stack.extend(unvisited.into_iter().rev());
        }
    }

    /// Add a node for `term`, merging attributes into an existing one.
    pub fn add_node(&mut self, term: Node, attrs: NodeAttrs) -> NodeId {
        if let Some(&id) = self.by_term.get(&term) {
            merge_into(&mut self.nodes[id.0 as usize].attrs, attrs);
            return id;
        }
        let id = self.push_node(Some(term.clone()), attrs);
        self.by_term.insert(term, id);
        id
    }

    /// Add a fresh node with no description term.
    pub fn add_clone(&mut self, attrs: NodeAttrs) -> NodeId {
        self.push_node(None, attrs)
    }

    fn push_node(&mut self, term: Option<Node>, attrs: NodeAttrs) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PlanNode { id, term, attrs });
        self.out.push(Vec::new());
        id
    }

    /// Add `from -> to`. An edge with the same endpoints and property absorbs
    /// the new attributes instead.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, attrs: EdgeAttrs) -> EdgeId {
        let key = (from, to, attrs.property.clone());
        if let Some(&id) = self.edge_keys.get(&key) {
            let edge = &mut self.edges[id.0 as usize];
            edge.expected_types.extend(attrs.expected_types);
            edge.cycle_starts.extend(attrs.cycle_starts);
            edge.is_cycle_edge |= attrs.is_cycle_edge;
            if edge.type_hierarchy.is_none() {
                edge.type_hierarchy = attrs.type_hierarchy;
            }
            return id;
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(PlanEdge {
            id,
            from,
            to,
            property: attrs.property,
            expected_types: attrs.expected_types,
            type_hierarchy: attrs.type_hierarchy,
            is_cycle_edge: attrs.is_cycle_edge,
            cycle_starts: attrs.cycle_starts,
        });
        self.out[from.0 as usize].push(id);
        self.edge_keys.insert(key, id);
        id
    }

    /// Add one step of a spliced cycle. An existing edge between the same
    /// endpoints takes the property into its set and becomes a cycle edge.
    pub fn splice_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        property: &Iri,
        expected_types: &BTreeSet<Iri>,
        type_hierarchy: Option<&Term>,
    ) -> EdgeId {
        let existing = self.out[from.0 as usize]
            .iter()
            .copied()
            .find(|&id| self.edges[id.0 as usize].to == to);

        let Some(id) = existing else {
            return self.add_edge(
                from,
                to,
                EdgeAttrs {
                    property: LinkProperty::Many(BTreeSet::from([property.clone()])),
                    expected_types: expected_types.clone(),
                    type_hierarchy: type_hierarchy.cloned(),
                    is_cycle_edge: true,
                    cycle_starts: BTreeSet::new(),
                },
            );
        };

        let edge = &mut self.edges[id.0 as usize];
        let old_key = (from, to, edge.property.clone());
        edge.property = edge
            .property
            .union(&LinkProperty::One(property.clone()));
        edge.expected_types.extend(expected_types.iter().cloned());
        edge.is_cycle_edge = true;
        if edge.type_hierarchy.is_none() {
            edge.type_hierarchy = type_hierarchy.cloned();
        }
        let new_key = (from, to, edge.property.clone());

        if self.edge_keys.get(&old_key) == Some(&id) {
            self.edge_keys.remove(&old_key);
        }
        self.edge_keys.entry(new_key).or_insert(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&PlanNode> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(PlanError::UnknownNode(id))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&PlanEdge> {
        self.edges.get(id.0 as usize)
    }

    /// Outgoing edges of `id` in declaration order.
    pub fn edges_from(&self, id: NodeId) -> Result<&[EdgeId]> {
        self.out
            .get(id.0 as usize)
            .map(Vec::as_slice)
            .ok_or(PlanError::UnknownNode(id))
    }

    pub fn edges_between(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = &PlanEdge> {
        self.out
            .get(from.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&id| &self.edges[id.0 as usize])
            .filter(move |edge| edge.to == to)
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PlanEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_by_term(&self, term: &Node) -> Option<NodeId> {
        self.by_term.get(term).copied()
    }
}

/// Attributes of the edges leading into `node`, read off `node` itself.
fn link_attrs(description: &PlanDescription, cycles: &CycleRegistry, node: &Node) -> EdgeAttrs {
    let property = description
        .objects(node, vocab::ON_PROPERTY)
        .find_map(Term::as_iri)
        .cloned()
        .map_or(LinkProperty::None, LinkProperty::One);

    let mut cycle_starts = BTreeSet::new();
    for target in description.objects(node, vocab::IS_CYCLE_START_OF) {
        match target.as_node().and_then(|c| cycles.by_root(c)) {
            Some(cycle) => {
                cycle_starts.insert(cycle.id);
            }
            None => warn!(%node, cycle = %target, "skipping unknown cycle reference"),
        }
    }

    EdgeAttrs {
        property,
        expected_types: description
            .objects(node, vocab::EXPECTED_TYPE)
            .filter_map(Term::as_iri)
            .cloned()
            .collect(),
        type_hierarchy: description.object(node, vocab::TYPE_HIERARCHY).cloned(),
        is_cycle_edge: false,
        cycle_starts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Iri {
        Iri::new(format!("http://example.org/{local}"))
    }

    fn attrs(spaces: &[u32]) -> NodeAttrs {
        NodeAttrs::with_spaces(spaces.iter().copied().collect())
    }

    #[test]
    fn merge_unions_sets_and_keeps_existing_scalars() {
        let mut existing = NodeAttrs {
            requires_type_check: Some(true),
            ..attrs(&[0])
        };
        let incoming = NodeAttrs {
            requires_type_check: Some(false),
            seeds: BTreeSet::from([ex("seed")]),
            ..attrs(&[1])
        };
        merge_into(&mut existing, incoming);
        assert_eq!(existing.spaces.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(existing.requires_type_check, Some(true));
        assert!(existing.seeds.contains(&ex("seed")));

        let mut unset = NodeAttrs::default();
        merge_into(&mut unset, NodeAttrs { requires_type_check: Some(true), ..NodeAttrs::default() });
        assert_eq!(unset.requires_type_check, Some(true));
    }

    #[test]
    fn nodes_merge_by_term_and_clones_are_fresh() {
        let mut g = PlanGraph::new();
        let a = g.add_node(Node::blank("a"), attrs(&[0]));
        let again = g.add_node(Node::blank("a"), attrs(&[2]));
        assert_eq!(a, again);
        assert_eq!(g.node(a).unwrap().search_spaces().count(), 2);

        let c = g.add_clone(g.node(a).unwrap().attrs.without_seeds());
        assert_ne!(a, c);
        assert!(g.node(c).unwrap().is_clone());
        assert!(matches!(g.node(NodeId::new(99)), Err(PlanError::UnknownNode(_))));
    }

    #[test]
    fn edges_dedupe_on_endpoints_and_property() {
        let mut g = PlanGraph::new();
        let a = g.add_node(Node::blank("a"), NodeAttrs::default());
        let b = g.add_node(Node::blank("b"), NodeAttrs::default());
        let knows = EdgeAttrs {
            property: LinkProperty::One(ex("knows")),
            expected_types: BTreeSet::from([ex("Person")]),
            ..EdgeAttrs::default()
        };
        let e1 = g.add_edge(a, b, knows.clone());
        let e2 = g.add_edge(
            a,
            b,
            EdgeAttrs {
                expected_types: BTreeSet::from([ex("Agent")]),
                ..knows
            },
        );
        assert_eq!(e1, e2);
        assert_eq!(g.edge(e1).unwrap().expected_types.len(), 2);

        let e3 = g.add_edge(a, b, EdgeAttrs::default());
        assert_ne!(e1, e3);
        assert_eq!(g.edges_from(a).unwrap(), &[e1, e3]);
        assert_eq!(g.edges_between(a, b).count(), 2);
    }

    #[test]
    fn splice_edge_unions_into_existing_edge() {
        let mut g = PlanGraph::new();
        let a = g.add_node(Node::blank("a"), NodeAttrs::default());
        let b = g.add_node(Node::blank("b"), NodeAttrs::default());
        let existing = g.add_edge(
            a,
            b,
            EdgeAttrs {
                property: LinkProperty::One(ex("knows")),
                ..EdgeAttrs::default()
            },
        );
        let types = BTreeSet::from([ex("Person")]);
        let spliced = g.splice_edge(a, b, &ex("parent"), &types, None);
        assert_eq!(existing, spliced);

        let edge = g.edge(spliced).unwrap();
        assert!(edge.is_cycle_edge);
        assert_eq!(
            edge.property,
            LinkProperty::Many(BTreeSet::from([ex("knows"), ex("parent")]))
        );

        let fresh = g.splice_edge(b, a, &ex("parent"), &types, None);
        assert_ne!(fresh, spliced);
        assert_eq!(g.edge(fresh).unwrap().property.iter().count(), 1);
    }

    #[test]
    fn type_hierarchy_flag_reads_boolean_literals() {
        let mut g = PlanGraph::new();
        let a = g.add_node(Node::blank("a"), NodeAttrs::default());
        let edge = |th: Option<Term>| EdgeAttrs {
            type_hierarchy: th,
            ..EdgeAttrs::default()
        };
        let off = g.add_edge(a, a, edge(Some(Literal::simple("false").into())));
        assert!(!g.edge(off).unwrap().follows_type_hierarchy());

        let b = g.add_node(Node::blank("b"), NodeAttrs::default());
        let on = g.add_edge(a, b, edge(Some(ex("Thing").into())));
        assert!(g.edge(on).unwrap().follows_type_hierarchy());
    }
}
