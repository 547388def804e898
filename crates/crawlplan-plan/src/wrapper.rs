//! Plan Wrapper: the executor-facing view of a built plan.
//!
//! Construction builds every component and splices cycles exactly once; the
//! resulting graph is read-only. Successor lists and the views derived from
//! them are computed on first request and cached for the wrapper's lifetime.
//! Filter marks are the only state that changes during a run.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;
use dashmap::DashMap;
use tracing::debug;

use crate::cycle::{splice_cycles, Cycle, CycleRegistry};
use crate::description::PlanDescription;
use crate::error::{PlanError, Result};
use crate::filter::{FilterForest, FilterTree};
use crate::graph::{EdgeId, NodeId, PlanEdge, PlanGraph, PlanNode};
use crate::pattern::{PatternRegistry, SpaceId, TriplePattern};
use crate::successor::{rank_successors, Successor};
use crate::term::{Iri, PatternTerm, Term};
use crate::vocab;

type Cache<T> = DashMap<NodeId, Arc<T>>;

pub struct PlanWrapper {
    registry: PatternRegistry,
    forest: FilterForest,
    cycles: CycleRegistry,
    graph: PlanGraph,

    inverses: AHashMap<Iri, Iri>,
    known_predicates: BTreeSet<Iri>,
    known_types: BTreeSet<Iri>,

    successors: Cache<[Successor]>,
    node_spaces: Cache<BTreeSet<SpaceId>>,
    pattern_successors: Cache<[Successor]>,
    link_successors: Cache<[Successor]>,
    node_links: Cache<BTreeSet<Iri>>,
    node_patterns: Cache<BTreeSet<Iri>>,
}

impl PlanWrapper {
    pub fn new(description: &PlanDescription) -> Result<Self> {
        let registry = PatternRegistry::build(description)?;
        let forest = FilterForest::build(&registry);
        let cycles = CycleRegistry::build(description)?;
        let mut graph = PlanGraph::build(description, &registry, &cycles)?;
        let spliced = splice_cycles(&mut graph, &cycles);

        let inverses = description
            .subject_objects(vocab::OWL_INVERSE_OF)
            .filter_map(|(s, o)| Some((o.as_iri()?.clone(), s.as_iri()?.clone())))
            .collect();

        let mut known_predicates: BTreeSet<Iri> = description
            .subject_objects(vocab::ON_PROPERTY)
            .filter_map(|(_, o)| o.as_iri().cloned())
            .collect();
        known_predicates.extend(
            registry
                .patterns()
                .iter()
                .filter(|tp| tp.predicate.as_str() != vocab::RDF_TYPE)
                .map(|tp| tp.predicate.clone()),
        );

        let known_types = description
            .subject_objects(vocab::EXPECTED_TYPE)
            .filter_map(|(_, o)| o.as_iri().cloned())
            .collect();

        debug!(
            patterns = registry.len(),
            spaces = registry.spaces().len(),
            cycles = cycles.len(),
            spliced,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built plan"
        );

        Ok(Self {
            registry,
            forest,
            cycles,
            graph,
            inverses,
            known_predicates,
            known_types,
            successors: DashMap::new(),
            node_spaces: DashMap::new(),
            pattern_successors: DashMap::new(),
            link_successors: DashMap::new(),
            node_links: DashMap::new(),
            node_patterns: DashMap::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Graph queries
    // ------------------------------------------------------------------------

    /// Nodes carrying seeds: where a crawl starts.
    pub fn roots(&self) -> Vec<(NodeId, &PlanNode)> {
        self.graph
            .nodes()
            .iter()
            .filter(|node| node.is_root())
            .map(|node| (node.id, node))
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Result<&PlanNode> {
        self.graph.node(id)
    }

    pub fn edge(&self, id: EdgeId) -> Result<&PlanEdge> {
        self.graph.edge(id).ok_or(PlanError::UnknownEdge(id))
    }

    /// Resolve a successor to its target node and the edge leading there.
    pub fn describe(&self, successor: &Successor) -> Result<(&PlanNode, &PlanEdge)> {
        Ok((self.node(successor.target)?, self.edge(successor.edge)?))
    }

    /// Ranked successors of `node`. Computed once per node.
    pub fn successors(&self, node: NodeId) -> Result<Arc<[Successor]>> {
        cached(&self.successors, node, || {
            rank_successors(&self.graph, &self.registry, &self.forest, node).map(Arc::from)
        })
    }

    /// Search spaces of the successors' targets.
    pub fn node_spaces(&self, node: NodeId) -> Result<Arc<BTreeSet<SpaceId>>> {
        cached(&self.node_spaces, node, || {
            let mut spaces = BTreeSet::new();
            for s in self.successors(node)?.iter() {
                spaces.extend(self.graph.node(s.target)?.search_spaces());
            }
            Ok(Arc::new(spaces))
        })
    }

    /// Successors whose target satisfies a pattern.
    pub fn pattern_successors(&self, node: NodeId) -> Result<Arc<[Successor]>> {
        cached(&self.pattern_successors, node, || {
            let mut out = Vec::new();
            for s in self.successors(node)?.iter() {
                if self.graph.node(s.target)?.has_patterns() {
                    out.push(s.clone());
                }
            }
            Ok(Arc::from(out))
        })
    }

    /// Successors over a concrete property that are not cycle edges.
    pub fn link_successors(&self, node: NodeId) -> Result<Arc<[Successor]>> {
        cached(&self.link_successors, node, || {
            let mut out = Vec::new();
            for s in self.successors(node)?.iter() {
                if s.property.is_some() && !self.edge(s.edge)?.is_cycle_edge {
                    out.push(s.clone());
                }
            }
            Ok(Arc::from(out))
        })
    }

    /// Properties of the link successors.
    pub fn node_links(&self, node: NodeId) -> Result<Arc<BTreeSet<Iri>>> {
        cached(&self.node_links, node, || {
            let links = self
                .link_successors(node)?
                .iter()
                .filter_map(|s| s.property.clone())
                .collect();
            Ok(Arc::new(links))
        })
    }

    /// Predicates of the patterns satisfied by pattern successors.
    pub fn node_patterns(&self, node: NodeId) -> Result<Arc<BTreeSet<Iri>>> {
        cached(&self.node_patterns, node, || {
            let mut predicates = BTreeSet::new();
            for s in self.pattern_successors(node)?.iter() {
                let target = self.graph.node(s.target)?;
                predicates.extend(
                    target
                        .satisfied_patterns()
                        .filter_map(|pid| self.registry.get(pid))
                        .map(|tp| tp.predicate.clone()),
                );
            }
            Ok(Arc::new(predicates))
        })
    }

    /// Whether two pattern terms are linked through the patterns, in either
    /// direction.
    pub fn connected(&self, a: &PatternTerm, b: &PatternTerm) -> bool {
        self.registry.term_graph().connected(a, b)
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    pub fn filter(&self, resource: &Term, space: SpaceId, variable: &PatternTerm) {
        self.forest.filter(resource, space, variable);
    }

    pub fn is_filtered(&self, resource: &Term, space: SpaceId, variable: Option<&PatternTerm>) -> bool {
        self.forest.is_filtered(resource, space, variable)
    }

    pub fn under_filter(&self, space: SpaceId) -> bool {
        self.forest.under_filter(space)
    }

    /// Start filtering `variable` through `pattern`'s space.
    ///
    /// Successors already computed keep their ranks.
    pub fn filter_var(&self, pattern: &TriplePattern, variable: PatternTerm) {
        self.forest.filter_var(&self.registry, pattern, variable);
    }

    pub fn filter_trees(&self, space: SpaceId) -> Vec<Arc<FilterTree>> {
        self.forest.trees(space)
    }

    pub fn filtered_variables(&self, space: SpaceId) -> BTreeSet<PatternTerm> {
        self.forest.tracked_variables(space)
    }

    pub fn clear_filters(&self) {
        self.forest.clear();
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn graph(&self) -> &PlanGraph {
        &self.graph
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        self.registry.patterns()
    }

    pub fn cycles(&self) -> &CycleRegistry {
        &self.cycles
    }

    pub fn cycles_for(&self, ty: &str) -> &[Arc<Cycle>] {
        self.cycles.cycles_for(ty)
    }

    /// `owl:inverseOf` pairs keyed by the object property.
    pub fn inverses(&self) -> &AHashMap<Iri, Iri> {
        &self.inverses
    }

    pub fn known_predicates(&self) -> &BTreeSet<Iri> {
        &self.known_predicates
    }

    pub fn known_types(&self) -> &BTreeSet<Iri> {
        &self.known_types
    }
}

impl std::fmt::Debug for PlanWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanWrapper")
            .field("patterns", &self.registry.len())
            .field("cycles", &self.cycles.len())
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish_non_exhaustive()
    }
}

/// Cached value for `node`, computing it under the entry lock on a miss.
fn cached<T: ?Sized>(
    map: &Cache<T>,
    node: NodeId,
    compute: impl FnOnce() -> Result<Arc<T>>,
) -> Result<Arc<T>> {
    if let Some(hit) = map.get(&node) {
        return Ok(Arc::clone(hit.value()));
    }
    let entry = map.entry(node).or_try_insert_with(compute)?;
    Ok(Arc::clone(entry.value()))
}
