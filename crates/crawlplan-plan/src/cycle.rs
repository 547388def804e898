//! Cycle Registry: recursive property chains and their splicing.
//!
//! A declared cycle is a simple `next` chain starting at the cycle node. Each
//! step is read off the node it leads to. Cycles are indexed by the types the
//! chain starts from, which the final step must be able to return to.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::description::PlanDescription;
use crate::error::{PlanError, Result};
use crate::graph::{NodeId, PlanGraph};
use crate::term::{Iri, Node, Term};
use crate::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CycleId(u32);

impl CycleId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStep {
    pub property: Iri,
    pub expected_types: BTreeSet<Iri>,
    pub type_hierarchy: Option<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub id: CycleId,
    pub root: Node,
    pub root_types: BTreeSet<Iri>,
    pub steps: Vec<CycleStep>,
}

impl Cycle {
    fn read(description: &PlanDescription, id: CycleId, root: &Node) -> Result<Self> {
        let mut steps = Vec::new();
        let mut visited: AHashSet<&Node> = AHashSet::new();
        visited.insert(root);
        let mut current = root;

        loop {
            let mut next = description
                .objects(current, vocab::NEXT)
                .filter_map(Term::as_node);
            let Some(nxt) = next.next() else {
                break;
            };
            if next.next().is_some() {
                return Err(PlanError::invalid_cycle(
                    root,
                    format!("chain branches at {current}"),
                ));
            }
            if !visited.insert(nxt) {
                return Err(PlanError::invalid_cycle(
                    root,
                    format!("chain revisits {nxt}"),
                ));
            }

            let property = description
                .object(nxt, vocab::ON_PROPERTY)
                .and_then(Term::as_iri)
                .cloned()
                .ok_or_else(|| {
                    PlanError::invalid_cycle(root, format!("step {nxt} has no onProperty"))
                })?;
            steps.push(CycleStep {
                property,
                expected_types: description
                    .objects(nxt, vocab::EXPECTED_TYPE)
                    .filter_map(Term::as_iri)
                    .cloned()
                    .collect(),
                type_hierarchy: description.object(nxt, vocab::TYPE_HIERARCHY).cloned(),
            });
            current = nxt;
        }

        let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
            return Err(PlanError::invalid_cycle(root, "no steps"));
        };
        let root_types = first.expected_types.clone();
        if root_types.is_empty() {
            return Err(PlanError::invalid_cycle(root, "first step declares no expected type"));
        }
        if last.expected_types.is_disjoint(&root_types) {
            return Err(PlanError::invalid_cycle(
                root,
                "final step never returns to a root type",
            ));
        }

        Ok(Cycle {
            id,
            root: root.clone(),
            root_types,
            steps,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleRegistry {
    cycles: Vec<Arc<Cycle>>,
    by_type: AHashMap<Iri, Vec<Arc<Cycle>>>,
    by_root: AHashMap<Node, CycleId>,
}

impl CycleRegistry {
    pub fn build(description: &PlanDescription) -> Result<Self> {
        let mut registry = CycleRegistry::default();
        for (i, node) in description.instances_of(vocab::CYCLE).into_iter().enumerate() {
            let cycle = Arc::new(Cycle::read(description, CycleId(i as u32), node)?);
            for ty in &cycle.root_types {
                registry
                    .by_type
                    .entry(ty.clone())
                    .or_default()
                    .push(Arc::clone(&cycle));
            }
            registry.by_root.insert(node.clone(), cycle.id);
            registry.cycles.push(cycle);
        }
        debug!(cycles = registry.len(), "built cycle registry");
        Ok(registry)
    }

    /// Cycles whose chain starts from `ty`.
    pub fn cycles_for(&self, ty: &str) -> &[Arc<Cycle>] {
        self.by_type
            .get(ty)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, id: CycleId) -> Option<&Arc<Cycle>> {
        self.cycles.get(id.0 as usize)
    }

    /// Cycle declared on description node `root`.
    pub fn by_root(&self, root: &Node) -> Option<&Arc<Cycle>> {
        self.by_root.get(root).and_then(|&id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Cycle>> {
        self.cycles.iter()
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Clone every cycle's chain onto each edge marked as its start point.
///
/// Start edges are collected before anything is spliced, and each
/// `(source node, cycle)` pair is spliced at most once. Returns the number of
/// splices performed.
pub(crate) fn splice_cycles(graph: &mut PlanGraph, cycles: &CycleRegistry) -> usize {
    let starts: Vec<(Arc<Cycle>, Vec<(NodeId, NodeId)>)> = cycles
        .iter()
        .map(|cycle| {
            let edges = graph
                .edges()
                .iter()
                .filter(|edge| edge.cycle_starts.contains(&cycle.id))
                .map(|edge| (edge.from, edge.to))
                .collect();
            (Arc::clone(cycle), edges)
        })
        .collect();

    let mut seen: AHashSet<(NodeId, CycleId)> = AHashSet::new();
    let mut spliced = 0;

    for (cycle, edges) in starts {
        for (u, v) in edges {
            if !seen.insert((u, cycle.id)) {
                continue;
            }
            let Ok(target) = graph.node(v) else {
                continue;
            };
            let template = target.attrs.without_seeds();

            let mut source = u;
            for (i, step) in cycle.steps.iter().enumerate() {
                let dest = if i + 1 == cycle.steps.len() {
                    u
                } else {
                    graph.add_clone(template.clone())
                };
                graph.splice_edge(
                    source,
                    dest,
                    &step.property,
                    &step.expected_types,
                    step.type_hierarchy.as_ref(),
                );
                source = dest;
            }

            debug!(cycle = %cycle.id, node = %u, steps = cycle.steps.len(), "spliced cycle");
            spliced += 1;
        }
    }

    spliced
}
