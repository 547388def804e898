//! Successor ordering.
//!
//! Candidate links out of a plan node are ranked so that the crawler first
//! visits nodes that satisfy patterns, then links known to lead towards a
//! pattern (preferring the ones furthest from a filter variable, which are the
//! most selective), then plain links, and cycle edges last.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::filter::FilterForest;
use crate::graph::{EdgeId, LinkProperty, NodeId, PlanGraph};
use crate::pattern::{PatternId, PatternRegistry};
use crate::term::Iri;

/// Exploration rank of a successor; lower ranks are explored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessorRank {
    /// The target satisfies at least one triple pattern.
    Pattern,
    /// A sibling target matches a pattern over this link's property.
    Linked { distance: usize },
    Plain,
    /// Spliced cycle edge.
    Cycle,
}

impl SuccessorRank {
    fn key(&self) -> (u8, Reverse<usize>) {
        match *self {
            SuccessorRank::Pattern => (0, Reverse(0)),
            SuccessorRank::Linked { distance } => (1, Reverse(distance)),
            SuccessorRank::Plain => (2, Reverse(0)),
            SuccessorRank::Cycle => (3, Reverse(0)),
        }
    }

    /// Numeric weight with the same ordering as the rank.
    pub fn weight(&self) -> i64 {
        match *self {
            SuccessorRank::Pattern => -5000,
            SuccessorRank::Linked { distance } => -1000 - distance as i64,
            SuccessorRank::Plain => 2,
            SuccessorRank::Cycle => 5000,
        }
    }
}

impl Ord for SuccessorRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for SuccessorRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A candidate next step out of a plan node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Successor {
    pub target: NodeId,
    pub edge: EdgeId,
    /// The concrete link property; multi-property edges yield one successor
    /// per property.
    pub property: Option<Iri>,
    pub rank: SuccessorRank,
}

struct Candidate<'g> {
    target: NodeId,
    edge: EdgeId,
    property: Option<&'g Iri>,
    is_cycle_edge: bool,
}

/// Ranked successors of `node`, ties kept in edge declaration order.
pub fn rank_successors(
    graph: &PlanGraph,
    registry: &PatternRegistry,
    forest: &FilterForest,
    node: NodeId,
) -> Result<Vec<Successor>> {
    let mut candidates = Vec::new();
    for &id in graph.edges_from(node)? {
        let Some(edge) = graph.edge(id) else {
            continue;
        };
        let mut push = |property| {
            candidates.push(Candidate {
                target: edge.to,
                edge: id,
                property,
                is_cycle_edge: edge.is_cycle_edge,
            })
        };
        match &edge.property {
            LinkProperty::None => push(None),
            LinkProperty::One(p) => push(Some(p)),
            LinkProperty::Many(set) => set.iter().for_each(|p| push(Some(p))),
        }
    }

    // Patterns of sibling targets, keyed by the links whose property they use.
    let mut linked: AHashMap<(NodeId, &Iri), BTreeSet<PatternId>> = AHashMap::new();
    for c in &candidates {
        if let Some(p) = c.property {
            linked.entry((c.target, p)).or_default();
        }
    }
    for c in &candidates {
        for pid in graph.node(c.target)?.satisfied_patterns() {
            let Some(tp) = registry.get(pid) else {
                continue;
            };
            for ((_, property), patterns) in linked.iter_mut() {
                if **property == tp.predicate {
                    patterns.insert(pid);
                }
            }
        }
    }

    let mut successors = Vec::with_capacity(candidates.len());
    for c in candidates {
        let rank = if c.is_cycle_edge {
            SuccessorRank::Cycle
        } else if graph.node(c.target)?.has_patterns() {
            SuccessorRank::Pattern
        } else {
            match c.property.and_then(|p| linked.get(&(c.target, p))) {
                Some(patterns) if !patterns.is_empty() => SuccessorRank::Linked {
                    distance: filter_distance(registry, forest, patterns),
                },
                _ => SuccessorRank::Plain,
            }
        };
        successors.push(Successor {
            target: c.target,
            edge: c.edge,
            property: c.property.cloned(),
            rank,
        });
    }
    successors.sort_by_key(|s| s.rank);

    trace!(%node, count = successors.len(), "ranked successors");
    Ok(successors)
}

/// Shortest hop count from any pattern's object to a filtered variable of its
/// space, over every tree containing that object. `0` when nothing is reachable.
fn filter_distance(
    registry: &PatternRegistry,
    forest: &FilterForest,
    patterns: &BTreeSet<PatternId>,
) -> usize {
    patterns
        .iter()
        .filter_map(|&pid| registry.get(pid))
        .filter_map(|tp| {
            let variables = forest.tracked_variables(tp.space);
            forest
                .trees(tp.space)
                .iter()
                .filter(|tree| tree.contains_term(&tp.object))
                .filter_map(|tree| tree.min_distance(&tp.object, &variables))
                .min()
        })
        .min()
        .unwrap_or(0)
}
