//! Filter trees: per-search-space exclusion bookkeeping.
//!
//! A tree is anchored at a filter-root pattern and records the chain of
//! same-space patterns that lead into it. The executor marks
//! `(resource, space, variable)` bindings as filtered; the planner reads the
//! tree shape back to prefer links that are close to a known filter.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::{Mutex, RwLock};
use roaring::RoaringBitmap;

use crate::pattern::{PatternId, PatternRegistry, SpaceId, TriplePattern};
use crate::term::{PatternTerm, Term};
use crate::term_graph::TermGraph;

type Mark = (Term, SpaceId, PatternTerm);

#[derive(Debug, Default)]
struct TreeShape {
    variables: BTreeSet<PatternTerm>,
    graph: TermGraph,
}

#[derive(Debug)]
pub struct FilterTree {
    space: SpaceId,
    shape: RwLock<TreeShape>,
    marks: Mutex<AHashSet<Mark>>,
}

impl FilterTree {
    pub fn new(space: SpaceId) -> Self {
        Self {
            space,
            shape: RwLock::new(TreeShape::default()),
            marks: Mutex::new(AHashSet::new()),
        }
    }

    /// Tree grown from a filter-root pattern, tracking the pattern's object.
    pub fn rooted_at(registry: &PatternRegistry, root: &TriplePattern) -> Self {
        let tree = Self::new(root.space);
        tree.extend(registry, root, root.object.clone());
        tree
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    /// Grow from `pattern` and start tracking `variable`.
    pub fn extend(&self, registry: &PatternRegistry, pattern: &TriplePattern, variable: PatternTerm) {
        let edges = grow(registry, pattern);
        let mut shape = self.shape.write();
        for (from, to) in edges {
            shape.graph.add_edge(from, to);
        }
        shape.variables.insert(variable);
    }

    /// Record an exclusion. Returns `true` if the mark is new.
    pub fn filter(&self, resource: &Term, space: SpaceId, variable: &PatternTerm) -> bool {
        self.marks
            .lock()
            .insert((resource.clone(), space, variable.clone()))
    }

    pub fn is_filtered(&self, resource: &Term, space: SpaceId, variable: &PatternTerm) -> bool {
        self.marks
            .lock()
            .contains(&(resource.clone(), space, variable.clone()))
    }

    /// Whether `resource` is marked for every tracked variable.
    ///
    /// A tree tracking no variables never filters anything.
    pub fn is_filtered_all(&self, resource: &Term, space: SpaceId) -> bool {
        let variables = self.variables();
        if variables.is_empty() {
            return false;
        }
        let marks = self.marks.lock();
        variables
            .into_iter()
            .all(|v| marks.contains(&(resource.clone(), space, v)))
    }

    pub fn variables(&self) -> BTreeSet<PatternTerm> {
        self.shape.read().variables.clone()
    }

    pub fn tracks(&self, variable: &PatternTerm) -> bool {
        self.shape.read().variables.contains(variable)
    }

    /// Whether `term` is a node of the tree's pattern graph.
    pub fn contains_term(&self, term: &PatternTerm) -> bool {
        self.shape.read().graph.contains(term)
    }

    pub fn distance(&self, from: &PatternTerm, to: &PatternTerm) -> Option<usize> {
        self.shape.read().graph.distance(from, to)
    }

    /// Shortest distance from `from` to any of `targets` present in the tree.
    pub fn min_distance<'a>(
        &self,
        from: &PatternTerm,
        targets: impl IntoIterator<Item = &'a PatternTerm>,
    ) -> Option<usize> {
        let shape = self.shape.read();
        if !shape.graph.contains(from) {
            return None;
        }
        targets
            .into_iter()
            .filter(|v| shape.graph.contains(v))
            .filter_map(|v| shape.graph.distance(from, v))
            .min()
    }

    /// Number of marks.
    pub fn len(&self) -> usize {
        self.marks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.lock().is_empty()
    }

    pub fn clear(&self) {
        self.marks.lock().clear();
    }
}

/// Pattern-graph edges reachable from `root` by walking backwards through
/// same-space patterns whose object feeds the current subject.
///
/// Stops at patterns with a bound subject; each pattern is visited once.
pub fn grow(registry: &PatternRegistry, root: &TriplePattern) -> Vec<(PatternTerm, PatternTerm)> {
    let mut edges = Vec::new();
    let mut trace = RoaringBitmap::new();
    let mut stack: Vec<PatternId> = vec![root.id];

    while let Some(id) = stack.pop() {
        if !trace.insert(id.raw()) {
            continue;
        }
        let Some(tp) = registry.get(id) else {
            continue;
        };
        if !tp.subject.is_variable() {
            continue;
        }
        edges.push((tp.subject.clone(), tp.object.clone()));

        let feeding: Vec<PatternId> = registry
            .patterns_of(tp.space)
            .filter(|q| q.object == tp.subject && !trace.contains(q.id.raw()))
            .map(|q| q.id)
            .collect();
        stack.extend(feeding.into_iter().rev());
    }

    edges
}

// ============================================================================
// Forest: every tree of every space
// ============================================================================

#[derive(Debug, Default)]
pub struct FilterForest {
    trees: AHashMap<SpaceId, RwLock<Vec<Arc<FilterTree>>>>,
}

impl FilterForest {
    /// One tree per filter-root pattern, in declaration order.
    pub fn build(registry: &PatternRegistry) -> Self {
        let mut trees = AHashMap::new();
        for space in registry.spaces() {
            let list: Vec<Arc<FilterTree>> = registry
                .filter_roots_of(space.id)
                .map(|root| Arc::new(FilterTree::rooted_at(registry, root)))
                .collect();
            trees.insert(space.id, RwLock::new(list));
        }
        Self { trees }
    }

    /// Snapshot of the trees of `space`.
    pub fn trees(&self, space: SpaceId) -> Vec<Arc<FilterTree>> {
        self.trees
            .get(&space)
            .map(|list| list.read().clone())
            .unwrap_or_default()
    }

    pub fn tree_count(&self, space: SpaceId) -> usize {
        self.trees.get(&space).map_or(0, |list| list.read().len())
    }

    /// Union of the variables tracked by any tree of `space`.
    pub fn tracked_variables(&self, space: SpaceId) -> BTreeSet<PatternTerm> {
        self.trees(space)
            .iter()
            .flat_map(|tree| tree.variables())
            .collect()
    }

    pub fn filter(&self, resource: &Term, space: SpaceId, variable: &PatternTerm) {
        for tree in self.trees(space) {
            tree.filter(resource, space, variable);
        }
    }

    /// `Some(v)`: every tree of the space holds the mark. `None`: every tree
    /// holds a mark for each of its tracked variables. Spaces without trees
    /// are never filtered.
    pub fn is_filtered(&self, resource: &Term, space: SpaceId, variable: Option<&PatternTerm>) -> bool {
        let trees = self.trees(space);
        if trees.is_empty() {
            return false;
        }
        trees.iter().all(|tree| match variable {
            Some(v) => tree.is_filtered(resource, space, v),
            None => tree.is_filtered_all(resource, space),
        })
    }

    /// Whether any tree of `space` holds a mark.
    pub fn under_filter(&self, space: SpaceId) -> bool {
        self.trees(space).iter().any(|tree| !tree.is_empty())
    }

    /// Extend every tree of the pattern's space with `pattern` and track
    /// `variable`, creating a first tree if the space has none.
    pub fn filter_var(&self, registry: &PatternRegistry, pattern: &TriplePattern, variable: PatternTerm) {
        let Some(list) = self.trees.get(&pattern.space) else {
            tracing::warn!(space = %pattern.space, "filter_var on a space unknown to the registry");
            return;
        };
        let mut list = list.write();
        if list.is_empty() {
            list.push(Arc::new(FilterTree::new(pattern.space)));
        }
        for tree in list.iter() {
            tree.extend(registry, pattern, variable.clone());
        }
    }

    pub fn clear(&self) {
        for list in self.trees.values() {
            for tree in list.read().iter() {
                tree.clear();
            }
        }
    }
}
