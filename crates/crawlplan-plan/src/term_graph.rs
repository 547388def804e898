//! Directed graph over pattern terms (`subject -> object`).
//!
//! Terms are interned to dense `u32` ids so traversals can track visited sets
//! in a `RoaringBitmap`.

use std::collections::VecDeque;

use ahash::AHashMap;
use roaring::RoaringBitmap;

use crate::term::PatternTerm;

#[derive(Debug, Clone, Default)]
pub struct TermGraph {
    terms: Vec<PatternTerm>,
    index: AHashMap<PatternTerm, u32>,
    out: Vec<Vec<u32>>,
    inc: Vec<Vec<u32>>,
    edge_count: usize,
}

impl TermGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, term: PatternTerm) -> u32 {
        if let Some(&id) = self.index.get(&term) {
            return id;
        }
        let id = self.terms.len() as u32;
        self.index.insert(term.clone(), id);
        self.terms.push(term);
        self.out.push(Vec::new());
        self.inc.push(Vec::new());
        id
    }

    /// Add `from -> to`. Parallel edges collapse.
    pub fn add_edge(&mut self, from: PatternTerm, to: PatternTerm) {
        let a = self.intern(from);
        let b = self.intern(to);
        if self.out[a as usize].contains(&b) {
            return;
        }
        self.out[a as usize].push(b);
        self.inc[b as usize].push(a);
        self.edge_count += 1;
    }

    pub fn contains(&self, term: &PatternTerm) -> bool {
        self.index.contains_key(term)
    }

    pub fn node_count(&self) -> usize {
        self.terms.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &PatternTerm> {
        self.terms.iter()
    }

    /// `(from, to)` pairs in insertion order of their source terms.
    pub fn edges(&self) -> impl Iterator<Item = (&PatternTerm, &PatternTerm)> {
        self.out.iter().enumerate().flat_map(move |(a, targets)| {
            targets
                .iter()
                .map(move |&b| (&self.terms[a], &self.terms[b as usize]))
        })
    }

    /// Hop count of the shortest directed path `from -> to`.
    ///
    /// `Some(0)` when `from == to` and the term is in the graph.
    pub fn distance(&self, from: &PatternTerm, to: &PatternTerm) -> Option<usize> {
        let start = *self.index.get(from)?;
        let goal = *self.index.get(to)?;
        self.bfs(start, goal, false)
    }

    /// Whether `a` and `b` are linked by a path, ignoring edge direction.
    pub fn connected(&self, a: &PatternTerm, b: &PatternTerm) -> bool {
        let (Some(&start), Some(&goal)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        self.bfs(start, goal, true).is_some()
    }

    fn bfs(&self, start: u32, goal: u32, undirected: bool) -> Option<usize> {
        let mut visited = RoaringBitmap::new();
        let mut queue = VecDeque::from([(start, 0usize)]);
        visited.insert(start);

        while let Some((current, depth)) = queue.pop_front() {
            if current == goal {
                return Some(depth);
            }
            let backward: &[u32] = if undirected {
                &self.inc[current as usize]
            } else {
                &[]
            };
            for &next in self.out[current as usize].iter().chain(backward) {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> PatternTerm {
        PatternTerm::var(name)
    }

    #[test]
    fn distance_is_directed_hop_count() {
        let mut g = TermGraph::new();
        g.add_edge(v("a"), v("b"));
        g.add_edge(v("b"), v("c"));
        g.add_edge(v("a"), v("c"));

        assert_eq!(g.distance(&v("a"), &v("c")), Some(1));
        assert_eq!(g.distance(&v("b"), &v("c")), Some(1));
        assert_eq!(g.distance(&v("a"), &v("a")), Some(0));
        assert_eq!(g.distance(&v("c"), &v("a")), None);
        assert_eq!(g.distance(&v("a"), &v("zzz")), None);
    }

    #[test]
    fn connected_ignores_direction() {
        let mut g = TermGraph::new();
        g.add_edge(v("x"), PatternTerm::iri("http://ex.org/Person"));
        g.add_edge(v("x"), v("n"));
        g.add_edge(v("other"), v("m"));

        assert!(g.connected(&v("n"), &PatternTerm::iri("http://ex.org/Person")));
        assert!(g.connected(&PatternTerm::iri("http://ex.org/Person"), &v("n")));
        assert!(!g.connected(&v("n"), &v("m")));
        assert!(!g.connected(&v("n"), &v("unknown")));
    }

    #[test]
    fn parallel_edges_collapse() {
        let mut g = TermGraph::new();
        g.add_edge(v("a"), v("b"));
        g.add_edge(v("a"), v("b"));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edges().count(), 1);
    }
}
