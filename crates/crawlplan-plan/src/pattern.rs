//! Triple Pattern Registry.
//!
//! Resolves every `TriplePattern` statement group of a plan description into a
//! structured [`TriplePattern`] and groups patterns by their search space.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::description::PlanDescription;
use crate::error::{PlanError, Result};
use crate::term::{Iri, Literal, Node, PatternTerm, Term, Variable};
use crate::term_graph::TermGraph;
use crate::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PatternId(u32);

impl PatternId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tp{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpaceId(u32);

impl SpaceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub id: PatternId,
    pub label: String,
    /// Description node the pattern was declared on.
    pub node: Node,
    pub subject: PatternTerm,
    pub predicate: Iri,
    pub object: PatternTerm,
    pub space: SpaceId,
}

impl TriplePattern {
    /// Patterns with a bound subject or object anchor a filter tree.
    pub fn is_filter_root(&self) -> bool {
        !self.subject.is_variable() || !self.object.is_variable()
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone)]
pub struct SearchSpace {
    pub id: SpaceId,
    pub node: Node,
    patterns: Vec<PatternId>,
}

impl SearchSpace {
    pub fn patterns(&self) -> &[PatternId] {
        &self.patterns
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<TriplePattern>,
    spaces: Vec<SearchSpace>,
    pattern_by_node: AHashMap<Node, PatternId>,
    space_by_node: AHashMap<Node, SpaceId>,
    term_graph: TermGraph,
}

impl PatternRegistry {
    pub fn build(description: &PlanDescription) -> Result<Self> {
        let mut registry = PatternRegistry::default();

        for node in description.instances_of(vocab::SEARCH_SPACE) {
            registry.intern_space(node);
        }

        for node in description.instances_of(vocab::TRIPLE_PATTERN) {
            let pattern_term = Term::from(node.clone());
            let space_node = description
                .subjects(vocab::DEFINED_BY, &pattern_term)
                .next()
                .ok_or_else(|| PlanError::malformed(node, "definedBy"))?;
            let space = registry.intern_space(space_node);

            let predicate = description
                .object(node, vocab::PREDICATE)
                .and_then(Term::as_iri)
                .cloned()
                .ok_or_else(|| PlanError::malformed(node, "predicate"))?;
            let subject = description
                .object(node, vocab::SUBJECT)
                .ok_or_else(|| PlanError::malformed(node, "subject"))?;
            let subject = resolve_subject(description, subject)?;
            let object = description
                .object(node, vocab::OBJECT)
                .ok_or_else(|| PlanError::malformed(node, "object"))?;
            let object = resolve_object(description, object)?;

            let label = description
                .object(node, vocab::RDFS_LABEL)
                .and_then(Term::as_literal)
                .map(|lit| lit.lexical.to_string())
                .unwrap_or_else(|| node.to_string());

            let id = PatternId(registry.patterns.len() as u32);
            registry
                .term_graph
                .add_edge(subject.clone(), object.clone());
            registry.spaces[space.0 as usize].patterns.push(id);
            registry.pattern_by_node.insert(node.clone(), id);
            registry.patterns.push(TriplePattern {
                id,
                label,
                node: node.clone(),
                subject,
                predicate,
                object,
                space,
            });
        }

        Ok(registry)
    }

    fn intern_space(&mut self, node: &Node) -> SpaceId {
        if let Some(&id) = self.space_by_node.get(node) {
            return id;
        }
        let id = SpaceId(self.spaces.len() as u32);
        self.space_by_node.insert(node.clone(), id);
        self.spaces.push(SearchSpace {
            id,
            node: node.clone(),
            patterns: Vec::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: PatternId) -> Option<&TriplePattern> {
        self.patterns.get(id.0 as usize)
    }

    pub fn by_node(&self, node: &Node) -> Option<&TriplePattern> {
        self.pattern_by_node.get(node).and_then(|&id| self.get(id))
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    pub fn spaces(&self) -> &[SearchSpace] {
        &self.spaces
    }

    pub fn space(&self, id: SpaceId) -> Option<&SearchSpace> {
        self.spaces.get(id.0 as usize)
    }

    pub fn space_of(&self, node: &Node) -> Option<SpaceId> {
        self.space_by_node.get(node).copied()
    }

    pub fn patterns_of(&self, space: SpaceId) -> impl Iterator<Item = &TriplePattern> {
        self.space(space)
            .map(SearchSpace::patterns)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.get(id))
    }

    pub fn filter_roots_of(&self, space: SpaceId) -> impl Iterator<Item = &TriplePattern> {
        self.patterns_of(space).filter(|tp| tp.is_filter_root())
    }

    /// Flat `subject -> object` graph across every pattern.
    pub fn term_graph(&self) -> &TermGraph {
        &self.term_graph
    }
}

fn variable_for(description: &PlanDescription, node: &Node) -> Result<PatternTerm> {
    description
        .object(node, vocab::RDFS_LABEL)
        .and_then(Term::as_literal)
        .map(|lit| PatternTerm::Variable(Variable::new(lit.lexical.clone())))
        .ok_or_else(|| PlanError::malformed(node, "label"))
}

fn resolve_subject(description: &PlanDescription, term: &Term) -> Result<PatternTerm> {
    match term {
        Term::Node(Node::Iri(iri)) => Ok(PatternTerm::Iri(iri.clone())),
        Term::Node(node) => variable_for(description, node),
        Term::Literal(lit) => Err(PlanError::malformed(lit, "subject")),
    }
}

fn resolve_object(description: &PlanDescription, term: &Term) -> Result<PatternTerm> {
    let node = match term {
        Term::Node(Node::Iri(iri)) => return Ok(PatternTerm::Iri(iri.clone())),
        Term::Literal(lit) => return Ok(PatternTerm::Literal(lit.clone())),
        Term::Node(node) => node,
    };

    let literal_class = Term::from(Iri::new(vocab::LITERAL));
    if !description.contains(node, vocab::RDF_TYPE, &literal_class) {
        return variable_for(description, node);
    }

    match description.object(node, vocab::VALUE) {
        Some(Term::Literal(lit)) => Ok(PatternTerm::Literal(lit.clone())),
        Some(Term::Node(Node::Iri(iri))) => Ok(PatternTerm::Iri(iri.clone())),
        Some(Term::Node(Node::Blank(id))) => Ok(PatternTerm::Literal(Literal::simple(id.clone()))),
        None => Err(PlanError::malformed(node, "value")),
    }
}
