//! Term model shared by plan descriptions and triple patterns.
//!
//! Two layers live here:
//!
//! - [`Node`] / [`Term`]: the RDF-shaped terms a plan description is written in
//!   (IRIs, blank nodes, literals).
//! - [`PatternTerm`]: the resolved terms of a triple pattern (variable, bound
//!   IRI, or literal).
//!
//! All string payloads are `Arc<str>`, so cloning a term is a refcount bump.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// An absolute IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(Arc<str>);

impl Iri {
    pub fn new(iri: impl Into<Arc<str>>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl Borrow<str> for Iri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A query variable, stored without the leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable(Arc<str>);

impl Variable {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        match name.strip_prefix('?') {
            Some(stripped) => Self(Arc::from(stripped)),
            None => Self(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: Arc<str>,
    pub datatype: Option<Iri>,
    pub language: Option<Arc<str>>,
}

impl Literal {
    pub fn simple(lexical: impl Into<Arc<str>>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<Arc<str>>, datatype: Iri) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<Arc<str>>, language: impl Into<Arc<str>>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    /// Interpret the literal as an `xsd:boolean` (`true`/`1`, `false`/`0`).
    pub fn as_bool(&self) -> Option<bool> {
        match self.lexical.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical.replace('"', "\\\""))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Plan description terms
// ============================================================================

/// A subject-position term of a plan description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Iri(Iri),
    Blank(Arc<str>),
}

impl Node {
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Self::Iri(Iri::new(iri))
    }

    pub fn blank(id: impl Into<Arc<str>>) -> Self {
        Self::Blank(id.into())
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Node::Iri(iri) => Some(iri),
            Node::Blank(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => fmt::Display::fmt(iri, f),
            Node::Blank(id) => write!(f, "_:{id}"),
        }
    }
}

impl From<Iri> for Node {
    fn from(value: Iri) -> Self {
        Node::Iri(value)
    }
}

/// An object-position term of a plan description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Node(Node),
    Literal(Literal),
}

impl Term {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Node(node) => Some(node),
            Term::Literal(_) => None,
        }
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        self.as_node().and_then(Node::as_iri)
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            Term::Node(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Node(node) => fmt::Display::fmt(node, f),
            Term::Literal(lit) => fmt::Display::fmt(lit, f),
        }
    }
}

impl From<Node> for Term {
    fn from(value: Node) -> Self {
        Term::Node(value)
    }
}

impl From<Iri> for Term {
    fn from(value: Iri) -> Self {
        Term::Node(Node::Iri(value))
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

// ============================================================================
// Pattern terms
// ============================================================================

/// A resolved triple-pattern term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternTerm {
    Variable(Variable),
    Iri(Iri),
    Literal(Literal),
}

impl PatternTerm {
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Self::Variable(Variable::new(name))
    }

    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Self::Iri(Iri::new(iri))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, PatternTerm::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternTerm::Variable(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Variable(v) => fmt::Display::fmt(v, f),
            PatternTerm::Iri(iri) => fmt::Display::fmt(iri, f),
            PatternTerm::Literal(lit) => fmt::Display::fmt(lit, f),
        }
    }
}

impl From<Variable> for PatternTerm {
    fn from(value: Variable) -> Self {
        PatternTerm::Variable(value)
    }
}

impl From<Iri> for PatternTerm {
    fn from(value: Iri) -> Self {
        PatternTerm::Iri(value)
    }
}
