//! Plan description: the statement set a planner front end emits.
//!
//! Statements are kept in insertion order and every lookup returns results in
//! that order, so everything built on top of a description (pattern ids, node
//! ids, edge declaration order) is deterministic.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::term::{Iri, Node, Term};
use crate::vocab;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Node,
    pub predicate: Iri,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: impl Into<Node>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Indexed, insertion-ordered statement set.
#[derive(Debug, Default, Clone)]
pub struct PlanDescription {
    statements: Vec<Statement>,
    seen: AHashSet<Statement>,
    by_subject: AHashMap<Node, Vec<usize>>,
    by_predicate: AHashMap<Iri, Vec<usize>>,
    by_object: AHashMap<Term, Vec<usize>>,
}

impl PlanDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Add a statement. Returns `false` if it was already present.
    pub fn insert(
        &mut self,
        subject: impl Into<Node>,
        predicate: impl Into<Iri>,
        object: impl Into<Term>,
    ) -> bool {
        self.push(Statement::new(subject, predicate, object))
    }

    pub fn push(&mut self, statement: Statement) -> bool {
        if !self.seen.insert(statement.clone()) {
            return false;
        }
        let index = self.statements.len();
        self.by_subject
            .entry(statement.subject.clone())
            .or_default()
            .push(index);
        self.by_predicate
            .entry(statement.predicate.clone())
            .or_default()
            .push(index);
        self.by_object
            .entry(statement.object.clone())
            .or_default()
            .push(index);
        self.statements.push(statement);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    pub fn contains(&self, subject: &Node, predicate: &str, object: &Term) -> bool {
        self.objects(subject, predicate).any(|o| o == object)
    }

    /// Objects of `(subject, predicate, ?)`.
    pub fn objects<'a>(
        &'a self,
        subject: &Node,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .map(move |&i| &self.statements[i])
            .filter(move |st| st.predicate.as_str() == predicate)
            .map(|st| &st.object)
    }

    /// First object of `(subject, predicate, ?)`.
    pub fn object<'a>(&'a self, subject: &Node, predicate: &'a str) -> Option<&'a Term> {
        self.objects(subject, predicate).next()
    }

    /// Subjects of `(?, predicate, object)`.
    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &Term,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.by_object
            .get(object)
            .into_iter()
            .flatten()
            .map(move |&i| &self.statements[i])
            .filter(move |st| st.predicate.as_str() == predicate)
            .map(|st| &st.subject)
    }

    /// All `(subject, object)` pairs of `predicate`.
    pub fn subject_objects<'a>(
        &'a self,
        predicate: &str,
    ) -> impl Iterator<Item = (&'a Node, &'a Term)> + 'a {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .map(move |&i| {
                let st = &self.statements[i];
                (&st.subject, &st.object)
            })
    }

    /// Nodes declared `rdf:type class`, in declaration order.
    pub fn instances_of(&self, class: &str) -> Vec<&Node> {
        let class = Term::from(Iri::new(class));
        self.subjects(vocab::RDF_TYPE, &class).collect()
    }
}

impl FromIterator<Statement> for PlanDescription {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        let mut out = PlanDescription::new();
        out.extend(iter);
        out
    }
}

impl Extend<Statement> for PlanDescription {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        for statement in iter {
            self.push(statement);
        }
    }
}
