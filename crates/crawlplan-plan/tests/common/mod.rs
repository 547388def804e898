//! Plan description builder shared by the integration tests.

#![allow(dead_code)]

use crawlplan_plan::vocab;
use crawlplan_plan::{Iri, Literal, Node, PlanDescription, Term};

pub fn ex(local: &str) -> Iri {
    Iri::new(format!("http://example.org/{local}"))
}

#[derive(Default)]
pub struct Fixture {
    pub description: PlanDescription,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn space(&mut self, id: &str) -> Node {
        let node = Node::blank(id);
        self.description
            .insert(node.clone(), vocab::RDF_TYPE, Iri::new(vocab::SEARCH_SPACE));
        node
    }

    /// Blank node standing for variable `name`.
    pub fn var(&mut self, name: &str) -> Term {
        let node = Node::blank(format!("var_{name}"));
        self.description
            .insert(node.clone(), vocab::RDFS_LABEL, Literal::simple(format!("?{name}")));
        node.into()
    }

    pub fn pattern(&mut self, space: &Node, id: &str, s: Term, p: &str, o: Term) -> Node {
        let node = Node::blank(id);
        let d = &mut self.description;
        d.insert(node.clone(), vocab::RDF_TYPE, Iri::new(vocab::TRIPLE_PATTERN));
        d.insert(space.clone(), vocab::DEFINED_BY, node.clone());
        d.insert(node.clone(), vocab::SUBJECT, s);
        d.insert(node.clone(), vocab::PREDICATE, ex(p));
        d.insert(node.clone(), vocab::OBJECT, o);
        node
    }

    /// Plan node reached over `on_property`, if given.
    pub fn node(&mut self, id: &str, on_property: Option<&str>) -> Node {
        let node = Node::blank(id);
        if let Some(p) = on_property {
            self.description
                .insert(node.clone(), vocab::ON_PROPERTY, ex(p));
        }
        node
    }

    pub fn next(&mut self, from: &Node, to: &Node) {
        self.description.insert(from.clone(), vocab::NEXT, to.clone());
    }

    pub fn by_pattern(&mut self, node: &Node, pattern: &Node) {
        self.description
            .insert(node.clone(), vocab::BY_PATTERN, pattern.clone());
    }

    pub fn seed(&mut self, node: &Node, local: &str) {
        self.description.insert(node.clone(), vocab::HAS_SEED, ex(local));
    }

    pub fn expected_type(&mut self, node: &Node, local: &str) {
        self.description
            .insert(node.clone(), vocab::EXPECTED_TYPE, ex(local));
    }

    /// Declare a cycle whose chain runs over `steps` of `(property, type)`.
    pub fn cycle(&mut self, id: &str, steps: &[(&str, &str)]) -> Node {
        let root = Node::blank(id);
        self.description
            .insert(root.clone(), vocab::RDF_TYPE, Iri::new(vocab::CYCLE));
        let mut current = root.clone();
        for (i, &(property, ty)) in steps.iter().enumerate() {
            let step = self.node(&format!("{id}_step{i}"), Some(property));
            self.expected_type(&step, ty);
            self.next(&current, &step);
            current = step;
        }
        root
    }

    pub fn cycle_start(&mut self, node: &Node, cycle: &Node) {
        self.description
            .insert(node.clone(), vocab::IS_CYCLE_START_OF, cycle.clone());
    }
}

/// `?x :type :Person` and `?x :name ?n` in one space, both reached from a
/// single seeded root.
pub fn person_plan() -> Fixture {
    let mut f = Fixture::new();
    let space = f.space("space");
    let x = f.var("x");
    let n = f.var("n");
    let tp_type = f.pattern(&space, "tp_type", x.clone(), "type", ex("Person").into());
    let tp_name = f.pattern(&space, "tp_name", x, "name", n);

    let root = f.node("root", None);
    f.seed(&root, "alice");
    let by_type = f.node("by_type", Some("type"));
    let by_name = f.node("by_name", Some("name"));
    f.next(&root, &by_type);
    f.next(&root, &by_name);
    f.by_pattern(&by_type, &tp_type);
    f.by_pattern(&by_name, &tp_name);
    f
}
