mod common;

use common::{ex, Fixture};
use crawlplan_plan::{PatternTerm, PlanDescription, PlanWrapper, SuccessorRank, Term};
use proptest::prelude::*;

const PROPERTIES: [&str; 4] = ["knows", "friend", "parent", "name"];
const MAX_CHILDREN: usize = 8;

/// One child of the seeded root: link property, whether it satisfies a
/// pattern itself, and whether it starts the cycle.
type ChildSpec = (Option<usize>, bool, bool);

fn child_strategy() -> impl Strategy<Value = ChildSpec> {
    (
        prop::option::of(0usize..PROPERTIES.len()),
        any::<bool>(),
        any::<bool>(),
    )
}

fn plan_strategy() -> impl Strategy<Value = (Vec<ChildSpec>, usize)> {
    (
        prop::collection::vec(child_strategy(), 1..=MAX_CHILDREN),
        0usize..=3,
    )
}

fn build_plan(children: &[ChildSpec], cycle_len: usize) -> PlanDescription {
    let mut f = Fixture::new();
    let space = f.space("space");
    let x = f.var("x");
    let tp_type = f.pattern(&space, "tp_type", x.clone(), "type", ex("Person").into());
    let terminal = f.node("terminal", Some("type"));
    f.by_pattern(&terminal, &tp_type);

    let steps = vec![("parent", "Person"); cycle_len];
    let cycle = (cycle_len > 0).then(|| f.cycle("cycle", &steps));

    let root = f.node("root", None);
    f.seed(&root, "seed");
    for (i, &(property, has_pattern, cycle_start)) in children.iter().enumerate() {
        let property = property.map(|p| PROPERTIES[p]);
        let child = f.node(&format!("child{i}"), property);
        f.next(&root, &child);
        if has_pattern {
            let o = f.var(&format!("o{i}"));
            let tp = f.pattern(&space, &format!("tp{i}"), x.clone(), property.unwrap_or("name"), o);
            f.by_pattern(&child, &tp);
        } else {
            f.next(&child, &terminal);
        }
        if let (true, Some(cycle)) = (cycle_start, &cycle) {
            f.cycle_start(&child, cycle);
        }
    }
    f.description
}

fn variable_terms(wrapper: &PlanWrapper) -> Vec<PatternTerm> {
    wrapper
        .patterns()
        .iter()
        .flat_map(|tp| [tp.subject.clone(), tp.object.clone()])
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn successors_are_deterministic((children, cycle_len) in plan_strategy()) {
        let description = build_plan(&children, cycle_len);
        let a = PlanWrapper::new(&description).expect("plan");
        let b = PlanWrapper::new(&description).expect("plan");
        prop_assert_eq!(a.graph().node_count(), b.graph().node_count());

        for node in a.graph().nodes() {
            let first = a.successors(node.id).unwrap();
            let again = a.successors(node.id).unwrap();
            let fresh = b.successors(node.id).unwrap();
            prop_assert_eq!(&*first, &*again);
            prop_assert_eq!(&*first, &*fresh);
        }
    }

    #[test]
    fn pattern_successors_precede_cycle_edges((children, cycle_len) in plan_strategy()) {
        let wrapper = PlanWrapper::new(&build_plan(&children, cycle_len)).expect("plan");

        for node in wrapper.graph().nodes() {
            let successors = wrapper.successors(node.id).unwrap();
            let first_cycle = successors
                .iter()
                .position(|s| wrapper.edge(s.edge).unwrap().is_cycle_edge);
            let last_pattern = successors.iter().rposition(|s| {
                !wrapper.edge(s.edge).unwrap().is_cycle_edge
                    && wrapper.node(s.target).unwrap().has_patterns()
            });
            if let (Some(cycle), Some(pattern)) = (first_cycle, last_pattern) {
                prop_assert!(pattern < cycle);
            }
            for s in successors.iter() {
                let is_cycle = wrapper.edge(s.edge).unwrap().is_cycle_edge;
                prop_assert_eq!(is_cycle, s.rank == SuccessorRank::Cycle);
            }
        }
    }

    #[test]
    fn filter_is_idempotent(
        (children, cycle_len) in plan_strategy(),
        resource in "[a-z]{1,8}",
        repeats in 1usize..4,
    ) {
        let wrapper = PlanWrapper::new(&build_plan(&children, cycle_len)).expect("plan");
        let space = wrapper.registry().spaces()[0].id;
        let resource: Term = ex(&resource).into();
        let variable = PatternTerm::var("x");

        wrapper.filter(&resource, space, &variable);
        let marks: Vec<usize> = wrapper.filter_trees(space).iter().map(|t| t.len()).collect();
        let filtered = wrapper.is_filtered(&resource, space, Some(&variable));

        for _ in 0..repeats {
            wrapper.filter(&resource, space, &variable);
        }
        let again: Vec<usize> = wrapper.filter_trees(space).iter().map(|t| t.len()).collect();
        prop_assert_eq!(marks, again);
        prop_assert_eq!(filtered, wrapper.is_filtered(&resource, space, Some(&variable)));
        prop_assert!(filtered);
    }

    #[test]
    fn connected_is_symmetric((children, cycle_len) in plan_strategy()) {
        let wrapper = PlanWrapper::new(&build_plan(&children, cycle_len)).expect("plan");
        let mut terms = variable_terms(&wrapper);
        terms.push(PatternTerm::var("unbound"));

        for a in &terms {
            for b in &terms {
                prop_assert_eq!(wrapper.connected(a, b), wrapper.connected(b, a));
            }
        }
    }
}
