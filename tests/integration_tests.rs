//! Integration tests for the complete crawlplan pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - RDF text → PlanDescription → PlanWrapper → ordered successors
//! - Plan files on disk → LoadOptions → PlanWrapper
//! - Executor-style filter bookkeeping over a loaded plan
//!
//! Run with: cargo test --test integration_tests

use std::fs;

use crawlplan_ingest_rdf::{
    description_from_file, description_from_str, IngestError, LoadOptions, RdfFormat,
};
use crawlplan_plan::{Iri, Node, PatternTerm, PlanError, PlanWrapper, SuccessorRank, Term};
use tempfile::tempdir;

const PREFIXES: &str = r#"
@prefix agora: <http://agora.org/ontology#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix ex: <http://example.org/> .
"#;

/// `?x ex:name ?n` reached from alice over `knows`, with a one-step `parent`
/// cycle over Person starting at the `knows` link. `?x ex:type ex:Person`
/// anchors the space's filter tree.
const CYCLE_PLAN: &str = r#"
ex:parentOf owl:inverseOf ex:parent .

_:space a agora:SearchSpace ; agora:definedBy _:tp_type, _:tp_name .
_:tp_type a agora:TriplePattern ;
    agora:subject _:x ; agora:predicate ex:type ; agora:object ex:Person .
_:tp_name a agora:TriplePattern ;
    agora:subject _:x ; agora:predicate ex:name ; agora:object _:n .
_:x rdfs:label "?x" .
_:n rdfs:label "?n" .

_:parents a agora:Cycle ; agora:next _:parents_step .
_:parents_step agora:onProperty ex:parent ; agora:expectedType ex:Person .

_:root agora:hasSeed ex:alice ; agora:next _:u .
_:u agora:onProperty ex:knows ; agora:expectedType ex:Person ; agora:next _:v .
_:v agora:onProperty ex:name ; agora:byPattern _:tp_name ;
    agora:isCycleStartOf _:parents .
"#;

fn ex(local: &str) -> Iri {
    Iri::new(format!("http://example.org/{local}"))
}

fn turtle(body: &str) -> String {
    format!("{PREFIXES}{body}")
}

fn load_wrapper(body: &str) -> PlanWrapper {
    let description = description_from_str(&turtle(body), RdfFormat::Turtle).expect("parse plan");
    PlanWrapper::new(&description).expect("build plan")
}

fn node_id(wrapper: &PlanWrapper, blank: &str) -> crawlplan_plan::NodeId {
    wrapper
        .graph()
        .node_by_term(&Node::blank(blank))
        .unwrap_or_else(|| panic!("no plan node for _:{blank}"))
}

// ============================================================================
// RDF → plan → successors
// ============================================================================

#[test]
fn test_turtle_plan_splices_cycle_and_orders_successors() {
    let wrapper = load_wrapper(CYCLE_PLAN);
    let u = node_id(&wrapper, "u");
    let v = node_id(&wrapper, "v");

    let roots = wrapper.roots();
    assert_eq!(roots.len(), 1);
    assert!(roots[0].1.seeds().contains(&ex("alice")));

    let successors = wrapper.successors(u).expect("successors of u");
    assert_eq!(successors[0].target, v);
    assert_eq!(successors[0].rank, SuccessorRank::Pattern);

    let last = successors.last().expect("cycle successor");
    assert_eq!(last.rank, SuccessorRank::Cycle);
    assert_eq!(last.property, Some(ex("parent")));
    assert!(wrapper.edge(last.edge).expect("edge").is_cycle_edge);

    assert_eq!(wrapper.cycles_for(ex("Person").as_str()).len(), 1);
    assert_eq!(wrapper.inverses().get(&ex("parent")), Some(&ex("parentOf")));
    assert!(wrapper.known_predicates().contains(&ex("knows")));
    assert!(wrapper.known_types().contains(&ex("Person")));
}

#[test]
fn test_ntriples_and_turtle_build_the_same_plan() {
    let nt = r#"
_:space <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://agora.org/ontology#SearchSpace> .
_:space <http://agora.org/ontology#definedBy> _:tp .
_:tp <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://agora.org/ontology#TriplePattern> .
_:tp <http://agora.org/ontology#subject> _:x .
_:tp <http://agora.org/ontology#predicate> <http://example.org/name> .
_:tp <http://agora.org/ontology#object> _:n .
_:x <http://www.w3.org/2000/01/rdf-schema#label> "?x" .
_:n <http://www.w3.org/2000/01/rdf-schema#label> "?n" .
_:root <http://agora.org/ontology#hasSeed> <http://example.org/alice> .
_:root <http://agora.org/ontology#next> _:leaf .
_:leaf <http://agora.org/ontology#onProperty> <http://example.org/name> .
_:leaf <http://agora.org/ontology#byPattern> _:tp .
"#;
    let ttl = r#"
_:space a agora:SearchSpace ; agora:definedBy _:tp .
_:tp a agora:TriplePattern ;
    agora:subject _:x ; agora:predicate ex:name ; agora:object _:n .
_:x rdfs:label "?x" .
_:n rdfs:label "?n" .
_:root agora:hasSeed ex:alice ; agora:next _:leaf .
_:leaf agora:onProperty ex:name ; agora:byPattern _:tp .
"#;

    let from_nt = PlanWrapper::new(
        &description_from_str(nt, RdfFormat::NTriples).expect("parse n-triples"),
    )
    .expect("build");
    let from_ttl = load_wrapper(ttl);

    assert_eq!(from_nt.graph().node_count(), from_ttl.graph().node_count());
    assert_eq!(from_nt.graph().edge_count(), from_ttl.graph().edge_count());
    assert_eq!(from_nt.patterns().len(), 1);
    assert_eq!(from_nt.patterns()[0].label, from_ttl.patterns()[0].label);

    let root = from_nt.roots()[0].0;
    let successors = from_nt.successors(root).expect("successors");
    assert_eq!(successors.len(), 1);
    assert_eq!(successors[0].rank, SuccessorRank::Pattern);
}

#[test]
fn test_malformed_plan_surfaces_plan_error() {
    let description = description_from_str(
        &turtle(
            "_:space a agora:SearchSpace ; agora:definedBy _:tp .\n\
             _:tp a agora:TriplePattern ; agora:subject _:x ; agora:object _:n .",
        ),
        RdfFormat::Turtle,
    )
    .expect("parse plan");
    let err = PlanWrapper::new(&description).unwrap_err();
    assert!(
        matches!(err, PlanError::MalformedPlan { field: "predicate", .. }),
        "{err}"
    );
}

// ============================================================================
// Plan files on disk
// ============================================================================

#[test]
fn test_plan_file_round_trip_through_loader() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("plan.ttl");
    fs::write(&path, turtle(CYCLE_PLAN)).expect("write plan");

    let description = description_from_file(&path, &LoadOptions::default()).expect("load");
    let wrapper = PlanWrapper::new(&description).expect("build");
    assert_eq!(wrapper.cycles().len(), 1);
    assert_eq!(wrapper.roots().len(), 1);
}

#[test]
fn test_plan_file_with_base_iri() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("relative.trig");
    let body = r#"
@prefix agora: <http://agora.org/ontology#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
{
  <#space> a agora:SearchSpace ; agora:definedBy <#tp> .
  <#tp> a agora:TriplePattern ;
      agora:subject _:x ; agora:predicate <knows> ; agora:object <bob> .
  _:x rdfs:label "?x" .
  <#root> agora:hasSeed <alice> ; agora:next <#leaf> .
  <#leaf> agora:onProperty <knows> ; agora:byPattern <#tp> .
}
"#;
    fs::write(&path, body).expect("write plan");

    let options = LoadOptions::default().with_base("http://example.org/");
    let description = description_from_file(&path, &options).expect("load");
    let wrapper = PlanWrapper::new(&description).expect("build");

    let roots = wrapper.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(
        roots[0].1.term,
        Some(Node::iri("http://example.org/#root"))
    );
    let successors = wrapper.successors(roots[0].0).expect("successors");
    assert_eq!(successors[0].property, Some(ex("knows")));
    assert_eq!(successors[0].rank, SuccessorRank::Pattern);
    assert_eq!(wrapper.patterns()[0].object, PatternTerm::iri("http://example.org/bob"));
}

#[test]
fn test_unknown_extension_requires_explicit_format() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("plan.txt");
    fs::write(&path, turtle(CYCLE_PLAN)).expect("write plan");

    let err = description_from_file(&path, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat(_)), "{err}");

    let options = LoadOptions::default().with_format(RdfFormat::Turtle);
    assert!(description_from_file(&path, &options).is_ok());
}

// ============================================================================
// Executor bookkeeping
// ============================================================================

#[test]
fn test_executor_filter_flow() {
    let wrapper = load_wrapper(CYCLE_PLAN);
    let space = wrapper.registry().spaces()[0].id;
    let x = PatternTerm::var("x");
    let bob: Term = ex("bob").into();

    assert!(!wrapper.is_filtered(&bob, space, Some(&x)));
    wrapper.filter(&bob, space, &x);
    assert!(wrapper.is_filtered(&bob, space, Some(&x)));
    assert!(!wrapper.is_filtered(&ex("carol").into(), space, Some(&x)));

    wrapper.clear_filters();
    assert!(!wrapper.is_filtered(&bob, space, Some(&x)));
}
