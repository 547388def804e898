//! Plan description vocabulary.
//!
//! Only relation names and arities are contractual; the namespace is the one
//! emitted by agora-compatible planners.

use crate::term::Iri;

pub const AGORA_NS: &str = "http://agora.org/ontology#";
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";

// Classes
pub const TRIPLE_PATTERN: &str = "http://agora.org/ontology#TriplePattern";
pub const SEARCH_SPACE: &str = "http://agora.org/ontology#SearchSpace";
pub const CYCLE: &str = "http://agora.org/ontology#Cycle";
pub const LITERAL: &str = "http://agora.org/ontology#Literal";

// Pattern structure
pub const DEFINED_BY: &str = "http://agora.org/ontology#definedBy";
pub const SUBJECT: &str = "http://agora.org/ontology#subject";
pub const PREDICATE: &str = "http://agora.org/ontology#predicate";
pub const OBJECT: &str = "http://agora.org/ontology#object";
pub const VALUE: &str = "http://agora.org/ontology#value";

// Traversal structure
pub const NEXT: &str = "http://agora.org/ontology#next";
pub const ON_PROPERTY: &str = "http://agora.org/ontology#onProperty";
pub const EXPECTED_TYPE: &str = "http://agora.org/ontology#expectedType";
pub const TYPE_HIERARCHY: &str = "http://agora.org/ontology#typeHierarchy";
pub const IS_CYCLE_START_OF: &str = "http://agora.org/ontology#isCycleStartOf";
pub const BY_PATTERN: &str = "http://agora.org/ontology#byPattern";
pub const HAS_SEED: &str = "http://agora.org/ontology#hasSeed";
pub const CHECK_TYPE: &str = "http://agora.org/ontology#checkType";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const OWL_INVERSE_OF: &str = "http://www.w3.org/2002/07/owl#inverseOf";

/// IRI in the agora namespace, e.g. `agora("next")`.
pub fn agora(local: &str) -> Iri {
    Iri::new(format!("{AGORA_NS}{local}"))
}
