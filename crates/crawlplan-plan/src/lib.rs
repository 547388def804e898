//! crawlplan: link-traversal query planning.
//!
//! A plan description decomposes a query into triple patterns grouped by
//! search space and describes how to reach resources matching them by
//! following links. This crate turns that description into a traversal plan:
//!
//! ```text
//!   PlanDescription
//!        │
//!        ├──► PatternRegistry ──► FilterForest
//!        ├──► CycleRegistry
//!        └──► PlanGraph ──(cycle splicing)──► PlanWrapper
//!                                                 │
//!                      executor ◄── successors / filter / is_filtered
//! ```
//!
//! ## Key pieces
//!
//! - **PatternRegistry**: structured triple patterns per search space
//! - **FilterForest**: per-space trees recording excluded bindings
//! - **CycleRegistry**: recursive property chains, indexed by the type they
//!   start from
//! - **PlanGraph**: arena of plan nodes and property-labelled edges
//! - **PlanWrapper**: ranked successors, cached views and filter bookkeeping,
//!   shareable across crawl workers

pub mod cycle;
pub mod description;
pub mod error;
pub mod filter;
pub mod graph;
pub mod pattern;
pub mod successor;
pub mod term;
pub mod term_graph;
pub mod vocab;
pub mod wrapper;

pub use cycle::{Cycle, CycleId, CycleRegistry, CycleStep};
pub use description::{PlanDescription, Statement};
pub use error::{PlanError, Result};
pub use filter::{FilterForest, FilterTree};
pub use graph::{EdgeId, LinkProperty, NodeAttrs, NodeId, PlanEdge, PlanGraph, PlanNode};
pub use pattern::{PatternId, PatternRegistry, SearchSpace, SpaceId, TriplePattern};
pub use successor::{Successor, SuccessorRank};
pub use term::{Iri, Literal, Node, PatternTerm, Term, Variable};
pub use wrapper::PlanWrapper;
