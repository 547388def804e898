//! Serializable plan reports and their terminal rendering.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;
use crawlplan_plan::{EdgeId, NodeId, PlanNode, PlanWrapper, SpaceId, SuccessorRank};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Counts {
    pub patterns: usize,
    pub spaces: usize,
    pub cycles: usize,
    pub nodes: usize,
    pub edges: usize,
}

impl Counts {
    pub fn of(wrapper: &PlanWrapper) -> Self {
        Self {
            patterns: wrapper.registry().len(),
            spaces: wrapper.registry().spaces().len(),
            cycles: wrapper.cycles().len(),
            nodes: wrapper.graph().node_count(),
            edges: wrapper.graph().edge_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessorReport {
    pub target: NodeId,
    pub edge: EdgeId,
    pub property: Option<String>,
    pub rank: SuccessorRank,
    pub weight: i64,
    pub cycle_edge: bool,
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    /// `None` for cycle clones.
    pub term: Option<String>,
    pub seeds: Vec<String>,
    pub spaces: Vec<SpaceId>,
    pub patterns: Vec<String>,
    pub requires_type_check: bool,
    pub successors: Vec<SuccessorReport>,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub counts: Counts,
    pub roots: Vec<NodeId>,
    pub nodes: Vec<NodeReport>,
    pub inverses: BTreeMap<String, String>,
    pub known_predicates: Vec<String>,
    pub known_types: Vec<String>,
}

fn node_report(wrapper: &PlanWrapper, node: &PlanNode) -> Result<NodeReport> {
    let mut successors = Vec::new();
    for successor in wrapper.successors(node.id)?.iter() {
        let edge = wrapper.edge(successor.edge)?;
        successors.push(SuccessorReport {
            target: successor.target,
            edge: successor.edge,
            property: successor.property.as_ref().map(|p| p.to_string()),
            rank: successor.rank,
            weight: successor.rank.weight(),
            cycle_edge: edge.is_cycle_edge,
        });
    }

    let patterns = node
        .satisfied_patterns()
        .filter_map(|id| wrapper.registry().get(id))
        .map(|tp| tp.label.clone())
        .collect();

    Ok(NodeReport {
        id: node.id,
        term: node.term.as_ref().map(|t| t.to_string()),
        seeds: node.seeds().iter().map(|s| s.to_string()).collect(),
        spaces: node.search_spaces().collect(),
        patterns,
        requires_type_check: node.requires_type_check(),
        successors,
    })
}

/// Builds a report over every node, or only `only` when given.
pub fn plan_report(wrapper: &PlanWrapper, only: Option<NodeId>) -> Result<PlanReport> {
    let nodes = match only {
        Some(id) => vec![node_report(wrapper, wrapper.node(id)?)?],
        None => wrapper
            .graph()
            .nodes()
            .iter()
            .map(|node| node_report(wrapper, node))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(PlanReport {
        counts: Counts::of(wrapper),
        roots: wrapper.roots().into_iter().map(|(id, _)| id).collect(),
        nodes,
        inverses: wrapper
            .inverses()
            .iter()
            .map(|(o, s)| (o.to_string(), s.to_string()))
            .collect(),
        known_predicates: wrapper.known_predicates().iter().map(|p| p.to_string()).collect(),
        known_types: wrapper.known_types().iter().map(|t| t.to_string()).collect(),
    })
}

// ============================================================================
// Text rendering
// ============================================================================

fn rank_label(rank: &SuccessorRank) -> String {
    match rank {
        SuccessorRank::Pattern => "pattern".green().to_string(),
        SuccessorRank::Linked { distance } => format!("linked({distance})").cyan().to_string(),
        SuccessorRank::Plain => "plain".normal().to_string(),
        SuccessorRank::Cycle => "cycle".yellow().to_string(),
    }
}

pub fn print_counts(counts: &Counts) {
    println!(
        "{} patterns={} spaces={} cycles={} nodes={} edges={}",
        "plan".bold(),
        counts.patterns,
        counts.spaces,
        counts.cycles,
        counts.nodes,
        counts.edges
    );
}

pub fn print_report(report: &PlanReport) {
    print_counts(&report.counts);

    let roots: Vec<String> = report.roots.iter().map(|r| r.to_string()).collect();
    println!("{} {}", "roots:".bold(), roots.join(", "));

    for node in &report.nodes {
        let term = node.term.as_deref().unwrap_or("(cycle clone)");
        println!();
        println!("{} {}", node.id.to_string().bold(), term);
        if !node.seeds.is_empty() {
            println!("  seeds: {}", node.seeds.join(", "));
        }
        if !node.patterns.is_empty() {
            println!("  patterns: {}", node.patterns.join(", "));
        }
        if node.requires_type_check {
            println!("  {}", "type check".yellow());
        }
        for (i, s) in node.successors.iter().enumerate() {
            println!(
                "  {:>2}. {} via {} [{}] {}",
                i + 1,
                s.target,
                s.property.as_deref().unwrap_or("-"),
                rank_label(&s.rank),
                s.edge.to_string().dimmed()
            );
        }
    }

    if !report.inverses.is_empty() {
        println!();
        println!("{}", "inverses:".bold());
        for (o, s) in &report.inverses {
            println!("  {o} <- {s}");
        }
    }
    println!();
    println!(
        "{} {} predicates, {} types",
        "known:".bold(),
        report.known_predicates.len(),
        report.known_types.len()
    );
}
