//! crawlplan CLI
//!
//! Inspection front end for link-traversal plans:
//! - `inspect` prints roots, each node's ordered successors and the flat indexes
//! - `check` builds the plan and reports counts or the construction error

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use crawlplan_ingest_rdf::{description_from_file, LoadOptions, RdfFormat};
use crawlplan_plan::{NodeId, PlanWrapper};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "crawlplan")]
#[command(author, version, about = "Inspect link-traversal query plans")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print roots, ordered successors and indexes of a plan.
    Inspect {
        /// Plan description file (RDF)
        plan: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
        /// Emit a JSON report instead of text
        #[arg(long)]
        json: bool,
        /// Only report this node (`n3` or `3`)
        #[arg(long)]
        node: Option<String>,
    },

    /// Build a plan and report its size, failing on construction errors.
    Check {
        /// Plan description file (RDF)
        plan: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(clap::Args)]
struct LoadArgs {
    /// RDF format (turtle, n-triples, n-quads, trig, rdf-xml); inferred from the extension by default
    #[arg(long)]
    format: Option<RdfFormat>,
    /// Base IRI for relative references (Turtle and TriG)
    #[arg(long)]
    base: Option<String>,
}

impl LoadArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            format: self.format,
            base_iri: self.base.clone(),
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_node_id(raw: &str) -> Result<NodeId> {
    let digits = raw.strip_prefix('n').unwrap_or(raw);
    let id: u32 = digits
        .parse()
        .map_err(|_| anyhow!("invalid node id `{raw}` (expected `n3` or `3`)"))?;
    Ok(NodeId::new(id))
}

fn load_plan(path: &Path, load: &LoadArgs) -> Result<PlanWrapper> {
    let description = description_from_file(path, &load.options())
        .with_context(|| format!("loading {}", path.display()))?;
    info!(statements = description.len(), "plan description loaded");
    PlanWrapper::new(&description).with_context(|| format!("building plan from {}", path.display()))
}

fn cmd_inspect(plan: &Path, load: &LoadArgs, json: bool, node: Option<&str>) -> Result<()> {
    let wrapper = load_plan(plan, load)?;
    let only = node.map(parse_node_id).transpose()?;
    let report = report::plan_report(&wrapper, only)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_report(&report);
    }
    Ok(())
}

fn cmd_check(plan: &Path, load: &LoadArgs) -> Result<()> {
    let wrapper = load_plan(plan, load)?;
    eprintln!("{} {}", "ok".green().bold(), plan.display());
    report::print_counts(&report::Counts::of(&wrapper));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect {
            plan,
            load,
            json,
            node,
        } => cmd_inspect(&plan, &load, json, node.as_deref()),
        Commands::Check { plan, load } => cmd_check(&plan, &load),
    }
}
