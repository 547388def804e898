//! RDF ingestion for crawlplan (boundary adapter).
//!
//! Plan descriptions are usually produced by a planner front end as RDF. This
//! crate parses the common serializations with **Sophia** and loads every
//! statement into a [`PlanDescription`]:
//!
//! - N-Triples (`.nt`)
//! - Turtle (`.ttl`)
//! - N-Quads (`.nq`)
//! - TriG (`.trig`)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)
//!
//! Quad formats are flattened: graph names are ignored.

mod terms;

use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crawlplan_plan::{Node, PlanDescription, Statement};
use serde::{Deserialize, Serialize};
use sophia::api::prelude::*;
use sophia::api::source::StreamError;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RdfFormat {
    NTriples,
    Turtle,
    NQuads,
    TriG,
    RdfXml,
}

impl RdfFormat {
    pub const ALL: [RdfFormat; 5] = [
        RdfFormat::NTriples,
        RdfFormat::Turtle,
        RdfFormat::NQuads,
        RdfFormat::TriG,
        RdfFormat::RdfXml,
    ];

    /// Format for a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "nq" | "nquads" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }

    /// Format for a user-facing name such as `turtle` or `n-triples`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .or_else(|| match name.as_str() {
                "rdfxml" => Some(RdfFormat::RdfXml),
                other => Self::from_extension(other),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            RdfFormat::NTriples => "n-triples",
            RdfFormat::Turtle => "turtle",
            RdfFormat::NQuads => "n-quads",
            RdfFormat::TriG => "trig",
            RdfFormat::RdfXml => "rdf-xml",
        }
    }

    /// Whether a base IRI can be supplied through an `@base` directive.
    pub fn supports_base(self) -> bool {
        matches!(self, RdfFormat::Turtle | RdfFormat::TriG)
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RdfFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| IngestError::UnsupportedFormat(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format}: {message}")]
    Parse { format: RdfFormat, message: String },

    #[error("unsupported RDF format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported RDF term: {0}")]
    UnsupportedTerm(String),
}

/// Error type threaded through Sophia's sink callbacks.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct SinkError(IngestError);

impl From<IngestError> for SinkError {
    fn from(value: IngestError) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Inferred from the file extension when unset.
    pub format: Option<RdfFormat>,
    pub base_iri: Option<String>,
}

impl LoadOptions {
    pub fn with_format(mut self, format: RdfFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_iri = Some(base.into());
        self
    }
}

// ============================================================================
// Loading
// ============================================================================

fn push_statement(
    description: &mut PlanDescription,
    subject: &str,
    predicate: &str,
    object: &str,
) -> Result<(), SinkError> {
    let subject = terms::node(subject)?;
    let Node::Iri(predicate) = terms::node(predicate)? else {
        return Ok(());
    };
    let object = terms::term(object)?;
    description.push(Statement {
        subject,
        predicate,
        object,
    });
    Ok(())
}

fn stream_error<E: std::error::Error>(format: RdfFormat, err: StreamError<E, SinkError>) -> IngestError {
    match err {
        StreamError::SinkError(SinkError(inner)) => inner,
        StreamError::SourceError(source) => IngestError::Parse {
            format,
            message: source.to_string(),
        },
    }
}

/// Parse `bytes` in `format` into a plan description.
pub fn description_from_rdf(bytes: &[u8], format: RdfFormat) -> Result<PlanDescription, IngestError> {
    load(bytes, format, None)
}

pub fn description_from_str(text: &str, format: RdfFormat) -> Result<PlanDescription, IngestError> {
    load(text.as_bytes(), format, None)
}

/// Read and parse a plan description file.
pub fn description_from_file(path: &Path, options: &LoadOptions) -> Result<PlanDescription, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = match options.format {
        Some(format) => format,
        None => path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(RdfFormat::from_extension)
            .ok_or_else(|| IngestError::UnsupportedFormat(path.display().to_string()))?,
    };
    let description = load(&bytes, format, options.base_iri.as_deref())?;
    debug!(path = %path.display(), %format, statements = description.len(), "loaded plan description");
    Ok(description)
}

fn load(bytes: &[u8], format: RdfFormat, base: Option<&str>) -> Result<PlanDescription, IngestError> {
    let prefixed;
    let bytes = match base {
        Some(base) if format.supports_base() => {
            prefixed = [format!("@base <{base}> .\n").as_bytes(), bytes].concat();
            prefixed.as_slice()
        }
        Some(base) => {
            warn!(%format, base, "base IRI ignored for this format");
            bytes
        }
        None => bytes,
    };

    let reader = BufReader::new(Cursor::new(bytes));
    let mut description = PlanDescription::new();

    match format {
        RdfFormat::NTriples => sophia::turtle::parser::nt::parse_bufread(reader)
            .try_for_each_triple(|t| -> Result<(), SinkError> {
                push_statement(
                    &mut description,
                    &t.s().to_string(),
                    &t.p().to_string(),
                    &t.o().to_string(),
                )
            })
            .map_err(|e| stream_error(format, e))?,
        RdfFormat::Turtle => sophia::turtle::parser::turtle::parse_bufread(reader)
            .try_for_each_triple(|t| -> Result<(), SinkError> {
                push_statement(
                    &mut description,
                    &t.s().to_string(),
                    &t.p().to_string(),
                    &t.o().to_string(),
                )
            })
            .map_err(|e| stream_error(format, e))?,
        RdfFormat::NQuads => sophia::turtle::parser::nq::parse_bufread(reader)
            .try_for_each_quad(|q| -> Result<(), SinkError> {
                push_statement(
                    &mut description,
                    &q.s().to_string(),
                    &q.p().to_string(),
                    &q.o().to_string(),
                )
            })
            .map_err(|e| stream_error(format, e))?,
        RdfFormat::TriG => sophia::turtle::parser::trig::parse_bufread(reader)
            .try_for_each_quad(|q| -> Result<(), SinkError> {
                push_statement(
                    &mut description,
                    &q.s().to_string(),
                    &q.p().to_string(),
                    &q.o().to_string(),
                )
            })
            .map_err(|e| stream_error(format, e))?,
        RdfFormat::RdfXml => sophia::xml::parser::parse_bufread(reader)
            .try_for_each_triple(|t| -> Result<(), SinkError> {
                push_statement(
                    &mut description,
                    &t.s().to_string(),
                    &t.p().to_string(),
                    &t.o().to_string(),
                )
            })
            .map_err(|e| stream_error(format, e))?,
    }

    Ok(description)
}
