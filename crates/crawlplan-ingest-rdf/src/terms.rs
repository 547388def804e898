//! Parsing of the N-Triples-style display form of parsed RDF terms.

use crawlplan_plan::{Iri, Literal, Node, Term};

use crate::IngestError;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Lexical form of a quoted literal and the byte offset just past its closing
/// quote. Escapes are decoded in the same pass that finds the quote.
fn quoted(s: &str) -> Result<(String, usize), IngestError> {
    let unterminated =
        || IngestError::UnsupportedTerm(format!("literal without closing quote: {s}"));
    let mut lexical = String::with_capacity(s.len());
    let mut chars = s.char_indices().skip(1);
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((lexical, i + 1)),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(unterminated)?;
                match escaped {
                    'n' => lexical.push('\n'),
                    'r' => lexical.push('\r'),
                    't' => lexical.push('\t'),
                    'b' => lexical.push('\u{8}'),
                    'f' => lexical.push('\u{c}'),
                    'u' | 'U' => {
                        let width = if escaped == 'u' { 4 } else { 8 };
                        let hex: String = chars.by_ref().take(width).map(|(_, c)| c).collect();
                        let decoded = u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == width)
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                IngestError::UnsupportedTerm(format!(
                                    "bad \\{escaped} escape in literal: {s}"
                                ))
                            })?;
                        lexical.push(decoded);
                    }
                    other => lexical.push(other),
                }
            }
            other => lexical.push(other),
        }
    }
    Err(unterminated())
}

fn literal(s: &str) -> Result<Literal, IngestError> {
    let (lexical, end) = quoted(s)?;
    let rest = s[end..].trim();

    if let Some(lang) = rest.strip_prefix('@') {
        return Ok(Literal::lang(lexical, lang));
    }
    if let Some(dt) = rest.strip_prefix("^^") {
        let dt = dt.trim();
        let dt = dt
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(dt);
        if dt.is_empty() || dt == XSD_STRING {
            return Ok(Literal::simple(lexical));
        }
        return Ok(Literal::typed(lexical, Iri::new(dt)));
    }
    Ok(Literal::simple(lexical))
}

/// Any term: IRI, blank node or literal.
pub(crate) fn term(display: &str) -> Result<Term, IngestError> {
    let s = display.trim();
    if let Some(iri) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Node::iri(iri).into());
    }
    if let Some(id) = s.strip_prefix("_:") {
        return Ok(Node::blank(id).into());
    }
    if s.starts_with('"') {
        return literal(s).map(Term::Literal);
    }
    Err(IngestError::UnsupportedTerm(s.to_string()))
}

/// Subject-position term: IRI or blank node.
pub(crate) fn node(display: &str) -> Result<Node, IngestError> {
    match term(display)? {
        Term::Node(node) => Ok(node),
        Term::Literal(_) => Err(IngestError::UnsupportedTerm(format!(
            "literal in node position: {display}"
        ))),
    }
}
