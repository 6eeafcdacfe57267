//! RSP-QL: SPARQL extended with a `REGISTER` clause and named windows over
//! streams.
//!
//! ```text
//! PREFIX ex: <http://example.org/>
//! REGISTER RSTREAM ex:output AS
//! SELECT ?s
//! FROM NAMED WINDOW ex:w ON STREAM ex:stream [RANGE 1000 STEP 500]
//! WHERE { WINDOW ex:w { ?s ?p ?o } }
//! ```
//!
//! Parsing strips the RSP-QL clauses and rewrites `WINDOW x {` into
//! `GRAPH <x> {`, leaving plain SPARQL for the evaluator.

use crate::error::{ConfigError, Result};
use crate::naming::Prefixes;
use regex::Regex;
use std::sync::OnceLock;

/// How query results become output elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StreamOperator {
    #[default]
    RStream,
    IStream,
    DStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDefinition {
    pub window_name: String,
    pub stream_name: String,
    pub width: i64,
    pub slide: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub r2s: StreamOperator,
    /// Name of the output stream, expanded.
    pub output: Option<String>,
    pub s2r: Vec<WindowDefinition>,
    pub prefixes: Prefixes,
    pub sparql_query: String,
}

fn register_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)REGISTER\s+(RSTREAM|ISTREAM|DSTREAM)\s+(\S+)\s+AS\b")
            .expect("register pattern is valid")
    })
}

fn window_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)FROM\s+NAMED\s+WINDOW\s+(\S+)\s+ON\s+STREAM\s+(\S+)\s*\[\s*RANGE\s+(-?\d+)(?:\s+STEP\s+(-?\d+))?\s*\]",
        )
        .expect("window pattern is valid")
    })
}

fn window_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bWINDOW\s+(\S+)\s*\{").expect("window block pattern is valid"))
}

pub struct RSPQLParser {
    query: String,
}

impl RSPQLParser {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn parse(&self) -> Result<ParsedQuery> {
        let prefixes = Prefixes::parse(&self.query);
        let mut parsed = ParsedQuery {
            prefixes,
            ..ParsedQuery::default()
        };

        if let Some(caps) = register_regex().captures(&self.query) {
            parsed.r2s = match caps[1].to_ascii_uppercase().as_str() {
                "ISTREAM" => StreamOperator::IStream,
                "DSTREAM" => StreamOperator::DStream,
                _ => StreamOperator::RStream,
            };
            parsed.output = Some(parsed.prefixes.expand(&caps[2]));
        }

        for caps in window_regex().captures_iter(&self.query) {
            let width = parse_number(&caps[3])?;
            let slide = match caps.get(4) {
                Some(step) => parse_number(step.as_str())?,
                None => width,
            };
            parsed.s2r.push(WindowDefinition {
                window_name: parsed.prefixes.expand(&caps[1]),
                stream_name: parsed.prefixes.expand(&caps[2]),
                width,
                slide,
            });
        }
        if parsed.s2r.is_empty() {
            return Err(ConfigError::InvalidQuery("no FROM NAMED WINDOW clause".into()).into());
        }

        let stripped = register_regex().replace_all(&self.query, "");
        let stripped = window_regex().replace_all(&stripped, "");
        let prefixes = &parsed.prefixes;
        let sparql = window_block_regex().replace_all(&stripped, |caps: &regex::Captures<'_>| {
            format!("GRAPH {} {{", graph_term(prefixes, &caps[1]))
        });
        parsed.sparql_query = sparql.trim().to_string();

        log::debug!(
            "Parsed RSP-QL query: {} windows, SPARQL:\n{}",
            parsed.s2r.len(),
            parsed.sparql_query
        );
        Ok(parsed)
    }
}

fn parse_number(text: &str) -> Result<i64> {
    text.parse()
        .map_err(|_| ConfigError::InvalidQuery(format!("'{}' is not a valid duration", text)).into())
}

/// `<iri>` when the term resolves to an absolute IRI, the term itself
/// otherwise.
fn graph_term(prefixes: &Prefixes, term: &str) -> String {
    if term.starts_with('<') {
        return term.to_string();
    }
    let expanded = prefixes.expand(term);
    if expanded != term {
        format!("<{}>", expanded)
    } else {
        term.to_string()
    }
}
