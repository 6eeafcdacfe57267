//! Names of windows, operator results and streams, and IRI prefix handling.

use crate::error::{ConfigError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Checks that `name` can be used as a window, result or stream identifier.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

fn prefix_regex() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"(?i)PREFIX\s+([A-Za-z][\w\-.]*)?:\s*<([^>]*)>")
            .expect("prefix pattern is valid")
    })
}

/// Prefix declarations (`ex:` -> `http://example.org/`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefixes {
    map: BTreeMap<String, String>,
}

impl Prefixes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every `PREFIX p: <iri>` declaration in `text`.
    pub fn parse(text: &str) -> Self {
        let mut prefixes = Self::new();
        for caps in prefix_regex().captures_iter(text) {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            prefixes.insert(prefix, &caps[2]);
        }
        prefixes
    }

    pub fn insert(&mut self, prefix: &str, iri: &str) {
        self.map.insert(prefix.to_string(), iri.to_string());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.map.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolves `<iri>`, `prefix:local` or a bare IRI to a full IRI.
    ///
    /// A term whose prefix is undeclared is returned unchanged.
    pub fn expand(&self, term: &str) -> String {
        let term = term.trim();
        if let Some(iri) = term.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return iri.to_string();
        }
        if let Some((prefix, local)) = term.split_once(':') {
            if !local.starts_with("//") {
                if let Some(base) = self.map.get(prefix) {
                    return format!("{}{}", base, local);
                }
            }
        }
        term.to_string()
    }

    /// Shortens `iri` with the longest matching namespace, if any.
    pub fn compact(&self, iri: &str) -> String {
        self.map
            .iter()
            .filter(|(_, base)| !base.is_empty() && iri.starts_with(base.as_str()))
            .max_by_key(|(_, base)| base.len())
            .map(|(prefix, base)| format!("{}:{}", prefix, &iri[base.len()..]))
            .unwrap_or_else(|| iri.to_string())
    }
}
