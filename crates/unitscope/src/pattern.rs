//! Exclusion patterns over fully-qualified unit names.
//!
//! A pattern written only with name characters is literal: `a.b.C` excludes
//! exactly that unit and `a.b.*` (or `a.b.`) excludes the whole `a.b`
//! namespace. Anything else is a regular expression that must match the
//! entire name.

use std::collections::HashSet;

use regex::{Regex, RegexSet};

use crate::error::ConfigError;

/// Host namespaces that a plugin can never shadow.
pub const DEFAULT_EXCLUDED_PATTERNS: &[&str] = &["std.*", "core.*", "alloc.*", "proc_macro.*"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Regex(String),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Self {
        let namespace = pattern.strip_suffix('*').unwrap_or(pattern);
        if namespace.len() > 1 && namespace.ends_with('.') && is_literal(namespace) {
            NamePattern::Prefix(namespace.to_string())
        } else if is_literal(pattern) {
            NamePattern::Exact(pattern.to_string())
        } else {
            NamePattern::Regex(pattern.to_string())
        }
    }
}

fn is_literal(pattern: &str) -> bool {
    !pattern.is_empty()
        && !pattern.starts_with('.')
        && pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}

/// Compiled union of exclusion patterns.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    patterns: Vec<String>,
    exact: HashSet<String>,
    prefixes: Vec<String>,
    regexes: RegexSet,
}

impl NameMatcher {
    /// Compile [`DEFAULT_EXCLUDED_PATTERNS`] extended with `extra`. The
    /// defaults are always part of the result.
    pub fn compile<I, S>(extra: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = extra.into_iter().map(|p| p.as_ref().to_string()).collect();
        Self::from_patterns(
            DEFAULT_EXCLUDED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .chain(extra),
        )
    }

    fn from_patterns<I>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut matcher_patterns: Vec<String> = Vec::new();
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();
        let mut anchored = Vec::new();

        for pattern in patterns {
            if matcher_patterns.contains(&pattern) {
                continue;
            }
            match NamePattern::parse(&pattern) {
                NamePattern::Exact(name) => {
                    exact.insert(name);
                }
                NamePattern::Prefix(prefix) => prefixes.push(prefix),
                NamePattern::Regex(source) => {
                    let full = format!("^(?:{source})$");
                    Regex::new(&full).map_err(|source| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                    anchored.push(full);
                }
            }
            matcher_patterns.push(pattern);
        }

        let regexes = RegexSet::new(&anchored).map_err(|source| ConfigError::InvalidPattern {
            pattern: anchored.join(" | "),
            source,
        })?;

        Ok(Self {
            patterns: matcher_patterns,
            exact,
            prefixes,
            regexes,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name)
            || self.prefixes.iter().any(|prefix| name.starts_with(prefix))
            || self.regexes.is_match(name)
    }

    /// Source patterns in the order they were compiled.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
