//! Route pattern matching.
//!
//! # Responsibilities
//! - Normalize route fragments so they only match whole paths
//! - Compile patterns once at registration
//! - Extract named capture groups as path variables
//!
//! # Design Decisions
//! - Regex rather than a trie: handlers need arbitrary sub-patterns
//!   (numeric IDs, enumerated segments) with named captures
//! - Path matching is case-sensitive
//! - Unanchored bodies are wrapped in a non-capturing group so that an
//!   alternation such as `/a|/b` stays anchored on both branches

use regex::Regex;
use thiserror::Error;

use crate::context::PathVars;

/// Error raised when a route cannot be registered.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Anchor `raw` at both ends unless it already is.
pub fn normalize(raw: &str) -> String {
    let starts = raw.starts_with('^');
    let ends = raw.ends_with('$') && !raw.ends_with("\\$");
    if starts && ends {
        return raw.to_string();
    }

    let inner = raw.strip_prefix('^').unwrap_or(raw);
    let inner = if ends {
        &inner[..inner.len() - 1]
    } else {
        inner
    };
    format!("^(?:{inner})$")
}

/// A compiled, whole-string-anchored route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    regex: Regex,
}

impl RoutePattern {
    pub fn new(raw: &str) -> Result<Self, RouteError> {
        let normalized = normalize(raw);
        let regex = Regex::new(&normalized).map_err(|source| RouteError::InvalidPattern {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// The normalized source text.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and return its named captures.
    ///
    /// Groups that did not participate in the match are left out.
    pub fn captures(&self, path: &str) -> Option<PathVars> {
        let caps = self.regex.captures(path)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}
