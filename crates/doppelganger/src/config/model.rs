//! Validated configuration model.
//!
//! Everything here is produced by the loader in a single pass and is never
//! mutated afterwards.

use crate::expression::Condition;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 8000;

/// Every server described by one configuration document.
#[derive(Debug, Clone)]
pub struct ServerSet {
    pub configurations: Vec<Configuration>,
}

/// One listener: a port and its endpoints.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub port: u16,
    pub endpoints: Vec<Endpoint>,
}

/// A path template + verb with mappings tried in declared order.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: String,
    pub verb: Verb,
    pub mappings: Vec<Mapping>,
}

/// A candidate response and the conditions that select it.
#[derive(Debug, Clone)]
pub struct Mapping {
    /// Conjuncts; an empty list always matches
    pub params: Vec<Condition>,
    pub code: u16,
    pub content: Option<Content>,
}

impl Mapping {
    /// Status used when no `code` is configured.
    pub fn default_code(content: Option<&Content>) -> u16 {
        match content {
            Some(_) => 200,
            None => 204,
        }
    }
}

/// Response payload descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Inline JSON, returned verbatim
    Json(serde_json::Value),
    /// File read at request time, relative to the working directory
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Verb {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    /// Verbs whose request body is negotiated and exposed to `BODY` lookups.
    pub fn reads_body(&self) -> bool {
        !matches!(self, Verb::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}
