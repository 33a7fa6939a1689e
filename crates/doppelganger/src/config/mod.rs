//! Configuration types for doppelganger.

mod loader;
pub mod migrate;
mod model;

use std::io;
use std::path::{Path, PathBuf};

use crate::expression::BuildError;

pub use loader::load_document;
pub use model::{Configuration, Content, Endpoint, Mapping, ServerSet, Verb, DEFAULT_PORT};

/// Errors raised while loading a configuration document.
///
/// `location` fields point into the document, e.g.
/// `servers[0].endpoint[1].mappings[0].params[2]`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no server found in configuration")]
    EmptyServerList,
    #[error("{location}: unknown HTTP verb '{verb}'")]
    UnknownVerb { location: String, verb: String },
    #[error("{location}: {source}")]
    Expression {
        location: String,
        #[source]
        source: BuildError,
    },
    #[error("{location}: unknown content type '{content_type}'")]
    UnknownContentType {
        location: String,
        content_type: String,
    },
    #[error("{location}: FILE content requires data.path to be a string")]
    MissingFilePath { location: String },
    #[error("{location}: invalid status code {code}")]
    InvalidStatusCode { location: String, code: u16 },
    #[error("port {0} is configured more than once")]
    DuplicatePort(u16),
}

impl ServerSet {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let document: serde_json::Value = serde_json::from_str(contents)?;
        Self::from_value(&document)
    }

    pub fn from_value(document: &serde_json::Value) -> Result<Self, ConfigError> {
        load_document(document)
    }
}
