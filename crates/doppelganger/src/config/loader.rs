//! Configuration loading from JSON.
//!
//! The document is first read into raw serde types carrying the schema
//! defaults, then converted into the validated model. Expressions are built
//! and type-checked during the conversion, so a document that loads can be
//! served without further checks.

use super::model::{Configuration, Content, Endpoint, Mapping, ServerSet, Verb, DEFAULT_PORT};
use super::ConfigError;
use crate::expression::build_condition;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct RawConfiguration {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    endpoint: Vec<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    #[serde(default = "default_path")]
    path: String,
    #[serde(default)]
    verb: Option<String>,
    #[serde(default)]
    mappings: Vec<RawMapping>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    "/".to_string()
}

/// Load a configuration document.
///
/// A document with a top-level `servers` array describes several listeners;
/// any other object is read as a single server.
pub fn load_document(document: &Value) -> Result<ServerSet, ConfigError> {
    let configurations = match document.get("servers") {
        Some(servers) => {
            let raw = Vec::<RawConfiguration>::deserialize(servers)?;
            if raw.is_empty() {
                return Err(ConfigError::EmptyServerList);
            }
            raw.into_iter()
                .enumerate()
                .map(|(i, configuration)| configuration.build(&format!("servers[{i}]")))
                .collect::<Result<Vec<_>, _>>()?
        }
        None => vec![RawConfiguration::deserialize(document)?.build("")?],
    };

    // Port 0 asks for an ephemeral port and may repeat
    let mut ports = HashSet::new();
    for configuration in configurations.iter().filter(|c| c.port != 0) {
        if !ports.insert(configuration.port) {
            return Err(ConfigError::DuplicatePort(configuration.port));
        }
    }

    Ok(ServerSet { configurations })
}

fn child(parent: &str, name: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("{name}[{index}]")
    } else {
        format!("{parent}.{name}[{index}]")
    }
}

impl RawConfiguration {
    fn build(self, location: &str) -> Result<Configuration, ConfigError> {
        let endpoints = self
            .endpoint
            .into_iter()
            .enumerate()
            .map(|(i, endpoint)| endpoint.build(&child(location, "endpoint", i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Configuration {
            port: self.port,
            endpoints,
        })
    }
}

impl RawEndpoint {
    fn build(self, location: &str) -> Result<Endpoint, ConfigError> {
        let verb = match self.verb {
            Some(verb) => verb
                .parse::<Verb>()
                .map_err(|verb| ConfigError::UnknownVerb {
                    location: location.to_string(),
                    verb,
                })?,
            None => Verb::default(),
        };

        let mappings = self
            .mappings
            .into_iter()
            .enumerate()
            .map(|(i, mapping)| mapping.build(&child(location, "mappings", i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Endpoint {
            path: self.path,
            verb,
            mappings,
        })
    }
}

impl RawMapping {
    fn build(self, location: &str) -> Result<Mapping, ConfigError> {
        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, descriptor)| {
                build_condition(descriptor).map_err(|source| ConfigError::Expression {
                    location: child(location, "params", i),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let content = self
            .content
            .map(|content| content.build(location))
            .transpose()?;

        let code = match self.code {
            Some(code) => {
                if hyper::StatusCode::from_u16(code).is_err() {
                    return Err(ConfigError::InvalidStatusCode {
                        location: location.to_string(),
                        code,
                    });
                }
                code
            }
            None => Mapping::default_code(content.as_ref()),
        };

        Ok(Mapping {
            params,
            code,
            content,
        })
    }
}

impl RawContent {
    fn build(self, location: &str) -> Result<Content, ConfigError> {
        let kind = self.kind.as_deref().unwrap_or("JSON");
        if kind.eq_ignore_ascii_case("JSON") {
            Ok(Content::Json(self.data))
        } else if kind.eq_ignore_ascii_case("FILE") {
            self.data
                .get("path")
                .and_then(Value::as_str)
                .map(|path| Content::File(PathBuf::from(path)))
                .ok_or_else(|| ConfigError::MissingFilePath {
                    location: location.to_string(),
                })
        } else {
            Err(ConfigError::UnknownContentType {
                location: location.to_string(),
                content_type: kind.to_string(),
            })
        }
    }
}
