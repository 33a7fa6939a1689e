//! Materializes a matched mapping into a status code and payload.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde_json::Value;

use crate::config::{Content, Mapping};

/// Content type used for every JSON payload served.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to read response file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport-agnostic response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResponse {
    pub status: u16,
    pub payload: ContentPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPayload {
    Empty,
    /// Stored JSON value, served verbatim
    Json(Value),
    File {
        bytes: Bytes,
        content_type: &'static str,
    },
}

impl ContentPayload {
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            ContentPayload::Empty => None,
            ContentPayload::Json(_) => Some(JSON_CONTENT_TYPE),
            ContentPayload::File { content_type, .. } => Some(content_type),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            ContentPayload::Empty => Bytes::new(),
            ContentPayload::Json(value) => Bytes::from(value.to_string()),
            ContentPayload::File { bytes, .. } => bytes,
        }
    }
}

/// Resolve the response for a matched mapping.
///
/// FILE content is read on every call, so edits to the file show up without
/// a restart.
pub async fn resolve(mapping: &Mapping) -> Result<ResolvedResponse, ResolveError> {
    let payload = match &mapping.content {
        None => ContentPayload::Empty,
        Some(Content::Json(value)) => ContentPayload::Json(value.clone()),
        Some(Content::File(path)) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| ResolveError::FileRead {
                    path: path.clone(),
                    source,
                })?;
            ContentPayload::File {
                bytes: Bytes::from(bytes),
                content_type: guess_content_type(path),
            }
        }
    };

    Ok(ResolvedResponse {
        status: mapping.code,
        payload,
    })
}

/// Content type for a file, from its extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return "application/octet-stream";
    };
    match ext.to_ascii_lowercase().as_str() {
        "json" => JSON_CONTENT_TYPE,
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "xml" => "application/xml",
        "csv" => "text/csv; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
