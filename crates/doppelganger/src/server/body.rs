//! Request body negotiation.
//!
//! Turns the raw body of a POST, PUT or DELETE request into the field map
//! consulted by `BODY` expressions. Supported media types are JSON objects,
//! urlencoded forms and multipart forms.

use bytes::Bytes;
use hyper::StatusCode;
use serde_json::Value;

use crate::expression::context::parse_query_pairs;
use crate::expression::BodyFields;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Request body is empty but Content-Type header is present")]
    EmptyWithContentType,
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("Invalid form data: {0}")]
    InvalidForm(String),
    #[error("Unable to parse request body. Please specify Content-Type header or ensure valid JSON format")]
    UndeclaredNotJson,
    #[error("Unsupported Content-Type: {0}. Supported types are: application/json, application/x-www-form-urlencoded, multipart/form-data")]
    UnsupportedMediaType(String),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Parse a request body according to its declared content type.
///
/// `content_type` is the raw header value, parameters included.
pub async fn parse_body(content_type: Option<&str>, body: Bytes) -> Result<BodyFields, BodyError> {
    let Some(content_type) = content_type.map(str::trim).filter(|ct| !ct.is_empty()) else {
        if body.is_empty() {
            return Ok(BodyFields::new());
        }
        return serde_json::from_slice(&body).map_err(|_| BodyError::UndeclaredNotJson);
    };

    if body.is_empty() {
        return Err(BodyError::EmptyWithContentType);
    }

    match media_type(content_type).as_str() {
        "application/json" => {
            serde_json::from_slice(&body).map_err(|e| BodyError::InvalidJson(e.to_string()))
        }
        "application/x-www-form-urlencoded" => {
            let text =
                std::str::from_utf8(&body).map_err(|e| BodyError::InvalidForm(e.to_string()))?;
            Ok(squash_form(parse_query_pairs(text)))
        }
        "multipart/form-data" => parse_multipart(content_type, body).await,
        _ => Err(BodyError::UnsupportedMediaType(content_type.to_string())),
    }
}

/// Lowercased media type without parameters.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Text fields of a multipart form; file parts are skipped.
async fn parse_multipart(content_type: &str, body: Bytes) -> Result<BodyFields, BodyError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| BodyError::InvalidForm(format!("multipart boundary: {e}")))?;

    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut pairs = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BodyError::InvalidForm(e.to_string()))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        let text = field
            .text()
            .await
            .map_err(|e| BodyError::InvalidForm(e.to_string()))?;
        pairs.push((name, text));
    }

    Ok(squash_form(pairs))
}

/// Collapse form pairs: a key seen once maps to its string, a repeated key
/// maps to the list of its values in order.
pub fn squash_form(pairs: Vec<(String, String)>) -> BodyFields {
    let mut fields = BodyFields::new();
    for (key, value) in pairs {
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }
    fields
}
