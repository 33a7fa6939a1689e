//! Request lookups consulted while evaluating expressions.
//!
//! The transport builds one context per request; expressions only read from
//! it, so a context can be shared by every mapping tried for that request.

use serde_json::Value;
use std::collections::HashMap;

/// Parsed request body: JSON object fields, or form fields where a repeated
/// key is kept as an array of strings.
pub type BodyFields = serde_json::Map<String, Value>;

/// Lookups an expression may perform against the current request.
pub trait EvaluationContext {
    /// Body field rendered as a string, `None` when the field is absent.
    fn body_field(&self, key: &str) -> Option<String>;

    /// First query value for `key`, empty when absent.
    fn query_scalar(&self, key: &str) -> String;

    /// Every query value for `key`, in request order.
    fn query_list(&self, key: &str) -> Vec<String>;

    /// Path template parameter, empty when absent.
    fn path_param(&self, key: &str) -> String;
}

/// Owned request values handed over by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestValues {
    body: BodyFields,
    query: Vec<(String, String)>,
    path: HashMap<String, String>,
}

impl RequestValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query = parse_query_pairs(query);
        self
    }

    pub fn with_path_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.path
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_body(mut self, body: BodyFields) -> Self {
        self.body = body;
        self
    }
}

impl EvaluationContext for RequestValues {
    fn body_field(&self, key: &str) -> Option<String> {
        self.body.get(key).map(stringify_body_value)
    }

    fn query_scalar(&self, key: &str) -> String {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    fn query_list(&self, key: &str) -> Vec<String> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn path_param(&self, key: &str) -> String {
        self.path.get(key).cloned().unwrap_or_default()
    }
}

/// Render a body value the way `BODY` expressions compare it.
///
/// Strings are returned as-is, numbers and booleans as their JSON text, null
/// as the empty string, lists joined with `,` and objects as compact JSON.
pub fn stringify_body_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify_body_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Split a query (or form-urlencoded) string into ordered, decoded pairs.
///
/// Keys and values are percent-decoded and `+` decodes to a space. A key
/// without `=` yields an empty value.
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
