//! Rewrites legacy mapping parameters into expressions.
//!
//! Older configurations described each parameter as
//! `{"key": "id", "type": "BODY", "value": "123"}`. The equivalent expression
//! is an `EQUALS` between the request value and a string literal.

use serde_json::{json, Map, Value};

/// Rewrite every `params` list found anywhere in `document`.
///
/// Entries that are not in the legacy shape are left untouched, so running
/// the migration twice is harmless.
pub fn migrate_document(document: Value) -> Value {
    match document {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Array(params) if key == "params" => {
                            Value::Array(params.into_iter().map(migrate_param).collect())
                        }
                        other => migrate_document(other),
                    };
                    (key, value)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(migrate_document).collect()),
        other => other,
    }
}

/// Rewrite a single legacy parameter, if it is one.
pub fn migrate_param(param: Value) -> Value {
    let is_legacy = param
        .as_object()
        .map(|object| ["key", "type", "value"].iter().all(|k| object.contains_key(*k)))
        .unwrap_or(false);
    if !is_legacy {
        return param;
    }

    json!({
        "type": "EQUALS",
        "left": {"type": param["type"], "id": param["key"]},
        "right": {"type": "STRING", "value": param["value"]}
    })
}
