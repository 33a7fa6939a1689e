//! Typed request-matching expressions.
//!
//! Expressions are built once from their JSON descriptors and are immutable
//! afterwards. Every node has a [`ReturnKind`] that is fixed by its variant,
//! and the tree is split by that kind so evaluation never needs a runtime cast:
//!
//! - [`Condition`] evaluates to a boolean (`AND`, `OR`, `NOT`, `EQUALS`,
//!   `CONTAINS`, `REGEX`)
//! - [`TextExpr`] evaluates to a string (`BODY`, `QUERY`, `PATH`, `STRING`)
//! - [`ListExpr`] evaluates to a list of strings (`QUERY_ARRAY`)
//!
//! ## Module Structure
//!
//! - `builder`: JSON descriptor to AST conversion with eager type checking
//! - `context`: request lookups consulted during evaluation

mod builder;
pub mod context;

#[cfg(test)]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use builder::{build, build_condition, BuildError};
pub use context::{BodyFields, EvaluationContext, RequestValues};

/// Static type an expression evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Boolean,
    String,
    StringList,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Boolean => f.write_str("Boolean"),
            ReturnKind::String => f.write_str("String"),
            ReturnKind::StringList => f.write_str("StringList"),
        }
    }
}

/// Discriminator of an expression descriptor (the `"type"` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    And,
    Or,
    Not,
    Equals,
    Contains,
    Regex,
    Body,
    Query,
    QueryArray,
    Path,
    String,
}

static EXPRESSION_TYPES: Lazy<HashMap<&'static str, ExpressionType>> = Lazy::new(|| {
    ExpressionType::ALL
        .iter()
        .map(|expression_type| (expression_type.as_str(), *expression_type))
        .collect()
});

impl ExpressionType {
    pub const ALL: [ExpressionType; 11] = [
        ExpressionType::And,
        ExpressionType::Or,
        ExpressionType::Not,
        ExpressionType::Equals,
        ExpressionType::Contains,
        ExpressionType::Regex,
        ExpressionType::Body,
        ExpressionType::Query,
        ExpressionType::QueryArray,
        ExpressionType::Path,
        ExpressionType::String,
    ];

    /// Discriminator string used in JSON descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::And => "AND",
            ExpressionType::Or => "OR",
            ExpressionType::Not => "NOT",
            ExpressionType::Equals => "EQUALS",
            ExpressionType::Contains => "CONTAINS",
            ExpressionType::Regex => "REGEX",
            ExpressionType::Body => "BODY",
            ExpressionType::Query => "QUERY",
            ExpressionType::QueryArray => "QUERY_ARRAY",
            ExpressionType::Path => "PATH",
            ExpressionType::String => "STRING",
        }
    }

    /// Resolve a discriminator string. Matching is exact (upper case).
    pub fn lookup(name: &str) -> Option<ExpressionType> {
        EXPRESSION_TYPES.get(name).copied()
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated expression of any kind.
#[derive(Debug, Clone)]
pub enum Expression {
    Condition(Condition),
    Text(TextExpr),
    List(ListExpr),
}

/// Result of evaluating an [`Expression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Boolean(bool),
    String(String),
    StringList(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> ReturnKind {
        match self {
            Value::Boolean(_) => ReturnKind::Boolean,
            Value::String(_) => ReturnKind::String,
            Value::StringList(_) => ReturnKind::StringList,
        }
    }
}

impl Expression {
    pub fn return_kind(&self) -> ReturnKind {
        match self {
            Expression::Condition(_) => ReturnKind::Boolean,
            Expression::Text(_) => ReturnKind::String,
            Expression::List(_) => ReturnKind::StringList,
        }
    }

    pub fn expression_type(&self) -> ExpressionType {
        match self {
            Expression::Condition(condition) => condition.expression_type(),
            Expression::Text(text) => text.expression_type(),
            Expression::List(list) => list.expression_type(),
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationContext) -> Value {
        match self {
            Expression::Condition(condition) => Value::Boolean(condition.evaluate(ctx)),
            Expression::Text(text) => Value::String(text.evaluate(ctx)),
            Expression::List(list) => Value::StringList(list.evaluate(ctx)),
        }
    }

    /// Serialize back into the descriptor shape accepted by [`build`].
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Expression::Condition(condition) => condition.to_json(),
            Expression::Text(text) => text.to_json(),
            Expression::List(list) => list.to_json(),
        }
    }
}

/// Boolean-valued expression.
#[derive(Debug, Clone)]
pub enum Condition {
    /// True when every child is true (vacuously true when empty)
    And(Vec<Condition>),
    /// True when any child is true (false when empty)
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Equals(Equality),
    /// True when the list holds every value
    Contains {
        list: ListExpr,
        values: Vec<TextExpr>,
    },
    Regex {
        value: TextExpr,
        pattern: Pattern,
    },
}

/// Operands of an `EQUALS` node. Both sides always share a kind.
#[derive(Debug, Clone)]
pub enum Equality {
    Condition(Box<Condition>, Box<Condition>),
    Text(TextExpr, TextExpr),
    List(ListExpr, ListExpr),
}

impl Condition {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            Condition::And(_) => ExpressionType::And,
            Condition::Or(_) => ExpressionType::Or,
            Condition::Not(_) => ExpressionType::Not,
            Condition::Equals(_) => ExpressionType::Equals,
            Condition::Contains { .. } => ExpressionType::Contains,
            Condition::Regex { .. } => ExpressionType::Regex,
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationContext) -> bool {
        match self {
            Condition::And(children) => children.iter().all(|child| child.evaluate(ctx)),
            Condition::Or(children) => children.iter().any(|child| child.evaluate(ctx)),
            Condition::Not(inner) => !inner.evaluate(ctx),
            Condition::Equals(Equality::Condition(left, right)) => {
                left.evaluate(ctx) == right.evaluate(ctx)
            }
            Condition::Equals(Equality::Text(left, right)) => {
                left.evaluate(ctx) == right.evaluate(ctx)
            }
            Condition::Equals(Equality::List(left, right)) => {
                left.evaluate(ctx) == right.evaluate(ctx)
            }
            Condition::Contains { list, values } => {
                let items = list.evaluate(ctx);
                values
                    .iter()
                    .all(|value| items.contains(&value.evaluate(ctx)))
            }
            Condition::Regex { value, pattern } => pattern.is_match(&value.evaluate(ctx)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let tag = self.expression_type().as_str();
        match self {
            Condition::And(children) | Condition::Or(children) => json!({
                "type": tag,
                "expressions": children.iter().map(Condition::to_json).collect::<Vec<_>>(),
            }),
            Condition::Not(inner) => json!({"type": tag, "expression": inner.to_json()}),
            Condition::Equals(equality) => {
                let (left, right) = match equality {
                    Equality::Condition(left, right) => (left.to_json(), right.to_json()),
                    Equality::Text(left, right) => (left.to_json(), right.to_json()),
                    Equality::List(left, right) => (left.to_json(), right.to_json()),
                };
                json!({"type": tag, "left": left, "right": right})
            }
            Condition::Contains { list, values } => json!({
                "type": tag,
                "list": list.to_json(),
                "values": values.iter().map(TextExpr::to_json).collect::<Vec<_>>(),
            }),
            Condition::Regex { value, pattern } => json!({
                "type": tag,
                "value": value.to_json(),
                "pattern": pattern.as_str(),
            }),
        }
    }
}

/// String-valued expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextExpr {
    /// Request body field, stringified; empty when missing
    Body(String),
    /// First query value for the key; empty when missing
    Query(String),
    /// Path template parameter
    Path(String),
    Literal(String),
}

impl TextExpr {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            TextExpr::Body(_) => ExpressionType::Body,
            TextExpr::Query(_) => ExpressionType::Query,
            TextExpr::Path(_) => ExpressionType::Path,
            TextExpr::Literal(_) => ExpressionType::String,
        }
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationContext) -> String {
        match self {
            TextExpr::Body(id) => ctx.body_field(id).unwrap_or_default(),
            TextExpr::Query(id) => ctx.query_scalar(id),
            TextExpr::Path(id) => ctx.path_param(id),
            TextExpr::Literal(value) => value.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let tag = self.expression_type().as_str();
        match self {
            TextExpr::Body(id) | TextExpr::Query(id) | TextExpr::Path(id) => {
                json!({"type": tag, "id": id})
            }
            TextExpr::Literal(value) => json!({"type": tag, "value": value}),
        }
    }
}

/// List-valued expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListExpr {
    QueryArray(String),
}

impl ListExpr {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            ListExpr::QueryArray(_) => ExpressionType::QueryArray,
        }
    }

    /// `?tags=a,b` splits the first value on commas; otherwise every repeated
    /// `?tags=a&tags=b` value is returned. The comma form is checked first.
    pub fn evaluate(&self, ctx: &dyn EvaluationContext) -> Vec<String> {
        match self {
            ListExpr::QueryArray(id) => {
                let scalar = ctx.query_scalar(id);
                if scalar.contains(',') {
                    scalar.split(',').map(str::to_string).collect()
                } else {
                    ctx.query_list(id)
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ListExpr::QueryArray(id) => json!({"type": self.expression_type().as_str(), "id": id}),
        }
    }
}

/// Regex compiled once at build time.
#[derive(Debug, Clone)]
pub struct Pattern(Arc<Regex>);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(|regex| Pattern(Arc::new(regex)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let descriptor = serde_json::Value::deserialize(deserializer)?;
        build(&descriptor).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let descriptor = serde_json::Value::deserialize(deserializer)?;
        build_condition(&descriptor).map_err(serde::de::Error::custom)
    }
}
