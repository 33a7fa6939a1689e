//! Conversion of JSON expression descriptors into typed expressions.
//!
//! Operand kinds are checked here, while the configuration is loaded, so a
//! tree that builds successfully can always be evaluated.

use super::{Condition, Equality, Expression, ExpressionType, ListExpr, Pattern, TextExpr};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while building an expression from its descriptor.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("expression descriptor must be a JSON object")]
    NotAnObject,
    #[error("expression descriptor has no string 'type' field")]
    MissingType,
    #[error("unknown expression type '{0}'")]
    UnknownExpressionType(String),
    #[error("{variant} requires field '{field}'")]
    MissingField {
        variant: ExpressionType,
        field: &'static str,
    },
    #[error("{variant} field '{field}' must be {expected}")]
    InvalidField {
        variant: ExpressionType,
        field: &'static str,
        expected: &'static str,
    },
    #[error("{variant} type mismatch: {detail}")]
    TypeMismatch {
        variant: ExpressionType,
        detail: String,
    },
    #[error("REGEX pattern '{pattern}' is invalid: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Build an expression of any kind from its JSON descriptor.
pub fn build(descriptor: &Value) -> Result<Expression, BuildError> {
    let object = descriptor.as_object().ok_or(BuildError::NotAnObject)?;
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(BuildError::MissingType)?;
    let variant = ExpressionType::lookup(type_name)
        .ok_or_else(|| BuildError::UnknownExpressionType(type_name.to_string()))?;
    let fields = Fields { variant, object };

    let expression = match variant {
        ExpressionType::And => Expression::Condition(Condition::And(fields.conditions("expressions")?)),
        ExpressionType::Or => Expression::Condition(Condition::Or(fields.conditions("expressions")?)),
        ExpressionType::Not => {
            let inner = fields.expression("expression")?;
            Expression::Condition(Condition::Not(Box::new(expect_condition(
                variant, "operand", inner,
            )?)))
        }
        ExpressionType::Equals => {
            let left = fields.expression("left")?;
            let right = fields.expression("right")?;
            Expression::Condition(Condition::Equals(equality(left, right)?))
        }
        ExpressionType::Contains => {
            let list = expect_list(variant, "list", fields.expression("list")?)?;
            let values = fields
                .expressions("values")?
                .into_iter()
                .map(|value| expect_text(variant, "values", value))
                .collect::<Result<Vec<_>, _>>()?;
            Expression::Condition(Condition::Contains { list, values })
        }
        ExpressionType::Regex => {
            let value = expect_text(variant, "value", fields.expression("value")?)?;
            let raw_pattern = fields.string("pattern")?;
            let pattern = match Pattern::new(&raw_pattern) {
                Ok(pattern) => pattern,
                Err(source) => {
                    return Err(BuildError::InvalidPattern {
                        pattern: raw_pattern,
                        source,
                    })
                }
            };
            Expression::Condition(Condition::Regex { value, pattern })
        }
        ExpressionType::Body => Expression::Text(TextExpr::Body(fields.string("id")?)),
        ExpressionType::Query => Expression::Text(TextExpr::Query(fields.string("id")?)),
        ExpressionType::Path => Expression::Text(TextExpr::Path(fields.string("id")?)),
        ExpressionType::String => Expression::Text(TextExpr::Literal(fields.string("value")?)),
        ExpressionType::QueryArray => Expression::List(ListExpr::QueryArray(fields.string("id")?)),
    };

    Ok(expression)
}

/// Build an expression that must evaluate to a boolean, as mapping
/// parameters do.
pub fn build_condition(descriptor: &Value) -> Result<Condition, BuildError> {
    match build(descriptor)? {
        Expression::Condition(condition) => Ok(condition),
        other => Err(BuildError::TypeMismatch {
            variant: other.expression_type(),
            detail: format!(
                "a condition must be Boolean, found {}",
                other.return_kind()
            ),
        }),
    }
}

struct Fields<'a> {
    variant: ExpressionType,
    object: &'a Map<String, Value>,
}

impl Fields<'_> {
    fn get(&self, field: &'static str) -> Result<&Value, BuildError> {
        self.object.get(field).ok_or(BuildError::MissingField {
            variant: self.variant,
            field,
        })
    }

    fn string(&self, field: &'static str) -> Result<String, BuildError> {
        self.get(field)?
            .as_str()
            .map(str::to_string)
            .ok_or(BuildError::InvalidField {
                variant: self.variant,
                field,
                expected: "a string",
            })
    }

    fn expression(&self, field: &'static str) -> Result<Expression, BuildError> {
        build(self.get(field)?)
    }

    fn expressions(&self, field: &'static str) -> Result<Vec<Expression>, BuildError> {
        self.get(field)?
            .as_array()
            .ok_or(BuildError::InvalidField {
                variant: self.variant,
                field,
                expected: "an array of expressions",
            })?
            .iter()
            .map(build)
            .collect()
    }

    fn conditions(&self, field: &'static str) -> Result<Vec<Condition>, BuildError> {
        self.expressions(field)?
            .into_iter()
            .map(|child| expect_condition(self.variant, "operands", child))
            .collect()
    }
}

fn expect_condition(
    variant: ExpressionType,
    role: &str,
    expression: Expression,
) -> Result<Condition, BuildError> {
    match expression {
        Expression::Condition(condition) => Ok(condition),
        other => Err(mismatch(variant, role, "Boolean", &other)),
    }
}

fn expect_text(
    variant: ExpressionType,
    role: &str,
    expression: Expression,
) -> Result<TextExpr, BuildError> {
    match expression {
        Expression::Text(text) => Ok(text),
        other => Err(mismatch(variant, role, "String", &other)),
    }
}

fn expect_list(
    variant: ExpressionType,
    role: &str,
    expression: Expression,
) -> Result<ListExpr, BuildError> {
    match expression {
        Expression::List(list) => Ok(list),
        other => Err(mismatch(variant, role, "StringList", &other)),
    }
}

fn mismatch(
    variant: ExpressionType,
    role: &str,
    expected: &str,
    found: &Expression,
) -> BuildError {
    BuildError::TypeMismatch {
        variant,
        detail: format!(
            "{role} must be {expected}, found {} ({})",
            found.return_kind(),
            found.expression_type()
        ),
    }
}

fn equality(left: Expression, right: Expression) -> Result<Equality, BuildError> {
    match (left, right) {
        (Expression::Condition(left), Expression::Condition(right)) => {
            Ok(Equality::Condition(Box::new(left), Box::new(right)))
        }
        (Expression::Text(left), Expression::Text(right)) => Ok(Equality::Text(left, right)),
        (Expression::List(left), Expression::List(right)) => Ok(Equality::List(left, right)),
        (left, right) => Err(BuildError::TypeMismatch {
            variant: ExpressionType::Equals,
            detail: format!(
                "left is {} but right is {}",
                left.return_kind(),
                right.return_kind()
            ),
        }),
    }
}
