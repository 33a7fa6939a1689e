//! Tests for the expression module.
//!
//! Covers:
//! - Building every descriptor type and its type rules
//! - Evaluation against a request context
//! - Serialization back to descriptors

use super::*;
use serde_json::json;

fn eq_body(id: &str, value: &str) -> serde_json::Value {
    json!({
        "type": "EQUALS",
        "left": {"type": "BODY", "id": id},
        "right": {"type": "STRING", "value": value}
    })
}

fn condition(descriptor: serde_json::Value) -> Condition {
    build_condition(&descriptor).unwrap()
}

fn body_ctx(body: serde_json::Value) -> RequestValues {
    RequestValues::new().with_body(body.as_object().cloned().unwrap_or_default())
}

#[test]
fn test_discriminator_table_is_complete() {
    for expression_type in ExpressionType::ALL {
        assert_eq!(
            ExpressionType::lookup(expression_type.as_str()),
            Some(expression_type)
        );
    }
    assert_eq!(ExpressionType::lookup("and"), None);
    assert_eq!(ExpressionType::lookup("XOR"), None);
}

#[test]
fn test_leaf_return_kinds() {
    let cases = [
        (json!({"type": "BODY", "id": "a"}), ReturnKind::String),
        (json!({"type": "QUERY", "id": "a"}), ReturnKind::String),
        (json!({"type": "PATH", "id": "a"}), ReturnKind::String),
        (json!({"type": "STRING", "value": "a"}), ReturnKind::String),
        (json!({"type": "QUERY_ARRAY", "id": "a"}), ReturnKind::StringList),
    ];
    for (descriptor, kind) in cases {
        assert_eq!(build(&descriptor).unwrap().return_kind(), kind);
    }
}

#[test]
fn test_unknown_type() {
    let err = build(&json!({"type": "XOR", "expressions": []})).unwrap_err();
    assert!(matches!(err, BuildError::UnknownExpressionType(ref name) if name == "XOR"));
}

#[test]
fn test_missing_type_and_non_object() {
    assert!(matches!(
        build(&json!({"id": "x"})).unwrap_err(),
        BuildError::MissingType
    ));
    assert!(matches!(
        build(&json!(["AND"])).unwrap_err(),
        BuildError::NotAnObject
    ));
}

#[test]
fn test_missing_and_invalid_fields() {
    let err = build(&json!({"type": "BODY"})).unwrap_err();
    assert!(matches!(
        err,
        BuildError::MissingField {
            variant: ExpressionType::Body,
            field: "id"
        }
    ));

    let err = build(&json!({"type": "AND", "expressions": {"type": "STRING"}})).unwrap_err();
    assert!(matches!(
        err,
        BuildError::InvalidField {
            variant: ExpressionType::And,
            field: "expressions",
            ..
        }
    ));

    let err = build(&json!({"type": "STRING", "value": 12})).unwrap_err();
    assert!(matches!(err, BuildError::InvalidField { field: "value", .. }));
}

#[test]
fn test_logical_operands_must_be_boolean() {
    for tag in ["AND", "OR"] {
        let err = build(&json!({
            "type": tag,
            "expressions": [eq_body("a", "1"), {"type": "STRING", "value": "x"}]
        }))
        .unwrap_err();
        assert!(
            matches!(err, BuildError::TypeMismatch { variant, .. } if variant.as_str() == tag),
            "{tag}: {err}"
        );
    }

    let err = build(&json!({"type": "NOT", "expression": {"type": "QUERY", "id": "q"}})).unwrap_err();
    assert!(matches!(
        err,
        BuildError::TypeMismatch {
            variant: ExpressionType::Not,
            ..
        }
    ));
}

#[test]
fn test_equals_kind_mismatch_fails_at_build_time() {
    let err = build(&json!({
        "type": "EQUALS",
        "left": {"type": "QUERY_ARRAY", "id": "tags"},
        "right": {"type": "STRING", "value": "a"}
    }))
    .unwrap_err();

    match err {
        BuildError::TypeMismatch { variant, detail } => {
            assert_eq!(variant, ExpressionType::Equals);
            assert!(detail.contains("StringList"));
            assert!(detail.contains("String"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_contains_type_rules() {
    let err = build(&json!({
        "type": "CONTAINS",
        "list": {"type": "QUERY", "id": "tags"},
        "values": [{"type": "STRING", "value": "a"}]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        BuildError::TypeMismatch {
            variant: ExpressionType::Contains,
            ..
        }
    ));

    let err = build(&json!({
        "type": "CONTAINS",
        "list": {"type": "QUERY_ARRAY", "id": "tags"},
        "values": [{"type": "QUERY_ARRAY", "id": "other"}]
    }))
    .unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));

    let err = build(&json!({
        "type": "CONTAINS",
        "list": {"type": "QUERY_ARRAY", "id": "tags"}
    }))
    .unwrap_err();
    assert!(matches!(err, BuildError::MissingField { field: "values", .. }));
}

#[test]
fn test_regex_type_rules() {
    let err = build(&json!({
        "type": "REGEX",
        "value": {"type": "QUERY_ARRAY", "id": "tags"},
        "pattern": "^a"
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        BuildError::TypeMismatch {
            variant: ExpressionType::Regex,
            ..
        }
    ));

    let err = build(&json!({
        "type": "REGEX",
        "value": {"type": "QUERY", "id": "q"},
        "pattern": "([a-z"
    }))
    .unwrap_err();
    assert!(matches!(err, BuildError::InvalidPattern { ref pattern, .. } if pattern == "([a-z"));
}

#[test]
fn test_build_condition_rejects_non_boolean() {
    let err = build_condition(&json!({"type": "PATH", "id": "id"})).unwrap_err();
    assert!(matches!(
        err,
        BuildError::TypeMismatch {
            variant: ExpressionType::Path,
            ..
        }
    ));
}

#[test]
fn test_nested_errors_surface() {
    let err = build(&json!({
        "type": "OR",
        "expressions": [{"type": "NOT", "expression": {"type": "NOPE"}}]
    }))
    .unwrap_err();
    assert!(matches!(err, BuildError::UnknownExpressionType(_)));
}

#[test]
fn test_empty_and_is_true_empty_or_is_false() {
    let ctx = RequestValues::new();
    assert!(condition(json!({"type": "AND", "expressions": []})).evaluate(&ctx));
    assert!(!condition(json!({"type": "OR", "expressions": []})).evaluate(&ctx));
}

#[test]
fn test_double_negation() {
    let inner = eq_body("id", "123");
    let double = condition(json!({
        "type": "NOT",
        "expression": {"type": "NOT", "expression": inner.clone()}
    }));
    let plain = condition(inner);

    for id in ["123", "999"] {
        let ctx = body_ctx(json!({"id": id}));
        assert_eq!(double.evaluate(&ctx), plain.evaluate(&ctx));
    }
}

#[test]
fn test_and_or_evaluation() {
    let both = condition(json!({
        "type": "AND",
        "expressions": [eq_body("a", "1"), eq_body("b", "2")]
    }));
    let either = condition(json!({
        "type": "OR",
        "expressions": [eq_body("a", "1"), eq_body("b", "2")]
    }));

    let ctx = body_ctx(json!({"a": "1", "b": "2"}));
    assert!(both.evaluate(&ctx));
    assert!(either.evaluate(&ctx));

    let ctx = body_ctx(json!({"a": "1", "b": "3"}));
    assert!(!both.evaluate(&ctx));
    assert!(either.evaluate(&ctx));

    let ctx = body_ctx(json!({}));
    assert!(!either.evaluate(&ctx));
}

#[test]
fn test_equals_on_body_numbers() {
    let cond = condition(eq_body("id", "123"));
    assert!(cond.evaluate(&body_ctx(json!({"id": 123}))));
    assert!(cond.evaluate(&body_ctx(json!({"id": "123"}))));
    assert!(!cond.evaluate(&body_ctx(json!({"id": 124}))));
}

#[test]
fn test_missing_body_field_is_empty() {
    let cond = condition(eq_body("id", ""));
    assert!(cond.evaluate(&body_ctx(json!({}))));
}

#[test]
fn test_equals_between_booleans_and_lists() {
    let bools = condition(json!({
        "type": "EQUALS",
        "left": eq_body("a", "1"),
        "right": eq_body("b", "1")
    }));
    assert!(bools.evaluate(&body_ctx(json!({"a": "2", "b": "3"}))));
    assert!(!bools.evaluate(&body_ctx(json!({"a": "1", "b": "3"}))));

    let lists = condition(json!({
        "type": "EQUALS",
        "left": {"type": "QUERY_ARRAY", "id": "x"},
        "right": {"type": "QUERY_ARRAY", "id": "y"}
    }));
    let ctx = RequestValues::new().with_query_string("x=a,b&y=a&y=b");
    assert!(lists.evaluate(&ctx));
    let ctx = RequestValues::new().with_query_string("x=b,a&y=a&y=b");
    assert!(!lists.evaluate(&ctx));
}

#[test]
fn test_contains() {
    let all_of = |values: &[&str]| {
        condition(json!({
            "type": "CONTAINS",
            "list": {"type": "QUERY_ARRAY", "id": "tags"},
            "values": values
                .iter()
                .map(|v| json!({"type": "STRING", "value": v}))
                .collect::<Vec<_>>()
        }))
    };

    let ctx = RequestValues::new().with_query_string("tags=a,b");
    assert!(all_of(&["a"]).evaluate(&ctx));
    assert!(all_of(&["a", "b"]).evaluate(&ctx));
    assert!(all_of(&[]).evaluate(&ctx));

    let ctx = RequestValues::new().with_query_string("tags=a");
    assert!(!all_of(&["a", "b"]).evaluate(&ctx));
}

#[test]
fn test_query_array_comma_and_repeated_forms() {
    let list = match build(&json!({"type": "QUERY_ARRAY", "id": "tags"})).unwrap() {
        Expression::List(list) => list,
        other => panic!("expected list, got {other:?}"),
    };

    let comma = RequestValues::new().with_query_string("tags=a,b");
    assert_eq!(list.evaluate(&comma), vec!["a", "b"]);

    let repeated = RequestValues::new().with_query_string("tags=a&tags=b");
    assert_eq!(list.evaluate(&repeated), vec!["a", "b"]);

    // Comma form wins: only the first value is split
    let mixed = RequestValues::new().with_query_string("tags=a,b&tags=c");
    assert_eq!(list.evaluate(&mixed), vec!["a", "b"]);

    let absent = RequestValues::new();
    assert!(list.evaluate(&absent).is_empty());
}

#[test]
fn test_regex_search_semantics() {
    let cond = condition(json!({
        "type": "REGEX",
        "value": {"type": "PATH", "id": "id"},
        "pattern": "[0-9]{3}"
    }));
    assert!(cond.evaluate(&RequestValues::new().with_path_params([("id", "ab123cd")])));
    assert!(!cond.evaluate(&RequestValues::new().with_path_params([("id", "ab12cd")])));

    let anchored = condition(json!({
        "type": "REGEX",
        "value": {"type": "QUERY", "id": "q"},
        "pattern": "^abc$"
    }));
    assert!(anchored.evaluate(&RequestValues::new().with_query_string("q=abc")));
    assert!(!anchored.evaluate(&RequestValues::new().with_query_string("q=xabc")));
}

#[test]
fn test_evaluate_returns_typed_value() {
    let ctx = RequestValues::new().with_query_string("q=hello&tags=a,b");
    let text = build(&json!({"type": "QUERY", "id": "q"})).unwrap();
    let list = build(&json!({"type": "QUERY_ARRAY", "id": "tags"})).unwrap();
    let literal = build(&json!({"type": "STRING", "value": "x"})).unwrap();

    assert_eq!(text.evaluate(&ctx), Value::String("hello".to_string()));
    assert_eq!(
        list.evaluate(&ctx),
        Value::StringList(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(literal.evaluate(&ctx).kind(), ReturnKind::String);
}

#[test]
fn test_evaluation_is_repeatable() {
    let cond = condition(json!({
        "type": "AND",
        "expressions": [
            eq_body("id", "123"),
            {"type": "REGEX", "value": {"type": "QUERY", "id": "q"}, "pattern": "^x"}
        ]
    }));
    let ctx = body_ctx(json!({"id": "123"})).with_query_string("q=xyz");
    let first = cond.evaluate(&ctx);
    for _ in 0..10 {
        assert_eq!(cond.evaluate(&ctx), first);
    }
}

#[test]
fn test_round_trip_preserves_descriptor() {
    let descriptor = json!({
        "type": "OR",
        "expressions": [
            {
                "type": "AND",
                "expressions": [
                    eq_body("id", "123"),
                    {"type": "NOT", "expression": {
                        "type": "REGEX",
                        "value": {"type": "PATH", "id": "name"},
                        "pattern": "^adm"
                    }}
                ]
            },
            {
                "type": "CONTAINS",
                "list": {"type": "QUERY_ARRAY", "id": "tags"},
                "values": [{"type": "QUERY", "id": "tag"}, {"type": "STRING", "value": "x"}]
            }
        ]
    });

    let expression = build(&descriptor).unwrap();
    assert_eq!(expression.to_json(), descriptor);

    let rebuilt = build(&expression.to_json()).unwrap();
    assert_eq!(rebuilt.to_json(), descriptor);
}

#[test]
fn test_serde_integration() {
    let descriptor = eq_body("id", "123");
    let parsed: Condition = serde_json::from_value(descriptor.clone()).unwrap();
    assert_eq!(serde_json::to_value(&parsed).unwrap(), descriptor);

    let rejected = serde_json::from_value::<Condition>(json!({"type": "STRING", "value": "x"}));
    assert!(rejected.is_err());

    let any: Expression = serde_json::from_value(json!({"type": "QUERY_ARRAY", "id": "t"})).unwrap();
    assert_eq!(any.return_kind(), ReturnKind::StringList);
}
