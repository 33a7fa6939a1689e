//! Ordered mapping selection.
//!
//! Mappings are tried in declared order; the first whose conditions all hold
//! wins. A mapping without conditions always matches, which makes it a
//! catch-all when placed last.

use crate::config::{Endpoint, Mapping};
use crate::expression::EvaluationContext;

/// Result of matching a request against an endpoint's mappings.
#[derive(Debug, Clone, Copy)]
pub enum MatchOutcome<'a> {
    Matched { mapping: &'a Mapping, index: usize },
    NoMatch,
}

impl<'a> MatchOutcome<'a> {
    pub fn mapping(&self) -> Option<&'a Mapping> {
        match self {
            MatchOutcome::Matched { mapping, .. } => Some(mapping),
            MatchOutcome::NoMatch => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            MatchOutcome::Matched { index, .. } => Some(*index),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Whether every condition of `mapping` holds for the request.
pub fn mapping_matches(mapping: &Mapping, ctx: &dyn EvaluationContext) -> bool {
    mapping.params.iter().all(|condition| condition.evaluate(ctx))
}

/// Find the first mapping whose conditions hold.
pub fn find_mapping<'a>(mappings: &'a [Mapping], ctx: &dyn EvaluationContext) -> MatchOutcome<'a> {
    mappings
        .iter()
        .enumerate()
        .find(|(_, mapping)| mapping_matches(mapping, ctx))
        .map(|(index, mapping)| MatchOutcome::Matched { mapping, index })
        .unwrap_or(MatchOutcome::NoMatch)
}

impl Endpoint {
    pub fn find_mapping(&self, ctx: &dyn EvaluationContext) -> MatchOutcome<'_> {
        find_mapping(&self.mappings, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSet;
    use crate::expression::RequestValues;
    use serde_json::json;

    fn endpoint(document: serde_json::Value) -> Endpoint {
        let mut set = ServerSet::from_value(&json!({ "endpoint": [document] })).unwrap();
        set.configurations.remove(0).endpoints.remove(0)
    }

    fn body(value: serde_json::Value) -> RequestValues {
        RequestValues::new().with_body(value.as_object().cloned().unwrap_or_default())
    }

    fn id_endpoint() -> Endpoint {
        endpoint(json!({
            "path": "/users",
            "verb": "POST",
            "mappings": [
                {
                    "params": [{"type": "EQUALS", "left": {"type": "BODY", "id": "id"}, "right": {"type": "STRING", "value": "123"}}],
                    "code": 201,
                    "content": {"data": {"matched": "first"}}
                },
                {"content": {"data": {"matched": "catch-all"}}}
            ]
        }))
    }

    #[test]
    fn test_first_match_wins() {
        let endpoint = id_endpoint();
        let outcome = endpoint.find_mapping(&body(json!({"id": "123"})));
        assert_eq!(outcome.index(), Some(0));
        assert_eq!(outcome.mapping().map(|m| m.code), Some(201));
    }

    #[test]
    fn test_catch_all() {
        let endpoint = id_endpoint();
        let outcome = endpoint.find_mapping(&body(json!({"id": "999"})));
        assert_eq!(outcome.index(), Some(1));
        assert_eq!(outcome.mapping().map(|m| m.code), Some(200));
    }

    #[test]
    fn test_empty_params_always_match() {
        let endpoint = endpoint(json!({"path": "/", "mappings": [{}, {"code": 500}]}));
        assert_eq!(endpoint.find_mapping(&RequestValues::new()).index(), Some(0));
    }

    #[test]
    fn test_no_match() {
        let endpoint = endpoint(json!({
            "path": "/search",
            "mappings": [
                {"params": [{"type": "EQUALS", "left": {"type": "QUERY", "id": "q"}, "right": {"type": "STRING", "value": "rust"}}]}
            ]
        }));
        let ctx = RequestValues::new().with_query_string("q=go");
        assert!(matches!(endpoint.find_mapping(&ctx), MatchOutcome::NoMatch));
        assert!(endpoint.find_mapping(&ctx).mapping().is_none());
    }

    #[test]
    fn test_no_mappings_is_no_match() {
        let endpoint = endpoint(json!({"path": "/empty"}));
        assert!(matches!(
            endpoint.find_mapping(&RequestValues::new()),
            MatchOutcome::NoMatch
        ));
    }

    #[test]
    fn test_all_conjuncts_must_hold() {
        let endpoint = endpoint(json!({
            "path": "/items/:id",
            "mappings": [
                {
                    "params": [
                        {"type": "EQUALS", "left": {"type": "PATH", "id": "id"}, "right": {"type": "STRING", "value": "1"}},
                        {"type": "CONTAINS", "list": {"type": "QUERY_ARRAY", "id": "tags"}, "values": [{"type": "STRING", "value": "new"}]}
                    ],
                    "code": 200
                },
                {"code": 404}
            ]
        }));

        let both = RequestValues::new()
            .with_path_params([("id", "1")])
            .with_query_string("tags=old,new");
        assert_eq!(endpoint.find_mapping(&both).index(), Some(0));

        let only_path = RequestValues::new()
            .with_path_params([("id", "1")])
            .with_query_string("tags=old");
        assert_eq!(endpoint.find_mapping(&only_path).index(), Some(1));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let endpoint = id_endpoint();
        let ctx = body(json!({"id": "123"}));
        let first = endpoint.find_mapping(&ctx).index();
        for _ in 0..10 {
            assert_eq!(endpoint.find_mapping(&ctx).index(), first);
        }
    }
}
