//! Per-verb path routing.
//!
//! Endpoint paths use `:name` for a segment parameter and `*name` for a
//! trailing catch-all. They are translated to `matchit` syntax once, when the
//! table is built.

use std::collections::HashMap;

use matchit::Router;

use super::ServerError;
use crate::config::{Endpoint, Verb};

/// Result of looking up a request path.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Found {
        endpoint: &'a Endpoint,
        params: Vec<(String, String)>,
    },
    /// The path exists, but not for this method
    MethodNotAllowed { allowed: Vec<Verb> },
    NotFound,
}

/// Routing table for one listener.
pub struct RouteTable {
    endpoints: Vec<Endpoint>,
    /// Catch-all parameter name per endpoint, if its path ends in `*name`
    catch_alls: Vec<Option<String>>,
    routers: HashMap<Verb, Router<usize>>,
}

impl RouteTable {
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ServerError> {
        let mut routers: HashMap<Verb, Router<usize>> = HashMap::new();

        for (index, endpoint) in endpoints.iter().enumerate() {
            let invalid = |reason: String| ServerError::InvalidRoute {
                path: endpoint.path.clone(),
                verb: endpoint.verb,
                reason,
            };
            let route = to_route(&endpoint.path).map_err(|reason| invalid(reason.to_string()))?;
            routers
                .entry(endpoint.verb)
                .or_default()
                .insert(route, index)
                .map_err(|e| invalid(e.to_string()))?;
        }

        let catch_alls = endpoints
            .iter()
            .map(|endpoint| {
                endpoint
                    .path
                    .rsplit('/')
                    .next()
                    .and_then(|last| last.strip_prefix('*'))
                    .map(str::to_string)
            })
            .collect();

        Ok(Self {
            endpoints,
            catch_alls,
            routers,
        })
    }

    /// Look up `path` for `method`, the raw request method.
    ///
    /// `path` is expected percent-decoded. A catch-all capture keeps its
    /// leading `/`.
    pub fn lookup(&self, method: &str, path: &str) -> RouteLookup<'_> {
        if let Some(found) = method
            .parse::<Verb>()
            .ok()
            .filter(|verb| verb.as_str() == method)
            .and_then(|verb| self.routers.get(&verb))
            .and_then(|router| router.at(path).ok())
        {
            let index = *found.value;
            let catch_all = self.catch_alls[index].as_deref();
            let params = found
                .params
                .iter()
                .map(|(k, v)| {
                    if catch_all == Some(k) {
                        (k.to_string(), format!("/{v}"))
                    } else {
                        (k.to_string(), v.to_string())
                    }
                })
                .collect();
            return RouteLookup::Found {
                endpoint: &self.endpoints[index],
                params,
            };
        }

        let allowed: Vec<Verb> = Verb::ALL
            .into_iter()
            .filter(|verb| {
                self.routers
                    .get(verb)
                    .is_some_and(|router| router.at(path).is_ok())
            })
            .collect();

        if allowed.is_empty() {
            RouteLookup::NotFound
        } else {
            RouteLookup::MethodNotAllowed { allowed }
        }
    }
}

/// Percent-decode a request path for routing.
///
/// `+` is kept as-is. A path that does not decode to UTF-8 is routed raw.
pub fn decode_path(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Translate an endpoint path to `matchit` syntax.
///
/// A missing leading `/` is added. Literal braces are escaped.
pub fn to_route(path: &str) -> Result<String, &'static str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').collect();
    let mut route = String::with_capacity(path.len() + 8);

    for (i, segment) in segments.iter().enumerate() {
        route.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err("empty parameter name");
            }
            route.push('{');
            route.push_str(name);
            route.push('}');
        } else if let Some(name) = segment.strip_prefix('*') {
            if name.is_empty() {
                return Err("empty catch-all name");
            }
            if i + 1 != segments.len() {
                return Err("catch-all must be the last segment");
            }
            route.push_str("{*");
            route.push_str(name);
            route.push('}');
        } else {
            route.push_str(&segment.replace('{', "{{").replace('}', "}}"));
        }
    }

    Ok(route)
}
