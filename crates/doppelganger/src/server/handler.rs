//! Request handling for stub servers.
//!
//! Routes the request, builds the evaluation context, picks the first
//! matching mapping and renders its response.

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{ALLOW, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::body::parse_body;
use super::core::StubServer;
use super::router::{decode_path, RouteLookup};
use crate::config::Verb;
use crate::expression::{BodyFields, RequestValues};
use crate::matcher::MatchOutcome;
use crate::response::{resolve, ResolvedResponse, JSON_CONTENT_TYPE};

pub const NO_MATCH_MESSAGE: &str = "No matching endpoint configuration found for this request";

/// Handle a request to a stub server.
pub async fn handle_request<B>(
    req: Request<B>,
    server: Arc<StubServer>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let method = req.method().clone();
    let path = decode_path(req.uri().path());
    let query = req.uri().query().unwrap_or_default().to_string();

    let (endpoint, params) = match server.routes().lookup(method.as_str(), &path) {
        RouteLookup::Found { endpoint, params } => (endpoint, params),
        RouteLookup::MethodNotAllowed { allowed } => {
            debug!(port = server.port(), %method, %path, "method not allowed");
            return Ok(method_not_allowed(&allowed));
        }
        RouteLookup::NotFound => {
            debug!(port = server.port(), %method, %path, "no route");
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                &format!("No endpoint configured for {method} {path}"),
            ));
        }
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(port = server.port(), %path, "failed to read request body: {}", e);
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ));
        }
    };

    if server.verbose() && !bytes.is_empty() {
        info!(
            port = server.port(),
            %method,
            %path,
            "Request body: {}",
            String::from_utf8_lossy(&bytes)
        );
    }

    // GET matches against an empty body whatever was sent
    let body = if endpoint.verb.reads_body() {
        match parse_body(content_type.as_deref(), bytes).await {
            Ok(body) => body,
            Err(e) => {
                debug!(port = server.port(), %path, "rejected request body: {}", e);
                return Ok(error_response(e.status(), &e.to_string()));
            }
        }
    } else {
        BodyFields::new()
    };

    let ctx = RequestValues::new()
        .with_query_string(&query)
        .with_path_params(params)
        .with_body(body);

    let (mapping, index) = match endpoint.find_mapping(&ctx) {
        MatchOutcome::Matched { mapping, index } => (mapping, index),
        MatchOutcome::NoMatch => {
            debug!(port = server.port(), verb = %endpoint.verb, %path, "no mapping matched");
            return Ok(error_response(StatusCode::NOT_FOUND, NO_MATCH_MESSAGE));
        }
    };

    match resolve(mapping).await {
        Ok(resolved) => {
            debug!(
                port = server.port(),
                verb = %endpoint.verb,
                %path,
                mapping = index,
                status = resolved.status,
                "matched"
            );
            Ok(render(resolved))
        }
        Err(e) => {
            error!(port = server.port(), %path, mapping = index, "{}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
            ))
        }
    }
}

fn render(resolved: ResolvedResponse) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(resolved.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = resolved.payload.content_type();
    let body = resolved.payload.into_bytes();
    match content_type {
        Some(content_type) => build_response_with_headers(status, [(CONTENT_TYPE.as_str(), content_type)], body),
        None => build_response(status, body),
    }
}

fn method_not_allowed(allowed: &[Verb]) -> Response<Full<Bytes>> {
    let allow = allowed
        .iter()
        .map(Verb::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    build_response_with_headers(
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW.as_str(), allow.as_str()), (CONTENT_TYPE.as_str(), JSON_CONTENT_TYPE)],
        json!({"error": "Method not allowed"}).to_string(),
    )
}

/// JSON error body of the form `{"error": message}`.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    build_response_with_headers(
        status,
        [(CONTENT_TYPE.as_str(), JSON_CONTENT_TYPE)],
        json!({ "error": message }).to_string(),
    )
}

/// Build an HTTP response with the given status and body.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Build an HTTP response with headers.
pub fn build_response_with_headers<'h>(
    status: StatusCode,
    headers: impl IntoIterator<Item = (&'h str, &'h str)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key, value);
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}
