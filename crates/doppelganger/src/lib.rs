//! Configuration-driven HTTP response stubs.
//!
//! A JSON document describes servers, their endpoints and an ordered list of
//! mappings per endpoint. Each mapping carries boolean expressions over the
//! request body, query string and path parameters; the first mapping whose
//! expressions all hold supplies the response.

pub mod config;
pub mod expression;
pub mod matcher;
pub mod response;
pub mod server;

pub use config::{ConfigError, ServerSet};
pub use matcher::{find_mapping, MatchOutcome};
pub use response::{resolve, ContentPayload, ResolvedResponse};
pub use server::{ServerError, ServerManager};
