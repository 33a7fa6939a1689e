//! HTTP transport for the configured stub servers.
//!
//! Each `Configuration` becomes a `StubServer` listening on its own port.
//!
//! ## Module Structure
//!
//! - `core`: `StubServer`, the immutable per-port state
//! - `router`: path template + verb routing
//! - `body`: request body negotiation
//! - `handler`: HTTP request handling
//! - `manager`: binding, accept loops and shutdown

mod body;
mod core;
mod handler;
mod manager;
mod router;

use std::io;

use crate::config::Verb;

pub use body::{parse_body, squash_form, BodyError};
pub use self::core::StubServer;
pub use handler::{handle_request, NO_MATCH_MESSAGE};
pub use manager::{RunningServers, ServerManager};
pub use router::{decode_path, to_route, RouteLookup, RouteTable};

pub const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid route {verb} {path}: {reason}")]
    InvalidRoute {
        path: String,
        verb: Verb,
        reason: String,
    },
    #[error("failed to bind {host}:{port}: {source}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}
