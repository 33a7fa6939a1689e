//! Per-port server state.

use super::router::RouteTable;
use super::ServerError;
use crate::config::Configuration;

/// One configured listener. Built once and shared read-only by every
/// connection task.
pub struct StubServer {
    port: u16,
    routes: RouteTable,
    verbose: bool,
}

impl StubServer {
    /// Build the routing table for `configuration`.
    ///
    /// Fails on malformed or conflicting path templates.
    pub fn new(configuration: Configuration, verbose: bool) -> Result<Self, ServerError> {
        Ok(Self {
            port: configuration.port,
            routes: RouteTable::new(configuration.endpoints)?,
            verbose,
        })
    }

    /// Configured port; 0 means an ephemeral port chosen at bind time
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Whether request bodies are echoed to the log
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
