//! ServerManager - binds and runs every configured stub server.
//!
//! All routing tables are built before the first port is bound, so a bad
//! route never leaves a partially started process behind.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::core::StubServer;
use super::handler::handle_request;
use super::ServerError;
use crate::config::ServerSet;

/// Stub servers ready to be bound.
pub struct ServerManager {
    servers: Vec<Arc<StubServer>>,
}

impl ServerManager {
    /// Build a server per configuration without binding anything.
    pub fn new(set: ServerSet, verbose: bool) -> Result<Self, ServerError> {
        let servers = set
            .configurations
            .into_iter()
            .map(|configuration| StubServer::new(configuration, verbose).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { servers })
    }

    pub fn servers(&self) -> &[Arc<StubServer>] {
        &self.servers
    }

    /// Bind every server on `host` and start serving.
    ///
    /// Nothing is served unless every port could be bound.
    pub async fn start(self, host: &str) -> Result<RunningServers, ServerError> {
        let mut listeners = Vec::with_capacity(self.servers.len());
        for server in &self.servers {
            let listener = TcpListener::bind((host, server.port()))
                .await
                .map_err(|source| ServerError::Bind {
                    host: host.to_string(),
                    port: server.port(),
                    source,
                })?;
            listeners.push(listener);
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut addrs = Vec::with_capacity(listeners.len());
        let mut handles = Vec::with_capacity(listeners.len());

        for (server, listener) in self.servers.into_iter().zip(listeners) {
            let addr = listener.local_addr().map_err(|source| ServerError::Bind {
                host: host.to_string(),
                port: server.port(),
                source,
            })?;
            info!(port = addr.port(), "Server listening on {}", addr);
            addrs.push(addr);
            handles.push(tokio::spawn(serve(
                server,
                listener,
                shutdown_tx.subscribe(),
            )));
        }

        Ok(RunningServers {
            addrs,
            shutdown_tx,
            handles,
        })
    }
}

/// Handle on the running listeners.
pub struct RunningServers {
    addrs: Vec<SocketAddr>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl RunningServers {
    /// Bound addresses, in configuration order
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Signal every accept loop to stop.
    pub fn shutdown(&self) {
        // Err only means every loop has already exited
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for every accept loop to exit.
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Server task failed: {}", e);
            }
        }
    }

    pub async fn shutdown_and_wait(self) {
        self.shutdown();
        self.wait().await;
    }
}

/// Accept loop for one server, running until a shutdown signal arrives.
pub async fn serve(
    server: Arc<StubServer>,
    listener: TcpListener,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let port = listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or_else(|_| server.port());

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(port, "Connection from {}", addr);
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let server = Arc::clone(&server);
                                async move { handle_request(req, server).await }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!(port, "Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!(port, "Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!(port, "Server shutting down");
                break;
            }
        }
    }
}
