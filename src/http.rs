//! Auxiliary HTTP route table.
//!
//! The host and plugins add `axum` routes while the robot is being set up.
//! When a bind address is configured the table is served from
//! [`crate::robot::Robot::open`] onwards and torn down on close.

use std::net::SocketAddr;

use axum::routing::MethodRouter;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running server.
struct Running {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

/// Route table plus the address it should be served on.
#[derive(Default)]
pub struct RouteTable {
    router: Router,
    bind: Option<SocketAddr>,
    route_count: usize,
    running: Option<Running>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("bind", &self.bind)
            .field("route_count", &self.route_count)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl RouteTable {
    /// Add a route.
    pub fn route(&mut self, path: &str, handler: MethodRouter) {
        self.router = std::mem::take(&mut self.router).route(path, handler);
        self.route_count = self.route_count.saturating_add(1);
    }

    /// Serve the table on `addr`. Port 0 picks a free port.
    pub fn bind_to(&mut self, addr: SocketAddr) {
        self.bind = Some(addr);
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.addr)
    }

    /// Bind the listening socket, if an address is configured.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn listen(&self) -> std::io::Result<Option<TcpListener>> {
        match self.bind {
            Some(addr) => TcpListener::bind(addr).await.map(Some),
            None => Ok(None),
        }
    }

    /// Start serving on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub fn serve(&mut self, listener: TcpListener) -> std::io::Result<SocketAddr> {
        let addr = listener.local_addr()?;
        let router = self.router.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!(error = %e, "http server error");
            }
        });
        info!(%addr, routes = self.route_count, "http server listening");
        self.stop();
        self.running = Some(Running { addr, task });
        Ok(addr)
    }

    /// Stop serving. No-op when not running.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            info!(addr = %running.addr, "http server stopped");
        }
    }
}
