//! Listener dispatcher.
//!
//! The [`Robot`] owns the ordered list of listeners, opens its adapter with
//! a fresh inbound queue, and drains that queue on a single consumer: every
//! message is matched against every listener in registration order and all
//! matching callbacks run, one after another, before the next message is
//! taken.
//!
//! Direct listeners (registered with [`Robot::respond`]) only see messages
//! that start with the robot's address (`@name`, `name:`, `name `); the
//! address is stripped before their pattern runs. In a direct-message
//! channel the address is optional: it is stripped when present, and the
//! raw text is matched otherwise. Ambient listeners ([`Robot::hear`]) see
//! the raw text.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::MethodRouter;
use futures_util::future::BoxFuture;
use regex::Regex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapters::{Adapter, AdapterError};
use crate::http::RouteTable;
use crate::types::Message;

pub mod listener;
pub mod request;

pub use listener::Listener;
pub use request::Request;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum RobotError {
    /// The robot's name does not form a valid address pattern.
    #[error("invalid robot name {name:?}: {source}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Underlying compile error.
        #[source]
        source: regex::Error,
    },
    /// A listener pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Underlying compile error.
        #[source]
        source: regex::Error,
    },
    /// The adapter failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The HTTP route table could not be served.
    #[error("http server: {0}")]
    Http(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

/// Compile the pattern matching a message addressed to `name`.
///
/// The name is used as a regex fragment, not a literal.
///
/// # Errors
///
/// Returns [`RobotError::InvalidName`] if the result does not compile.
pub fn address_pattern(name: &str) -> Result<Regex, RobotError> {
    Regex::new(&format!(r"^@?{name}:?\s+")).map_err(|source| RobotError::InvalidName {
        name: name.to_owned(),
        source,
    })
}

/// Setup step that runs once the adapter is open.
type DeferredPlugin =
    Box<dyn FnOnce(&mut Robot) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// The listener dispatcher.
pub struct Robot {
    name: String,
    address: Regex,
    adapter: Arc<dyn Adapter>,
    listeners: Vec<Listener>,
    deferred: Vec<DeferredPlugin>,
    routes: RouteTable,
    /// Inbound queue, present between `open` and `run`.
    inbox: Option<mpsc::UnboundedReceiver<Message>>,
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.name)
            .field("listeners", &self.listeners)
            .field("deferred_plugins", &self.deferred.len())
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl Robot {
    /// Create a robot named `name` driving `adapter`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidName`] if `name` cannot be compiled into
    /// the address pattern `^@?<name>:?\s+`.
    pub fn new(name: &str, adapter: Arc<dyn Adapter>) -> Result<Self, RobotError> {
        let address = address_pattern(name)?;
        Ok(Self {
            name: name.to_owned(),
            address,
            adapter,
            listeners: Vec::new(),
            deferred: Vec::new(),
            routes: RouteTable::default(),
            inbox: None,
        })
    }

    /// The robot's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the adapter, for plugins that send on their own.
    pub fn adapter(&self) -> Arc<dyn Adapter> {
        Arc::clone(&self.adapter)
    }

    /// Registered listeners, in registration order.
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    // -- registration -------------------------------------------------------

    /// Listen for messages matching `pattern`, addressed to the robot or not.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidPattern`]; no listener is added.
    pub fn hear<F, Fut>(&mut self, pattern: &str, callback: F) -> Result<(), RobotError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.listeners.push(Listener::new(pattern, false, callback)?);
        Ok(())
    }

    /// Listen for messages addressed to the robot whose remaining text
    /// matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidPattern`]; no listener is added.
    pub fn respond<F, Fut>(&mut self, pattern: &str, callback: F) -> Result<(), RobotError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.listeners.push(Listener::new(pattern, true, callback)?);
        Ok(())
    }

    /// Run a plugin's registration immediately.
    ///
    /// # Errors
    ///
    /// Returns whatever the plugin returns.
    pub fn register_plugin<P>(&mut self, plugin: P) -> Result<(), RobotError>
    where
        P: FnOnce(&mut Robot) -> Result<(), RobotError>,
    {
        plugin(self)
    }

    /// Run a plugin once the adapter is open, so it can send during setup.
    ///
    /// The plugin registers synchronously against the robot and returns a
    /// future for its outbound work; that future is awaited inside
    /// [`Robot::open`]. Failures are logged, not propagated.
    pub fn register_deferred_plugin<P, Fut>(&mut self, plugin: P)
    where
        P: FnOnce(&mut Robot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.deferred
            .push(Box::new(move |robot: &mut Robot| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(plugin(robot))
            }));
    }

    /// Add an auxiliary HTTP route.
    pub fn route(&mut self, path: &str, handler: MethodRouter) {
        self.routes.route(path, handler);
    }

    /// Serve the HTTP route table on `addr` once the robot is open.
    pub fn serve_http(&mut self, addr: SocketAddr) {
        self.routes.bind_to(addr);
    }

    /// Address the HTTP route table is served on, while open.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.routes.local_addr()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Open the adapter, start the HTTP server, and run deferred plugins.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error, or the HTTP bind error. On error nothing
    /// is left running.
    pub async fn open(&mut self) -> Result<(), RobotError> {
        let listener = self.routes.listen().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.adapter.open(tx).await?;
        self.inbox = Some(rx);
        info!(name = %self.name, listeners = self.listeners.len(), "robot open");

        if let Some(listener) = listener {
            if let Err(e) = self.routes.serve(listener) {
                self.inbox = None;
                if let Err(close_err) = self.adapter.close().await {
                    debug!(error = %close_err, "adapter close after failed open");
                }
                return Err(e.into());
            }
        }

        for plugin in std::mem::take(&mut self.deferred) {
            if let Err(e) = plugin(self).await {
                warn!(error = %e, "deferred plugin failed");
            }
        }
        Ok(())
    }

    /// Dispatch inbound messages until the adapter stops producing them.
    ///
    /// Returns immediately if the robot is not open.
    pub async fn run(&mut self) {
        let Some(mut inbox) = self.inbox.take() else {
            warn!("run called before open");
            return;
        };
        while let Some(message) = inbox.recv().await {
            self.dispatch(&message).await;
        }
        info!("inbound queue closed, dispatch stopped");
    }

    /// Match one message against every listener and run each match.
    pub async fn dispatch(&self, message: &Message) {
        debug!(channel = %message.channel.id, user = %message.user.id, "dispatching message");

        for listener in &self.listeners {
            let text = if listener.is_direct() {
                match self.address.find(&message.text) {
                    Some(prefix) => message.text.get(prefix.end()..).unwrap_or_default(),
                    // In a 1:1 conversation every message is meant for the robot.
                    None if message.channel.is_dm => message.text.as_str(),
                    None => continue,
                }
            } else {
                message.text.as_str()
            };

            let Some(query) = listener.captures(text) else {
                continue;
            };

            debug!(pattern = listener.pattern(), "listener matched");
            let request = Request::new(self.adapter(), message.clone(), query);
            if let Err(e) = listener.invoke(request).await {
                warn!(pattern = listener.pattern(), error = %e, "listener failed");
            }
        }
    }

    /// Stop the HTTP server and close the adapter.
    ///
    /// # Errors
    ///
    /// Returns the adapter's close error.
    pub async fn close(&mut self) -> Result<(), RobotError> {
        self.routes.stop();
        self.adapter.close().await?;
        Ok(())
    }
}
