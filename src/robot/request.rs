//! Per-match invocation context handed to listener callbacks.

use std::sync::Arc;

use crate::adapters::{Adapter, AdapterError};
use crate::types::Message;

/// The message that matched, its captures, and a route back to the adapter.
#[derive(Clone)]
pub struct Request {
    /// The triggering message.
    pub message: Message,
    /// Pattern capture groups, full match excluded.
    pub query: Vec<String>,
    adapter: Arc<dyn Adapter>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("message", &self.message)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Create a request.
    pub fn new(adapter: Arc<dyn Adapter>, message: Message, query: Vec<String>) -> Self {
        Self {
            message,
            query,
            adapter,
        }
    }

    /// Reply to the author of the request.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error unchanged.
    pub async fn reply(&self, text: &str) -> Result<(), AdapterError> {
        self.adapter.reply(&self.message, text).await
    }

    /// Send a message to the channel the request came from.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error unchanged.
    pub async fn send(&self, text: &str) -> Result<(), AdapterError> {
        self.adapter.send(&self.message.channel, text).await
    }
}
