//! Listener records: a compiled pattern, a directness flag, and a callback.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use regex::Regex;

use super::request::Request;
use super::RobotError;

/// Future returned by a listener callback.
pub type ListenerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased listener callback.
pub type ListenerCallback = Arc<dyn Fn(Request) -> ListenerFuture + Send + Sync>;

/// A registered pattern handler.
pub struct Listener {
    regex: Regex,
    direct: bool,
    callback: ListenerCallback,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("pattern", &self.regex.as_str())
            .field("direct", &self.direct)
            .finish_non_exhaustive()
    }
}

impl Listener {
    /// Compile `pattern` and wrap `callback`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::InvalidPattern`] if the pattern does not compile.
    pub fn new<F, Fut>(pattern: &str, direct: bool, callback: F) -> Result<Self, RobotError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let regex = Regex::new(pattern).map_err(|source| RobotError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        let callback: ListenerCallback =
            Arc::new(move |request: Request| -> ListenerFuture { Box::pin(callback(request)) });
        Ok(Self {
            regex,
            direct,
            callback,
        })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the listener only fires when the robot is addressed.
    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Capture groups of a match against `text`, full match excluded.
    ///
    /// Groups that did not participate are empty strings.
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }

    /// Run the callback for `request`.
    pub fn invoke(&self, request: Request) -> ListenerFuture {
        (self.callback)(request)
    }
}
