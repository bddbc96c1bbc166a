//! Backend adapters that feed the robot.
//!
//! Each adapter owns one real-time session with a chat backend, normalizes
//! inbound events into [`Message`]s pushed onto the queue handed to
//! [`Adapter::open`], and carries outbound text back to the backend.
//!
//! Two adapters are implemented:
//! - [`slack::SlackAdapter`]: Slack RTM websocket session
//! - [`mock::MockAdapter`]: in-memory test double

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{Channel, Message};

pub mod mock;
pub mod slack;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Adapter errors.
///
/// Everything up to and including [`AdapterError::Dial`] is fatal to
/// [`Adapter::open`]; the rest are returned from outbound calls.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The configured session-start endpoint is not a valid URL.
    #[error("invalid session-start endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    /// The session-start HTTP call failed at the transport level.
    #[error("failed to make call to rtm.start")]
    HandshakeTransport(#[source] reqwest::Error),
    /// The session-start response body could not be decoded.
    #[error("{0}")]
    MalformedHandshake(#[source] serde_json::Error),
    /// The backend answered the session-start call with `ok: false`.
    #[error("{0}")]
    HandshakeRejected(String),
    /// The websocket dial failed, including a missing or invalid socket URL.
    #[error("websocket dial failed: {0}")]
    Dial(#[source] tokio_tungstenite::tungstenite::Error),
    /// An outbound call was made without an open session.
    #[error("adapter is not connected")]
    NotConnected,
    /// An outbound frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing an outbound frame to the socket failed.
    #[error("failed to write frame: {0}")]
    Write(#[source] tokio_tungstenite::tungstenite::Error),
    /// Free-form backend failure.
    #[error("{0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Capability interface
// ---------------------------------------------------------------------------

/// Capability interface the robot drives. Implemented once per backend.
///
/// Methods take `&self` so a single adapter can be shared between the
/// robot and every in-flight [`crate::robot::Request`].
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Authenticate, connect, and start producing inbound messages on
    /// `messages`. Returns once the session is live.
    async fn open(&self, messages: mpsc::UnboundedSender<Message>) -> Result<(), AdapterError>;

    /// Tear down the session. Idempotent: closing twice, or closing an
    /// adapter that was never opened, succeeds.
    async fn close(&self) -> Result<(), AdapterError>;

    /// Post `text` to `channel`.
    async fn send(&self, channel: &Channel, text: &str) -> Result<(), AdapterError>;

    /// Answer the author of `message` in the channel it came from.
    async fn reply(&self, message: &Message, text: &str) -> Result<(), AdapterError>;

    /// Resolve a channel by display name, if the adapter knows it.
    fn find_channel(&self, _name: &str) -> Option<Channel> {
        None
    }
}

/// Text of a reply to `message`: prefixed with an `@user` mention unless
/// the conversation is already 1:1.
pub fn reply_text(message: &Message, text: &str) -> String {
    if message.channel.is_dm {
        text.to_owned()
    } else {
        format!("@{} {text}", message.user.name)
    }
}
