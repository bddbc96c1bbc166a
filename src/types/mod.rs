//! Domain shapes shared by the dispatcher and every adapter.
//!
//! Adapters normalize whatever their backend puts on the wire into these
//! three types before anything reaches a listener.

use serde::{Deserialize, Serialize};

/// Prefix of channel IDs that address a direct-message pairing.
const DIRECT_MESSAGE_PREFIX: char = 'D';

/// A chat channel, private group, or direct-message pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    /// Backend channel ID (e.g. `C024BE91L`).
    pub id: String,
    /// Display name without the leading `#`. Empty for direct messages.
    #[serde(default)]
    pub name: String,
    /// Whether this channel is a 1:1 direct-message pairing.
    ///
    /// Computed from the ID prefix when the entity cache is built; never
    /// read from the wire.
    #[serde(skip)]
    pub is_dm: bool,
}

impl Channel {
    /// Create a channel, deriving the direct-message flag from `id`.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let is_dm = id.starts_with(DIRECT_MESSAGE_PREFIX);
        Self {
            id,
            name: name.into(),
            is_dm,
        }
    }
}

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID (e.g. `U023BECGF`).
    pub id: String,
    /// Handle the user is mentioned by, without the leading `@`.
    #[serde(default)]
    pub name: String,
}

impl User {
    /// Create a user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One normalized inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was posted in.
    pub channel: Channel,
    /// Author of the message.
    pub user: User,
    /// Message text. Backend mention syntax is preserved as received.
    pub text: String,
}

impl Message {
    /// Create a message.
    pub fn new(channel: Channel, user: User, text: impl Into<String>) -> Self {
        Self {
            channel,
            user,
            text: text.into(),
        }
    }
}
