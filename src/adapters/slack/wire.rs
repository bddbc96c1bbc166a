//! Slack RTM wire types (minimal subset).

use serde::{Deserialize, Serialize};

/// Frame type carrying a chat message.
pub const MESSAGE_TYPE: &str = "message";

/// A `{id, name}` record from the `rtm.start` snapshot lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityRecord {
    /// Backend ID.
    pub id: String,
    /// Display name. Direct-message channels have none.
    #[serde(default)]
    pub name: String,
}

/// Response body of `rtm.start`.
#[derive(Debug, Default, Deserialize)]
pub struct RtmStart {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Backend error code when `ok` is false.
    #[serde(default)]
    pub error: String,
    /// Websocket URL to dial.
    #[serde(default)]
    pub url: String,
    /// The bot's own identity.
    #[serde(default, rename = "self")]
    pub own: EntityRecord,
    /// Public channels.
    #[serde(default)]
    pub channels: Vec<EntityRecord>,
    /// Private groups.
    #[serde(default)]
    pub groups: Vec<EntityRecord>,
    /// Direct-message channels.
    #[serde(default)]
    pub ims: Vec<EntityRecord>,
    /// Workspace members.
    #[serde(default)]
    pub users: Vec<EntityRecord>,
}

/// One socket frame. Inbound and outbound frames share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Outbound sequence number; absent on inbound frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Channel ID.
    #[serde(default)]
    pub channel: String,
    /// Message text.
    #[serde(default)]
    pub text: String,
    /// Frame type discriminator.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Author ID; inbound only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Frame {
    /// Build an outbound message frame.
    pub fn outbound(id: u64, channel: &str, text: String) -> Self {
        Self {
            id: Some(id),
            channel: channel.to_owned(),
            text,
            kind: MESSAGE_TYPE.to_owned(),
            user: None,
        }
    }

    /// Whether this frame carries a chat message.
    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_TYPE
    }
}
