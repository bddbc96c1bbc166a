//! In-memory adapter for tests.
//!
//! Records every call, can be told to fail, and can push inbound messages
//! into the queue it was opened with as if a read loop had produced them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::adapters::{Adapter, AdapterError};
use crate::types::{Channel, Message};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Target channel ID.
    pub channel_id: String,
    /// Text as passed by the caller.
    pub text: String,
}

#[derive(Default)]
struct State {
    error: Option<String>,
    open_called: bool,
    close_called: bool,
    sent: Vec<Outbound>,
    replies: Vec<Outbound>,
    channels: Vec<Channel>,
    messages: Option<mpsc::UnboundedSender<Message>>,
}

/// Test double implementing [`Adapter`].
#[derive(Default)]
pub struct MockAdapter {
    state: Mutex<State>,
}

impl std::fmt::Debug for MockAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAdapter").finish_non_exhaustive()
    }
}

impl MockAdapter {
    /// Create a mock that succeeds at everything.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn result(state: &State) -> Result<(), AdapterError> {
        match &state.error {
            Some(message) => Err(AdapterError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    /// Make every subsequent call fail with `message`.
    pub fn set_error(&self, message: impl Into<String>) {
        self.state().error = Some(message.into());
    }

    /// Make a channel resolvable through [`Adapter::find_channel`].
    pub fn add_channel(&self, channel: Channel) {
        self.state().channels.push(channel);
    }

    /// Whether [`Adapter::open`] was called.
    pub fn open_called(&self) -> bool {
        self.state().open_called
    }

    /// Whether [`Adapter::close`] was called.
    pub fn close_called(&self) -> bool {
        self.state().close_called
    }

    /// Every [`Adapter::send`] call so far.
    pub fn sent(&self) -> Vec<Outbound> {
        self.state().sent.clone()
    }

    /// Every [`Adapter::reply`] call so far.
    pub fn replies(&self) -> Vec<Outbound> {
        self.state().replies.clone()
    }

    /// Push `message` onto the queue handed to `open`.
    ///
    /// Returns false if the adapter is not open or the consumer is gone.
    pub fn deliver(&self, message: Message) -> bool {
        match &self.state().messages {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Drop the queue sender, ending the robot's dispatch loop.
    pub fn disconnect(&self) {
        self.state().messages = None;
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn open(&self, messages: mpsc::UnboundedSender<Message>) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.open_called = true;
        Self::result(&state)?;
        state.messages = Some(messages);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.close_called = true;
        state.messages = None;
        Self::result(&state)
    }

    async fn send(&self, channel: &Channel, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.sent.push(Outbound {
            channel_id: channel.id.clone(),
            text: text.to_owned(),
        });
        Self::result(&state)
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.replies.push(Outbound {
            channel_id: message.channel.id.clone(),
            text: text.to_owned(),
        });
        Self::result(&state)
    }

    fn find_channel(&self, name: &str) -> Option<Channel> {
        self.state()
            .channels
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}
