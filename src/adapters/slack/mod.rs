//! Slack RTM adapter -- websocket session with the real-time messaging API.
//!
//! Calls `rtm.start` with the bot token, builds the [`EntityCache`] from the
//! returned snapshot, dials the websocket URL, and spawns a read loop that
//! normalizes `message` frames into [`Message`]s. Outbound text is escaped,
//! mention-encoded, stamped with the next per-connection frame ID, and
//! written to the socket.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::{reply_text, Adapter, AdapterError};
use crate::types::{Channel, Message, User};

pub mod cache;
pub mod format;
pub mod wire;

pub use cache::EntityCache;

use self::wire::{Frame, RtmStart};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default `rtm.start` endpoint.
pub const DEFAULT_RTM_START_ENDPOINT: &str = "https://slack.com/api/rtm.start";

/// Default upper bound on the `rtm.start` response body, in bytes.
pub const DEFAULT_MAX_HANDSHAKE_BYTES: usize = 8 * 1024 * 1024;

/// Slack adapter configuration.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token sent as the `token` query parameter.
    pub token: String,
    /// Session-start endpoint, without query string.
    pub rtm_start_endpoint: String,
    /// Bodies longer than this are truncated before decoding.
    pub max_handshake_bytes: usize,
}

impl SlackConfig {
    /// Configuration for the public Slack API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            rtm_start_endpoint: DEFAULT_RTM_START_ENDPOINT.to_owned(),
            max_handshake_bytes: DEFAULT_MAX_HANDSHAKE_BYTES,
        }
    }

    /// Point the adapter at a different session-start endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rtm_start_endpoint = endpoint.into();
        self
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"[REDACTED]")
            .field("rtm_start_endpoint", &self.rtm_start_endpoint)
            .field("max_handshake_bytes", &self.max_handshake_bytes)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live connection state, present between a successful open and close.
struct Session {
    sink: SplitSink<WsStream, WsMessage>,
    cache: Arc<EntityCache>,
    /// Last frame ID handed out. Starts at zero on every connection.
    last_id: u64,
}

impl Session {
    fn next_frame_id(&mut self) -> u64 {
        self.last_id = self.last_id.saturating_add(1);
        self.last_id
    }
}

/// Slack RTM adapter.
pub struct SlackAdapter {
    config: SlackConfig,
    client: reqwest::Client,
    /// Snapshot from the most recent successful handshake.
    cache: RwLock<Option<Arc<EntityCache>>>,
    /// Outbound half of the socket. Held across writes so frame IDs and
    /// socket order always agree.
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for SlackAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SlackAdapter {
    /// Create a closed adapter.
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cache: RwLock::new(None),
            session: Mutex::new(None),
        }
    }

    /// Entity cache from the most recent successful handshake.
    ///
    /// Populated before the websocket is dialed, so it is available even
    /// when the dial itself fails.
    pub fn cache(&self) -> Option<Arc<EntityCache>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a socket session is currently open.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    fn store_cache(&self, cache: Arc<EntityCache>) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(cache);
    }

    /// Call `rtm.start` and return the accepted snapshot.
    async fn start(&self) -> Result<RtmStart, AdapterError> {
        let url = Url::parse_with_params(
            &self.config.rtm_start_endpoint,
            &[("token", self.config.token.as_str())],
        )?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::HandshakeTransport)?;

        let limit = self.config.max_handshake_bytes;
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(AdapterError::HandshakeTransport)?
        {
            let room = limit.saturating_sub(body.len());
            body.extend(chunk.iter().take(room).copied());
            if chunk.len() > room {
                warn!(limit, "rtm.start body exceeds limit, truncating");
                break;
            }
        }

        let start: RtmStart =
            serde_json::from_slice(&body).map_err(AdapterError::MalformedHandshake)?;
        if !start.ok {
            return Err(AdapterError::HandshakeRejected(start.error));
        }
        Ok(start)
    }
}

#[async_trait]
impl Adapter for SlackAdapter {
    async fn open(&self, messages: mpsc::UnboundedSender<Message>) -> Result<(), AdapterError> {
        let start = self.start().await?;

        let cache = Arc::new(EntityCache::from_snapshot(&start));
        let own = User::new(start.own.id, start.own.name);
        info!(
            channels = cache.channel_count(),
            users = cache.user_count(),
            own_id = %own.id,
            "rtm.start accepted"
        );
        self.store_cache(Arc::clone(&cache));

        let (stream, _) = tokio_tungstenite::connect_async(start.url.as_str())
            .await
            .map_err(AdapterError::Dial)?;
        let (sink, source) = stream.split();

        let mut session = self.session.lock().await;
        if let Some(mut previous) = session.take() {
            debug!("replacing previous session");
            if let Err(e) = previous.sink.close().await {
                debug!(error = %e, "previous socket close handshake failed");
            }
        }
        *session = Some(Session {
            sink,
            cache: Arc::clone(&cache),
            last_id: 0,
        });

        tokio::spawn(read_loop(source, cache, own, messages));
        info!("Slack socket open");
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        let previous = self.session.lock().await.take();
        if let Some(mut session) = previous {
            if let Err(e) = session.sink.close().await {
                debug!(error = %e, "socket close handshake failed");
            }
            info!("Slack socket closed");
        }
        Ok(())
    }

    async fn send(&self, channel: &Channel, text: &str) -> Result<(), AdapterError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(AdapterError::NotConnected)?;

        let text = format::encode(text, &session.cache);
        let id = session.next_frame_id();
        let payload = serde_json::to_string(&Frame::outbound(id, &channel.id, text))
            .map_err(AdapterError::Encode)?;

        debug!(id, channel = %channel.id, "sending message frame");
        session
            .sink
            .send(WsMessage::Text(payload))
            .await
            .map_err(AdapterError::Write)
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<(), AdapterError> {
        self.send(&message.channel, &reply_text(message, text)).await
    }

    fn find_channel(&self, name: &str) -> Option<Channel> {
        self.cache()?.channel_by_name(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Decode frames until the socket ends or the queue's consumer goes away.
///
/// Dropping `messages` on exit is what lets the robot's dispatch loop finish.
async fn read_loop(
    mut source: SplitStream<WsStream>,
    cache: Arc<EntityCache>,
    own: User,
    messages: mpsc::UnboundedSender<Message>,
) {
    while let Some(next) = source.next().await {
        let raw = match next {
            Ok(WsMessage::Text(raw)) => raw,
            Ok(WsMessage::Close(_)) => {
                info!("Slack socket closed by peer");
                break;
            }
            Ok(_) => continue,
            Err(e) if is_terminal(&e) => {
                warn!(error = %e, "Slack socket read failed, stopping read loop");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Slack socket read error");
                continue;
            }
        };

        let Some(message) = decode_frame(&raw, &cache, &own) else {
            continue;
        };
        if messages.send(message).is_err() {
            info!("message queue closed, stopping read loop");
            break;
        }
    }
    debug!("read loop exited");
}

fn is_terminal(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
    )
}

/// Turn one text frame into a [`Message`], or `None` if it should not reach
/// the robot.
pub fn decode_frame(raw: &str, cache: &EntityCache, own: &User) -> Option<Message> {
    let frame = match serde_json::from_str::<Frame>(raw) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "discarding undecodable frame");
            return None;
        }
    };

    if !frame.is_message() {
        debug!(kind = %frame.kind, "ignoring non-message frame");
        return None;
    }

    let user_id = frame.user.unwrap_or_default();
    if user_id.is_empty() || user_id == own.id {
        return None;
    }

    let Some(channel) = cache.channel(&frame.channel).cloned() else {
        warn!(channel = %frame.channel, "dropping message for unknown channel");
        return None;
    };

    let user = match cache.user(&user_id) {
        Some(user) => user.clone(),
        None => User::new(user_id.clone(), user_id),
    };

    Some(Message::new(channel, user, frame.text))
}
