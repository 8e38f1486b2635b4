//! Client configuration.

use std::time::Duration;

use roomlink_protocol::Payload;
use roomlink_protocol::events::{
    ERROR, GAME_STARTED, PLAYER_LEFT, PLAYER_REJOINED, ROOM_DESTROYED,
    ROOM_UPDATED,
};
use roomlink_transport::{Listener, ReconnectConfig};

/// Server used when [`ClientConfig::server_url`] is `None`: the local
/// development room server.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/";

/// How long a query waits for its reply before failing with `timeout`.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// CorrelationMode
// ---------------------------------------------------------------------------

/// How concurrent queries that share a request name are handled.
///
/// Replies carry no request id, only a derived event name, so two pending
/// `getRoom` queries can't tell whose `getRoom_response` just arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelationMode {
    /// At most one pending query per request name. A second one fails
    /// immediately with [`ClientError::AlreadyInFlight`](crate::ClientError::AlreadyInFlight)
    /// and nothing is emitted.
    #[default]
    SingleFlight,

    /// Any number of pending queries per name; every one of them settles on
    /// the first matching reply. Matches servers that expect clients to
    /// fire freely.
    EventName,
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything a [`RoomClient`](crate::RoomClient) needs at construction.
///
/// Every field is optional in spirit: `ClientConfig::default()` connects to
/// [`DEFAULT_SERVER_URL`] with a 5 s query timeout, single-flight
/// correlation, automatic reconnection, and no push listeners.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use roomlink::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_server_url("ws://rooms.example.com/")
///     .with_query_timeout(Duration::from_secs(2))
///     .on_room_updated(|room| println!("room is now {room}"));
///
/// assert!(config.on_room_updated.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Room server URL. `None` means [`DEFAULT_SERVER_URL`].
    pub server_url: Option<String>,

    /// Query timeout. Default: 5000 ms.
    pub query_timeout: Duration,

    /// Same-name concurrency policy. Default: [`CorrelationMode::SingleFlight`].
    pub correlation: CorrelationMode,

    /// Transport reconnection policy.
    pub reconnect: ReconnectConfig,

    /// Subscribed to `error`: general server errors and every failed query.
    pub on_error: Option<Listener>,
    /// Subscribed to `roomUpdated`.
    pub on_room_updated: Option<Listener>,
    /// Subscribed to `roomDestroyed`.
    pub on_room_destroyed: Option<Listener>,
    /// Subscribed to `gameStarted`.
    pub on_game_started: Option<Listener>,
    /// Subscribed to `playerLeft`.
    pub on_player_left: Option<Listener>,
    /// Subscribed to `playerRejoined`.
    pub on_player_rejoined: Option<Listener>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            correlation: CorrelationMode::default(),
            reconnect: ReconnectConfig::default(),
            on_error: None,
            on_room_updated: None,
            on_room_destroyed: None,
            on_game_started: None,
            on_player_left: None,
            on_player_rejoined: None,
        }
    }
}

impl ClientConfig {
    /// The URL to connect to, after applying the default.
    pub fn resolved_server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Sets the server URL.
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Sets the query timeout.
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the correlation mode.
    #[must_use]
    pub fn with_correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = mode;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Sets the `error` listener.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Listener::new(f));
        self
    }

    /// Sets the `roomUpdated` listener.
    #[must_use]
    pub fn on_room_updated(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_room_updated = Some(Listener::new(f));
        self
    }

    /// Sets the `roomDestroyed` listener.
    #[must_use]
    pub fn on_room_destroyed(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_room_destroyed = Some(Listener::new(f));
        self
    }

    /// Sets the `gameStarted` listener.
    #[must_use]
    pub fn on_game_started(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_game_started = Some(Listener::new(f));
        self
    }

    /// Sets the `playerLeft` listener.
    #[must_use]
    pub fn on_player_left(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_player_left = Some(Listener::new(f));
        self
    }

    /// Sets the `playerRejoined` listener.
    #[must_use]
    pub fn on_player_rejoined(mut self, f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        self.on_player_rejoined = Some(Listener::new(f));
        self
    }

    /// The configured push listeners, paired with the event each one
    /// subscribes to.
    pub(crate) fn push_listeners(&self) -> Vec<(&'static str, Listener)> {
        [
            (ERROR, &self.on_error),
            (ROOM_UPDATED, &self.on_room_updated),
            (ROOM_DESTROYED, &self.on_room_destroyed),
            (GAME_STARTED, &self.on_game_started),
            (PLAYER_LEFT, &self.on_player_left),
            (PLAYER_REJOINED, &self.on_player_rejoined),
        ]
        .into_iter()
        .filter_map(|(event, listener)| Some((event, listener.clone()?)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = ClientConfig::default();

        assert_eq!(cfg.resolved_server_url(), DEFAULT_SERVER_URL);
        assert_eq!(cfg.query_timeout, Duration::from_millis(5000));
        assert_eq!(cfg.correlation, CorrelationMode::SingleFlight);
        assert!(cfg.push_listeners().is_empty());
    }

    #[test]
    fn test_server_url_overrides_default() {
        let cfg = ClientConfig::default().with_server_url("ws://example.test/");
        assert_eq!(cfg.resolved_server_url(), "ws://example.test/");
    }

    #[test]
    fn test_push_listeners_pair_each_callback_with_its_event() {
        let cfg = ClientConfig::default()
            .on_error(|_| {})
            .on_player_left(|_| {});

        let events: Vec<&str> =
            cfg.push_listeners().into_iter().map(|(e, _)| e).collect();

        assert_eq!(events, vec![ERROR, PLAYER_LEFT]);
    }

    #[test]
    fn test_cloned_config_shares_listener_identity() {
        let cfg = ClientConfig::default().on_error(|_| {});
        let copy = cfg.clone();
        assert_eq!(cfg.on_error, copy.on_error);
    }
}
