//! Connect-time options: where to connect, what to send, how to reconnect.

use std::time::Duration;

use url::Url;

use crate::TransportError;

/// How a transport behaves after losing its link.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use roomlink_transport::ReconnectConfig;
///
/// let config = ReconnectConfig {
///     max_attempts: Some(3),
///     ..ReconnectConfig::default()
/// };
/// assert!(config.enabled);
/// assert_eq!(config.delay, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Whether to reconnect at all. Default: `true`.
    pub enabled: bool,

    /// Base wait between attempts. Default: 1 second.
    pub delay: Duration,

    /// Upper bound of the random jitter added to every wait, so clients
    /// dropped by the same server restart don't come back in lockstep.
    /// Default: 500 ms.
    pub max_jitter: Duration,

    /// Give up after this many failed attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// A config that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Everything a transport needs to open (and reopen) a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Server URL, e.g. `ws://127.0.0.1:3000/`.
    pub url: String,

    /// Query parameters appended to the URL on every (re)connect.
    pub params: Vec<(String, String)>,

    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl ConnectOptions {
    /// Options for `url` with no params and the default reconnect policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Adds (or replaces) a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.set_param(key, value);
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Adds a query parameter, replacing any earlier value for `key`.
    pub fn set_param(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
    }

    /// Returns the value of a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Builds the final URL with every param percent-encoded into the query.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] if `url` doesn't parse.
    pub fn endpoint(&self) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url)?;
        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_without_params_is_unchanged() {
        let opts = ConnectOptions::new("ws://127.0.0.1:3000/");

        let url = opts.endpoint().unwrap();

        assert_eq!(url.as_str(), "ws://127.0.0.1:3000/");
    }

    #[test]
    fn test_endpoint_appends_encoded_params() {
        let opts = ConnectOptions::new("ws://localhost:3000/rooms")
            .with_param("playerID", "a b&c");

        let url = opts.endpoint().unwrap();

        assert_eq!(url.query(), Some("playerID=a+b%26c"));
    }

    #[test]
    fn test_endpoint_keeps_existing_query() {
        let opts = ConnectOptions::new("ws://localhost:3000/?v=2")
            .with_param("playerID", "p1");

        let url = opts.endpoint().unwrap();

        assert_eq!(url.query(), Some("v=2&playerID=p1"));
    }

    #[test]
    fn test_endpoint_invalid_url_returns_error() {
        let opts = ConnectOptions::new("not a url");
        assert!(matches!(opts.endpoint(), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_set_param_replaces_existing_value() {
        let mut opts = ConnectOptions::new("ws://x/").with_param("playerID", "old");

        opts.set_param("playerID", "new");

        assert_eq!(opts.param("playerID"), Some("new"));
        assert_eq!(opts.params.len(), 1);
    }

    #[test]
    fn test_reconnect_disabled() {
        let cfg = ReconnectConfig::disabled();
        assert!(!cfg.enabled);
        assert_eq!(cfg.delay, ReconnectConfig::default().delay);
    }
}
