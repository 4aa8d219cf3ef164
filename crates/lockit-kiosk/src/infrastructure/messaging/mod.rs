//! Messaging infrastructure: the MQTT connection behind [`TokenPublisher`].
//!
//! # What is MQTT? (for beginners)
//!
//! MQTT is a small publish/subscribe protocol.  Clients connect to a
//! *broker*, publish messages to named *topics* (e.g. `lockit/boxes`), and
//! subscribe to topics they care about.  The broker fans every message out
//! to the subscribers.  The box controllers subscribe to the unlock topic;
//! the kiosk publishes to it.
//!
//! # Sub-modules
//!
//! - **`mqtt`** – [`MqttPublisher`]: owns the `rumqttc` client and drives its
//!   event loop on a Tokio task.
//! - **`mock`** – [`mock::RecordingPublisher`] for tests.
//!
//! This module holds what both share: broker URL parsing, client identity,
//! connection settings, and the events the connection reports.
//!
//! [`TokenPublisher`]: crate::application::publish_token::TokenPublisher

pub mod mock;
pub mod mqtt;

use std::time::Duration;

use lockit_core::{ConnectionState, Qos};
use thiserror::Error;
use uuid::Uuid;

use crate::application::publish_token::IncomingMessage;

pub use mqtt::MqttPublisher;

/// Default client-id prefix; six random hex characters are appended.
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "lockit_kiosk_";

/// Number of random hex characters in a generated client id.
pub const CLIENT_ID_SUFFIX_LEN: usize = 6;

/// Path used for WebSocket brokers when the URL has none.
pub const DEFAULT_WS_PATH: &str = "/mqtt";

/// Error type for messaging setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// The broker URL could not be parsed.
    #[error("invalid broker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL scheme is not one the kiosk can speak.
    #[error("unsupported broker URL scheme '{0}' (expected mqtt, tcp, mqtts, ssl, ws or wss)")]
    UnsupportedScheme(String),
}

/// How the MQTT session is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerTransport {
    /// Plain TCP (`mqtt://`, `tcp://`).
    Tcp,
    /// TLS over TCP (`mqtts://`, `ssl://`).
    Tls,
    /// WebSocket (`ws://`).
    Ws,
    /// WebSocket over TLS (`wss://`).
    Wss,
}

impl BrokerTransport {
    fn from_scheme(scheme: &str) -> Result<Self, MessagingError> {
        match scheme.to_ascii_lowercase().as_str() {
            "mqtt" | "tcp" => Ok(BrokerTransport::Tcp),
            "mqtts" | "ssl" => Ok(BrokerTransport::Tls),
            "ws" => Ok(BrokerTransport::Ws),
            "wss" => Ok(BrokerTransport::Wss),
            _ => Err(MessagingError::UnsupportedScheme(scheme.to_string())),
        }
    }

    /// IANA / de-facto default port for the transport.
    pub fn default_port(self) -> u16 {
        match self {
            BrokerTransport::Tcp => 1883,
            BrokerTransport::Tls => 8883,
            BrokerTransport::Ws => 80,
            BrokerTransport::Wss => 443,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            BrokerTransport::Tcp => "mqtt",
            BrokerTransport::Tls => "mqtts",
            BrokerTransport::Ws => "ws",
            BrokerTransport::Wss => "wss",
        }
    }

    pub fn is_websocket(self) -> bool {
        matches!(self, BrokerTransport::Ws | BrokerTransport::Wss)
    }
}

/// A parsed broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub transport: BrokerTransport,
    pub host: String,
    pub port: u16,
    /// Request path, only meaningful for WebSocket transports.
    pub path: String,
}

impl BrokerEndpoint {
    /// Parses `scheme://host[:port][/path]`.
    ///
    /// # Errors
    ///
    /// [`MessagingError::UnsupportedScheme`] for unknown schemes and
    /// [`MessagingError::InvalidUrl`] for anything else malformed.
    pub fn parse(url: &str) -> Result<Self, MessagingError> {
        let invalid = |reason: &str| MessagingError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = url.trim().split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let transport = BrokerTransport::from_scheme(scheme)?;

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };

        let (host, port) = match authority.rsplit_once(':') {
            // "[::1]" has colons but no port
            Some((host, port)) if !authority.ends_with(']') => {
                let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
                (host, port)
            }
            _ => (authority, transport.default_port()),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let path = match (transport.is_websocket(), path) {
            (true, "" | "/") => DEFAULT_WS_PATH.to_string(),
            (true, p) => p.to_string(),
            (false, _) => String::new(),
        };

        Ok(Self {
            transport,
            host: host.to_string(),
            port,
            path,
        })
    }

    /// The address string handed to the MQTT client.
    ///
    /// TCP transports take a bare host; WebSocket transports take the full URL.
    pub fn broker_addr(&self) -> String {
        if self.transport.is_websocket() {
            format!("{}://{}:{}{}", self.transport.scheme(), self.host, self.port, self.path)
        } else {
            self.host.clone()
        }
    }
}

/// Returns `prefix` followed by six random lowercase hex characters.
pub fn generate_client_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &random[..CLIENT_ID_SUFFIX_LEN])
}

/// Settings for one MQTT session.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConnectConfig {
    /// Broker URL, e.g. `mqtt://localhost:1883` or `wss://broker/mqtt`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic subscribed after every successful connect.
    pub topic: String,
    pub client_id_prefix: String,
    pub keep_alive: Duration,
    /// Pause before the event loop re-dials after a transport error.
    pub reconnect_delay: Duration,
}

impl Default for MqttConnectConfig {
    fn default() -> Self {
        Self {
            url: "mqtt://localhost:1883".to_string(),
            username: None,
            password: None,
            topic: "lockit/boxes".to_string(),
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Something the connection wants the front end to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingEvent {
    /// The connection moved to a new state.
    StateChanged(ConnectionState),
    /// The broker acknowledged a subscription.
    Subscribed { topic: String, qos: Qos },
    /// A message arrived on a subscribed topic.
    Message(IncomingMessage),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
