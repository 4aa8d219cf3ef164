//! Messaging connection state and delivery levels.
//!
//! Both types are transport-agnostic: the kiosk maps them onto its MQTT
//! client, but nothing here depends on a particular broker library.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the publish/subscribe connection.
///
/// ```text
/// Disconnected ──► Connecting ──► Connected
///                      ▲              │
///                      │              ▼
///                      └──────── Reconnecting
/// ```
///
/// The publisher owns and mutates this value; every other component only
/// observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session, either not started yet or explicitly disconnected.
    #[default]
    Disconnected,
    /// First dial in progress.
    Connecting,
    /// Broker acknowledged the session.
    Connected,
    /// Transport was interrupted; the transport is re-dialling.
    Reconnecting,
}

impl ConnectionState {
    /// `true` only while the broker session is acknowledged.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
        };
        f.write_str(label)
    }
}

/// Delivery guarantee requested for a publish or subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Qos {
    /// QoS 0: fire and forget.
    #[default]
    AtMostOnce,
    /// QoS 1: acknowledged, may be duplicated.
    AtLeastOnce,
    /// QoS 2: exactly-once handshake.
    ExactlyOnce,
}

impl Qos {
    /// Numeric MQTT level (0, 1 or 2).
    pub fn level(self) -> u8 {
        match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(other),
        }
    }
}
