//! Recording publisher for unit and integration testing.
//!
//! Captures every publish and subscribe so tests can assert on what would
//! have gone over the wire, without a broker.

use std::sync::Mutex;

use async_trait::async_trait;
use lockit_core::{ConnectionState, Qos};

use crate::application::publish_token::{PublishError, SubscribeError, TokenPublisher};

/// One captured publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
}

impl PublishedMessage {
    /// The payload as UTF-8 text (lossily).
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A [`TokenPublisher`] that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, Qos)>>,
    attempts: Mutex<usize>,
    failure: Mutex<Option<String>>,
    state: Mutex<ConnectionState>,
}

impl RecordingPublisher {
    /// A publisher that accepts everything and reports `Connected`.
    pub fn new() -> Self {
        let publisher = Self::default();
        publisher.set_state(ConnectionState::Connected);
        publisher
    }

    /// Makes every following publish fail with `reason`.
    pub fn fail_publishes(&self, reason: &str) {
        *self.failure.lock().expect("lock poisoned") = Some(reason.to_string());
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("lock poisoned") = state;
    }

    /// Successfully published messages, oldest first.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().expect("lock poisoned").clone()
    }

    /// Number of publish calls, including failed ones.
    pub fn publish_attempts(&self) -> usize {
        *self.attempts.lock().expect("lock poisoned")
    }

    pub fn subscriptions(&self) -> Vec<(String, Qos)> {
        self.subscriptions.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl TokenPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), PublishError> {
        *self.attempts.lock().expect("lock poisoned") += 1;
        if let Some(reason) = self.failure.lock().expect("lock poisoned").clone() {
            return Err(PublishError::Rejected(reason));
        }
        self.published
            .lock()
            .expect("lock poisoned")
            .push(PublishedMessage {
                topic: topic.to_string(),
                payload,
                qos,
            });
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), SubscribeError> {
        self.subscriptions
            .lock()
            .expect("lock poisoned")
            .push((topic.to_string(), qos));
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.lock().expect("lock poisoned")
    }
}
