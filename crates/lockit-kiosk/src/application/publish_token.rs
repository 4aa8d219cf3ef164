//! PublishTokenUseCase: parse raw text and publish the unlock request.
//!
//! This is the tail of the pipeline.  It receives the raw text of a decoded QR
//! code (or, depending on policy, a hand-typed code), and:
//!
//! 1. Parses it into a [`ScanToken`] with [`parse_token`].
//! 2. Converts the token into an [`UnlockPayload`] and serialises it to JSON.
//! 3. Hands the bytes to the injected [`TokenPublisher`].
//!
//! # Error policy
//!
//! Nothing here is retried and nothing panics.  Every failure is logged and
//! reported back as a [`SubmissionOutcome`] so the view controller can show
//! it on the Result view:
//!
//! - A token that does not parse is logged at `warn` and **not** published.
//! - A publish the transport rejects is logged at `error`.

use std::sync::Arc;

use async_trait::async_trait;
use lockit_core::{parse_token, ConnectionState, Qos, ScanToken, TokenError, UnlockPayload};
use thiserror::Error;
use tracing::{error, info, warn};

/// Error returned when the transport rejects or cannot deliver a publish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The transport refused the request (queue full, session closed, ...).
    #[error("publish rejected by transport: {0}")]
    Rejected(String),
}

/// Error returned when the transport rejects a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("subscribe rejected by transport: {0}")]
    Rejected(String),
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub topic: String,
    /// Payload decoded as UTF-8 (lossily).
    pub payload: String,
}

/// Trait for the publish/subscribe transport.
///
/// The infrastructure implementation is MQTT; tests use a recording double.
#[async_trait]
pub trait TokenPublisher: Send + Sync {
    /// Queues `payload` for delivery on `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), PublishError>;

    /// Subscribes to `topic`; matching messages arrive on the transport's
    /// event channel.
    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), SubscribeError>;

    /// Current connection state.  Read-only for callers.
    fn connection_state(&self) -> ConnectionState;
}

/// What happened to a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The token parsed and the publish was queued.
    Published(ScanToken),
    /// The text is not a valid token; nothing was published.
    Rejected(TokenError),
    /// The token parsed but the transport refused the publish.
    PublishFailed { token: ScanToken, reason: String },
    /// The text was only displayed (manual entry under the display-only policy).
    NotSubmitted,
}

impl SubmissionOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, SubmissionOutcome::Published(_))
    }
}

/// The Publish Token use case.
pub struct PublishTokenUseCase {
    publisher: Arc<dyn TokenPublisher>,
    topic: String,
    qos: Qos,
}

impl PublishTokenUseCase {
    /// Creates a new use case publishing to `topic` at `qos`.
    pub fn new(publisher: Arc<dyn TokenPublisher>, topic: impl Into<String>, qos: Qos) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            qos,
        }
    }

    /// Connection state of the underlying publisher.
    pub fn connection_state(&self) -> ConnectionState {
        self.publisher.connection_state()
    }

    /// Parses `raw` and publishes the resulting unlock payload.
    pub async fn submit(&self, raw: &str) -> SubmissionOutcome {
        let token = match parse_token(raw) {
            Ok(token) => token,
            Err(e) => {
                warn!(raw, "scanned code rejected: {e}");
                return SubmissionOutcome::Rejected(e);
            }
        };

        let payload = match UnlockPayload::from(&token).to_json_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("failed to serialise unlock payload: {e}");
                return SubmissionOutcome::PublishFailed {
                    token,
                    reason: e.to_string(),
                };
            }
        };

        match self.publisher.publish(&self.topic, payload, self.qos).await {
            Ok(()) => {
                info!(
                    user_id = token.user_id(),
                    box_id = token.box_id(),
                    topic = %self.topic,
                    "unlock request published"
                );
                SubmissionOutcome::Published(token)
            }
            Err(e) => {
                error!("Publish error: {e}");
                SubmissionOutcome::PublishFailed {
                    token,
                    reason: e.to_string(),
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
