//! MqttPublisher: the kiosk's single broker connection.
//!
//! `rumqttc` splits a connection into two halves:
//!
//! - an [`AsyncClient`] handle that *queues* requests (publish, subscribe,
//!   disconnect), and
//! - an [`EventLoop`] that actually talks to the broker.  Nothing is sent or
//!   received unless somebody keeps calling [`EventLoop::poll`].
//!
//! [`MqttPublisher::connect`] keeps the client half and moves the event loop
//! into a Tokio task that polls it forever.  The task:
//!
//! - reports state changes through a `watch` channel
//!   (`Connecting → Connected → Reconnecting → Connected ...`),
//! - subscribes to the configured topic at QoS 0 after every CONNACK,
//! - forwards incoming publishes as [`MessagingEvent::Message`],
//! - on a transport error logs it, waits `reconnect_delay`, and polls again
//!   (the next poll re-dials).
//!
//! Dropping the publisher aborts the task.  [`MqttPublisher::disconnect`]
//! ends the session politely first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lockit_core::{ConnectionState, Qos};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS, SubscribeReasonCode, Transport,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{
    generate_client_id, BrokerEndpoint, BrokerTransport, MessagingError, MessagingEvent,
    MqttConnectConfig,
};
use crate::application::publish_token::{
    IncomingMessage, PublishError, SubscribeError, TokenPublisher,
};

/// Capacity of the client → event loop request queue.
const REQUEST_QUEUE_CAPACITY: usize = 10;
/// Capacity of the event channel handed to the front end.
const EVENT_CHANNEL_CAPACITY: usize = 64;
/// `rumqttc` rejects keep-alive intervals shorter than this.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);
/// How long `disconnect` waits for the event loop to confirm.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Subscriptions sent but not yet acknowledged, in send order.
type PendingSubscriptions = Arc<Mutex<VecDeque<(String, Qos)>>>;

/// MQTT-backed [`TokenPublisher`].
pub struct MqttPublisher {
    client: AsyncClient,
    client_id: String,
    state: Arc<watch::Sender<ConnectionState>>,
    pending: PendingSubscriptions,
    task: JoinHandle<()>,
}

impl MqttPublisher {
    /// Opens the session and spawns the event-loop task.
    ///
    /// Returns immediately in [`ConnectionState::Connecting`]; the broker
    /// handshake happens on the task.  Must be called from inside a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError`] if the broker URL cannot be parsed.
    pub fn connect(
        config: &MqttConnectConfig,
    ) -> Result<(Self, mpsc::Receiver<MessagingEvent>), MessagingError> {
        let endpoint = BrokerEndpoint::parse(&config.url)?;
        let client_id = generate_client_id(&config.client_id_prefix);
        let options = mqtt_options(&client_id, &endpoint, config);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));
        let pending: PendingSubscriptions = Arc::default();

        info!(
            %client_id,
            host = %endpoint.host,
            port = endpoint.port,
            transport = ?endpoint.transport,
            "connecting to MQTT broker"
        );

        let driver = EventLoopDriver {
            client: client.clone(),
            topic: config.topic.clone(),
            state: Arc::clone(&state),
            events: event_tx,
            pending: Arc::clone(&pending),
            reconnect_delay: config.reconnect_delay,
        };
        let task = tokio::spawn(driver.run(eventloop));

        Ok((
            Self {
                client,
                client_id,
                state,
                pending,
                task,
            },
            event_rx,
        ))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Ends the session and waits briefly for the event loop to confirm.
    ///
    /// The request and the confirmation share one grace period.  If the
    /// broker is unreachable (the request queue never drains) the task is
    /// aborted instead.  Either way the state is
    /// [`ConnectionState::Disconnected`] afterwards.
    pub async fn disconnect(&self) {
        let mut state = self.state.subscribe();
        let graceful = async {
            if let Err(e) = self.client.disconnect().await {
                warn!("MQTT disconnect request failed: {e}");
                return false;
            }
            state
                .wait_for(|s| *s == ConnectionState::Disconnected)
                .await
                .is_ok()
        };
        let confirmed = matches!(tokio::time::timeout(DISCONNECT_GRACE, graceful).await, Ok(true));
        if !confirmed {
            debug!("event loop did not confirm disconnect; aborting it");
            self.task.abort();
            self.state.send_replace(ConnectionState::Disconnected);
        }
        info!(client_id = %self.client_id, "MQTT session closed");
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl TokenPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, to_mqtt_qos(qos), false, payload)
            .map_err(|e| PublishError::Rejected(e.to_string()))
    }

    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), SubscribeError> {
        request_subscription(&self.client, &self.pending, topic, qos)
            .map_err(SubscribeError::Rejected)
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

// ── Event loop ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum LoopStep {
    Continue,
    Stop,
}

/// State owned by the event-loop task.
struct EventLoopDriver {
    client: AsyncClient,
    topic: String,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::Sender<MessagingEvent>,
    pending: PendingSubscriptions,
    reconnect_delay: Duration,
}

impl EventLoopDriver {
    async fn run(mut self, mut eventloop: EventLoop) {
        loop {
            let step = match eventloop.poll().await {
                Ok(event) => self.on_event(event).await,
                Err(e) => self.on_error(e).await,
            };
            if step == LoopStep::Stop {
                break;
            }
        }
        debug!("MQTT event loop stopped");
    }

    async fn on_event(&mut self, event: Event) -> LoopStep {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                info!("Connection successful");
                self.set_state(ConnectionState::Connected).await;
                // SUBACKs from a dropped session never arrive.
                if let Ok(mut pending) = self.pending.lock() {
                    pending.clear();
                }
                if let Err(e) =
                    request_subscription(&self.client, &self.pending, &self.topic, Qos::AtMostOnce)
                {
                    error!("Subscribe to topics error: {e}");
                }
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                let requested = self
                    .pending
                    .lock()
                    .map(|mut pending| pending.pop_front())
                    .unwrap_or_default();
                let Some((topic, _)) = requested else {
                    debug!(pkid = ack.pkid, "SUBACK without a pending subscription");
                    return LoopStep::Continue;
                };
                match ack.return_codes.first() {
                    Some(SubscribeReasonCode::Success(granted)) => {
                        info!("Subscribe to topics: {topic}");
                        let qos = from_mqtt_qos(*granted);
                        self.emit(MessagingEvent::Subscribed { topic, qos }).await;
                    }
                    _ => error!("Subscribe to topics error: broker refused {topic}"),
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = IncomingMessage {
                    topic: publish.topic,
                    payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                };
                info!(
                    "Received message: {} from topic: {}",
                    message.payload, message.topic
                );
                self.emit(MessagingEvent::Message(message)).await;
            }
            Event::Outgoing(Outgoing::Disconnect) => {
                self.set_state(ConnectionState::Disconnected).await;
                return LoopStep::Stop;
            }
            other => debug!(event = ?other, "MQTT event"),
        }
        LoopStep::Continue
    }

    async fn on_error(&mut self, e: ConnectionError) -> LoopStep {
        if matches!(e, ConnectionError::RequestsDone) {
            // Every client handle is gone; nobody can publish any more.
            self.set_state(ConnectionState::Disconnected).await;
            return LoopStep::Stop;
        }
        error!("Connection error: {e}");
        self.set_state(ConnectionState::Reconnecting).await;
        tokio::time::sleep(self.reconnect_delay).await;
        LoopStep::Continue
    }

    async fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "MQTT connection state changed");
            self.emit(MessagingEvent::StateChanged(next)).await;
        }
    }

    async fn emit(&self, event: MessagingEvent) {
        if self.events.send(event).await.is_err() {
            debug!("messaging event receiver dropped");
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn mqtt_options(client_id: &str, endpoint: &BrokerEndpoint, config: &MqttConnectConfig) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, endpoint.broker_addr(), endpoint.port);
    options.set_keep_alive(config.keep_alive.max(MIN_KEEP_ALIVE));
    if let Some(username) = &config.username {
        options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
    }
    match endpoint.transport {
        BrokerTransport::Tcp => {}
        BrokerTransport::Tls => {
            options.set_transport(Transport::tls_with_default_config());
        }
        BrokerTransport::Ws => {
            options.set_transport(Transport::Ws);
        }
        BrokerTransport::Wss => {
            options.set_transport(Transport::wss_with_default_config());
        }
    }
    options
}

/// Records the subscription as pending and queues the SUBSCRIBE packet.
fn request_subscription(
    client: &AsyncClient,
    pending: &PendingSubscriptions,
    topic: &str,
    qos: Qos,
) -> Result<(), String> {
    if let Ok(mut pending) = pending.lock() {
        pending.push_back((topic.to_string(), qos));
    }
    client.try_subscribe(topic, to_mqtt_qos(qos)).map_err(|e| {
        if let Ok(mut pending) = pending.lock() {
            pending.pop_back();
        }
        e.to_string()
    })
}

fn to_mqtt_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn from_mqtt_qos(qos: QoS) -> Qos {
    match qos {
        QoS::AtMostOnce => Qos::AtMostOnce,
        QoS::AtLeastOnce => Qos::AtLeastOnce,
        QoS::ExactlyOnce => Qos::ExactlyOnce,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
