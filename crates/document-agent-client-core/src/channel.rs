use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel requires a session credential")]
    MissingCredential,
    #[error("channel is {state}, not open", state = .0.as_str())]
    NotOpen(ConnectionState),
    #[error("failed to open channel: {0}")]
    Connect(String),
    #[error("failed to send on channel: {0}")]
    Send(String),
    #[error("undecodable channel frame: {0}")]
    Decode(String),
}

/// Lifecycle callbacks of the underlying socket, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Errored(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
}

/// Decoded inbound frame. Only `answer` and `error` reach the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Answer(String),
    Error(String),
    Unrecognized { kind: String },
}

pub fn decode_inbound_frame(frame: &str) -> Result<InboundPayload, ChannelError> {
    let envelope: InboundEnvelope =
        serde_json::from_str(frame).map_err(|error| ChannelError::Decode(error.to_string()))?;
    Ok(match envelope.kind.as_str() {
        "answer" => InboundPayload::Answer(envelope.content),
        "error" => InboundPayload::Error(envelope.content),
        _ => InboundPayload::Unrecognized {
            kind: envelope.kind,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    StateChanged(ConnectionState),
    Inbound(InboundPayload),
    TransportError(String),
}

/// Write half of an open socket.
pub trait ChannelSink {
    type Error: Display;

    fn send_text(&mut self, text: &str) -> Result<(), Self::Error>;
    fn close(&mut self);
}

/// Unique across every manager in the process, so a socket left over from a
/// torn-down view can never match the id of a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChannelEvent)>;

/// Holds at most one live connection, keyed by the session credential.
///
/// Transport events are tagged with the [`ConnectionId`] they belong to, so
/// callbacks from a discarded socket never reach the current view.
pub struct ChannelManager<S> {
    config: BackendConfig,
    credential: Option<String>,
    state: ConnectionState,
    sink: Option<S>,
    connection: Option<ConnectionId>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<S: ChannelSink> ChannelManager<S> {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            credential: None,
            state: ConnectionState::Closed,
            sink: None,
            connection: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Opens a connection the first time `credential` is seen. Calling again
    /// with the same credential is a no-op whatever the current state; a
    /// different credential replaces the old connection.
    pub fn ensure_connected<E: Display>(
        &mut self,
        credential: &str,
        connect: impl FnOnce(&str, ConnectionId) -> Result<S, E>,
    ) -> Result<Option<ConnectionId>, ChannelError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ChannelError::MissingCredential);
        }
        if self.credential.as_deref() == Some(credential) {
            return Ok(None);
        }

        self.discard_connection();
        let connection = ConnectionId::next();
        let url = self.config.chat_socket_url(credential);
        let sink = connect(&url, connection).map_err(|error| {
            tracing::warn!(error = %error, "chat channel connect failed");
            ChannelError::Connect(error.to_string())
        })?;

        self.credential = Some(credential.to_string());
        self.sink = Some(sink);
        self.connection = Some(connection);
        self.set_state(ConnectionState::Connecting);
        tracing::info!(?connection, "chat channel connecting");
        Ok(Some(connection))
    }

    pub fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        if self.state != ConnectionState::Open {
            return Err(ChannelError::NotOpen(self.state));
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(ChannelError::NotOpen(self.state));
        };
        sink.send_text(text)
            .map_err(|error| ChannelError::Send(error.to_string()))
    }

    /// Applies one transport callback and returns the events it produced, in
    /// dispatch order. Events for any connection other than the current one
    /// are dropped.
    pub fn handle_transport_event(
        &mut self,
        connection: ConnectionId,
        event: TransportEvent,
    ) -> Vec<ChannelEvent> {
        if self.connection != Some(connection) {
            tracing::debug!(?connection, "event from discarded connection ignored");
            return Vec::new();
        }

        let mut events = Vec::new();
        match event {
            TransportEvent::Opened => {
                if self.transition(ConnectionState::Open) {
                    events.push(ChannelEvent::StateChanged(ConnectionState::Open));
                }
            }
            TransportEvent::Frame(frame) => match decode_inbound_frame(&frame) {
                Ok(InboundPayload::Unrecognized { kind }) => {
                    tracing::debug!(%kind, "unrecognized channel payload ignored");
                }
                Ok(payload) => events.push(ChannelEvent::Inbound(payload)),
                Err(error) => tracing::warn!(error = %error, "dropping channel frame"),
            },
            TransportEvent::Errored(message) => {
                tracing::warn!(%message, "chat channel transport error");
                events.push(ChannelEvent::TransportError(message));
                if self.transition(ConnectionState::Closed) {
                    events.push(ChannelEvent::StateChanged(ConnectionState::Closed));
                }
            }
            TransportEvent::Closed => {
                if self.transition(ConnectionState::Closed) {
                    events.push(ChannelEvent::StateChanged(ConnectionState::Closed));
                }
            }
        }

        for event in &events {
            self.dispatch(event);
        }
        events
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ChannelEvent) + 'static) -> SubscriptionId {
        self.next_subscription = self.next_subscription.saturating_add(1);
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Unsubscribes everyone and discards the connection handle. A later
    /// [`ChannelManager::ensure_connected`] opens a fresh connection.
    pub fn shutdown(&mut self) {
        self.subscribers.clear();
        self.discard_connection();
    }

    fn discard_connection(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        self.credential = None;
        self.connection = None;
        self.state = ConnectionState::Closed;
    }

    fn transition(&mut self, next: ConnectionState) -> bool {
        if self.state == next {
            return false;
        }
        self.state = next;
        tracing::info!(state = next.as_str(), "chat channel state changed");
        true
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.transition(next) {
            self.dispatch(&ChannelEvent::StateChanged(next));
        }
    }

    fn dispatch(&mut self, event: &ChannelEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }
}

impl<S> std::fmt::Debug for ChannelManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("state", &self.state)
            .field("connection", &self.connection)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Rc<RefCell<Vec<String>>>,
        pub(crate) closed: Rc<RefCell<bool>>,
    }

    impl ChannelSink for RecordingSink {
        type Error = String;

        fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
            self.sent.borrow_mut().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() = true;
        }
    }

    fn manager() -> ChannelManager<RecordingSink> {
        ChannelManager::new(BackendConfig::new("https://agent.example.org").expect("config"))
    }

    fn connect_ok(
        sink: &RecordingSink,
    ) -> impl FnOnce(&str, ConnectionId) -> Result<RecordingSink, String> + '_ {
        move |_url, _id| Ok(sink.clone())
    }

    #[test]
    fn decodes_answer_and_error_frames() {
        assert_eq!(
            decode_inbound_frame(r#"{"type":"answer","content":"X"}"#),
            Ok(InboundPayload::Answer("X".to_string()))
        );
        assert_eq!(
            decode_inbound_frame(r#"{"type":"error","content":"boom"}"#),
            Ok(InboundPayload::Error("boom".to_string()))
        );
        assert_eq!(
            decode_inbound_frame(r#"{"type":"progress"}"#),
            Ok(InboundPayload::Unrecognized {
                kind: "progress".to_string()
            })
        );
        assert!(matches!(
            decode_inbound_frame("not json"),
            Err(ChannelError::Decode(_))
        ));
    }

    #[test]
    fn connects_with_credential_url_and_tracks_state() {
        let sink = RecordingSink::default();
        let mut manager = manager();
        let mut seen_url = String::new();

        let connection = manager
            .ensure_connected("tok en", |url, _| {
                seen_url = url.to_string();
                Ok::<_, String>(sink.clone())
            })
            .expect("connect")
            .expect("new connection");
        assert_eq!(seen_url, "wss://agent.example.org/ws/chat?token=tok%20en");
        assert_eq!(manager.state(), ConnectionState::Connecting);

        let events = manager.handle_transport_event(connection, TransportEvent::Opened);
        assert_eq!(events, vec![ChannelEvent::StateChanged(ConnectionState::Open)]);
        assert_eq!(manager.state(), ConnectionState::Open);

        let events = manager.handle_transport_event(connection, TransportEvent::Closed);
        assert_eq!(events, vec![ChannelEvent::StateChanged(ConnectionState::Closed)]);
    }

    #[test]
    fn same_credential_does_not_reconnect() {
        let sink = RecordingSink::default();
        let mut manager = manager();
        let first = manager.ensure_connected("token", connect_ok(&sink)).expect("first");
        assert!(first.is_some());

        let mut connect_calls = 0;
        let second = manager
            .ensure_connected("token", |_, _| {
                connect_calls += 1;
                Ok::<_, String>(RecordingSink::default())
            })
            .expect("second");
        assert_eq!(second, None);
        assert_eq!(connect_calls, 0);
    }

    #[test]
    fn new_credential_replaces_connection() {
        let old_sink = RecordingSink::default();
        let mut manager = manager();
        let old = manager
            .ensure_connected("token-a", connect_ok(&old_sink))
            .expect("first")
            .expect("id");

        let new_sink = RecordingSink::default();
        let new = manager
            .ensure_connected("token-b", connect_ok(&new_sink))
            .expect("second")
            .expect("id");
        assert_ne!(old, new);
        assert!(*old_sink.closed.borrow());
        assert!(manager.handle_transport_event(old, TransportEvent::Opened).is_empty());
    }

    #[test]
    fn socket_from_a_dropped_manager_never_reaches_the_next_one() {
        let old_sink = RecordingSink::default();
        let mut first = manager();
        let stale = first
            .ensure_connected("token", connect_ok(&old_sink))
            .expect("first")
            .expect("id");
        first.shutdown();
        drop(first);

        let new_sink = RecordingSink::default();
        let mut second = manager();
        let current = second
            .ensure_connected("token", connect_ok(&new_sink))
            .expect("second")
            .expect("id");
        assert_ne!(stale, current);

        assert!(second.handle_transport_event(stale, TransportEvent::Opened).is_empty());
        assert!(
            second
                .handle_transport_event(stale, TransportEvent::Errored("reset".to_string()))
                .is_empty()
        );
        assert_eq!(second.state(), ConnectionState::Connecting);
    }

    #[test]
    fn empty_credential_is_rejected() {
        let mut manager = manager();
        let result = manager.ensure_connected("  ", |_, _| Ok::<_, String>(RecordingSink::default()));
        assert_eq!(result, Err(ChannelError::MissingCredential));
    }

    #[test]
    fn send_requires_open_state() {
        let sink = RecordingSink::default();
        let mut manager = manager();
        let connection = manager
            .ensure_connected("token", connect_ok(&sink))
            .expect("connect")
            .expect("id");

        assert_eq!(
            manager.send("hello"),
            Err(ChannelError::NotOpen(ConnectionState::Connecting))
        );
        manager.handle_transport_event(connection, TransportEvent::Opened);
        manager.send("hello").expect("send");
        assert_eq!(sink.sent.borrow().as_slice(), ["hello".to_string()]);
    }

    #[test]
    fn transport_error_reports_then_closes() {
        let sink = RecordingSink::default();
        let mut manager = manager();
        let connection = manager
            .ensure_connected("token", connect_ok(&sink))
            .expect("connect")
            .expect("id");
        manager.handle_transport_event(connection, TransportEvent::Opened);

        let events =
            manager.handle_transport_event(connection, TransportEvent::Errored("reset".to_string()));
        assert_eq!(
            events,
            vec![
                ChannelEvent::TransportError("reset".to_string()),
                ChannelEvent::StateChanged(ConnectionState::Closed),
            ]
        );
    }

    #[test]
    fn subscribers_receive_events_until_shutdown() {
        let sink = RecordingSink::default();
        let received = Rc::new(RefCell::new(Vec::new()));
        let mut manager = manager();
        let recorder = Rc::clone(&received);
        manager.subscribe(move |event| recorder.borrow_mut().push(event.clone()));

        let connection = manager
            .ensure_connected("token", connect_ok(&sink))
            .expect("connect")
            .expect("id");
        manager.handle_transport_event(
            connection,
            TransportEvent::Frame(r#"{"type":"answer","content":"hi"}"#.to_string()),
        );
        assert_eq!(
            received.borrow().as_slice(),
            [
                ChannelEvent::StateChanged(ConnectionState::Connecting),
                ChannelEvent::Inbound(InboundPayload::Answer("hi".to_string())),
            ]
        );

        manager.shutdown();
        assert_eq!(manager.subscriber_count(), 0);
        assert!(*sink.closed.borrow());
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(
            manager
                .handle_transport_event(connection, TransportEvent::Opened)
                .is_empty()
        );
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let mut manager = manager();
        let first = manager.subscribe(|_| {});
        let _second = manager.subscribe(|_| {});
        assert!(manager.unsubscribe(first));
        assert!(!manager.unsubscribe(first));
        assert_eq!(manager.subscriber_count(), 1);
    }
}
