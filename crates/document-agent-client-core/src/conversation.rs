use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::{
    ChannelError, ChannelEvent, ChannelManager, ChannelSink, ConnectionId, ConnectionState,
    InboundPayload, TransportEvent,
};
use crate::config::BackendConfig;

pub const EXAMPLE_PROMPTS: [&str; 3] = [
    "Strategic plan of the cooperative",
    "Responsibilities of the work team",
    "Values of the cooperative",
];
/// Distance from the bottom, in CSS pixels, that still counts as "at bottom".
pub const SCROLL_BOTTOM_TOLERANCE_PX: f64 = 8.0;
pub const CONNECTION_LOST_NOTICE: &str =
    "The connection to the assistant was lost before it answered. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    #[serde(rename = "assistant")]
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    /// Markdown source; render through [`crate::markdown::render_markdown_html`].
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    /// `HH:MM` in the viewer's offset.
    #[must_use]
    pub fn time_label(&self, offset: FixedOffset) -> String {
        self.created_at.with_timezone(&offset).format("%H:%M").to_string()
    }

    #[must_use]
    pub fn iso_timestamp(&self) -> String {
        self.created_at.to_rfc3339()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Idle,
    Composing,
    Awaiting,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Caller must prevent the default key behavior.
    Submit,
    /// Let the input handle the key (line breaks included).
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("a response is already pending")]
    AlreadyAwaiting,
    #[error("message is empty")]
    EmptyInput,
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub smooth: bool,
}

/// Follow-the-tail policy for the message list.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoScroll {
    tolerance_px: f64,
    following: bool,
    show_jump_to_latest: bool,
    programmatic_scroll_pending: bool,
    last_scroll_top: Option<f64>,
}

impl Default for AutoScroll {
    fn default() -> Self {
        Self {
            tolerance_px: SCROLL_BOTTOM_TOLERANCE_PX,
            following: true,
            show_jump_to_latest: false,
            programmatic_scroll_pending: false,
            last_scroll_top: None,
        }
    }
}

impl AutoScroll {
    #[must_use]
    pub fn is_following(&self) -> bool {
        self.following
    }

    #[must_use]
    pub fn show_jump_to_latest(&self) -> bool {
        self.show_jump_to_latest
    }

    /// Positions reported while our own smooth scroll runs only move down.
    /// Anything else (a move up, or no known starting point) is the user
    /// taking over, and the browser has already cancelled our scroll.
    pub fn on_user_scroll(&mut self, metrics: ScrollMetrics) {
        let at_bottom = metrics.distance_from_bottom() <= self.tolerance_px;
        let moving_down = self
            .last_scroll_top
            .is_some_and(|last| metrics.scroll_top >= last);
        self.last_scroll_top = Some(metrics.scroll_top);

        if self.programmatic_scroll_pending {
            if at_bottom {
                self.programmatic_scroll_pending = false;
                return;
            }
            if moving_down {
                return;
            }
            self.programmatic_scroll_pending = false;
        }
        self.following = at_bottom;
        self.show_jump_to_latest = !at_bottom;
    }

    /// Records where a programmatic scroll starts from.
    pub fn anchor(&mut self, scroll_top: f64) {
        self.last_scroll_top = Some(scroll_top);
    }

    pub fn on_log_changed(&mut self) -> Option<ScrollRequest> {
        if self.following {
            self.programmatic_scroll_pending = true;
            Some(ScrollRequest { smooth: true })
        } else {
            self.show_jump_to_latest = true;
            None
        }
    }

    pub fn jump_to_latest(&mut self) -> ScrollRequest {
        self.following = true;
        self.show_jump_to_latest = false;
        self.programmatic_scroll_pending = true;
        ScrollRequest { smooth: true }
    }
}

/// Ordered message log plus composer state for one mounted conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    input: String,
    awaiting: bool,
    scroll: AutoScroll,
    pending_scroll: Option<ScrollRequest>,
}

impl ConversationState {
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    #[must_use]
    pub fn phase(&self) -> ConversationPhase {
        if self.awaiting {
            ConversationPhase::Awaiting
        } else if !self.input.trim().is_empty() {
            ConversationPhase::Composing
        } else if self.messages.is_empty() {
            ConversationPhase::Idle
        } else {
            ConversationPhase::Settled
        }
    }

    #[must_use]
    pub fn scroll(&self) -> &AutoScroll {
        &self.scroll
    }

    /// The affordance only makes sense once there is something to jump to.
    #[must_use]
    pub fn show_jump_to_latest(&self) -> bool {
        self.scroll.show_jump_to_latest() && !self.messages.is_empty()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Prefills the composer with an example query; never submits.
    pub fn choose_example_prompt(&mut self, index: usize) -> bool {
        let Some(prompt) = EXAMPLE_PROMPTS.get(index) else {
            return false;
        };
        self.input = (*prompt).to_string();
        true
    }

    pub fn on_user_scroll(&mut self, metrics: ScrollMetrics) {
        self.scroll.on_user_scroll(metrics);
    }

    pub fn anchor_scroll(&mut self, scroll_top: f64) {
        self.scroll.anchor(scroll_top);
    }

    pub fn jump_to_latest(&mut self) -> ScrollRequest {
        let request = self.scroll.jump_to_latest();
        self.pending_scroll = None;
        request
    }

    /// Scroll the view owes after the last log change, if any.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.pending_scroll.take()
    }

    /// Applies one channel event. Returns whether the log or indicator changed.
    pub fn ingest(&mut self, event: &ChannelEvent) -> bool {
        match event {
            ChannelEvent::Inbound(InboundPayload::Answer(content))
            | ChannelEvent::Inbound(InboundPayload::Error(content)) => {
                self.settle_with_agent_message(content.clone());
                true
            }
            ChannelEvent::Inbound(InboundPayload::Unrecognized { .. }) => false,
            ChannelEvent::TransportError(message) => {
                self.settle_with_agent_message(format!(
                    "The connection to the assistant failed: {message}"
                ));
                true
            }
            ChannelEvent::StateChanged(ConnectionState::Closed) if self.awaiting => {
                self.settle_with_agent_message(CONNECTION_LOST_NOTICE.to_string());
                true
            }
            ChannelEvent::StateChanged(_) => false,
        }
    }

    fn commit_user_message(&mut self, text: String) {
        self.push(Message::new(MessageRole::User, text));
        self.input.clear();
        self.awaiting = true;
    }

    fn settle_with_agent_message(&mut self, content: String) {
        self.push(Message::new(MessageRole::Agent, content));
        self.awaiting = false;
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        if let Some(request) = self.scroll.on_log_changed() {
            self.pending_scroll = Some(request);
        }
    }
}

/// Binds the conversation state to its channel for one mounted view.
#[derive(Debug)]
pub struct ConversationController<S> {
    state: ConversationState,
    channel: ChannelManager<S>,
}

impl<S: ChannelSink> ConversationController<S> {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            state: ConversationState::default(),
            channel: ChannelManager::new(config),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Opens the channel for `credential` unless this view already did.
    pub fn mount<E: std::fmt::Display>(
        &mut self,
        credential: &str,
        connect: impl FnOnce(&str, ConnectionId) -> Result<S, E>,
    ) -> Result<Option<ConnectionId>, ChannelError> {
        self.channel.ensure_connected(credential, connect)
    }

    pub fn handle_transport_event(&mut self, connection: ConnectionId, event: TransportEvent) -> bool {
        let events = self.channel.handle_transport_event(connection, event);
        let mut changed = false;
        for event in &events {
            changed |= self.state.ingest(event);
        }
        changed
    }

    /// Sends the composer text. Refused (nothing appended, nothing sent)
    /// while awaiting, for blank input, or while the channel is not open.
    pub fn submit(&mut self) -> Result<(), SubmitError> {
        if self.state.awaiting {
            return Err(SubmitError::AlreadyAwaiting);
        }
        if self.state.input.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        let text = self.state.input.clone();
        self.channel.send(&text)?;
        self.state.commit_user_message(text);
        Ok(())
    }

    /// Enter submits unless a response is pending; Shift+Enter and every
    /// other key keep their default behavior.
    pub fn handle_key(&mut self, key: &str, shift: bool) -> KeyAction {
        if key != "Enter" || shift || self.state.awaiting {
            return KeyAction::Passthrough;
        }
        if let Err(error) = self.submit() {
            tracing::debug!(error = %error, "submit from keyboard refused");
        }
        KeyAction::Submit
    }

    /// Releases the channel and every registration on it, and forgets the
    /// conversation.
    pub fn unmount(&mut self) {
        self.channel.shutdown();
        self.state = ConversationState::default();
    }
}
