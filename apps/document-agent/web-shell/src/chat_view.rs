use chrono::{FixedOffset, Offset, Utc};
use document_agent_client_core::conversation::EXAMPLE_PROMPTS;
use document_agent_client_core::markdown::render_markdown_html;
use document_agent_client_core::{
    ConnectionState, ConversationState, LoginFlow, MessageRole, SessionIdentity,
};
use serde::Serialize;

pub const THINKING_LABEL: &str = "Analyzing…";
pub const WELCOME_TITLE: &str = "How can I help you?";
pub const WELCOME_BODY: &str = "Type your question or tell me which document you want to analyze.";
pub const LOGIN_SUBMIT_LABEL: &str = "Sign in";
pub const LOGIN_SUBMIT_BUSY_LABEL: &str = "Signing in…";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRow {
    pub id: String,
    pub role_class: &'static str,
    pub aria_label: &'static str,
    /// Sanitized HTML for the bubble body.
    pub html: String,
    pub time_label: String,
    pub datetime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserBadge {
    pub initial: String,
    pub name: String,
    pub email: String,
    pub department: String,
}

impl UserBadge {
    fn from_identity(identity: &SessionIdentity) -> Self {
        Self {
            initial: identity.avatar_initial().unwrap_or_default(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            department: identity.department.clone(),
        }
    }
}

/// Everything the conversation screen paints, derived in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatView {
    pub connection: &'static str,
    pub status_label: &'static str,
    pub show_welcome: bool,
    pub example_prompts: Vec<&'static str>,
    pub messages: Vec<MessageRow>,
    pub show_thinking: bool,
    pub input: String,
    pub send_enabled: bool,
    pub show_jump_to_latest: bool,
    pub user: UserBadge,
}

impl ChatView {
    pub fn build(
        state: &ConversationState,
        connection: ConnectionState,
        identity: &SessionIdentity,
        offset: FixedOffset,
    ) -> Self {
        let messages = state
            .messages()
            .iter()
            .map(|message| {
                let (role_class, aria_label) = match message.role {
                    MessageRole::User => ("user", "Your message"),
                    MessageRole::Agent => ("assistant", "Agent response"),
                };
                MessageRow {
                    id: message.id.clone(),
                    role_class,
                    aria_label,
                    html: render_markdown_html(&message.content),
                    time_label: message.time_label(offset),
                    datetime: message.iso_timestamp(),
                }
            })
            .collect::<Vec<_>>();

        Self {
            connection: connection.as_str(),
            status_label: status_label(connection),
            show_welcome: messages.is_empty(),
            example_prompts: EXAMPLE_PROMPTS.to_vec(),
            messages,
            show_thinking: state.is_awaiting(),
            input: state.input().to_string(),
            send_enabled: can_send(state, connection),
            show_jump_to_latest: state.show_jump_to_latest(),
            user: UserBadge::from_identity(identity),
        }
    }
}

pub fn status_label(connection: ConnectionState) -> &'static str {
    match connection {
        ConnectionState::Connecting => "Connecting…",
        ConnectionState::Open => "Online",
        ConnectionState::Closed => "Offline",
    }
}

pub fn can_send(state: &ConversationState, connection: ConnectionState) -> bool {
    connection == ConnectionState::Open && !state.is_awaiting() && !state.input().trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginView {
    pub loading: bool,
    pub error: Option<String>,
    pub submit_label: &'static str,
}

impl LoginView {
    pub fn build(flow: &LoginFlow) -> Self {
        Self {
            loading: flow.is_loading(),
            error: flow.error().map(ToString::to_string),
            submit_label: if flow.is_loading() {
                LOGIN_SUBMIT_BUSY_LABEL
            } else {
                LOGIN_SUBMIT_LABEL
            },
        }
    }
}

/// Converts `Date.getTimezoneOffset()` minutes (positive west of UTC) into
/// a chrono offset; out-of-range values fall back to UTC.
pub fn offset_from_js_minutes(minutes: f64) -> FixedOffset {
    let seconds = if minutes.is_finite() {
        (minutes * 60.0).round() as i32
    } else {
        0
    };
    FixedOffset::west_opt(seconds).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_agent_client_core::DemoCredentialVerifier;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            access_token: "token".to_string(),
            name: "marta".to_string(),
            email: "marta@example.org".to_string(),
            department: "Operations".to_string(),
        }
    }

    fn utc() -> FixedOffset {
        offset_from_js_minutes(0.0)
    }

    #[test]
    fn empty_conversation_shows_welcome_and_prompts() {
        let view = ChatView::build(
            &ConversationState::default(),
            ConnectionState::Connecting,
            &identity(),
            utc(),
        );
        assert!(view.show_welcome);
        assert_eq!(view.example_prompts.len(), 3);
        assert_eq!(view.status_label, "Connecting…");
        assert!(!view.send_enabled);
        assert!(!view.show_jump_to_latest);
        assert_eq!(view.user.initial, "M");
    }

    #[test]
    fn send_requires_open_channel_and_text() {
        let mut state = ConversationState::default();
        assert!(!can_send(&state, ConnectionState::Open));
        state.set_input("hello");
        assert!(can_send(&state, ConnectionState::Open));
        assert!(!can_send(&state, ConnectionState::Closed));
    }

    #[test]
    fn prefilled_prompt_enables_send() {
        let mut state = ConversationState::default();
        assert!(state.choose_example_prompt(0));
        let view = ChatView::build(&state, ConnectionState::Open, &identity(), utc());
        assert_eq!(view.input, EXAMPLE_PROMPTS[0]);
        assert!(view.send_enabled);
        assert!(view.show_welcome);
    }

    #[test]
    fn js_offsets_map_to_chrono() {
        assert_eq!(offset_from_js_minutes(-60.0).local_minus_utc(), 3600);
        assert_eq!(offset_from_js_minutes(300.0).local_minus_utc(), -18_000);
        assert_eq!(offset_from_js_minutes(f64::NAN).local_minus_utc(), 0);
        assert_eq!(offset_from_js_minutes(1.0e9).local_minus_utc(), 0);
    }

    #[test]
    fn login_view_tracks_flow() {
        let mut flow = LoginFlow::default();
        assert_eq!(LoginView::build(&flow).submit_label, LOGIN_SUBMIT_LABEL);

        let verifier = DemoCredentialVerifier::default();
        assert!(flow.begin_local(&verifier, "nobody@example.org", "nope").is_none());
        let view = LoginView::build(&flow);
        assert!(!view.loading);
        assert!(view.error.is_some());

        assert!(flow
            .begin_local(&verifier, "juan.niemen@gmail.com", "123456")
            .is_some());
        let view = LoginView::build(&flow);
        assert!(view.loading);
        assert_eq!(view.submit_label, LOGIN_SUBMIT_BUSY_LABEL);
    }
}
