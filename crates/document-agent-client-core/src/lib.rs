//! Platform-neutral client core for the document agent: session persistence,
//! route guards, login flows, the live chat channel, and conversation state.
//! The browser shell drives these state machines; nothing here touches the DOM.

pub mod channel;
pub mod config;
pub mod conversation;
pub mod login;
pub mod markdown;
pub mod obfuscation;
pub mod routing;
pub mod session;

pub use channel::{
    ChannelError, ChannelEvent, ChannelManager, ChannelSink, ConnectionId, ConnectionState,
    InboundPayload, SubscriptionId, TransportEvent,
};
pub use config::{BackendConfig, ConfigError};
pub use conversation::{
    ConversationController, ConversationPhase, ConversationState, KeyAction, Message, MessageRole,
    ScrollMetrics, ScrollRequest, SubmitError,
};
pub use login::{
    CredentialVerifier, DemoCredentialVerifier, FederatedAttemptId, FederatedResolution,
    FederatedSignal, LoginError, LoginFlow, LoginSuccess,
};
pub use routing::{AppRoute, GuardOutcome, RouteGuard, resolve_route};
pub use session::{KeyValueStore, MemoryStore, SessionHolder, SessionIdentity};
