use std::cell::RefCell;
use std::rc::Rc;

use document_agent_client_core::login::LOCAL_LOGIN_DELAY;
use document_agent_client_core::session::SESSION_STORAGE_KEY;
use document_agent_client_core::{
    AppRoute, BackendConfig, ChannelSink, ConnectionState, ConversationController,
    DemoCredentialVerifier, FederatedResolution, FederatedSignal, LoginFlow, MemoryStore,
    MessageRole, SessionHolder, TransportEvent, resolve_route,
};
use serde_json::json;

#[derive(Debug, Default, Clone)]
struct SharedSink {
    sent: Rc<RefCell<Vec<String>>>,
    closed: Rc<RefCell<bool>>,
}

impl ChannelSink for SharedSink {
    type Error = String;

    fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
        self.sent.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

fn config() -> BackendConfig {
    BackendConfig::new("http://127.0.0.1:8000/").expect("config")
}

#[test]
fn local_login_chat_round_trip_and_logout() {
    let mut session = SessionHolder::rehydrate(MemoryStore::default());
    assert_eq!(
        resolve_route(AppRoute::Chat, session.is_logged_in()),
        (AppRoute::Login, true)
    );

    let mut flow = LoginFlow::default();
    let verifier = DemoCredentialVerifier::default();
    let identity = flow
        .begin_local(&verifier, " Juan.Niemen@gmail.com ", "123456")
        .expect("demo credentials accepted");
    assert!(flow.is_loading());
    assert_eq!(LOCAL_LOGIN_DELAY.as_millis(), 2_000);

    let success = flow.finish_local(identity);
    session
        .set_identity(success.identity.clone())
        .expect("persist session");
    assert_eq!(
        resolve_route(success.navigate_to, session.is_logged_in()),
        (AppRoute::Chat, false)
    );

    // A reload restores the same identity from storage.
    let reloaded = SessionHolder::rehydrate(session.store().clone());
    assert_eq!(reloaded.identity(), session.identity());

    let sink = SharedSink::default();
    let mut controller = ConversationController::new(config());
    let mut dialed = String::new();
    let handle = sink.clone();
    let connection = controller
        .mount(&session.identity().access_token, |url, _| {
            dialed = url.to_string();
            Ok::<_, String>(handle)
        })
        .expect("mount")
        .expect("new connection");
    assert!(dialed.starts_with("ws://127.0.0.1:8000/ws/chat?token="));

    controller.handle_transport_event(connection, TransportEvent::Opened);
    assert_eq!(controller.connection_state(), ConnectionState::Open);

    controller
        .state_mut()
        .set_input("Summarize the strategic plan");
    controller.submit().expect("submit");
    controller.handle_transport_event(
        connection,
        TransportEvent::Frame(json!({"type": "answer", "content": "**Three** goals."}).to_string()),
    );

    let roles: Vec<MessageRole> = controller
        .state()
        .messages()
        .iter()
        .map(|message| message.role)
        .collect();
    assert_eq!(roles, [MessageRole::User, MessageRole::Agent]);
    assert_eq!(
        sink.sent.borrow().as_slice(),
        ["Summarize the strategic plan".to_string()]
    );

    controller.unmount();
    assert!(*sink.closed.borrow());

    session.logout().expect("logout");
    assert!(!session.store().contains_key(SESSION_STORAGE_KEY));
    assert_eq!(
        resolve_route(AppRoute::Chat, session.is_logged_in()),
        (AppRoute::Login, true)
    );
}

#[test]
fn federated_login_persists_identity_from_callback() {
    let mut session = SessionHolder::rehydrate(MemoryStore::default());
    let mut flow = LoginFlow::default();
    let attempt = flow.begin_federated(true).expect("popup opened");

    let resolution = flow.handle_federated_signal(
        attempt,
        FederatedSignal::Message {
            origin: "http://127.0.0.1:8000".to_string(),
            data: json!({
                "type": "ms-auth-callback",
                "access_token": "provider-token",
                "name": "Marta",
                "email": "marta@example.org",
                "department": "Operations"
            }),
        },
        &config(),
    );
    let Some(FederatedResolution::Authenticated(success)) = resolution else {
        panic!("expected authenticated resolution, got {resolution:?}");
    };
    session.set_identity(success.identity).expect("persist");

    // The popup closing afterwards must not undo the login.
    assert_eq!(
        flow.handle_federated_signal(attempt, FederatedSignal::PopupPoll { closed: true }, &config()),
        None
    );
    assert!(session.is_logged_in());
    assert_eq!(session.identity().department, "Operations");
    assert!(session.store().contains_key(SESSION_STORAGE_KEY));
}
