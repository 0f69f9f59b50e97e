use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::routing::AppRoute;
use crate::session::SessionIdentity;

pub const LOCAL_LOGIN_DELAY: Duration = Duration::from_millis(2_000);
pub const POPUP_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const POPUP_WIDTH: f64 = 500.0;
pub const POPUP_HEIGHT: f64 = 700.0;
pub const POPUP_WINDOW_NAME: &str = "identity-login";
pub const AUTH_CALLBACK_MESSAGE_TYPE: &str = "ms-auth-callback";

const DEMO_EMAIL: &str = "juan.niemen@gmail.com";
const DEMO_PASSWORD: &str = "123456";
const DEMO_DISPLAY_NAME: &str = "Juan Niemen";
const DEMO_DEPARTMENT: &str = "General";

/// Display text of each variant is what the login screen shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Incorrect email address or password.")]
    InvalidCredentials,
    #[error("The browser blocked the sign-in window. Allow pop-ups and try again.")]
    PopupBlocked,
    #[error("Could not start sign-in with the identity provider.")]
    ProviderUnavailable,
    #[error("The identity provider did not return a session.")]
    MissingCredential,
    #[error("{0}")]
    Provider(String),
}

/// Checks a local email/secret pair. Stands in for a real verification call.
pub trait CredentialVerifier {
    fn verify(&self, email: &str, password: &str) -> Result<SessionIdentity, LoginError>;
}

/// Accepts exactly one configured pair and mints a fresh opaque credential on
/// each success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoCredentialVerifier {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub department: String,
}

impl Default for DemoCredentialVerifier {
    fn default() -> Self {
        Self {
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
            display_name: DEMO_DISPLAY_NAME.to_string(),
            department: DEMO_DEPARTMENT.to_string(),
        }
    }
}

impl CredentialVerifier for DemoCredentialVerifier {
    fn verify(&self, email: &str, password: &str) -> Result<SessionIdentity, LoginError> {
        if normalize_email(email) != normalize_email(&self.email) || password != self.password {
            return Err(LoginError::InvalidCredentials);
        }
        Ok(SessionIdentity {
            access_token: Uuid::new_v4().to_string(),
            name: self.display_name.clone(),
            email: normalize_email(&self.email),
            department: self.department.clone(),
        })
    }
}

#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Body of `GET <backend>/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginUrlResponse {
    pub login_url: String,
}

/// Outer geometry of the window that opens the popup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFrame {
    pub screen_x: f64,
    pub screen_y: f64,
    pub outer_width: f64,
    pub outer_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupPlacement {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl PopupPlacement {
    #[must_use]
    pub fn centered_on(frame: WindowFrame) -> Self {
        Self {
            width: POPUP_WIDTH,
            height: POPUP_HEIGHT,
            left: frame.screen_x + (frame.outer_width - POPUP_WIDTH) / 2.0,
            top: frame.screen_y + (frame.outer_height - POPUP_HEIGHT) / 2.0,
        }
    }

    /// Feature string for `window.open`.
    #[must_use]
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={},popup=yes",
            self.width.round() as i64,
            self.height.round() as i64,
            self.left.round() as i64,
            self.top.round() as i64
        )
    }
}

/// Cross-window payload posted by the backend's provider callback page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthCallbackMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl AuthCallbackMessage {
    /// `None` unless `data` is an object tagged as the auth callback.
    #[must_use]
    pub fn from_value(data: &Value) -> Option<Self> {
        let tagged = data.get("type").and_then(Value::as_str) == Some(AUTH_CALLBACK_MESSAGE_TYPE);
        if !tagged {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }

    fn into_resolution(self) -> Result<SessionIdentity, LoginError> {
        if let Some(error) = self.error.filter(|error| !error.trim().is_empty()) {
            return Err(LoginError::Provider(error));
        }
        let identity = SessionIdentity {
            access_token: self.access_token.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
        };
        if identity.is_authenticated() {
            Ok(identity)
        } else {
            Err(LoginError::MissingCredential)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FederatedAttemptId(u64);

/// The two sources racing to finish a pending popup login.
#[derive(Debug, Clone, PartialEq)]
pub enum FederatedSignal {
    Message { origin: String, data: Value },
    PopupPoll { closed: bool },
}

/// Terminal result of a popup login. Any resolution means the caller must
/// drop both the message listener and the poll timer of that attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederatedResolution {
    Authenticated(LoginSuccess),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub identity: SessionIdentity,
    pub navigate_to: AppRoute,
}

impl LoginSuccess {
    fn new(identity: SessionIdentity) -> Self {
        Self {
            identity,
            navigate_to: AppRoute::Chat,
        }
    }
}

/// Login screen state shared by both strategies. Every attempt ends with
/// either a [`LoginSuccess`] or an error string, never both.
#[derive(Debug, Clone, Default)]
pub struct LoginFlow {
    loading: bool,
    error: Option<String>,
    next_attempt: u64,
    pending_federated: Option<FederatedAttemptId>,
}

impl LoginFlow {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Starts a local login. On a match the identity is handed back while the
    /// flow stays loading; the caller waits [`LOCAL_LOGIN_DELAY`] and then
    /// calls [`LoginFlow::finish_local`]. A mismatch sets the error and stops.
    pub fn begin_local<V: CredentialVerifier>(
        &mut self,
        verifier: &V,
        email: &str,
        password: &str,
    ) -> Option<SessionIdentity> {
        if self.loading {
            return None;
        }
        self.loading = true;
        match verifier.verify(email, password) {
            Ok(identity) => {
                self.error = None;
                Some(identity)
            }
            Err(error) => {
                tracing::debug!(error = %error, "local login rejected");
                self.loading = false;
                self.error = Some(error.to_string());
                None
            }
        }
    }

    pub fn finish_local(&mut self, identity: SessionIdentity) -> LoginSuccess {
        self.loading = false;
        self.error = None;
        tracing::info!(email = %identity.email, "local login succeeded");
        LoginSuccess::new(identity)
    }

    /// Marks the login screen busy while the provider URL is fetched.
    /// Returns `false` when another attempt already holds the screen.
    pub fn begin_federated_request(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    /// The login URL request failed or returned a non-success status.
    pub fn fail_federated_start(&mut self, error: &LoginError) {
        tracing::warn!(error = %error, "federated login could not start");
        self.loading = false;
        self.error = Some(error.to_string());
    }

    /// Registers a popup attempt. A blocked popup surfaces the error
    /// immediately and yields no attempt. Starting a new attempt supersedes
    /// any earlier one still pending.
    pub fn begin_federated(&mut self, popup_opened: bool) -> Option<FederatedAttemptId> {
        if !popup_opened {
            self.fail_federated_start(&LoginError::PopupBlocked);
            return None;
        }
        self.next_attempt = self.next_attempt.saturating_add(1);
        let attempt = FederatedAttemptId(self.next_attempt);
        self.loading = true;
        self.error = None;
        self.pending_federated = Some(attempt);
        Some(attempt)
    }

    #[must_use]
    pub fn is_pending(&self, attempt: FederatedAttemptId) -> bool {
        self.pending_federated == Some(attempt)
    }

    /// Feeds one signal into a pending attempt. The first signal that
    /// resolves wins; signals for stale attempts, foreign origins, untagged
    /// payloads and open-popup polls return `None`.
    pub fn handle_federated_signal(
        &mut self,
        attempt: FederatedAttemptId,
        signal: FederatedSignal,
        config: &BackendConfig,
    ) -> Option<FederatedResolution> {
        if !self.is_pending(attempt) {
            tracing::debug!(?attempt, "signal for settled login attempt ignored");
            return None;
        }

        let resolution = match signal {
            FederatedSignal::Message { origin, data } => {
                if !config.accepts_origin(&origin) {
                    tracing::debug!(%origin, "cross-window message from foreign origin ignored");
                    return None;
                }
                let message = AuthCallbackMessage::from_value(&data)?;
                match message.into_resolution() {
                    Ok(identity) => {
                        self.error = None;
                        tracing::info!(email = %identity.email, "federated login succeeded");
                        FederatedResolution::Authenticated(LoginSuccess::new(identity))
                    }
                    Err(error) => {
                        let message = error.to_string();
                        self.error = Some(message.clone());
                        FederatedResolution::Failed(message)
                    }
                }
            }
            FederatedSignal::PopupPoll { closed: false } => return None,
            FederatedSignal::PopupPoll { closed: true } => {
                tracing::debug!("sign-in window closed without callback");
                FederatedResolution::Cancelled
            }
        };

        self.pending_federated = None;
        self.loading = false;
        Some(resolution)
    }

    /// Drops any pending popup attempt without surfacing an error.
    pub fn cancel_pending(&mut self) {
        if self.pending_federated.take().is_some() {
            self.loading = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> BackendConfig {
        BackendConfig::new("https://agent.example.org").expect("config")
    }

    #[test]
    fn demo_pair_produces_fresh_identity() {
        let verifier = DemoCredentialVerifier::default();
        let mut flow = LoginFlow::default();

        let identity = flow
            .begin_local(&verifier, "juan.niemen@gmail.com", "123456")
            .expect("accepted");
        assert!(flow.is_loading());
        assert!(identity.is_authenticated());
        assert_eq!(identity.name, "Juan Niemen");

        let success = flow.finish_local(identity.clone());
        assert_eq!(success.navigate_to, AppRoute::Chat);
        assert_eq!(success.identity, identity);
        assert!(!flow.is_loading());
        assert_eq!(flow.error(), None);
    }

    #[test]
    fn each_success_mints_a_new_credential() {
        let verifier = DemoCredentialVerifier::default();
        let first = verifier.verify("juan.niemen@gmail.com", "123456").expect("first");
        let second = verifier.verify(" Juan.Niemen@gmail.com ", "123456").expect("second");
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn wrong_pair_sets_error_without_identity() {
        let verifier = DemoCredentialVerifier::default();
        let mut flow = LoginFlow::default();

        assert!(flow.begin_local(&verifier, "juan.niemen@gmail.com", "654321").is_none());
        assert!(!flow.is_loading());
        assert_eq!(flow.error(), Some(LoginError::InvalidCredentials.to_string().as_str()));

        // No lockout: the next attempt is evaluated normally.
        assert!(flow.begin_local(&verifier, "juan.niemen@gmail.com", "123456").is_some());
    }

    #[test]
    fn popup_placement_centers_on_window() {
        let placement = PopupPlacement::centered_on(WindowFrame {
            screen_x: 100.0,
            screen_y: 50.0,
            outer_width: 1500.0,
            outer_height: 900.0,
        });
        assert_eq!(placement.left, 600.0);
        assert_eq!(placement.top, 150.0);
        assert_eq!(
            placement.features(),
            "width=500,height=700,left=600,top=150,popup=yes"
        );
    }

    #[test]
    fn provider_request_holds_the_screen_until_it_fails() {
        let mut flow = LoginFlow::default();
        assert!(flow.begin_federated_request());
        assert!(!flow.begin_federated_request());
        assert!(flow.begin_local(&DemoCredentialVerifier::default(), "a@b.c", "x").is_none());

        flow.fail_federated_start(&LoginError::ProviderUnavailable);
        assert!(!flow.is_loading());
        assert_eq!(
            flow.error(),
            Some(LoginError::ProviderUnavailable.to_string().as_str())
        );
    }

    #[test]
    fn blocked_popup_surfaces_error_immediately() {
        let mut flow = LoginFlow::default();
        assert!(flow.begin_federated(false).is_none());
        assert!(!flow.is_loading());
        assert_eq!(flow.error(), Some(LoginError::PopupBlocked.to_string().as_str()));
    }

    #[test]
    fn callback_message_adopts_identity() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");
        assert!(flow.is_loading());

        let resolution = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://agent.example.org".to_string(),
                data: json!({
                    "type": "ms-auth-callback",
                    "access_token": "jwt-abc",
                    "name": "Ana Torres",
                    "email": "ana@example.org",
                    "department": "Finance"
                }),
            },
            &config(),
        );

        let Some(FederatedResolution::Authenticated(success)) = resolution else {
            panic!("expected authenticated resolution, got {resolution:?}");
        };
        assert_eq!(success.identity.access_token, "jwt-abc");
        assert_eq!(success.identity.department, "Finance");
        assert_eq!(success.navigate_to, AppRoute::Chat);
        assert!(!flow.is_loading());
        assert!(!flow.is_pending(attempt));
    }

    #[test]
    fn callback_error_is_surfaced() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");
        let resolution = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://agent.example.org".to_string(),
                data: json!({ "type": "ms-auth-callback", "error": "consent denied" }),
            },
            &config(),
        );
        assert_eq!(
            resolution,
            Some(FederatedResolution::Failed("consent denied".to_string()))
        );
        assert_eq!(flow.error(), Some("consent denied"));
    }

    #[test]
    fn foreign_origin_and_untagged_messages_are_ignored() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");

        let foreign = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://evil.example.org".to_string(),
                data: json!({ "type": "ms-auth-callback", "access_token": "stolen" }),
            },
            &config(),
        );
        let untagged = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://agent.example.org".to_string(),
                data: json!({ "type": "other", "access_token": "x" }),
            },
            &config(),
        );

        assert_eq!(foreign, None);
        assert_eq!(untagged, None);
        assert!(flow.is_pending(attempt));
        assert!(flow.is_loading());
    }

    #[test]
    fn closed_popup_cancels_silently() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");

        assert_eq!(
            flow.handle_federated_signal(attempt, FederatedSignal::PopupPoll { closed: false }, &config()),
            None
        );
        assert_eq!(
            flow.handle_federated_signal(attempt, FederatedSignal::PopupPoll { closed: true }, &config()),
            Some(FederatedResolution::Cancelled)
        );
        assert!(!flow.is_loading());
        assert_eq!(flow.error(), None);
    }

    #[test]
    fn first_resolution_wins_the_race() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");

        let closed =
            flow.handle_federated_signal(attempt, FederatedSignal::PopupPoll { closed: true }, &config());
        assert_eq!(closed, Some(FederatedResolution::Cancelled));

        let late_message = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://agent.example.org".to_string(),
                data: json!({ "type": "ms-auth-callback", "access_token": "late" }),
            },
            &config(),
        );
        assert_eq!(late_message, None);
    }

    #[test]
    fn new_attempt_supersedes_previous() {
        let mut flow = LoginFlow::default();
        let first = flow.begin_federated(true).expect("first");
        let second = flow.begin_federated(true).expect("second");
        assert_ne!(first, second);
        assert_eq!(
            flow.handle_federated_signal(first, FederatedSignal::PopupPoll { closed: true }, &config()),
            None
        );
        assert!(flow.is_pending(second));
    }

    #[test]
    fn callback_without_token_fails() {
        let mut flow = LoginFlow::default();
        let attempt = flow.begin_federated(true).expect("attempt");
        let resolution = flow.handle_federated_signal(
            attempt,
            FederatedSignal::Message {
                origin: "https://agent.example.org".to_string(),
                data: json!({ "type": "ms-auth-callback", "name": "Ana" }),
            },
            &config(),
        );
        assert_eq!(
            resolution,
            Some(FederatedResolution::Failed(
                LoginError::MissingCredential.to_string()
            ))
        );
    }
}
