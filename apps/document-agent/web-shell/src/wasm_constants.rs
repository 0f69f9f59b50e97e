pub(crate) const BACKEND_URL_GLOBAL: &str = "__DOCUMENT_AGENT_BACKEND_URL__";
pub(crate) const APP_TITLE: &str = "Document Agent";
pub(crate) const APP_SUBTITLE: &str = "Intelligent documentation assistant";
pub(crate) const LOGIN_SUBTITLE: &str = "Sign in to continue";
pub(crate) const LOGIN_HINT: &str = "Intelligent documentation assistant for Cooperativa Barcelona.";
pub(crate) const FEDERATED_BUTTON_LABEL: &str = "Sign in with Microsoft";
pub(crate) const LOGOUT_LABEL: &str = "Sign out";
pub(crate) const COMPOSER_PLACEHOLDER: &str = "Ask about your documents…";

pub(crate) const SHELL_STATUS_ID: &str = "document-agent-shell-status";
pub(crate) const SHELL_ROOT_ID: &str = "document-agent-shell";
pub(crate) const LOGIN_PANEL_ID: &str = "document-agent-login";
pub(crate) const LOGIN_FORM_ID: &str = "document-agent-login-form";
pub(crate) const LOGIN_EMAIL_ID: &str = "document-agent-login-email";
pub(crate) const LOGIN_PASSWORD_ID: &str = "document-agent-login-password";
pub(crate) const LOGIN_SUBMIT_ID: &str = "document-agent-login-submit";
pub(crate) const LOGIN_FEDERATED_ID: &str = "document-agent-login-federated";
pub(crate) const LOGIN_ERROR_ID: &str = "document-agent-login-error";
pub(crate) const CHAT_PANEL_ID: &str = "document-agent-chat";
pub(crate) const CHAT_STATUS_ID: &str = "document-agent-chat-status";
pub(crate) const CHAT_AVATAR_ID: &str = "document-agent-chat-avatar";
pub(crate) const CHAT_USER_MENU_ID: &str = "document-agent-chat-user-menu";
pub(crate) const CHAT_USER_NAME_ID: &str = "document-agent-chat-user-name";
pub(crate) const CHAT_USER_EMAIL_ID: &str = "document-agent-chat-user-email";
pub(crate) const CHAT_USER_DEPARTMENT_ID: &str = "document-agent-chat-user-department";
pub(crate) const CHAT_LOGOUT_ID: &str = "document-agent-chat-logout";
pub(crate) const CHAT_MESSAGES_ID: &str = "document-agent-chat-messages";
pub(crate) const CHAT_WELCOME_ID: &str = "document-agent-chat-welcome";
pub(crate) const CHAT_LOG_ID: &str = "document-agent-chat-log";
pub(crate) const CHAT_JUMP_ID: &str = "document-agent-chat-jump";
pub(crate) const CHAT_COMPOSER_ID: &str = "document-agent-chat-composer";
pub(crate) const CHAT_INPUT_ID: &str = "document-agent-chat-input";
pub(crate) const CHAT_SEND_ID: &str = "document-agent-chat-send";
pub(crate) const CHAT_PROMPT_IDS: [&str; 3] = [
    "document-agent-chat-prompt-0",
    "document-agent-chat-prompt-1",
    "document-agent-chat-prompt-2",
];
