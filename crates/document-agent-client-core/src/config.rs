pub const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:8000";
pub const ENV_BACKEND_BASE_URL: &str = "DOCUMENT_AGENT_BACKEND_URL";
pub const LOGIN_URL_PATH: &str = "/login";
pub const CHAT_SOCKET_PATH: &str = "/ws/chat";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("backend url must not be empty")]
    EmptyBaseUrl,
    #[error("backend url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

/// The single backend base URL and everything derived from it: the HTTP
/// login endpoint, the chat socket URL, and the origin accepted for
/// cross-window auth callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
}

impl BackendConfig {
    pub fn new(raw_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(raw_base_url)?,
        })
    }

    /// Environment first, then the local default. Returns the source label
    /// alongside the config.
    pub fn from_env() -> Result<(Self, &'static str), ConfigError> {
        if let Some(base_url) = env_non_empty(ENV_BACKEND_BASE_URL) {
            return Self::new(&base_url).map(|config| (config, ENV_BACKEND_BASE_URL));
        }
        Self::new(DEFAULT_BACKEND_BASE_URL).map(|config| (config, "default_local"))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn login_endpoint(&self) -> String {
        format!("{}{LOGIN_URL_PATH}", self.base_url)
    }

    #[must_use]
    pub fn chat_socket_url(&self, token: &str) -> String {
        let (scheme, remainder) = self
            .base_url
            .split_once("://")
            .unwrap_or(("http", self.base_url.as_str()));
        let ws_scheme = if scheme == "https" { "wss" } else { "ws" };
        format!(
            "{ws_scheme}://{remainder}{CHAT_SOCKET_PATH}?token={}",
            urlencoding::encode(token)
        )
    }

    /// `scheme://host[:port]`, as browsers report `MessageEvent.origin`.
    #[must_use]
    pub fn origin(&self) -> String {
        let Some((scheme, remainder)) = self.base_url.split_once("://") else {
            return self.base_url.clone();
        };
        let authority = remainder.split('/').next().unwrap_or(remainder);
        format!("{scheme}://{}", authority.to_ascii_lowercase())
    }

    #[must_use]
    pub fn accepts_origin(&self, origin: &str) -> bool {
        origin.trim().trim_end_matches('/').eq_ignore_ascii_case(&self.origin())
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}
