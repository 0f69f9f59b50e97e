use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::obfuscation::{decrypt, encrypt};

pub const SESSION_STORAGE_KEY: &str = "document-agent-user";

/// The authenticated user. A non-empty `access_token` is the only signal for
/// "logged in"; every other field is display data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: String,
}

impl SessionIdentity {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// First letter of the display name, upper-cased, for the avatar badge.
    #[must_use]
    pub fn avatar_initial(&self) -> Option<String> {
        self.name
            .trim()
            .chars()
            .next()
            .map(|initial| initial.to_uppercase().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionStoreError {
    #[error("failed to serialize session identity: {0}")]
    Serialize(String),
    #[error("session storage write failed: {0}")]
    Storage(String),
}

/// Synchronous string key/value storage, shaped after `window.localStorage`.
pub trait KeyValueStore {
    type Error: Display;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;
    fn remove_item(&mut self, key: &str) -> Result<(), Self::Error>;
}

/// In-process store used on native targets and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn with_item(key: &str, value: &str) -> Self {
        let mut items = BTreeMap::new();
        items.insert(key.to_string(), value.to_string());
        Self { items }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), Self::Error> {
        self.items.remove(key);
        Ok(())
    }
}

pub fn encode_session_record(identity: &SessionIdentity) -> Result<String, SessionStoreError> {
    let serialized = serde_json::to_string(identity)
        .map_err(|error| SessionStoreError::Serialize(error.to_string()))?;
    Ok(encrypt(&serialized))
}

/// Any failure (bad encoding, bad JSON, missing credential) reads as "no
/// session".
#[must_use]
pub fn decode_session_record(raw: &str) -> Option<SessionIdentity> {
    let decrypted = decrypt(raw)?;
    let identity: SessionIdentity = serde_json::from_str(&decrypted).ok()?;
    identity.is_authenticated().then_some(identity)
}

/// Owns the session identity for one browser context and mirrors it into
/// storage. [`SessionHolder::set_identity`] is the only mutation path.
#[derive(Debug)]
pub struct SessionHolder<S> {
    store: S,
    identity: SessionIdentity,
}

impl<S: KeyValueStore> SessionHolder<S> {
    pub fn rehydrate(store: S) -> Self {
        let identity = match store.get_item(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => decode_session_record(&raw).unwrap_or_else(|| {
                tracing::debug!("stored session record unreadable; starting logged out");
                SessionIdentity::default()
            }),
            Ok(None) => SessionIdentity::default(),
            Err(error) => {
                tracing::warn!(error = %error, "session storage read failed; starting logged out");
                SessionIdentity::default()
            }
        };
        if identity.is_authenticated() {
            tracing::info!(email = %identity.email, "session rehydrated from storage");
        }
        Self { store, identity }
    }

    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.identity.is_authenticated()
    }

    /// Replaces the identity and syncs storage: a record is written only for
    /// an authenticated identity, otherwise the key is removed. The in-memory
    /// identity is updated even when the write fails.
    pub fn set_identity(&mut self, identity: SessionIdentity) -> Result<(), SessionStoreError> {
        self.identity = identity;
        if self.identity.is_authenticated() {
            let record = encode_session_record(&self.identity)?;
            self.store
                .set_item(SESSION_STORAGE_KEY, &record)
                .map_err(|error| SessionStoreError::Storage(error.to_string()))
        } else {
            self.store
                .remove_item(SESSION_STORAGE_KEY)
                .map_err(|error| SessionStoreError::Storage(error.to_string()))
        }
    }

    pub fn logout(&mut self) -> Result<(), SessionStoreError> {
        tracing::info!("session cleared");
        self.set_identity(SessionIdentity::default())
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            access_token: "token-1".to_string(),
            name: "ana torres".to_string(),
            email: "ana@example.org".to_string(),
            department: "Finance".to_string(),
        }
    }

    #[test]
    fn rehydrate_without_record_is_logged_out() {
        let holder = SessionHolder::rehydrate(MemoryStore::default());
        assert!(!holder.is_logged_in());
        assert_eq!(holder.identity(), &SessionIdentity::default());
    }

    #[test]
    fn rehydrate_restores_persisted_identity() {
        let record = encode_session_record(&identity()).expect("encode");
        let holder = SessionHolder::rehydrate(MemoryStore::with_item(SESSION_STORAGE_KEY, &record));
        assert!(holder.is_logged_in());
        assert_eq!(holder.identity(), &identity());
    }

    #[test]
    fn rehydrate_from_corrupt_record_is_logged_out() {
        let records = [
            "not base64 !!".to_string(),
            encrypt("{ not json"),
            encrypt("[1,2,3]"),
        ];
        for raw in &records {
            let holder = SessionHolder::rehydrate(MemoryStore::with_item(SESSION_STORAGE_KEY, raw));
            assert!(!holder.is_logged_in(), "record {raw:?} should not log in");
        }
    }

    #[test]
    fn rehydrate_rejects_record_without_credential() {
        let raw = encrypt(r#"{"name":"Ana","email":"ana@example.org"}"#);
        let holder = SessionHolder::rehydrate(MemoryStore::with_item(SESSION_STORAGE_KEY, &raw));
        assert!(!holder.is_logged_in());
    }

    #[test]
    fn set_identity_persists_obfuscated_record() {
        let mut holder = SessionHolder::rehydrate(MemoryStore::default());
        holder.set_identity(identity()).expect("persist");

        let raw = holder
            .store()
            .get_item(SESSION_STORAGE_KEY)
            .expect("infallible")
            .expect("record written");
        assert!(!raw.contains("ana@example.org"));
        assert_eq!(decode_session_record(&raw), Some(identity()));
    }

    #[test]
    fn empty_credential_removes_stored_key() {
        let mut holder = SessionHolder::rehydrate(MemoryStore::default());
        holder.set_identity(identity()).expect("persist");
        assert!(holder.store().contains_key(SESSION_STORAGE_KEY));

        holder
            .set_identity(SessionIdentity {
                access_token: String::new(),
                ..identity()
            })
            .expect("clear");
        assert!(!holder.store().contains_key(SESSION_STORAGE_KEY));
        assert!(holder.store().is_empty());
    }

    #[test]
    fn logout_resets_fields_and_storage() {
        let mut holder = SessionHolder::rehydrate(MemoryStore::default());
        holder.set_identity(identity()).expect("persist");
        holder.logout().expect("logout");
        assert_eq!(holder.identity(), &SessionIdentity::default());
        assert!(holder.store().is_empty());
    }

    #[test]
    fn avatar_initial_uses_first_letter() {
        assert_eq!(identity().avatar_initial().as_deref(), Some("A"));
        assert_eq!(SessionIdentity::default().avatar_initial(), None);
    }

    quickcheck! {
        fn record_round_trips_for_any_authenticated_identity(
            token: String,
            name: String,
            email: String,
            department: String
        ) -> bool {
            let identity = SessionIdentity { access_token: token, name, email, department };
            let serialized = serde_json::to_string(&identity).unwrap_or_default();
            if decrypt(&encrypt(&serialized)).as_deref() != Some(serialized.as_str()) {
                return false;
            }
            let decoded = encode_session_record(&identity).ok().and_then(|raw| decode_session_record(&raw));
            if identity.is_authenticated() {
                decoded == Some(identity)
            } else {
                decoded.is_none()
            }
        }
    }
}
