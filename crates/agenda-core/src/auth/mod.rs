//! Per-user credentials consumed by the sync engine.
//!
//! Login flows live outside this crate; all the engine needs is an opaque
//! token for the current user, or nothing when signed out.

use std::fmt;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::util::normalize_text_option;

/// Opaque per-user API token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    /// Build a token, rejecting blank values.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        normalize_text_option(Some(raw.into())).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AuthToken([REDACTED])")
    }
}

/// Supplies the current user's token.
pub trait CredentialProvider: Send + Sync {
    /// `None` means unauthenticated: uploads are skipped and syncs fail.
    fn current_token(&self) -> Option<AuthToken>;
}

/// In-memory credentials that can be swapped at runtime (sign in / sign out).
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Arc<RwLock<Option<AuthToken>>>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(token: Option<AuthToken>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    #[must_use]
    pub fn signed_in(raw: impl Into<String>) -> Self {
        Self::new(AuthToken::new(raw))
    }

    pub fn set(&self, token: Option<AuthToken>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn current_token(&self) -> Option<AuthToken> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Durable home for a token (OS keychain, test map, ...).
pub trait TokenPersistence: Send + Sync + 'static {
    fn load_token(&self) -> CredentialResult<Option<String>>;
    fn save_token(&self, token: &str) -> CredentialResult<()>;
    fn clear_token(&self) -> CredentialResult<()>;
}

/// Credentials read from a [`TokenPersistence`] backend, with an optional
/// override that wins when present (e.g. an environment variable).
pub struct PersistedCredentials<S: TokenPersistence> {
    store: S,
    override_token: Option<AuthToken>,
}

impl<S: TokenPersistence> PersistedCredentials<S> {
    pub const fn new(store: S, override_token: Option<AuthToken>) -> Self {
        Self {
            store,
            override_token,
        }
    }

    pub fn sign_in(&self, raw: &str) -> CredentialResult<AuthToken> {
        let token = AuthToken::new(raw).ok_or_else(|| {
            CredentialError::SecureStorage("token must not be empty".to_string())
        })?;
        self.store.save_token(token.as_str())?;
        Ok(token)
    }

    pub fn sign_out(&self) -> CredentialResult<()> {
        self.store.clear_token()
    }

    pub fn stored_token(&self) -> CredentialResult<Option<AuthToken>> {
        Ok(self.store.load_token()?.and_then(AuthToken::new))
    }
}

impl<S: TokenPersistence> CredentialProvider for PersistedCredentials<S> {
    fn current_token(&self) -> Option<AuthToken> {
        if let Some(token) = &self.override_token {
            return Some(token.clone());
        }
        match self.stored_token() {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!("Failed to read stored token: {error}");
                None
            }
        }
    }
}
