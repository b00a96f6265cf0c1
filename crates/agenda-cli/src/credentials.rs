//! CLI API token storage with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use agenda_core::auth::{
    AuthToken, CredentialError, CredentialResult, PersistedCredentials, TokenPersistence,
};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "agenda-cli";

/// Environment variable that overrides the stored token (for scripting)
pub const TOKEN_ENV_VAR: &str = "AGENDA_TOKEN";

#[derive(Clone)]
pub struct KeyringTokenStore {
    username: String,
}

impl KeyringTokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("api_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> CredentialResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CredentialError::SecureStorage(error.to_string()))
    }
}

impl TokenPersistence for KeyringTokenStore {
    #[cfg(not(test))]
    fn load_token(&self) -> CredentialResult<Option<String>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CredentialError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_token(&self) -> CredentialResult<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CredentialError::SecureStorage(error.to_string()))?;
        Ok(guard.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    fn save_token(&self, token: &str) -> CredentialResult<()> {
        self.entry()?
            .set_password(token)
            .map_err(|error| CredentialError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_token(&self, token: &str) -> CredentialResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CredentialError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_token(&self) -> CredentialResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CredentialError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_token(&self) -> CredentialResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CredentialError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

pub type ProfileCredentials = PersistedCredentials<KeyringTokenStore>;

/// Credentials for a profile: `AGENDA_TOKEN` wins over the keychain.
pub fn profile_credentials(profile_name: &str) -> ProfileCredentials {
    let override_token = std::env::var(TOKEN_ENV_VAR).ok().and_then(AuthToken::new);
    PersistedCredentials::new(KeyringTokenStore::new(profile_name), override_token)
}

/// Credentials that only look at the keychain
pub fn stored_credentials(profile_name: &str) -> ProfileCredentials {
    PersistedCredentials::new(KeyringTokenStore::new(profile_name), None)
}
