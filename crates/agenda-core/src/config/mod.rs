//! Engine and remote configuration.
//!
//! `EngineConfig` controls how the sync engine reconciles pulled data;
//! `RemoteConfig` points the HTTP client at the API service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const MIN_SYNC_INTERVAL_SECS: u64 = 5;

/// How the reconciler decides a pulled record is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TombstonePolicy {
    /// One delete timestamp per user. Any pulled record last modified at or
    /// before it is skipped, as is one whose own id was deleted after it.
    #[default]
    UserScoped,
    /// Only records whose own id was deleted at or after their last-modified
    /// time are skipped.
    PerEntity,
}

impl TombstonePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserScoped => "user-scoped",
            Self::PerEntity => "per-entity",
        }
    }
}

impl std::str::FromStr for TombstonePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "user-scoped" => Ok(Self::UserScoped),
            "per-entity" => Ok(Self::PerEntity),
            other => Err(format!(
                "unknown tombstone policy '{other}' (expected user-scoped or per-entity)"
            )),
        }
    }
}

/// Sync engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub tombstone_policy: TombstonePolicy,
    /// Periodic sync interval; `None` means manual sync only.
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tombstone_policy: TombstonePolicy::default(),
            sync_interval_secs: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Set the tombstone policy
    #[must_use]
    pub const fn with_tombstone_policy(mut self, policy: TombstonePolicy) -> Self {
        self.tombstone_policy = policy;
        self
    }

    /// Enable periodic sync every `interval`
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval_secs = Some(interval.as_secs());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(interval) = self.sync_interval_secs {
            if interval < MIN_SYNC_INTERVAL_SECS {
                return Err(Error::InvalidInput(format!(
                    "sync_interval_secs must be at least {MIN_SYNC_INTERVAL_SECS}"
                )));
            }
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs.map(Duration::from_secs)
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Remote API location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    base_url: String,
    timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Trim, require an http(s) scheme, and strip trailing slashes.
pub fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
