//! Remote API: stateless request/response calls keyed by an auth token.

mod http;
mod memory;

use thiserror::Error;

use crate::auth::AuthToken;
use crate::models::{Entity, EntityId, EntityKind};

pub use http::HttpRemoteApi;
pub use memory::{MemoryRemote, RemoteCall};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport failure, timeout, or a server-side outage
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
    /// The server understood the request and refused it
    #[error("Remote rejected request: {message} ({status})")]
    Rejected { status: u16, message: String },
    /// The payload did not match the expected shape
    #[error("Remote payload error: {0}")]
    Serialization(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// The server-side API for one user's entities.
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    /// Full snapshot of one kind for the token's user
    async fn fetch_all(&self, kind: EntityKind, token: &AuthToken) -> RemoteResult<Vec<Entity>>;

    async fn create(&self, entity: &Entity, token: &AuthToken) -> RemoteResult<()>;

    async fn update(&self, entity: &Entity, token: &AuthToken) -> RemoteResult<()>;

    async fn delete(&self, kind: EntityKind, id: &EntityId, token: &AuthToken)
        -> RemoteResult<()>;
}

/// Remote used when no API base URL is configured; every call is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

const NOT_CONFIGURED: &str = "remote sync is not configured";

#[async_trait::async_trait]
impl RemoteApi for Disconnected {
    async fn fetch_all(&self, _kind: EntityKind, _token: &AuthToken) -> RemoteResult<Vec<Entity>> {
        Err(RemoteError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn create(&self, _entity: &Entity, _token: &AuthToken) -> RemoteResult<()> {
        Err(RemoteError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn update(&self, _entity: &Entity, _token: &AuthToken) -> RemoteResult<()> {
        Err(RemoteError::Unavailable(NOT_CONFIGURED.to_string()))
    }

    async fn delete(
        &self,
        _kind: EntityKind,
        _id: &EntityId,
        _token: &AuthToken,
    ) -> RemoteResult<()> {
        Err(RemoteError::Unavailable(NOT_CONFIGURED.to_string()))
    }
}
