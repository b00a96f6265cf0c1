//! JSON-over-HTTPS client for the Agenda API

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{RemoteApi, RemoteError, RemoteResult};
use crate::auth::AuthToken;
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::models::{Entity, EntityId, EntityKind, Event, NoteItem, Project, TaskItem};
use crate::util::compact_text;

#[derive(Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| Error::InvalidInput(format!("Failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
        })
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/v1/{}", self.base_url, kind.collection())
    }

    fn record_url(&self, kind: EntityKind, id: &EntityId) -> String {
        format!("{}/{id}", self.collection_url(kind))
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        token: &AuthToken,
        body: Option<serde_json::Value>,
    ) -> RemoteResult<String> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token.as_str())
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| RemoteError::Unavailable(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| RemoteError::Unavailable(error.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(classify_failure(status, &text))
        }
    }
}

#[async_trait::async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn fetch_all(&self, kind: EntityKind, token: &AuthToken) -> RemoteResult<Vec<Entity>> {
        let body = self
            .send(Method::GET, self.collection_url(kind), token, None)
            .await?;
        decode_records(kind, &body)
    }

    async fn create(&self, entity: &Entity, token: &AuthToken) -> RemoteResult<()> {
        let payload = encode_record(entity)?;
        self.send(
            Method::POST,
            self.collection_url(entity.kind()),
            token,
            Some(payload),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, entity: &Entity, token: &AuthToken) -> RemoteResult<()> {
        let payload = encode_record(entity)?;
        self.send(
            Method::PUT,
            self.record_url(entity.kind(), &entity.id()),
            token,
            Some(payload),
        )
        .await?;
        Ok(())
    }

    async fn delete(
        &self,
        kind: EntityKind,
        id: &EntityId,
        token: &AuthToken,
    ) -> RemoteResult<()> {
        self.send(Method::DELETE, self.record_url(kind, id), token, None)
            .await?;
        Ok(())
    }
}

/// Records travel as the bare entity structs, without the `kind` tag.
fn encode_record(entity: &Entity) -> RemoteResult<serde_json::Value> {
    let value = match entity {
        Entity::Project(project) => serde_json::to_value(project),
        Entity::Event(event) => serde_json::to_value(event),
        Entity::Task(task) => serde_json::to_value(task),
        Entity::Note(note) => serde_json::to_value(note),
    };
    value.map_err(|error| RemoteError::Serialization(error.to_string()))
}

fn decode_records(kind: EntityKind, body: &str) -> RemoteResult<Vec<Entity>> {
    fn parse<T: DeserializeOwned + Into<Entity>>(body: &str) -> RemoteResult<Vec<Entity>> {
        let records: Vec<T> = serde_json::from_str(body)
            .map_err(|error| RemoteError::Serialization(error.to_string()))?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    match kind {
        EntityKind::Project => parse::<Project>(body),
        EntityKind::Event => parse::<Event>(body),
        EntityKind::Task => parse::<TaskItem>(body),
        EntityKind::Note => parse::<NoteItem>(body),
    }
}

fn classify_failure(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_api_error(status, body);
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        RemoteError::Unavailable(message)
    } else {
        RemoteError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}
