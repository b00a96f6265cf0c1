use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agenda_core::db::Database;
use agenda_core::models::SyncConflict;
use agenda_core::remote::{Disconnected, HttpRemoteApi, RemoteApi};
use agenda_core::{Entity, EntityId, EntityKind, RemoteConfig, SyncEngine};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config_profiles::CliProfilesConfig;
use crate::credentials::profile_credentials;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct EntityListItem {
    pub id: String,
    pub kind: EntityKind,
    pub label: String,
    pub detail: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub record: Entity,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub kind: EntityKind,
    pub entity_id: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("AGENDA_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("agenda").join("agenda.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

/// Open the local database and build the sync engine for a profile.
pub fn open_engine(db_path: &Path, profile: Option<&str>) -> Result<SyncEngine, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let engine_config = profile.engine_config();

    let remote: Arc<dyn RemoteApi> = if let Some(base_url) = profile.api_base_url() {
        let remote_config = RemoteConfig::new(base_url, engine_config.http_timeout())?;
        tracing::debug!("Using API {} for profile '{profile_name}'", remote_config.base_url());
        Arc::new(HttpRemoteApi::new(&remote_config)?)
    } else {
        tracing::debug!("Profile '{profile_name}' has no API base URL; running local-only");
        Arc::new(Disconnected)
    };

    let db = Arc::new(Database::open(db_path)?);
    Ok(SyncEngine::with_database(
        engine_config,
        db,
        remote,
        Arc::new(profile_credentials(&profile_name)),
    )?)
}

/// Resolve a full id or a unique id prefix to a stored entity.
pub fn resolve_entity(
    engine: &SyncEngine,
    kind: EntityKind,
    query: &str,
) -> Result<Entity, CliError> {
    let query = normalize_identifier(query)?;
    let store = engine.store();

    if let Ok(id) = query.parse::<EntityId>() {
        if let Some(entity) = store.get(kind, &id)? {
            return Ok(entity);
        }
    }

    let matching_ids = store.find_ids_by_prefix(kind, &query, 3)?;
    match matching_ids.as_slice() {
        [] => Err(CliError::NotFound(kind.as_str(), query)),
        [id] => store
            .get(kind, id)?
            .ok_or_else(|| CliError::NotFound(kind.as_str(), query.clone())),
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| id.to_string().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn resolve_entity_id(
    engine: &SyncEngine,
    kind: EntityKind,
    query: Option<&str>,
) -> Result<Option<EntityId>, CliError> {
    query
        .map(|query| resolve_entity(engine, kind, query).map(|entity| entity.id()))
        .transpose()
}

pub fn normalize_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn required_text(parts: &[String], what: &'static str) -> Result<String, CliError> {
    normalize_content(&parts.join(" ")).ok_or(CliError::EmptyInput(what))
}

/// Note body from `--content`, else piped stdin, else empty.
pub fn resolve_note_content(content: Option<String>) -> Result<String, CliError> {
    if let Some(content) = content.as_deref().and_then(normalize_content) {
        return Ok(content);
    }
    Ok(read_piped_stdin()?.unwrap_or_default())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Parse an RFC 3339 time into Unix milliseconds
pub fn parse_timestamp(raw: &str) -> Result<i64, CliError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date_time| date_time.timestamp_millis())
        .map_err(|_| CliError::InvalidTimestamp(raw.to_string()))
}

pub fn short_id(id: &EntityId) -> String {
    id.to_string().chars().take(13).collect()
}

fn entity_label(entity: &Entity) -> String {
    match entity {
        Entity::Project(project) => project.name.clone(),
        Entity::Event(event) => event.title.clone(),
        Entity::Task(task) => task.title.clone(),
        Entity::Note(note) => note.title.clone(),
    }
}

fn entity_detail(entity: &Entity) -> String {
    match entity {
        Entity::Project(_) => String::new(),
        Entity::Event(event) => format!(
            "{} -> {} [{}]",
            format_sync_timestamp(event.start_at),
            format_sync_timestamp(event.end_at),
            event.status.as_str()
        ),
        Entity::Task(task) => task.due_at.map_or_else(
            || format!("[{}]", task.status.as_str()),
            |due| format!("[{}] due {}", task.status.as_str(), format_sync_timestamp(due)),
        ),
        Entity::Note(note) => {
            let preview = note.content_preview(40);
            if note.is_favorite {
                format!("* {preview}")
            } else {
                preview
            }
        }
    }
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_entity_lines(entities: &[Entity]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entities
        .iter()
        .map(|entity| {
            let short_id = short_id(&entity.id());
            let label = preview(&entity_label(entity), 32);
            let relative_time = format_relative_time(entity.updated_at(), now_ms);
            let detail = entity_detail(entity);

            if detail.is_empty() {
                format!("{short_id:<13}  {label:<32}  {relative_time}")
            } else {
                format!("{short_id:<13}  {label:<32}  {relative_time:<10}  {detail}")
            }
        })
        .collect()
}

pub fn entity_to_list_item(entity: &Entity) -> EntityListItem {
    let now_ms = Utc::now().timestamp_millis();
    EntityListItem {
        id: entity.id().to_string(),
        kind: entity.kind(),
        label: entity_label(entity),
        detail: entity_detail(entity),
        created_at: entity.created_at(),
        updated_at: entity.updated_at(),
        relative_time: format_relative_time(entity.updated_at(), now_ms),
        record: entity.clone(),
    }
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        kind: conflict.kind,
        entity_id: conflict.entity_id.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}={}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.kind,
                conflict.entity_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
