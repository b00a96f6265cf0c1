use std::collections::BTreeMap;
use std::sync::Arc;

use agenda_core::db::Database;
use agenda_core::models::SyncConflict;
use agenda_core::remote::{Disconnected, MemoryRemote, RemoteApi, RemoteCall};
use agenda_core::{
    EngineConfig, Entity, EntityKind, EntityRef, Event, Project, StaticCredentials, SyncEngine,
    TaskItem, TombstonePolicy,
};
use pretty_assertions::assert_eq;

use crate::cli::CompletionShell;
use crate::commands::add::{run_event_add, run_project_add, run_task_add};
use crate::commands::common::{
    format_relative_time, format_sync_conflict_lines, format_sync_timestamp, normalize_content,
    normalize_identifier, parse_timestamp, preview, required_text, resolve_entity,
};
use crate::commands::complete::run_task_done;
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{apply_config_init, ConfigInit};
use crate::commands::delete::run_delete;
use crate::commands::sync::{format_sync_report_lines, run_sync};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

fn engine_with(remote: Arc<dyn RemoteApi>, credentials: StaticCredentials) -> SyncEngine {
    let db = Arc::new(Database::open_in_memory().unwrap());
    SyncEngine::with_database(EngineConfig::default(), db, remote, Arc::new(credentials)).unwrap()
}

fn signed_in_engine() -> (SyncEngine, MemoryRemote) {
    let remote = MemoryRemote::new();
    let engine = engine_with(
        Arc::new(remote.clone()),
        StaticCredentials::signed_in("cli-test-token"),
    );
    (engine, remote)
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(ToString::to_string).collect()
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn normalize_identifier_rejects_empty() {
    assert!(matches!(normalize_identifier(" \n "), Err(CliError::EmptyId)));
    assert_eq!(normalize_identifier("  abc123  ").unwrap(), "abc123");
}

#[test]
fn required_text_joins_words() {
    assert_eq!(
        required_text(&words("Quarterly   review"), "Title").unwrap(),
        "Quarterly review"
    );
    assert!(matches!(
        required_text(&[], "Title"),
        Err(CliError::EmptyInput("Title"))
    ));
}

#[test]
fn parse_timestamp_accepts_rfc3339_only() {
    assert_eq!(parse_timestamp("1970-01-01T00:00:01Z").unwrap(), 1_000);
    assert_eq!(parse_timestamp("1970-01-01T01:00:00+01:00").unwrap(), 0);
    assert!(matches!(
        parse_timestamp("tomorrow"),
        Err(CliError::InvalidTimestamp(_))
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn preview_truncates_with_ellipsis() {
    assert_eq!(
        preview("This is a very long sentence that should be shortened", 20),
        "This is a very lo..."
    );
    assert_eq!(preview("first\nsecond", 20), "first");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflicts = vec![SyncConflict {
        id: 1,
        kind: EntityKind::Event,
        entity_id: "11111111-1111-7111-8111-111111111111".to_string(),
        local_updated_at: 200,
        incoming_updated_at: 100,
        resolved_at: 300,
        strategy: "lww".to_string(),
    }];

    let rendered = format_sync_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("lww"));
    assert!(rendered[0].contains("event=11111111-1111-7111-8111-111111111111"));
    assert!(rendered[0].contains("local=200"));
    assert!(rendered[0].contains("incoming=100"));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_entity_supports_exact_and_prefix_id() {
    let (engine, _remote) = signed_in_engine();
    let mut first = Project::new("Alpha");
    first.id = "11111111-1111-7111-8111-111111111111".parse().unwrap();
    let mut second = Project::new("Beta");
    second.id = "11111111-1111-7111-8111-222222222222".parse().unwrap();
    engine.insert_entity(&first.clone().into()).unwrap();
    engine.insert_entity(&second.clone().into()).unwrap();

    let exact = resolve_entity(
        &engine,
        EntityKind::Project,
        "11111111-1111-7111-8111-111111111111",
    )
    .unwrap();
    assert_eq!(exact.id(), first.id);

    let by_prefix =
        resolve_entity(&engine, EntityKind::Project, "11111111-1111-7111-8111-2").unwrap();
    assert_eq!(by_prefix.id(), second.id);

    assert!(matches!(
        resolve_entity(&engine, EntityKind::Project, "11111111"),
        Err(CliError::AmbiguousId(_))
    ));
    assert!(matches!(
        resolve_entity(&engine, EntityKind::Project, "ffff"),
        Err(CliError::NotFound("project", _))
    ));
    assert!(matches!(
        resolve_entity(&engine, EntityKind::Event, "11111111"),
        Err(CliError::NotFound("event", _))
    ));

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn project_add_commits_locally_and_uploads() {
    let (engine, remote) = signed_in_engine();

    run_project_add(&engine, &words("Home renovation")).unwrap();
    engine.flush_uploads().await;

    let projects = engine.store().fetch(EntityKind::Project).unwrap();
    assert_eq!(projects.len(), 1);
    let Entity::Project(project) = &projects[0] else {
        panic!("expected a project");
    };
    assert_eq!(project.name, "Home renovation");
    assert!(remote.get(EntityKind::Project, &project.id).is_some());

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn event_add_rejects_end_before_start() {
    let (engine, _remote) = signed_in_engine();

    let result = run_event_add(
        &engine,
        &words("Standup"),
        "2026-05-01T10:00:00Z",
        "2026-05-01T09:00:00Z",
        None,
    );

    assert!(matches!(result, Err(CliError::InvalidTimeRange)));
    assert!(engine.store().fetch(EntityKind::Event).unwrap().is_empty());
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn task_add_links_event_by_prefix() {
    let (engine, _remote) = signed_in_engine();
    let event = Event::new("Offsite", 1_000, 2_000);
    engine.insert_entity(&event.clone().into()).unwrap();
    let prefix = event.id.to_string()[..13].to_string();

    run_task_add(
        &engine,
        &words("Book venue"),
        Some(&prefix),
        Some("2026-05-01T09:00:00Z"),
    )
    .unwrap();

    let tasks = engine.store().tasks_of_event(&event.id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Book venue");
    assert!(tasks[0].due_at.is_some());
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn task_done_bumps_updated_at_and_uploads_the_change() {
    let (engine, remote) = signed_in_engine();
    let mut task = TaskItem::new("Ship it");
    task.created_at = 1_000;
    task.updated_at = 1_000;
    engine.insert_entity(&task.clone().into()).unwrap();
    engine.flush_uploads().await;

    run_task_done(&engine, &task.id.to_string()).unwrap();
    engine.flush_uploads().await;

    let Some(Entity::Task(stored)) = engine.store().get(EntityKind::Task, &task.id).unwrap() else {
        panic!("task should still exist");
    };
    assert!(stored.is_completed());
    assert!(stored.updated_at > 1_000);
    assert_eq!(
        remote.call_count(RemoteCall::Update(EntityRef::new(EntityKind::Task, task.id))),
        1
    );
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_event_removes_its_tasks_everywhere() {
    let (engine, remote) = signed_in_engine();
    let event = Event::new("Retro", 1_000, 2_000);
    let task = TaskItem::new("Collect feedback").in_event(event.id);
    engine.insert_entity(&event.clone().into()).unwrap();
    engine.insert_entity(&task.clone().into()).unwrap();
    engine.flush_uploads().await;

    run_delete(&engine, EntityKind::Event, &event.id.to_string()).unwrap();
    engine.flush_uploads().await;

    assert!(engine.store().get(EntityKind::Task, &task.id).unwrap().is_none());
    assert!(remote.get(EntityKind::Event, &event.id).is_none());
    assert!(remote.get(EntityKind::Task, &task.id).is_none());
    assert!(engine.last_delete().unwrap().is_some());
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_without_remote_reports_incomplete() {
    let engine = engine_with(Arc::new(Disconnected), StaticCredentials::signed_in("t"));

    let result = run_sync(&engine, true).await;

    assert!(matches!(result, Err(CliError::SyncIncomplete(_))));
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_report_lines_list_every_kind() {
    let (engine, remote) = signed_in_engine();
    remote.seed(Project::new("Pulled"));

    let report = engine.sync_all().await;
    let lines = format_sync_report_lines(&report);

    assert_eq!(lines.len(), EntityKind::SYNC_ORDER.len() + 1);
    assert!(lines[0].starts_with("project"));
    assert!(lines[0].contains("inserted=1"));
    assert_eq!(lines.last().map(String::as_str), Some("Sync completed"));
    engine.shutdown().await;
}

#[test]
fn config_init_sets_profile_and_activates() {
    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: None,
        profiles: BTreeMap::new(),
    };

    let name = apply_config_init(
        &mut config,
        Some("work"),
        ConfigInit {
            api_base_url: Some(" https://api.example.com/ ".to_string()),
            tombstone_policy: Some("per-entity".to_string()),
            sync_interval_secs: Some(60),
            activate: true,
        },
    )
    .unwrap();

    assert_eq!(name, "work");
    assert_eq!(config.active_profile.as_deref(), Some("work"));
    let profile = config.profile("work").unwrap();
    assert_eq!(profile.api_base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(profile.tombstone_policy, Some(TombstonePolicy::PerEntity));
    assert_eq!(profile.sync_interval_secs, Some(60));
}

#[test]
fn config_init_rejects_bad_values() {
    let mut config = CliProfilesConfig::default();

    let bad_url = apply_config_init(
        &mut config,
        Some("work"),
        ConfigInit {
            api_base_url: Some("api.example.com".to_string()),
            ..ConfigInit::default()
        },
    );
    assert!(matches!(bad_url, Err(CliError::Config(_))));

    let bad_policy = apply_config_init(
        &mut config,
        Some("work"),
        ConfigInit {
            tombstone_policy: Some("forever".to_string()),
            ..ConfigInit::default()
        },
    );
    assert!(matches!(bad_policy, Err(CliError::Config(_))));

    let bad_interval = apply_config_init(
        &mut config,
        Some("work"),
        ConfigInit {
            sync_interval_secs: Some(1),
            ..ConfigInit::default()
        },
    );
    assert!(matches!(bad_interval, Err(CliError::Config(_))));
    assert_eq!(config.active_profile, None);
}

#[test]
fn completions_are_written_for_the_agenda_binary() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("agenda.bash");

    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("agenda"));
}

#[test]
fn completion_scripts_cover_entity_and_sync_subcommands() {
    for shell in [CompletionShell::Bash, CompletionShell::Zsh, CompletionShell::Fish] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        for word in ["project", "event", "task", "note", "tombstone", "conflicts"] {
            assert!(script.contains(word), "{shell:?} completions lack {word}");
        }
    }
}
