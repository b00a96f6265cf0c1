//! End-to-end sync scenarios against the in-memory remote

use std::sync::Arc;

use agenda_core::db::{Database, LocalStore, SqliteTombstoneLedger, TombstoneLedger};
use agenda_core::remote::{MemoryRemote, RemoteCall, RemoteError};
use agenda_core::{
    AuthToken, EngineConfig, Entity, EntityKind, EntityRef, Event, NoteItem, Project,
    StaticCredentials, SyncEngine, SyncState, TaskItem, TombstonePolicy,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

struct Fixture {
    engine: SyncEngine,
    remote: MemoryRemote,
    db: Arc<Database>,
}

fn fixture_with(config: EngineConfig, db: Database) -> Fixture {
    let db = Arc::new(db);
    let remote = MemoryRemote::new();
    let engine = SyncEngine::with_database(
        config,
        db.clone(),
        Arc::new(remote.clone()),
        Arc::new(StaticCredentials::signed_in("user-1")),
    )
    .unwrap();
    Fixture { engine, remote, db }
}

fn fixture() -> Fixture {
    fixture_with(EngineConfig::default(), Database::open_in_memory().unwrap())
}

fn offline(remote: &MemoryRemote, kind: EntityKind) {
    remote.fail_kind(kind, RemoteError::Unavailable("offline".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn uploading_twice_is_idempotent_at_the_remote() {
    let f = fixture();
    let event = Event::new("Dentist", 1_000, 2_000);
    let entity = Entity::from(event.clone());

    f.engine.insert_entity(&entity).unwrap();
    f.engine.upload_entity(&entity);
    f.engine.flush_uploads().await;

    assert_eq!(f.remote.records(EntityKind::Event), vec![entity]);
    let target = EntityRef::new(EntityKind::Event, event.id);
    assert_eq!(f.remote.call_count(RemoteCall::Create(target)), 1);
    assert_eq!(f.remote.call_count(RemoteCall::Update(target)), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tombstone_never_moves_backwards() {
    let ledger = SqliteTombstoneLedger::new(Arc::new(Database::open_in_memory().unwrap()));
    let user = AuthToken::new("user-1").unwrap();

    ledger.record_delete(&user, 2_000).unwrap();
    ledger.record_delete(&user, 1_000).unwrap();

    assert_eq!(ledger.last_delete(&user).unwrap().unwrap().deleted_at, 2_000);
}

#[tokio::test(flavor = "multi_thread")]
async fn local_delete_wins_over_lagging_remote() {
    let f = fixture();
    let event = Event::new("Cancelled", 1_000, 2_000);
    f.engine.insert_entity(&event.clone().into()).unwrap();
    f.engine.flush_uploads().await;

    offline(&f.remote, EntityKind::Event);
    f.engine.delete_entity(EntityKind::Event, &event.id).unwrap();
    f.engine.flush_uploads().await;
    f.remote.clear_failures();

    // The server never heard about the delete.
    assert!(f.remote.get(EntityKind::Event, &event.id).is_some());

    let report = f.engine.sync_all().await;

    assert!(report.is_success());
    assert_eq!(report.summary(EntityKind::Event).unwrap().skipped_stale, 1);
    assert!(f
        .engine
        .store()
        .get(EntityKind::Event, &event.id)
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_side_delete_removes_local_row_despite_tombstone() {
    let f = fixture();
    let project = Project::new("Archived elsewhere");
    let other = Project::new("Deleted here");
    f.remote.seed(project.clone());
    f.remote.seed(other.clone());
    f.engine.sync_all().await;

    f.engine.delete_entity(EntityKind::Project, &other.id).unwrap();
    f.engine.flush_uploads().await;
    f.remote.remove(EntityKind::Project, &project.id);

    let report = f.engine.sync_all().await;

    assert_eq!(report.summary(EntityKind::Project).unwrap().removed, 1);
    assert!(f.engine.store().fetch(EntityKind::Project).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_sync_leaves_identical_snapshot() {
    let f = fixture();
    let project = Project::new("Home");
    let event = Event::new("Move in", 10, 20).in_project(project.id);
    let task = TaskItem::new("Boxes").in_event(event.id);
    let note = NoteItem::new("Keys", "under the mat").in_project(project.id);
    f.remote.seed(project);
    f.remote.seed(event);
    f.remote.seed(task);
    f.remote.seed(note);
    f.engine
        .insert_entity(&NoteItem::new("Local only", "").into())
        .unwrap();
    offline(&f.remote, EntityKind::Note);
    f.engine.flush_uploads().await;
    f.remote.clear_failures();

    f.engine.sync_all().await;
    let first = f.engine.store().snapshot().unwrap().to_json().unwrap();
    let report = f.engine.sync_all().await;
    let second = f.engine.store().snapshot().unwrap().to_json().unwrap();

    assert_eq!(first, second);
    let notes = report.summary(EntityKind::Note).unwrap();
    assert_eq!((notes.inserted, notes.updated, notes.removed), (0, 0, 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn parents_resolve_before_children() {
    let f = fixture();
    let project = Project::new("Launch");
    let event = Event::new("Kickoff", 10, 20).in_project(project.id);
    let task = TaskItem::new("Invite team").in_event(event.id);
    let note = NoteItem::new("Goals", "ship")
        .in_project(project.id)
        .in_event(event.id);
    f.remote.seed(note.clone());
    f.remote.seed(task.clone());
    f.remote.seed(event.clone());
    f.remote.seed(project.clone());

    let report = f.engine.sync_all().await;

    assert!(report.dangling_links.is_empty());
    let store = f.engine.store();
    assert_eq!(store.events_of_project(&project.id).unwrap(), vec![event.clone()]);
    assert_eq!(store.tasks_of_event(&event.id).unwrap(), vec![task]);
    assert_eq!(store.notes_of_event(&event.id).unwrap(), vec![note]);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_parent_is_reported_as_dangling() {
    let f = fixture();
    let orphan = TaskItem::new("Orphan").in_event(agenda_core::EntityId::new());
    f.remote.seed(orphan.clone());

    let report = f.engine.sync_all().await;

    assert_eq!(report.dangling_links.len(), 1);
    assert_eq!(
        report.dangling_links[0].child,
        EntityRef::new(EntityKind::Task, orphan.id)
    );
    assert!(f
        .engine
        .store()
        .get(EntityKind::Task, &orphan.id)
        .unwrap()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn event_deleted_on_server_takes_its_children_along() {
    let f = fixture();
    let event = Event::new("Offsite", 1_000, 2_000);
    let task = TaskItem::new("Book bus").in_event(event.id);
    let note = NoteItem::new("Ideas", "karaoke").in_event(event.id);
    f.remote.seed(event.clone());
    f.remote.seed(task.clone());
    f.remote.seed(note.clone());
    assert!(f.engine.sync_all().await.is_success());

    // The server dropped the event but still lists its children.
    f.remote.remove(EntityKind::Event, &event.id);
    let report = f.engine.sync_all().await;
    f.engine.flush_uploads().await;

    let store = f.engine.store();
    assert!(report.is_success());
    assert!(report.dangling_links.is_empty());
    assert!(store.get(EntityKind::Event, &event.id).unwrap().is_none());
    assert!(store.get(EntityKind::Task, &task.id).unwrap().is_none());
    let Some(Entity::Note(local_note)) = store.get(EntityKind::Note, &note.id).unwrap() else {
        panic!("note should survive its event");
    };
    assert_eq!(local_note.event_id, None);

    assert!(f.remote.get(EntityKind::Task, &task.id).is_none());
    assert_eq!(
        f.remote.get(EntityKind::Note, &note.id),
        Some(Entity::Note(local_note))
    );

    let settled = f.engine.sync_all().await;
    assert!(settled.dangling_links.is_empty());
    assert!(store.get(EntityKind::Task, &task.id).unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_note_stays_deleted_when_remote_lags() {
    let f = fixture();
    let project = Project::new("P1");
    let note = NoteItem::new("N1", "draft").in_project(project.id);
    f.engine.insert_entity(&project.clone().into()).unwrap();
    f.engine.insert_entity(&note.clone().into()).unwrap();
    f.engine.flush_uploads().await;
    assert!(f.remote.get(EntityKind::Note, &note.id).is_some());

    offline(&f.remote, EntityKind::Note);
    f.engine.delete_entity(EntityKind::Note, &note.id).unwrap();
    f.engine.flush_uploads().await;
    f.remote.clear_failures();

    f.engine.sync_all().await;

    assert!(f
        .engine
        .store()
        .get(EntityKind::Note, &note.id)
        .unwrap()
        .is_none());
    assert_eq!(f.engine.store().fetch(EntityKind::Project).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn completed_task_survives_lagging_remote() {
    let f = fixture();
    let event = Event::new("Sprint review", 10, 20);
    let mut done = TaskItem::new("Demo").in_event(event.id);
    let open = TaskItem::new("Notes").in_event(event.id);
    f.remote.seed(event);
    f.remote.seed(done.clone());
    f.remote.seed(open.clone());
    f.engine.sync_all().await;

    offline(&f.remote, EntityKind::Task);
    done.complete(done.updated_at + 1_000);
    f.engine.update_entity(&done.clone().into()).unwrap();
    f.engine.flush_uploads().await;
    f.remote.clear_failures();

    let report = f.engine.sync_all().await;

    let Some(Entity::Task(stored)) = f.engine.store().get(EntityKind::Task, &done.id).unwrap()
    else {
        panic!("completed task missing");
    };
    assert!(stored.is_completed());
    assert_eq!(report.summary(EntityKind::Task).unwrap().conflicts, 1);
    assert_eq!(f.engine.store().list_conflicts(10).unwrap().len(), 1);

    let Some(Entity::Task(untouched)) = f.engine.store().get(EntityKind::Task, &open.id).unwrap()
    else {
        panic!("open task missing");
    };
    assert!(!untouched.is_completed());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_kind_does_not_stop_other_kinds() {
    let f = fixture();
    f.remote.seed(Project::new("Still arrives"));
    f.remote.seed(NoteItem::new("Also arrives", ""));
    offline(&f.remote, EntityKind::Event);

    let report = f.engine.sync_all().await;

    assert_eq!(report.failed_kinds(), vec![EntityKind::Event]);
    assert_eq!(f.engine.sync_state(), SyncState::Error);
    assert_eq!(f.engine.store().fetch(EntityKind::Project).unwrap().len(), 1);
    assert_eq!(f.engine.store().fetch(EntityKind::Note).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unconfirmed_local_rows_survive_pull() {
    let f = fixture();
    offline(&f.remote, EntityKind::Task);
    let pending = TaskItem::new("Written on a plane");
    f.engine.insert_entity(&pending.clone().into()).unwrap();
    f.engine.flush_uploads().await;
    f.remote.clear_failures();

    let report = f.engine.sync_all().await;

    assert_eq!(report.summary(EntityKind::Task).unwrap().removed, 0);
    assert!(f
        .engine
        .store()
        .get(EntityKind::Task, &pending.id)
        .unwrap()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn per_entity_policy_keeps_unrelated_older_records() {
    let config = EngineConfig::default().with_tombstone_policy(TombstonePolicy::PerEntity);
    let f = fixture_with(config, Database::open_in_memory().unwrap());
    let from_other_device = NoteItem::new("Written elsewhere", "");
    let local = NoteItem::new("Mine", "");
    f.engine.insert_entity(&local.clone().into()).unwrap();
    f.engine.flush_uploads().await;
    f.engine.delete_entity(EntityKind::Note, &local.id).unwrap();
    f.engine.flush_uploads().await;
    // Older than the delete, and never seen locally.
    f.remote.seed(from_other_device.clone());

    let report = f.engine.sync_all().await;

    assert_eq!(report.summary(EntityKind::Note).unwrap().inserted, 1);
    assert!(f
        .engine
        .store()
        .get(EntityKind::Note, &from_other_device.id)
        .unwrap()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_event_cascades_to_the_remote() {
    let f = fixture();
    let event = Event::new("Offsite", 10, 20);
    let task = TaskItem::new("Book bus").in_event(event.id);
    let note = NoteItem::new("Menu", "").in_event(event.id);
    for entity in [
        Entity::from(event.clone()),
        Entity::from(task.clone()),
        Entity::from(note.clone()),
    ] {
        f.engine.insert_entity(&entity).unwrap();
    }
    f.engine.flush_uploads().await;

    let outcome = f.engine.delete_entity(EntityKind::Event, &event.id).unwrap();
    f.engine.flush_uploads().await;

    assert_eq!(outcome.removed.len(), 2);
    assert!(f.remote.records(EntityKind::Event).is_empty());
    assert!(f.remote.records(EntityKind::Task).is_empty());
    let Some(Entity::Note(remote_note)) = f.remote.get(EntityKind::Note, &note.id) else {
        panic!("detached note should stay on the server");
    };
    assert_eq!(remote_note.event_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_syncs_both_complete() {
    let f = fixture();
    f.remote.seed(Project::new("Concurrent"));

    let first = f.engine.spawn_sync();
    let second = f.engine.spawn_sync();
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    assert!(first.is_success() && second.is_success());
    assert_eq!(f.engine.store().fetch(EntityKind::Project).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tombstone_survives_restart() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("agenda.db");
    let note = NoteItem::new("Ephemeral", "");

    {
        let f = fixture_with(EngineConfig::default(), Database::open(&path).unwrap());
        f.engine.insert_entity(&note.clone().into()).unwrap();
        f.engine.flush_uploads().await;
        f.engine.delete_entity(EntityKind::Note, &note.id).unwrap();
        f.engine.shutdown().await;
        drop(f.db);
    }

    let f = fixture_with(EngineConfig::default(), Database::open(&path).unwrap());
    f.remote.seed(note.clone());
    let report = f.engine.sync_all().await;

    assert_eq!(report.summary(EntityKind::Note).unwrap().skipped_stale, 1);
    assert!(f.engine.last_delete().unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_sync_reports_every_kind_failed() {
    let remote = MemoryRemote::new();
    let engine = SyncEngine::with_database(
        EngineConfig::default(),
        Arc::new(Database::open_in_memory().unwrap()),
        Arc::new(remote.clone()),
        Arc::new(StaticCredentials::default()),
    )
    .unwrap();

    let report = engine.sync_all().await;

    assert_eq!(report.failed_kinds(), EntityKind::SYNC_ORDER.to_vec());
    assert_eq!(engine.sync_state(), SyncState::Offline);
    assert!(remote.calls().is_empty());
}
