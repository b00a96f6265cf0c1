use agenda_core::{Entity, EntityKind, Event, NoteItem, Project, SyncEngine, TaskItem};

use crate::commands::common::{
    parse_timestamp, required_text, resolve_entity_id, resolve_note_content,
};
use crate::error::CliError;

pub fn run_project_add(engine: &SyncEngine, name_parts: &[String]) -> Result<(), CliError> {
    let name = required_text(name_parts, "Project name")?;
    let project = Project::new(name);
    let id = project.id;

    engine.insert_entity(&Entity::Project(project))?;
    println!("{id}");
    Ok(())
}

pub fn run_event_add(
    engine: &SyncEngine,
    title_parts: &[String],
    start: &str,
    end: &str,
    project: Option<&str>,
) -> Result<(), CliError> {
    let title = required_text(title_parts, "Event title")?;
    let start_at = parse_timestamp(start)?;
    let end_at = parse_timestamp(end)?;
    if end_at < start_at {
        return Err(CliError::InvalidTimeRange);
    }

    let mut event = Event::new(title, start_at, end_at);
    if let Some(project_id) = resolve_entity_id(engine, EntityKind::Project, project)? {
        event = event.in_project(project_id);
    }
    let id = event.id;

    engine.insert_entity(&Entity::Event(event))?;
    println!("{id}");
    Ok(())
}

pub fn run_task_add(
    engine: &SyncEngine,
    title_parts: &[String],
    event: Option<&str>,
    due: Option<&str>,
) -> Result<(), CliError> {
    let title = required_text(title_parts, "Task title")?;

    let mut task = TaskItem::new(title);
    task.due_at = due.map(parse_timestamp).transpose()?;
    if let Some(event_id) = resolve_entity_id(engine, EntityKind::Event, event)? {
        task = task.in_event(event_id);
    }
    let id = task.id;

    engine.insert_entity(&Entity::Task(task))?;
    println!("{id}");
    Ok(())
}

pub struct NoteDraft<'a> {
    pub title_parts: &'a [String],
    pub content: Option<String>,
    pub project: Option<&'a str>,
    pub event: Option<&'a str>,
    pub favorite: bool,
}

pub fn run_note_add(engine: &SyncEngine, draft: NoteDraft<'_>) -> Result<(), CliError> {
    let title = required_text(draft.title_parts, "Note title")?;
    let content = resolve_note_content(draft.content)?;

    let mut note = NoteItem::new(title, content);
    note.is_favorite = draft.favorite;
    if let Some(project_id) = resolve_entity_id(engine, EntityKind::Project, draft.project)? {
        note = note.in_project(project_id);
    }
    if let Some(event_id) = resolve_entity_id(engine, EntityKind::Event, draft.event)? {
        note = note.in_event(event_id);
    }
    let id = note.id;

    engine.insert_entity(&Entity::Note(note))?;
    println!("{id}");
    Ok(())
}
