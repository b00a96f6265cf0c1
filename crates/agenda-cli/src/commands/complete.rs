use agenda_core::util::now_millis;
use agenda_core::{Entity, EntityKind, SyncEngine};

use crate::commands::common::{resolve_entity, short_id};
use crate::error::CliError;

pub fn run_event_complete(engine: &SyncEngine, id: &str) -> Result<(), CliError> {
    let Entity::Event(mut event) = resolve_entity(engine, EntityKind::Event, id)? else {
        return Err(CliError::NotFound("event", id.to_string()));
    };

    event.complete(now_millis());
    engine.update_entity(&Entity::Event(event.clone()))?;
    println!("Completed event {}", short_id(&event.id));
    Ok(())
}

pub fn run_task_done(engine: &SyncEngine, id: &str) -> Result<(), CliError> {
    let Entity::Task(mut task) = resolve_entity(engine, EntityKind::Task, id)? else {
        return Err(CliError::NotFound("task", id.to_string()));
    };

    if task.is_completed() {
        println!("Task {} is already done", short_id(&task.id));
        return Ok(());
    }

    task.complete(now_millis());
    engine.update_entity(&Entity::Task(task.clone()))?;
    println!("Completed task {}", short_id(&task.id));
    Ok(())
}
