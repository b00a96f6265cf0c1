use agenda_core::{EntityKind, SyncEngine};

use crate::commands::common::{resolve_entity, short_id};
use crate::error::CliError;

pub fn run_delete(engine: &SyncEngine, kind: EntityKind, id: &str) -> Result<(), CliError> {
    let entity = resolve_entity(engine, kind, id)?;
    let outcome = engine.delete_entity(kind, &entity.id())?;

    println!("Deleted {kind} {}", short_id(&entity.id()));
    for removed in outcome.removed.iter().skip(1) {
        println!("  also deleted {} {}", removed.kind, short_id(&removed.id));
    }
    for detached in &outcome.detached {
        println!("  unlinked {} {}", detached.kind(), short_id(&detached.id()));
    }
    Ok(())
}
