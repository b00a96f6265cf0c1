use agenda_core::{EntityKind, SyncEngine};

use crate::commands::common::{entity_to_list_item, format_entity_lines, EntityListItem};
use crate::error::CliError;

pub fn run_list(engine: &SyncEngine, kind: EntityKind, as_json: bool) -> Result<(), CliError> {
    let entities = engine.store().fetch(kind)?;

    if as_json {
        let json_items = entities
            .iter()
            .map(entity_to_list_item)
            .collect::<Vec<EntityListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if entities.is_empty() {
        println!("No {} found.", kind.collection());
        return Ok(());
    }

    for line in format_entity_lines(&entities) {
        println!("{line}");
    }
    Ok(())
}
