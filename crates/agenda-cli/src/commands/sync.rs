use agenda_core::sync::SyncReport;
use agenda_core::SyncEngine;

use crate::commands::common::{
    format_sync_conflict_lines, format_sync_timestamp, sync_conflict_to_item, SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(engine: &SyncEngine, as_json: bool) -> Result<(), CliError> {
    let report = engine.sync_all().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_sync_report_lines(&report) {
            println!("{line}");
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        let failed = report
            .failed_kinds()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(CliError::SyncIncomplete(failed))
    }
}

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    for summary in &report.succeeded {
        lines.push(format!(
            "{:<8} fetched={} inserted={} updated={} removed={} stale={} conflicts={}",
            summary.kind.to_string(),
            summary.fetched,
            summary.inserted,
            summary.updated,
            summary.removed,
            summary.skipped_stale,
            summary.conflicts
        ));
    }
    for failure in &report.failed {
        lines.push(format!("{:<8} failed: {}", failure.kind.to_string(), failure.error));
    }
    for link in report.dangling_link_reports() {
        lines.push(format!("warning: {} points at missing {}", link.child, link.parent));
    }
    if report.is_success() {
        lines.push("Sync completed".to_string());
    }
    lines
}

pub fn run_sync_conflicts(
    engine: &SyncEngine,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let conflicts = engine.store().list_conflicts(limit)?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_sync_tombstone(engine: &SyncEngine) -> Result<(), CliError> {
    match engine.last_delete()? {
        Some(tombstone) => println!(
            "Last delete at {} ({})",
            format_sync_timestamp(tombstone.deleted_at),
            tombstone.deleted_at
        ),
        None => println!("No delete recorded for the signed-in user."),
    }
    Ok(())
}
