//! Agenda CLI - projects, events, tasks and notes from the terminal
//!
//! Every change is written to the local database first and uploaded when a
//! profile is signed in; `agenda sync` pulls the server state back down.

mod cli;
mod commands;
mod config_profiles;
mod credentials;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    Cli, Commands, EventCommands, NoteCommands, ProjectCommands, SyncCommands, TaskCommands,
};
use crate::commands::add::{run_event_add, run_note_add, run_project_add, run_task_add, NoteDraft};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{open_engine, resolve_db_path};
use crate::commands::complete::{run_event_complete, run_task_done};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::sync::{run_sync, run_sync_conflicts, run_sync_tombstone};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agenda=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Config { command } => run_config(command, profile),
        Commands::Auth { command } => run_auth(command, profile),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        command => {
            let db_path = resolve_db_path(cli.db_path)?;
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let engine = open_engine(&db_path, profile)?;

            let result = run_engine_command(&engine, command).await;
            // Uploads queued by the command get their attempt before exit.
            engine.flush_uploads().await;
            let stats = engine.upload_stats();
            if stats.failed > 0 {
                tracing::warn!(
                    "{} upload(s) failed; run `agenda sync` once the server is reachable",
                    stats.failed
                );
            }
            engine.shutdown().await;
            result
        }
    }
}

async fn run_engine_command(
    engine: &agenda_core::SyncEngine,
    command: Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Add { name } => run_project_add(engine, &name),
        },
        Commands::Event { command } => match command {
            EventCommands::Add {
                title,
                start,
                end,
                project,
            } => run_event_add(engine, &title, &start, &end, project.as_deref()),
            EventCommands::Complete { id } => run_event_complete(engine, &id),
        },
        Commands::Task { command } => match command {
            TaskCommands::Add { title, event, due } => {
                run_task_add(engine, &title, event.as_deref(), due.as_deref())
            }
            TaskCommands::Done { id } => run_task_done(engine, &id),
        },
        Commands::Note { command } => match command {
            NoteCommands::Add {
                title,
                content,
                project,
                event,
                favorite,
            } => run_note_add(
                engine,
                NoteDraft {
                    title_parts: &title,
                    content,
                    project: project.as_deref(),
                    event: event.as_deref(),
                    favorite,
                },
            ),
        },
        Commands::List { kind, json } => run_list(engine, kind.into(), json),
        Commands::Delete { kind, id } => run_delete(engine, kind.into(), &id),
        Commands::Sync { command, json } => match command {
            None => run_sync(engine, json).await,
            Some(SyncCommands::Conflicts { limit, json }) => {
                run_sync_conflicts(engine, limit, json)
            }
            Some(SyncCommands::Tombstone) => run_sync_tombstone(engine),
        },
        Commands::Config { .. } | Commands::Auth { .. } | Commands::Completions { .. } => {
            Ok(())
        }
    }
}
