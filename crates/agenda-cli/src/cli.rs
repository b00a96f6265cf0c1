use std::path::PathBuf;

use agenda_core::EntityKind;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "agenda")]
#[command(about = "Projects, events, tasks and notes that sync when you're online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for API and credential configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage events
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// List stored entities of one kind
    #[command(alias = "ls")]
    List {
        /// Entity kind
        #[arg(value_enum)]
        kind: KindArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entity (events also remove their tasks)
    #[command(alias = "rm")]
    Delete {
        /// Entity kind
        #[arg(value_enum)]
        kind: KindArg,
        /// Entity ID or unique ID prefix
        id: String,
    },
    /// Pull everything from the server and merge it locally
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the API token for a profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    #[value(alias = "projects")]
    Project,
    #[value(alias = "events")]
    Event,
    #[value(alias = "tasks")]
    Task,
    #[value(alias = "notes")]
    Note,
}

impl From<KindArg> for EntityKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Project => Self::Project,
            KindArg::Event => Self::Event,
            KindArg::Task => Self::Task,
            KindArg::Note => Self::Note,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project
    Add {
        /// Project name
        name: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Schedule an event
    Add {
        /// Event title
        title: Vec<String>,
        /// Start time (RFC 3339, e.g. 2026-05-01T09:00:00Z)
        #[arg(long, value_name = "TIME")]
        start: String,
        /// End time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        end: String,
        /// Project ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        project: Option<String>,
    },
    /// Mark an event completed
    Complete {
        /// Event ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task title
        title: Vec<String>,
        /// Event ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        event: Option<String>,
        /// Due time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        due: Option<String>,
    },
    /// Mark a task completed
    Done {
        /// Task ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Write a note (content may also be piped on stdin)
    Add {
        /// Note title
        title: Vec<String>,
        /// Note body
        #[arg(long)]
        content: Option<String>,
        /// Project ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        project: Option<String>,
        /// Event ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        event: Option<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last delete recorded for the signed-in user
    Tombstone,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// API base URL (e.g. <https://api.example.com>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// How pulled records are checked against deletes
        #[arg(long, value_name = "POLICY")]
        tombstone_policy: Option<String>,
        /// Seconds between background syncs for long-running clients
        #[arg(long, value_name = "SECS")]
        sync_interval: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store an API token in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// API token issued by the server
        #[arg(long, value_name = "TOKEN")]
        token: String,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Remove the stored token
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
