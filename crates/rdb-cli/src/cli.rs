use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rdb",
    about = "RDB: version control for typed, ID-keyed asset trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Run as if started in this directory.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log at info level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log everything, including per-file hashing.
    #[arg(long, global = true)]
    pub trace: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Stage files or asset directories
    Add(AddArgs),
    /// Snapshot the working tree
    Commit(CommitArgs),
    /// Show working tree changes against HEAD
    Status(StatusArgs),
    /// Show commit history
    Log(LogArgs),
    /// Show file changes between two commits
    Diff(DiffArgs),
    /// Print the package manifest of a commit
    Manifest(ManifestArgs),
    /// List built-in asset types and their folders
    List(ListArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    /// Working-tree layout: tree or flat.
    #[arg(long, default_value = "tree")]
    pub layout: String,
    /// Declared asset types.
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Asset type (inferred from the ID when omitted).
    #[arg(long = "type")]
    pub asset_type: Option<String>,
    /// Asset ID; must match the asset directory.
    #[arg(long)]
    pub id: Option<u64>,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long, default_value = "")]
    pub message: String,
    /// `Name <email>`; defaults to the configured user.
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub amend: bool,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct LogArgs {
    /// Limit the number of commits (0 = all).
    #[arg(short = 'n', long, default_value = "0")]
    pub max_count: usize,
    /// Only commits at or after this date (YYYY-MM-DD or RFC 3339).
    #[arg(long)]
    pub since: Option<String>,
    /// Only commits at or before this date.
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long)]
    pub oneline: bool,
    /// Start from this revision instead of HEAD.
    pub rev: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Old revision (defaults to the parent of `to`).
    pub from: Option<String>,
    /// New revision (defaults to HEAD).
    pub to: Option<String>,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Revision to describe (defaults to HEAD).
    pub rev: Option<String>,
    /// Also list every object a package would carry.
    #[arg(long)]
    pub objects: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only show types whose folder is missing.
    #[arg(long)]
    pub missing: bool,
}
