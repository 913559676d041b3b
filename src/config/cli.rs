use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the almanac binary.
#[derive(Debug, Parser)]
#[command(
    name = "almanac",
    version,
    about = "Keyword-addressed topic and theme store"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "ALMANAC_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Manage topics. Images embedded in topic content are saved locally.
    Topic(EntryArgs),
    /// Manage themes.
    Theme(EntryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EntryArgs {
    #[command(subcommand)]
    pub action: EntryAction,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum EntryAction {
    /// Create a new entry.
    Add { keyword: String, content: String },
    /// Replace the content of an existing entry.
    Update { keyword: String, content: String },
    /// Delete an entry.
    Remove { keyword: String },
    /// Resolve a query to a single entry, or list the candidates.
    Show { query: String },
    /// Show every entry whose keyword matches a `%` wildcard pattern.
    Search { pattern: String },
    /// List all keywords.
    List,
    /// Check whether a keyword exists.
    Exists { keyword: String },
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the tracing level (e.g. info, debug).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the directory saved images are written to.
    #[arg(
        long = "media-directory",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub media_directory: Option<PathBuf>,

    /// Override the public base URL saved images are served from.
    #[arg(long = "media-public-base-url", value_name = "URL", global = true)]
    pub media_public_base_url: Option<String>,
}
