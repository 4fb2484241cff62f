use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hoard")]
#[command(about = "Find the largest files on disk and clean up the safe ones", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory tree and list the largest matching files
    Scan(ScanCommand),
    /// Scan, then delete Safe files above a size threshold after confirmation
    Clean(CleanArgs),
    /// Print the risk tier and reason for each path
    Classify {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanCommand {
    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// Options that decide what the scan collects.
#[derive(Debug, Clone, Default, Args)]
pub struct ScanArgs {
    /// Directory to scan; defaults to the configured root, then the whole machine
    pub root: Option<PathBuf>,

    /// Comma-separated extensions to keep, e.g. "mkv,.zip"; "" keeps everything
    #[arg(long, value_name = "LIST")]
    pub ext: Option<String>,

    /// Minimum file size in megabytes
    #[arg(long, value_name = "MB")]
    pub min_mb: Option<String>,

    /// Descend into and report hidden entries
    #[arg(long)]
    pub include_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Descend into directories on other filesystems
    #[arg(long)]
    pub cross_filesystems: bool,

    /// Directory name never to enter (repeatable)
    #[arg(long = "exclude-dir", value_name = "NAME")]
    pub exclude_dir: Vec<String>,

    /// Comma-separated path fragments to skip; "/" or "~" entries match as prefixes
    #[arg(long, value_name = "LIST")]
    pub exclude: Option<String>,

    /// Only files created on or after this day (YYYY-MM-DD, local time)
    #[arg(long, value_name = "DATE")]
    pub created_after: Option<String>,

    /// Only files created on or before this day (YYYY-MM-DD, local time)
    #[arg(long, value_name = "DATE")]
    pub created_before: Option<String>,

    /// Never drop results when the consumer falls behind
    #[arg(long)]
    pub lossless: bool,

    /// Cancel the scan after this many seconds and keep what was found
    #[arg(long, value_name = "SECS")]
    pub max_seconds: Option<u64>,
}

/// Options that only shape the printed table.
#[derive(Debug, Clone, Default, Args)]
pub struct ViewArgs {
    /// Show at most N rows (0 shows all)
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Comma-separated tiers to list: safe, caution, system
    #[arg(long, value_name = "TIERS")]
    pub show: Option<String>,

    /// Sort column: status, name, dir, size or created
    #[arg(long, value_name = "KEY")]
    pub sort: Option<String>,

    /// Sort ascending
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Print the full path of row N, for opening in a file manager
    #[arg(long, value_name = "N")]
    pub reveal: Option<usize>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Only delete Safe files of at least this many megabytes
    #[arg(long, value_name = "MB")]
    pub threshold_mb: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,

    /// Delete permanently instead of moving to the trash
    #[arg(long)]
    pub permanent: bool,
}
