use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Recurrence-driven task scheduler.
/// Storage defaults to ~/.pms/store.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "pms", version, about = "Project task scheduler")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
