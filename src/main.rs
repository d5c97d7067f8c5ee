//! # PMS - Project task scheduler
//!
//! Imports a programme's work plan (a semicolon-separated task table plus a
//! table of source documents), rebuilds the task hierarchy from dot-numbered
//! task identifiers and expands every task's recurrence category into dated
//! subtasks bounded by the project window.
//!
//! ## Quick Start
//!
//! ```bash
//! # Import documents and tasks, link hierarchy, generate subtasks
//! pms import --documents documents.csv --tasks tasks.csv
//!
//! # Inspect the result
//! pms list --tree
//! pms subtasks 1.2.1
//! pms stats --by type
//!
//! # Preview what a recurrence label expands to
//! pms occurrences "2x mesačne" 2025-01-01 2025-03-31
//! ```
//!
//! ## Recurrence categories
//!
//! - **one-time**: the window start
//! - **monthly** (ongoing, periodic, during works): the 1st of every month
//! - **twice-monthly**: the 1st and 15th of every month
//! - **quarterly**: January, April, July and October 1st
//! - **after-completion**: the window end
//! - **as-needed** and anything unrecognised: quarterly
//!
//! Subtasks are regenerated from scratch on every import or reschedule, so
//! status changes made to them are not preserved.
//!
//! Data is stored in `~/.pms/store.json`; settings are read from
//! `~/.pms/config.json` when present.

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod fields;
pub mod hierarchy;
pub mod import;
pub mod materialize;
pub mod recurrence;
pub mod tabular;
pub mod task;
pub mod window;

use cli::Cli;
use cmd::*;
use config::{default_pms_dir, Config};
use db::Database;

/// Log to stderr so reports on stdout stay clean. RUST_LOG wins over `-v`.
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Commands that need neither store nor config.
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Occurrences { category, start, end } => {
            cmd_occurrences(category.clone(), start.clone(), end.clone());
            return;
        }
        _ => {}
    }

    let pms_dir = match cli.db.as_ref() {
        Some(db_path) => db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."))
            .to_path_buf(),
        None => default_pms_dir(),
    };

    let config = match Config::load(cli.config.as_deref(), &pms_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let db_path = cli.db.unwrap_or_else(|| pms_dir.join("store.json"));
    let mut db = match Database::load(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load store {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Occurrences { .. } => unreachable!("occurrences handled above"),

        Commands::Import { tasks, documents, window, strict } =>
            cmd_import(&mut db, &db_path, config, tasks, documents, window, strict),

        Commands::Reschedule { task_number, window } =>
            cmd_reschedule(&mut db, &db_path, config, task_number, window),

        Commands::List { tree, category } => cmd_list(&db, tree, category),

        Commands::Subtasks { task_number } => cmd_subtasks(&db, task_number),

        Commands::Stats { by } => cmd_stats(&db, by),
    }
}
