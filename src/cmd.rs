//! Command implementations for the CLI interface.
//!
//! Each handler works on a loaded [`Database`], prints its results to stdout
//! and reports failures on stderr with a non-zero exit status.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::db::*;
use crate::fields::*;
use crate::hierarchy::depth_map;
use crate::import::{run, ImportOptions, ImportReport, ImportSources, RowOutcome, RunReport};
use crate::materialize::reschedule_task;
use crate::recurrence::generate_for_label;
use crate::task::Task;
use crate::window::{format_date, parse_date};

#[derive(Subcommand)]
pub enum Commands {
    /// Import documents and tasks, rebuild the hierarchy and regenerate subtasks.
    Import {
        /// Semicolon-separated task table.
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Semicolon-separated document table.
        #[arg(long)]
        documents: Option<PathBuf>,
        #[command(flatten)]
        window: WindowArgs,
        /// Skip rows with unrecognised recurrence labels instead of scheduling them quarterly.
        #[arg(long)]
        strict: bool,
    },

    /// Regenerate the subtasks of one task.
    Reschedule {
        /// Task number, e.g. 1.2.3
        task_number: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Preview the occurrence dates of a recurrence label.
    Occurrences {
        /// Recurrence label, e.g. "monthly" or "po ukončení".
        category: String,
        /// Window start: YYYY-MM-DD or DD.MM.YYYY.
        start: String,
        /// Window end: YYYY-MM-DD or DD.MM.YYYY.
        end: String,
    },

    /// List tasks ordered by task number.
    List {
        /// Indent tasks under their parents.
        #[arg(long)]
        tree: bool,
        /// Only tasks of this recurrence category.
        #[arg(long, value_enum)]
        category: Option<RecurrenceCategory>,
    },

    /// Show the generated subtasks of one task.
    Subtasks {
        /// Task number, e.g. 1.2.3
        task_number: String,
    },

    /// Count tasks grouped by a field.
    Stats {
        #[arg(long, value_enum, default_value_t = TaskField::Category)]
        by: TaskField,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides for the project window.
#[derive(Args, Debug, Default, Clone)]
pub struct WindowArgs {
    /// Project window start (overrides configuration).
    #[arg(long)]
    pub window_start: Option<String>,
    /// Project window end (overrides configuration).
    #[arg(long)]
    pub window_end: Option<String>,
}

impl WindowArgs {
    /// Apply the overrides to `config`, rejecting unparseable dates or an inverted window.
    pub fn apply(&self, config: &mut Config) -> Result<(), String> {
        if let Some(s) = &self.window_start {
            config.project_start = parse_date(s).ok_or_else(|| format!("Invalid window start '{s}'"))?;
        }
        if let Some(s) = &self.window_end {
            config.project_end = parse_date(s).ok_or_else(|| format!("Invalid window end '{s}'"))?;
        }
        config.validate().map_err(|e| e.to_string())
    }
}

fn exit_with(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        exit_with(format!("Failed to save store {}: {}", db_path.display(), e));
    }
}

/// Run the import pipeline and persist the result.
pub fn cmd_import(
    db: &mut Database,
    db_path: &Path,
    mut config: Config,
    tasks: Option<PathBuf>,
    documents: Option<PathBuf>,
    window: WindowArgs,
    strict: bool,
) {
    if tasks.is_none() && documents.is_none() {
        exit_with("Nothing to import: pass --tasks and/or --documents.");
    }
    if let Err(e) = window.apply(&mut config) {
        exit_with(e);
    }
    config.strict_categories |= strict;
    let options = match ImportOptions::from_config(&config) {
        Ok(o) => o,
        Err(e) => exit_with(e),
    };

    let report = match run(db, &ImportSources { documents, tasks }, &options) {
        Ok(r) => r,
        Err(e) => exit_with(format!("Import aborted: {e}")),
    };
    save_or_exit(db, db_path);
    print_run_report(&report);
}

fn print_run_report(report: &RunReport) {
    if let Some(docs) = &report.documents {
        println!(
            "Documents: {} created, {} updated, {} skipped, {} failed.",
            docs.created, docs.updated, docs.skipped, docs.failed
        );
    }
    if let Some(tasks) = &report.tasks {
        print_task_report(tasks);
    }
}

fn print_task_report(report: &ImportReport) {
    println!(
        "Tasks: {} created, {} updated, {} skipped, {} failed.",
        report.created, report.updated, report.skipped, report.failed
    );
    println!("Hierarchy links: {}", report.links);
    println!("Document links: {}", report.linked_documents);
    println!("Subtasks generated: {}", report.subtasks);
    if report.schedule_failures > 0 {
        println!("Tasks not rescheduled: {}", report.schedule_failures);
    }
    print_counts("By category", &report.by_category);
    print_counts("By type", &report.by_type);

    let problems: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|r| match &r.outcome {
            RowOutcome::Skipped(why) => Some((r, "skipped", why)),
            RowOutcome::Failed(why) => Some((r, "failed", why)),
            _ => None,
        })
        .collect();
    if !problems.is_empty() {
        println!("Rows not imported:");
        for (r, what, why) in problems {
            let key = if r.key.is_empty() { "-" } else { r.key.as_str() };
            println!("  line {:<5} {:<10} {:<8} {}", r.line, key, what, why);
        }
    }
}

fn print_counts(heading: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!("{heading}:");
    for (k, v) in counts {
        println!("  {:<24} {}", k, v);
    }
}

fn task_or_exit(db: &Database, task_number: &str) -> Task {
    match db.find_task_by_number(task_number) {
        Ok(Some(t)) => t,
        Ok(None) => exit_with(format!("No task with number '{task_number}'")),
        Err(e) => exit_with(e),
    }
}

/// Regenerate the subtasks of a single task.
pub fn cmd_reschedule(db: &mut Database, db_path: &Path, mut config: Config, task_number: String, window: WindowArgs) {
    if let Err(e) = window.apply(&mut config) {
        exit_with(e);
    }
    let task = task_or_exit(db, &task_number);
    match reschedule_task(db, &task, config.project_window()) {
        Ok(n) => {
            save_or_exit(db, db_path);
            println!("Task {} rescheduled: {} subtask(s).", task.task_number, n);
        }
        Err(e) => exit_with(format!("Failed to reschedule {}: {}", task.task_number, e)),
    }
}

/// Print the dates a recurrence label expands to.
pub fn cmd_occurrences(category: String, start: String, end: String) {
    let start = parse_date(&start).unwrap_or_else(|| exit_with(format!("Invalid start date '{start}'")));
    let end = parse_date(&end).unwrap_or_else(|| exit_with(format!("Invalid end date '{end}'")));
    if RecurrenceCategory::recognise(&category).is_none() {
        eprintln!("Unrecognised recurrence '{category}', scheduling quarterly.");
    }
    let resolved = RecurrenceCategory::parse_label(&category);
    let dates = generate_for_label(&category, start, end);
    println!("{} ({} occurrence(s))", format_category(resolved), dates.len());
    for d in dates {
        println!("  {}  {}", d, format_date(d));
    }
}

/// List tasks ordered by number, optionally indented by hierarchy depth.
pub fn cmd_list(db: &Database, tree: bool, category: Option<RecurrenceCategory>) {
    let tasks = match db.list_tasks_ordered_by_number() {
        Ok(t) => t,
        Err(e) => exit_with(e),
    };
    let depths = if tree { Some(depth_map(&tasks)) } else { None };
    let counts: HashMap<u64, usize> = db.subtasks.iter().fold(HashMap::new(), |mut m, s| {
        *m.entry(s.task_id).or_insert(0) += 1;
        m
    });
    let shown: Vec<&Task> = tasks
        .iter()
        .filter(|t| category.map_or(true, |c| t.recurrence == c))
        .collect();
    if shown.is_empty() {
        println!("No tasks.");
        return;
    }
    print_table(&shown, depths.as_ref(), &counts);
}

/// Print tasks in a formatted table with optional tree indentation.
pub fn print_table(tasks: &[&Task], id_to_depth: Option<&HashMap<u64, usize>>, subtask_counts: &HashMap<u64, usize>) {
    println!(
        "{:<10} {:<17} {:<11} {:<11} {:<5} {:<18} {}",
        "Number", "Recurrence", "Start", "End", "Subs", "Responsible", "Title"
    );
    for t in tasks {
        let indent = id_to_depth
            .and_then(|m| m.get(&t.id).copied())
            .unwrap_or(0);
        let start = t.start_date.map(format_date).unwrap_or_else(|| "-".into());
        let end = t.end_date.map(format_date).unwrap_or_else(|| "-".into());
        let responsible = t.responsible.clone().unwrap_or_else(|| "-".into());
        println!(
            "{:<10} {:<17} {:<11} {:<11} {:<5} {:<18} {}{}",
            truncate(&t.task_number, 10),
            format_category(t.recurrence),
            start,
            end,
            subtask_counts.get(&t.id).copied().unwrap_or(0),
            truncate(&responsible, 18),
            "  ".repeat(indent),
            t.title
        );
    }
}

/// Fit a table cell into `width` characters; an overlong cell keeps its head and ends in `…`.
fn truncate(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    match width.checked_sub(1) {
        Some(keep) => cell.chars().take(keep).chain(std::iter::once('…')).collect(),
        None => String::new(),
    }
}

/// Show one task's subtasks in due-date order.
pub fn cmd_subtasks(db: &Database, task_number: String) {
    let task = task_or_exit(db, &task_number);
    let subtasks = match db.subtasks_for_task(task.id) {
        Ok(s) => s,
        Err(e) => exit_with(e),
    };
    println!("{} {} [{}]", task.task_number, task.title, format_category(task.recurrence));
    if subtasks.is_empty() {
        println!("No subtasks.");
        return;
    }
    for s in subtasks {
        println!("  {:<6} {}  {:<10} {}", s.id, format_date(s.due_date), format_status(s.status), s.title);
    }
}

/// Count tasks grouped by the chosen field.
pub fn cmd_stats(db: &Database, by: TaskField) {
    match db.count_tasks_by_field(by) {
        Ok(counts) => {
            println!("Tasks: {}", db.tasks.len());
            print_counts(&format!("By {:?}", by).to_lowercase(), &counts);
        }
        Err(e) => exit_with(e),
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    generate(shell, &mut cmd, "pms", &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("1.2.3", 10), "1.2.3");
        assert_eq!(truncate("Lead partner office", 8), "Lead pa…");
        assert_eq!(truncate("mesačne", 7), "mesačne");
        assert_eq!(truncate("štvrťročne", 4), "štv…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_window_args_override_config() {
        let mut config = Config::default();
        let args = WindowArgs {
            window_start: Some("1.3.2025".into()),
            window_end: Some("2025-09-30".into()),
        };
        args.apply(&mut config).unwrap();
        assert_eq!(format_date(config.project_start), "01.03.2025");
        assert_eq!(format_date(config.project_end), "30.09.2025");

        let inverted = WindowArgs { window_start: Some("2030-01-01".into()), window_end: None };
        assert!(inverted.apply(&mut Config::default()).is_err());
        let garbage = WindowArgs { window_start: Some("soon".into()), window_end: None };
        assert!(garbage.apply(&mut Config::default()).is_err());
    }

    #[test]
    fn test_cli_parses_import() {
        use clap::Parser;
        let cli = crate::cli::Cli::try_parse_from([
            "pms", "import", "--tasks", "t.csv", "--window-end", "2025-12-31", "--strict", "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Import { tasks, documents, window, strict } => {
                assert_eq!(tasks, Some(PathBuf::from("t.csv")));
                assert!(documents.is_none());
                assert_eq!(window.window_end.as_deref(), Some("2025-12-31"));
                assert!(strict);
            }
            _ => panic!("expected import"),
        }
    }
}
