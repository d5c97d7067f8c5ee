//! Import pipeline.
//!
//! Documents are upserted first so task rows can link to them. Task rows are
//! then upserted by task number (pass 1), linked to their parents once every
//! id is known (pass 2), and finally scheduled: each task's recurrence is
//! expanded over its effective window and its subtasks regenerated.
//!
//! Row-level defects never abort a run. Each row ends up created, updated,
//! skipped (with a reason) or failed (with the store error), and is logged.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigError, DocumentColumns, TaskColumns};
use crate::db::{Store, StoreError};
use crate::fields::*;
use crate::hierarchy::link_hierarchy;
use crate::materialize::reschedule_task;
use crate::tabular::{read_rows, Row, TabularError};
use crate::task::{NewDocument, NewTask, Task};
use crate::window::{parse_date, DateWindow};

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] TabularError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Settings for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub project_window: DateWindow,
    pub strict_categories: bool,
    pub delimiter: u8,
    pub task_columns: TaskColumns,
    pub document_columns: DocumentColumns,
}

impl ImportOptions {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(ImportOptions {
            project_window: config.project_window(),
            strict_categories: config.strict_categories,
            delimiter: config.delimiter_byte()?,
            task_columns: config.task_columns.clone(),
            document_columns: config.document_columns.clone(),
        })
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            project_window: DateWindow::project_default(),
            strict_categories: false,
            delimiter: crate::tabular::DEFAULT_DELIMITER,
            task_columns: TaskColumns::default(),
            document_columns: DocumentColumns::default(),
        }
    }
}

/// What happened to a single source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub line: u64,
    /// Task number or document sequence number as read from the row.
    pub key: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Default)]
pub struct DocumentReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RowRecord>,
}

impl DocumentReport {
    fn record(&mut self, row: &Row, key: &str, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(RowRecord { line: row.line, key: key.to_string(), outcome });
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Parent links established by hierarchy resolution.
    pub links: usize,
    pub linked_documents: usize,
    pub subtasks: usize,
    /// Tasks whose subtask regeneration failed after the row itself was stored.
    pub schedule_failures: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub outcomes: Vec<RowRecord>,
}

impl ImportReport {
    fn record(&mut self, row: &Row, key: &str, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(RowRecord { line: row.line, key: key.to_string(), outcome });
    }
}

/// Input files of a run; either may be absent.
#[derive(Debug, Clone, Default)]
pub struct ImportSources {
    pub documents: Option<PathBuf>,
    pub tasks: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub documents: Option<DocumentReport>,
    pub tasks: Option<ImportReport>,
}

/// Read both sources and import them, documents first.
pub fn run<S: Store + ?Sized>(
    store: &mut S,
    sources: &ImportSources,
    options: &ImportOptions,
) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::default();
    if let Some(path) = &sources.documents {
        let rows = read_rows(path, options.delimiter)?;
        info!(path = %path.display(), rows = rows.len(), "importing documents");
        report.documents = Some(import_documents(store, &rows, &options.document_columns));
    }
    if let Some(path) = &sources.tasks {
        let rows = read_rows(path, options.delimiter)?;
        info!(path = %path.display(), rows = rows.len(), "importing tasks");
        report.tasks = Some(import_tasks(store, &rows, options)?);
    }
    Ok(report)
}

/// Upsert documents by sequence number.
pub fn import_documents<S: Store + ?Sized>(
    store: &mut S,
    rows: &[Row],
    columns: &DocumentColumns,
) -> DocumentReport {
    let mut report = DocumentReport::default();
    for row in rows {
        let raw = row.get(&columns.seq);
        let seq = match parse_seq(raw) {
            Some(seq) => seq,
            None => {
                let reason = format!("unparseable sequence number '{raw}'");
                warn!(line = row.line, %reason, "skipping document row");
                report.record(row, raw, RowOutcome::Skipped(reason));
                continue;
            }
        };
        let doc = NewDocument {
            seq,
            name: row.get(&columns.name).to_string(),
            doc_type: row.get_opt(&columns.doc_type),
            url: row.get_opt(&columns.url),
        };
        match store.upsert_document(doc) {
            Ok((id, created)) => {
                info!(line = row.line, seq, id, created, "document stored");
                let outcome = if created { RowOutcome::Created } else { RowOutcome::Updated };
                report.record(row, raw, outcome);
            }
            Err(e) => {
                error!(line = row.line, seq, error = %e, "document row failed");
                report.record(row, raw, RowOutcome::Failed(e.to_string()));
            }
        }
    }
    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        failed = report.failed,
        "document import finished"
    );
    report
}

/// Sequence numbers may be written with a trailing dot (`12.`).
fn parse_seq(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches('.').parse().ok()
}

/// Leading text of a source reference, up to its first parenthesis.
pub fn source_prefix(source: &str) -> Option<&str> {
    let head = source.split('(').next().unwrap_or("").trim();
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Normalise a task number as written in the table (`" 1.2. "` becomes `"1.2"`).
pub fn normalise_task_number(raw: &str) -> String {
    raw.trim().trim_end_matches('.').trim().to_string()
}

/// Import task rows: upsert, link hierarchy, then schedule every imported task.
pub fn import_tasks<S: Store + ?Sized>(
    store: &mut S,
    rows: &[Row],
    options: &ImportOptions,
) -> Result<ImportReport, PipelineError> {
    let columns = &options.task_columns;
    let mut report = ImportReport::default();
    let mut batch: Vec<(String, u64)> = Vec::new();

    // Pass 1: upsert every row without parent linkage.
    for row in rows {
        let number = normalise_task_number(row.get(&columns.number));
        if number.is_empty() {
            let reason = "missing task number".to_string();
            warn!(line = row.line, %reason, "skipping task row");
            report.record(row, "", RowOutcome::Skipped(reason));
            continue;
        }

        let label = row.get(&columns.recurrence);
        let recurrence = match RecurrenceCategory::recognise(label) {
            Some(c) => c,
            None if options.strict_categories => {
                let reason = format!("unrecognised recurrence '{label}'");
                warn!(line = row.line, task = %number, %reason, "skipping task row");
                report.record(row, &number, RowOutcome::Skipped(reason));
                continue;
            }
            None => {
                warn!(line = row.line, task = %number, label, "unrecognised recurrence, scheduling quarterly");
                RecurrenceCategory::Unspecified
            }
        };

        let document_id = match source_prefix(row.get(&columns.source)) {
            Some(prefix) => match store.find_document_by_name_contains(prefix) {
                Ok(found) => found.map(|d| d.id),
                Err(e) => {
                    error!(line = row.line, task = %number, error = %e, "task row failed");
                    report.record(row, &number, RowOutcome::Failed(e.to_string()));
                    continue;
                }
            },
            None => None,
        };

        let new = NewTask {
            task_number: number.clone(),
            title: row
                .get_opt(&columns.title)
                .unwrap_or_else(|| format!("Task {number}")),
            description: row.get_opt(&columns.description),
            expected_result: row.get_opt(&columns.expected_result),
            responsible: row.get_opt(&columns.responsible),
            priority: row.get_opt(&columns.priority),
            task_type: row.get_opt(&columns.task_type),
            recurrence,
            recurrence_label: label.to_string(),
            start_date: row_date(row, &columns.start_date, &number),
            end_date: row_date(row, &columns.end_date, &number),
            document_id,
        };

        match upsert_task(store, new) {
            Ok((id, created)) => {
                info!(line = row.line, task = %number, id, created, "task stored");
                if !batch.iter().any(|(n, _)| *n == number) {
                    batch.push((number.clone(), id));
                }
                let outcome = if created { RowOutcome::Created } else { RowOutcome::Updated };
                report.record(row, &number, outcome);
            }
            Err(e) => {
                error!(line = row.line, task = %number, error = %e, "task row failed");
                report.record(row, &number, RowOutcome::Failed(e.to_string()));
            }
        }
    }

    // Pass 2: every id is known now, so children can reach parents created after them.
    report.links = link_hierarchy(store, &batch)?;

    // Pass 3: expand recurrences and regenerate subtasks, one task at a time.
    // Breakdowns come from the stored task, which reflects the last row for its number.
    for (number, id) in &batch {
        let scheduled = match store.get_task(*id) {
            Ok(Some(task)) => {
                tally(&mut report, &task);
                reschedule_task(store, &task, options.project_window)
            }
            Ok(None) => Err(StoreError::TaskNotFound(*id)),
            Err(e) => Err(e),
        };
        match scheduled {
            Ok(n) => report.subtasks += n,
            Err(e) => {
                error!(task = %number, error = %e, "subtask regeneration failed");
                report.schedule_failures += 1;
            }
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        failed = report.failed,
        links = report.links,
        subtasks = report.subtasks,
        "task import finished"
    );
    Ok(report)
}

fn tally(report: &mut ImportReport, task: &Task) {
    if task.document_id.is_some() {
        report.linked_documents += 1;
    }
    *report
        .by_category
        .entry(format_category(task.recurrence).to_string())
        .or_insert(0) += 1;
    let task_type = task.task_type.clone().unwrap_or_else(|| "-".into());
    *report.by_type.entry(task_type).or_insert(0) += 1;
}

fn upsert_task<S: Store + ?Sized>(store: &mut S, new: NewTask) -> Result<(u64, bool), StoreError> {
    match store.find_task_by_number(&new.task_number)? {
        Some(existing) => {
            store.update_task(existing.id, new)?;
            Ok((existing.id, false))
        }
        None => Ok((store.create_task(new)?, true)),
    }
}

fn row_date(row: &Row, column: &str, number: &str) -> Option<chrono::NaiveDate> {
    let raw = row.get(column);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        warn!(line = row.line, task = %number, column, value = raw, "unparseable date ignored");
    }
    parsed
}
