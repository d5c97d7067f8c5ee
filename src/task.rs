//! Task, subtask and document records.
//!
//! A `Task` is one row of the imported work plan, a `Subtask` is one dated
//! occurrence generated from the task's recurrence category, and a `Document`
//! is a source document that tasks may be linked to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A unit of recurring or one-off work, positioned in the hierarchy by its number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub task_number: String,
    pub title: String,
    pub description: Option<String>,
    pub expected_result: Option<String>,
    pub responsible: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub recurrence: RecurrenceCategory,
    /// Recurrence text exactly as it appeared in the source row.
    #[serde(default)]
    pub recurrence_label: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Derived from `task_number` on every import; never authoritative.
    pub parent_id: Option<u64>,
    pub document_id: Option<u64>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// Creation payload for a task; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub task_number: String,
    pub title: String,
    pub description: Option<String>,
    pub expected_result: Option<String>,
    pub responsible: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub recurrence: RecurrenceCategory,
    pub recurrence_label: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub document_id: Option<u64>,
}

impl NewTask {
    /// Minimal payload with only the number, title and category set.
    pub fn new(task_number: &str, title: &str, recurrence: RecurrenceCategory) -> Self {
        NewTask {
            task_number: task_number.to_string(),
            title: title.to_string(),
            description: None,
            expected_result: None,
            responsible: None,
            priority: None,
            task_type: None,
            recurrence,
            recurrence_label: String::new(),
            start_date: None,
            end_date: None,
            document_id: None,
        }
    }
}

/// One scheduled occurrence of a task. Owned exclusively by its task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: SubtaskStatus,
    pub created_at_utc: i64,
}

/// Creation payload for a subtask.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubtask {
    pub task_id: u64,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: SubtaskStatus,
}

/// A source document, keyed by its internal sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub seq: u32,
    pub name: String,
    pub doc_type: Option<String>,
    pub url: Option<String>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// Upsert payload for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub seq: u32,
    pub name: String,
    pub doc_type: Option<String>,
    pub url: Option<String>,
}
