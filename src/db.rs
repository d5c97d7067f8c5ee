//! Storage interface and the JSON-file backed store.
//!
//! The scheduler talks to storage only through the [`Store`] trait, so the
//! pipeline does not care whether records live in SQL, a document store or
//! memory. [`Database`] keeps everything in memory and persists it as a
//! single JSON file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::*;
use crate::hierarchy::compare_task_numbers;
use crate::task::{Document, NewDocument, NewSubtask, NewTask, Subtask, Task};

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("task number '{0}' already exists")]
    DuplicateTaskNumber(String),

    #[error("store file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Operations the scheduler needs from its backing store.
pub trait Store {
    /// Create a task without parent linkage and return its id.
    fn create_task(&mut self, task: NewTask) -> Result<u64, StoreError>;

    /// Overwrite the payload of an existing task, clearing its parent link.
    fn update_task(&mut self, id: u64, task: NewTask) -> Result<(), StoreError>;

    fn get_task(&self, id: u64) -> Result<Option<Task>, StoreError>;

    fn find_task_by_number(&self, number: &str) -> Result<Option<Task>, StoreError>;

    fn update_task_parent(&mut self, id: u64, parent: Option<u64>) -> Result<(), StoreError>;

    /// Insert or update a document by its sequence number. Returns `(id, created)`.
    fn upsert_document(&mut self, doc: NewDocument) -> Result<(u64, bool), StoreError>;

    /// First document (by sequence number) whose name contains `needle`, ignoring case.
    fn find_document_by_name_contains(&self, needle: &str) -> Result<Option<Document>, StoreError>;

    /// Delete every subtask owned by `task_id`, returning how many were removed.
    fn delete_subtasks_for_task(&mut self, task_id: u64) -> Result<usize, StoreError>;

    fn create_subtask(&mut self, subtask: NewSubtask) -> Result<u64, StoreError>;

    /// Replace all subtasks of `task_id` with `subtasks`.
    ///
    /// The default deletes then inserts one by one; backends with
    /// transactions should override this to make the swap atomic.
    fn replace_subtasks(&mut self, task_id: u64, subtasks: Vec<NewSubtask>) -> Result<usize, StoreError> {
        self.delete_subtasks_for_task(task_id)?;
        let mut created = 0;
        for s in subtasks {
            self.create_subtask(s)?;
            created += 1;
        }
        Ok(created)
    }

    /// Subtasks of a task in due-date order.
    fn subtasks_for_task(&self, task_id: u64) -> Result<Vec<Subtask>, StoreError>;

    fn count_tasks_by_field(&self, field: TaskField) -> Result<BTreeMap<String, usize>, StoreError>;

    /// All tasks ordered by their hierarchical number (`1`, `1.2`, `1.10`, `2`).
    fn list_tasks_ordered_by_number(&self) -> Result<Vec<Task>, StoreError>;
}

/// In-memory store persisted as one JSON file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Database {
    /// Load the store from a JSON file; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        serde_json::from_str(&buf).map_err(StoreError::Corrupt)
    }

    /// Save the store to a JSON file using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn next_subtask_id(&self) -> u64 {
        self.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    fn next_document_id(&self) -> u64 {
        self.documents.iter().map(|d| d.id).max().unwrap_or(0) + 1
    }

    fn task_mut(&mut self, id: u64) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TaskNotFound(id))
    }

    fn has_task(&self, id: u64) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }
}

fn apply_payload(task: &mut Task, new: NewTask) {
    task.task_number = new.task_number;
    task.title = new.title;
    task.description = new.description;
    task.expected_result = new.expected_result;
    task.responsible = new.responsible;
    task.priority = new.priority;
    task.task_type = new.task_type;
    task.recurrence = new.recurrence;
    task.recurrence_label = new.recurrence_label;
    task.start_date = new.start_date;
    task.end_date = new.end_date;
    task.document_id = new.document_id;
    task.parent_id = None;
}

impl Store for Database {
    fn create_task(&mut self, task: NewTask) -> Result<u64, StoreError> {
        if self.tasks.iter().any(|t| t.task_number == task.task_number) {
            return Err(StoreError::DuplicateTaskNumber(task.task_number));
        }
        let now = Utc::now().timestamp();
        let id = self.next_task_id();
        let mut record = Task {
            id,
            task_number: String::new(),
            title: String::new(),
            description: None,
            expected_result: None,
            responsible: None,
            priority: None,
            task_type: None,
            recurrence: RecurrenceCategory::Unspecified,
            recurrence_label: String::new(),
            start_date: None,
            end_date: None,
            parent_id: None,
            document_id: None,
            created_at_utc: now,
            updated_at_utc: now,
        };
        apply_payload(&mut record, task);
        self.tasks.push(record);
        Ok(id)
    }

    fn update_task(&mut self, id: u64, task: NewTask) -> Result<(), StoreError> {
        if self
            .tasks
            .iter()
            .any(|t| t.id != id && t.task_number == task.task_number)
        {
            return Err(StoreError::DuplicateTaskNumber(task.task_number));
        }
        let record = self.task_mut(id)?;
        apply_payload(record, task);
        record.updated_at_utc = Utc::now().timestamp();
        Ok(())
    }

    fn get_task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn find_task_by_number(&self, number: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.iter().find(|t| t.task_number == number).cloned())
    }

    fn update_task_parent(&mut self, id: u64, parent: Option<u64>) -> Result<(), StoreError> {
        if let Some(p) = parent {
            if !self.has_task(p) {
                return Err(StoreError::TaskNotFound(p));
            }
        }
        let record = self.task_mut(id)?;
        if record.parent_id != parent {
            record.parent_id = parent;
            record.updated_at_utc = Utc::now().timestamp();
        }
        Ok(())
    }

    fn upsert_document(&mut self, doc: NewDocument) -> Result<(u64, bool), StoreError> {
        let now = Utc::now().timestamp();
        if let Some(existing) = self.documents.iter_mut().find(|d| d.seq == doc.seq) {
            existing.name = doc.name;
            existing.doc_type = doc.doc_type;
            existing.url = doc.url;
            existing.updated_at_utc = now;
            return Ok((existing.id, false));
        }
        let id = self.next_document_id();
        self.documents.push(Document {
            id,
            seq: doc.seq,
            name: doc.name,
            doc_type: doc.doc_type,
            url: doc.url,
            created_at_utc: now,
            updated_at_utc: now,
        });
        Ok((id, true))
    }

    fn find_document_by_name_contains(&self, needle: &str) -> Result<Option<Document>, StoreError> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        Ok(self
            .documents
            .iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .min_by_key(|d| d.seq)
            .cloned())
    }

    fn delete_subtasks_for_task(&mut self, task_id: u64) -> Result<usize, StoreError> {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.task_id != task_id);
        Ok(before - self.subtasks.len())
    }

    fn create_subtask(&mut self, subtask: NewSubtask) -> Result<u64, StoreError> {
        if !self.has_task(subtask.task_id) {
            return Err(StoreError::TaskNotFound(subtask.task_id));
        }
        let id = self.next_subtask_id();
        self.subtasks.push(Subtask {
            id,
            task_id: subtask.task_id,
            title: subtask.title,
            description: subtask.description,
            due_date: subtask.due_date,
            status: subtask.status,
            created_at_utc: Utc::now().timestamp(),
        });
        Ok(id)
    }

    /// Validates ownership up front so the swap either fully happens or not at all.
    fn replace_subtasks(&mut self, task_id: u64, subtasks: Vec<NewSubtask>) -> Result<usize, StoreError> {
        if !self.has_task(task_id) {
            return Err(StoreError::TaskNotFound(task_id));
        }
        if let Some(stray) = subtasks.iter().find(|s| s.task_id != task_id) {
            return Err(StoreError::TaskNotFound(stray.task_id));
        }
        self.delete_subtasks_for_task(task_id)?;
        let count = subtasks.len();
        let mut next = self.next_subtask_id();
        let now = Utc::now().timestamp();
        self.subtasks.reserve(count);
        for s in subtasks {
            self.subtasks.push(Subtask {
                id: next,
                task_id,
                title: s.title,
                description: s.description,
                due_date: s.due_date,
                status: s.status,
                created_at_utc: now,
            });
            next += 1;
        }
        Ok(count)
    }

    fn subtasks_for_task(&self, task_id: u64) -> Result<Vec<Subtask>, StoreError> {
        let mut out: Vec<Subtask> = self
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.due_date, s.id));
        Ok(out)
    }

    fn count_tasks_by_field(&self, field: TaskField) -> Result<BTreeMap<String, usize>, StoreError> {
        let mut counts = BTreeMap::new();
        for t in &self.tasks {
            let key = match field {
                TaskField::Category => format_category(t.recurrence).to_string(),
                TaskField::Type => t.task_type.clone().unwrap_or_else(|| "-".into()),
                TaskField::Responsible => t.responsible.clone().unwrap_or_else(|| "-".into()),
                TaskField::Priority => t.priority.clone().unwrap_or_else(|| "-".into()),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn list_tasks_ordered_by_number(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.tasks.clone();
        tasks.sort_by(|a, b| compare_task_numbers(&a.task_number, &b.task_number));
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn subtask(task_id: u64, day: u32) -> NewSubtask {
        NewSubtask {
            task_id,
            title: format!("occurrence {day}"),
            description: String::new(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            status: SubtaskStatus::Pending,
        }
    }

    fn doc(seq: u32, name: &str) -> NewDocument {
        NewDocument { seq, name: name.into(), doc_type: None, url: None }
    }

    #[test]
    fn test_duplicate_task_number_rejected() {
        let mut db = Database::default();
        db.create_task(NewTask::new("1", "a", RecurrenceCategory::Monthly)).unwrap();
        let err = db.create_task(NewTask::new("1", "b", RecurrenceCategory::Monthly)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTaskNumber(n) if n == "1"));
    }

    #[test]
    fn test_update_task_clears_parent() {
        let mut db = Database::default();
        let root = db.create_task(NewTask::new("1", "root", RecurrenceCategory::OneTime)).unwrap();
        let child = db.create_task(NewTask::new("1.1", "child", RecurrenceCategory::OneTime)).unwrap();
        db.update_task_parent(child, Some(root)).unwrap();
        db.update_task(child, NewTask::new("1.1", "renamed", RecurrenceCategory::Quarterly)).unwrap();
        let t = db.get_task(child).unwrap().unwrap();
        assert_eq!(t.title, "renamed");
        assert_eq!(t.parent_id, None);
    }

    #[test]
    fn test_update_parent_requires_existing_tasks() {
        let mut db = Database::default();
        let id = db.create_task(NewTask::new("1", "a", RecurrenceCategory::OneTime)).unwrap();
        assert!(matches!(db.update_task_parent(id, Some(99)), Err(StoreError::TaskNotFound(99))));
        assert!(matches!(db.update_task_parent(42, None), Err(StoreError::TaskNotFound(42))));
    }

    #[test]
    fn test_upsert_document_by_seq() {
        let mut db = Database::default();
        let (id, created) = db.upsert_document(doc(7, "Partnership Agreement")).unwrap();
        assert!(created);
        let (again, created) = db.upsert_document(doc(7, "Partnership Agreement v2")).unwrap();
        assert!(!created);
        assert_eq!(id, again);
        assert_eq!(db.documents.len(), 1);
        assert_eq!(db.documents[0].name, "Partnership Agreement v2");
    }

    #[test]
    fn test_find_document_case_insensitive_lowest_seq() {
        let mut db = Database::default();
        db.upsert_document(doc(5, "Grant Contract annex")).unwrap();
        db.upsert_document(doc(2, "GRANT CONTRACT")).unwrap();
        let found = db.find_document_by_name_contains("grant contract").unwrap().unwrap();
        assert_eq!(found.seq, 2);
        assert!(db.find_document_by_name_contains("manual").unwrap().is_none());
        assert!(db.find_document_by_name_contains("  ").unwrap().is_none());
    }

    #[test]
    fn test_replace_subtasks_removes_previous_generation() {
        let mut db = Database::default();
        let a = db.create_task(NewTask::new("1", "a", RecurrenceCategory::Monthly)).unwrap();
        let b = db.create_task(NewTask::new("2", "b", RecurrenceCategory::Monthly)).unwrap();
        db.replace_subtasks(a, vec![subtask(a, 1), subtask(a, 2), subtask(a, 3)]).unwrap();
        db.replace_subtasks(b, vec![subtask(b, 1)]).unwrap();

        let n = db.replace_subtasks(a, vec![subtask(a, 9)]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(db.subtasks_for_task(a).unwrap().len(), 1);
        assert_eq!(db.subtasks_for_task(b).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_subtasks_assigns_fresh_sequential_ids() {
        let mut db = Database::default();
        let a = db.create_task(NewTask::new("1", "a", RecurrenceCategory::Monthly)).unwrap();
        let b = db.create_task(NewTask::new("2", "b", RecurrenceCategory::Monthly)).unwrap();
        db.replace_subtasks(a, (1..=3).map(|d| subtask(a, d)).collect()).unwrap();
        db.replace_subtasks(b, (1..=2).map(|d| subtask(b, d)).collect()).unwrap();
        db.replace_subtasks(a, (10..=13).map(|d| subtask(a, d)).collect()).unwrap();

        let ids: Vec<u64> = db.subtasks_for_task(a).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9]);
        let mut all: Vec<u64> = db.subtasks.iter().map(|s| s.id).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), db.subtasks.len());
        assert_eq!(db.next_subtask_id(), 10);
    }

    #[test]
    fn test_replace_subtasks_rejects_foreign_subtask_without_deleting() {
        let mut db = Database::default();
        let a = db.create_task(NewTask::new("1", "a", RecurrenceCategory::Monthly)).unwrap();
        db.replace_subtasks(a, vec![subtask(a, 1)]).unwrap();
        assert!(db.replace_subtasks(a, vec![subtask(77, 2)]).is_err());
        assert_eq!(db.subtasks_for_task(a).unwrap().len(), 1);
    }

    #[test]
    fn test_count_and_ordering() {
        let mut db = Database::default();
        for (n, c) in [("2", RecurrenceCategory::Monthly), ("1.10", RecurrenceCategory::OneTime), ("1.2", RecurrenceCategory::Monthly)] {
            db.create_task(NewTask::new(n, n, c)).unwrap();
        }
        let counts = db.count_tasks_by_field(TaskField::Category).unwrap();
        assert_eq!(counts["Monthly"], 2);
        assert_eq!(counts["One-time"], 1);
        let types = db.count_tasks_by_field(TaskField::Type).unwrap();
        assert_eq!(types["-"], 3);

        let order: Vec<String> = db
            .list_tasks_ordered_by_number()
            .unwrap()
            .into_iter()
            .map(|t| t.task_number)
            .collect();
        assert_eq!(order, vec!["1.2", "1.10", "2"]);
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let mut db = Database::default();
        let id = db.create_task(NewTask::new("1", "a", RecurrenceCategory::Quarterly)).unwrap();
        db.replace_subtasks(id, vec![subtask(id, 1)]).unwrap();
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.subtasks.len(), 1);
        assert!(Database::load(&dir.path().join("missing.json")).unwrap().tasks.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Database::load(&path), Err(StoreError::Corrupt(_))));
    }
}
