//! Subtask materialisation.
//!
//! Turns a task's occurrence dates into subtask records. Regeneration is
//! destructive: the previous generation of a task's subtasks is deleted and a
//! fresh set is created, so manual status changes do not survive a reschedule.

use chrono::NaiveDate;
use tracing::debug;

use crate::db::{Store, StoreError};
use crate::fields::*;
use crate::recurrence::generate_occurrences;
use crate::task::{NewSubtask, Task};
use crate::window::{format_date, DateWindow};

/// Build the subtask payloads for `task`, one per occurrence, in occurrence order.
pub fn build_subtasks(task: &Task, occurrences: &[NaiveDate]) -> Vec<NewSubtask> {
    let total = occurrences.len();
    occurrences
        .iter()
        .enumerate()
        .map(|(i, &due)| NewSubtask {
            task_id: task.id,
            title: subtask_title(&task.title, due, i, total),
            description: subtask_description(task, i, total),
            due_date: due,
            status: SubtaskStatus::Pending,
        })
        .collect()
}

fn subtask_title(title: &str, due: NaiveDate, index: usize, total: usize) -> String {
    if total == 1 {
        format!("{} ({})", title, format_date(due))
    } else {
        format!("{} - {}/{} ({})", title, index + 1, total, format_date(due))
    }
}

fn subtask_description(task: &Task, index: usize, total: usize) -> String {
    let mut parts = Vec::new();
    if let Some(desc) = task.description.as_deref().filter(|s| !s.is_empty()) {
        parts.push(desc.to_string());
    }
    if let Some(result) = task.expected_result.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Expected result: {result}"));
    }
    if let Some(who) = task.responsible.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Responsible: {who}"));
    }
    parts.push(format!("Recurrence: {}", format_category(task.recurrence)));
    parts.push(format!("Priority: {}", task.priority.as_deref().unwrap_or("-")));
    if total > 1 {
        parts.push(format!("Occurrence {} of {}", index + 1, total));
    }
    parts.join("\n")
}

/// Replace every subtask of `task` with one per occurrence. Returns the number created.
pub fn materialize<S: Store + ?Sized>(
    store: &mut S,
    task: &Task,
    occurrences: &[NaiveDate],
) -> Result<usize, StoreError> {
    let subtasks = build_subtasks(task, occurrences);
    let created = store.replace_subtasks(task.id, subtasks)?;
    debug!(task = %task.task_number, subtasks = created, "regenerated subtasks");
    Ok(created)
}

/// Schedule one task against its effective window and regenerate its subtasks.
pub fn reschedule_task<S: Store + ?Sized>(
    store: &mut S,
    task: &Task,
    project: DateWindow,
) -> Result<usize, StoreError> {
    let window = DateWindow::effective(task.start_date, task.end_date, project);
    let occurrences = generate_occurrences(task.recurrence, window.start, window.end);
    materialize(store, task, &occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::task::NewTask;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored_task(db: &mut Database, new: NewTask) -> Task {
        let id = db.create_task(new).unwrap();
        db.get_task(id).unwrap().unwrap()
    }

    #[test]
    fn test_single_occurrence_title_and_description() {
        let mut db = Database::default();
        let mut new = NewTask::new("1", "Kick-off", RecurrenceCategory::OneTime);
        new.description = Some("Opening meeting".into());
        new.responsible = Some("Lead partner".into());
        let task = stored_task(&mut db, new);

        let subs = build_subtasks(&task, &[date(2025, 3, 5)]);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].title, "Kick-off (05.03.2025)");
        assert_eq!(
            subs[0].description,
            "Opening meeting\nResponsible: Lead partner\nRecurrence: One-time\nPriority: -"
        );
        assert_eq!(subs[0].status, SubtaskStatus::Pending);
    }

    #[test]
    fn test_multiple_occurrences_are_numbered() {
        let mut db = Database::default();
        let mut new = NewTask::new("2", "Report", RecurrenceCategory::Quarterly);
        new.priority = Some("High".into());
        new.expected_result = Some("Progress report".into());
        let task = stored_task(&mut db, new);

        let subs = build_subtasks(&task, &[date(2025, 1, 1), date(2025, 4, 1)]);
        assert_eq!(subs[0].title, "Report - 1/2 (01.01.2025)");
        assert_eq!(subs[1].title, "Report - 2/2 (01.04.2025)");
        assert!(subs[1].description.contains("Expected result: Progress report"));
        assert!(subs[1].description.contains("Priority: High"));
        assert!(subs[1].description.ends_with("Occurrence 2 of 2"));
        assert_eq!(subs[1].due_date, date(2025, 4, 1));
    }

    #[test]
    fn test_reschedule_is_destructive_and_matches_occurrence_count() {
        let mut db = Database::default();
        let mut new = NewTask::new("3", "Monitoring", RecurrenceCategory::Monthly);
        new.start_date = Some(date(2025, 1, 1));
        new.end_date = Some(date(2025, 6, 30));
        let task = stored_task(&mut db, new);
        let project = DateWindow::project_default();

        assert_eq!(reschedule_task(&mut db, &task, project).unwrap(), 6);

        let first = db.subtasks_for_task(task.id).unwrap();
        let id = first[0].id;
        db.subtasks.iter_mut().find(|s| s.id == id).unwrap().status = SubtaskStatus::Completed;

        let mut shorter = task.clone();
        shorter.end_date = Some(date(2025, 3, 31));
        assert_eq!(reschedule_task(&mut db, &shorter, project).unwrap(), 3);

        let after = db.subtasks_for_task(task.id).unwrap();
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|s| s.status == SubtaskStatus::Pending));
    }

    #[test]
    fn test_empty_window_clears_subtasks() {
        let mut db = Database::default();
        let mut new = NewTask::new("4", "Late", RecurrenceCategory::Monthly);
        new.start_date = Some(date(2030, 1, 1));
        let task = stored_task(&mut db, new);
        assert_eq!(reschedule_task(&mut db, &task, DateWindow::project_default()).unwrap(), 0);
        assert!(db.subtasks_for_task(task.id).unwrap().is_empty());
    }
}
