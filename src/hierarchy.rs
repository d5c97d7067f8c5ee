//! Task hierarchy resolution from dot-segmented task numbers.
//!
//! The parent of task `1.2.3` is task `1.2`; a single-segment number has no
//! parent. Storage ids only exist once every task in a batch has been created,
//! so linking happens in a second pass over a `number -> id` index.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::db::{Store, StoreError};
use crate::task::Task;

/// Number of the parent task: everything before the last `.`, or `None`.
pub fn parent_number(number: &str) -> Option<&str> {
    let (parent, _) = number.rsplit_once('.')?;
    if parent.is_empty() {
        None
    } else {
        Some(parent)
    }
}

/// Order task numbers segment by segment, numerically where both segments are numbers.
///
/// `1.2` < `1.10` < `2`; a prefix sorts before its extensions (`1` < `1.1`).
pub fn compare_task_numbers(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.trim().parse::<u64>(), r.trim().parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Resolve each task's parent id from the batch's `(number, id)` pairs.
///
/// Only the direct parent number is looked up; when it is absent from the
/// batch the result is `None` even if a more distant ancestor exists.
pub fn resolve_parents(batch: &[(String, u64)]) -> Vec<(u64, Option<u64>)> {
    let index: HashMap<&str, u64> = batch.iter().map(|(n, id)| (n.as_str(), *id)).collect();
    batch
        .iter()
        .map(|(number, id)| {
            let parent = parent_number(number)
                .and_then(|p| index.get(p).copied())
                .filter(|p| p != id);
            (*id, parent)
        })
        .collect()
}

/// Second pass: write every task's resolved parent to the store.
///
/// Returns the number of parent links established.
pub fn link_hierarchy<S: Store + ?Sized>(
    store: &mut S,
    batch: &[(String, u64)],
) -> Result<usize, StoreError> {
    let mut links = 0;
    for (id, parent) in resolve_parents(batch) {
        store.update_task_parent(id, parent)?;
        if let Some(p) = parent {
            debug!(task_id = id, parent_id = p, "linked task to parent");
            links += 1;
        }
    }
    Ok(links)
}

/// Depth of every task below its root, for indented listings.
pub fn depth_map(tasks: &[Task]) -> HashMap<u64, usize> {
    let parents: HashMap<u64, Option<u64>> = tasks.iter().map(|t| (t.id, t.parent_id)).collect();
    tasks
        .iter()
        .map(|t| {
            let mut depth = 0;
            let mut cursor = t.parent_id;
            while let Some(p) = cursor {
                depth += 1;
                // Guard against corrupted stores with parent cycles.
                if depth > tasks.len() {
                    break;
                }
                cursor = parents.get(&p).copied().flatten();
            }
            (t.id, depth)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::fields::RecurrenceCategory;
    use crate::task::NewTask;

    fn batch(numbers: &[&str]) -> Vec<(String, u64)> {
        numbers
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u64 + 1))
            .collect()
    }

    fn parent_of(resolved: &[(u64, Option<u64>)], id: u64) -> Option<u64> {
        resolved.iter().find(|(i, _)| *i == id).and_then(|(_, p)| *p)
    }

    #[test]
    fn test_parent_number() {
        assert_eq!(parent_number("1.2.3"), Some("1.2"));
        assert_eq!(parent_number("1.2"), Some("1"));
        assert_eq!(parent_number("1"), None);
        assert_eq!(parent_number(".5"), None);
    }

    #[test]
    fn test_resolve_full_chain() {
        // ids: "1" -> 1, "1.2" -> 2, "1.2.1" -> 3, "2" -> 4
        let resolved = resolve_parents(&batch(&["1", "1.2", "1.2.1", "2"]));
        assert_eq!(parent_of(&resolved, 3), Some(2));
        assert_eq!(parent_of(&resolved, 2), Some(1));
        assert_eq!(parent_of(&resolved, 1), None);
        assert_eq!(parent_of(&resolved, 4), None);
    }

    #[test]
    fn test_missing_direct_parent_is_not_climbed() {
        let resolved = resolve_parents(&batch(&["1", "1.2.1"]));
        assert_eq!(parent_of(&resolved, 2), None);
    }

    #[test]
    fn test_child_before_parent_in_source_order() {
        let resolved = resolve_parents(&batch(&["3.1", "3"]));
        assert_eq!(parent_of(&resolved, 1), Some(2));
    }

    #[test]
    fn test_compare_task_numbers() {
        let mut numbers = vec!["2", "1.10", "1.2", "1", "10", "1.2.1"];
        numbers.sort_by(|a, b| compare_task_numbers(a, b));
        assert_eq!(numbers, vec!["1", "1.2", "1.2.1", "1.10", "2", "10"]);
    }

    #[test]
    fn test_link_hierarchy_updates_store() {
        let mut db = Database::default();
        let mut created = Vec::new();
        for n in ["1.1", "1", "2.1"] {
            let id = db.create_task(NewTask::new(n, "t", RecurrenceCategory::OneTime)).unwrap();
            created.push((n.to_string(), id));
        }
        let links = link_hierarchy(&mut db, &created).unwrap();
        assert_eq!(links, 1);

        let tasks = db.list_tasks_ordered_by_number().unwrap();
        let child = tasks.iter().find(|t| t.task_number == "1.1").unwrap();
        let root = tasks.iter().find(|t| t.task_number == "1").unwrap();
        assert_eq!(child.parent_id, Some(root.id));
        assert!(tasks.iter().find(|t| t.task_number == "2.1").unwrap().parent_id.is_none());

        let depths = depth_map(&tasks);
        assert_eq!(depths[&child.id], 1);
        assert_eq!(depths[&root.id], 0);
    }
}
