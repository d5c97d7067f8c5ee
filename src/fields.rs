//! Enumerations and field types for scheduled tasks.
//!
//! This module defines the closed set of recurrence categories that drive the
//! scheduler, the lifecycle states of generated subtasks, and the grouping keys
//! used for task statistics.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Recurrence category of a task, selecting its date-generation algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrenceCategory {
    /// A single occurrence at the start of the window.
    OneTime,
    /// First day of every month; covers ongoing, periodic and during-works labels.
    Monthly,
    /// The 1st and the 15th of every month.
    TwiceMonthly,
    /// January, April, July and October 1st.
    Quarterly,
    /// A single occurrence when the window closes.
    AfterCompletion,
    /// Scheduled quarterly.
    AsNeeded,
    /// Missing or unrecognised label; scheduled quarterly.
    Unspecified,
}

impl RecurrenceCategory {
    /// Map a free-text recurrence label to its category.
    ///
    /// Matching ignores case, surrounding whitespace and Slovak diacritics.
    /// Unknown labels map to [`RecurrenceCategory::Unspecified`]; callers that
    /// need to tell "empty" from "unknown" should use [`RecurrenceCategory::recognise`].
    pub fn parse_label(label: &str) -> Self {
        Self::recognise(label).unwrap_or(RecurrenceCategory::Unspecified)
    }

    /// Like [`RecurrenceCategory::parse_label`] but returns `None` for a
    /// non-empty label that matches no known category.
    pub fn recognise(label: &str) -> Option<Self> {
        let folded = fold_label(label);
        let category = match folded.as_str() {
            "" => RecurrenceCategory::Unspecified,
            "one-time" | "one time" | "onetime" | "once" | "jednorazovo" | "jednorazova"
            | "jednorazovy" | "jednorazove" => RecurrenceCategory::OneTime,
            "monthly" | "mesacne" | "priebezne" | "ongoing" | "periodic" | "periodicky"
            | "periodicke" | "pocas realizacie" | "during works" | "during-works" => {
                RecurrenceCategory::Monthly
            }
            "twice-monthly" | "twice monthly" | "2x mesacne" | "2 x mesacne"
            | "dvakrat mesacne" => RecurrenceCategory::TwiceMonthly,
            "quarterly" | "stvrtrocne" | "kvartalne" => RecurrenceCategory::Quarterly,
            "after-completion" | "after completion" | "po ukonceni" | "po skonceni" => {
                RecurrenceCategory::AfterCompletion
            }
            "as-needed" | "as needed" | "podla potreby" | "ad hoc" | "ad-hoc" => {
                RecurrenceCategory::AsNeeded
            }
            _ => return None,
        };
        Some(category)
    }
}

/// Lower-case, trim, collapse inner whitespace and strip Slovak diacritics.
fn fold_label(label: &str) -> String {
    let lowered: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'ä' => 'a',
            'č' => 'c',
            'ď' => 'd',
            'é' => 'e',
            'í' => 'i',
            'ľ' | 'ĺ' => 'l',
            'ň' => 'n',
            'ó' | 'ô' => 'o',
            'ŕ' => 'r',
            'š' => 's',
            'ť' => 't',
            'ú' => 'u',
            'ý' => 'y',
            'ž' => 'z',
            other => other,
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lifecycle state of a generated subtask.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SubtaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
}

/// Task attribute used to group task counts.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TaskField {
    Category,
    Type,
    Responsible,
    Priority,
}

/// Format a recurrence category for display.
pub fn format_category(c: RecurrenceCategory) -> &'static str {
    match c {
        RecurrenceCategory::OneTime => "One-time",
        RecurrenceCategory::Monthly => "Monthly",
        RecurrenceCategory::TwiceMonthly => "Twice monthly",
        RecurrenceCategory::Quarterly => "Quarterly",
        RecurrenceCategory::AfterCompletion => "After completion",
        RecurrenceCategory::AsNeeded => "As needed",
        RecurrenceCategory::Unspecified => "Unspecified",
    }
}

/// Format a subtask status for display.
pub fn format_status(s: SubtaskStatus) -> &'static str {
    match s {
        SubtaskStatus::Pending => "Pending",
        SubtaskStatus::InProgress => "InProgress",
        SubtaskStatus::Completed => "Completed",
        SubtaskStatus::Overdue => "Overdue",
    }
}
