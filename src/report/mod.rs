//! Performance reporting.
//!
//! # Key Concepts
//! - Classified task: a task paired with its due instant and classification
//! - Stats: on-time / late counts and percentages over a task set
//! - Window: the time filter applied before aggregation
//! - Export: the three-sheet spreadsheet handed to admins

mod export;
mod stats;
mod window;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::task::{Classification, DeadlinePolicy, Task};

pub use export::{report_file_name, CellValue, ExportError, ReportWorkbook, Sheet};
pub use stats::{by_assignee, monthly_series, summarize, AssigneeStats, MonthlyPoint, Stats};
pub use window::{
    assignee_options, available_months, AssigneeOption, ReportFilter, ReportPeriod,
    WindowParseError, WindowSelection, YearMonth,
};

/// Assignee id to display name.
pub type AssigneeDirectory = HashMap<String, String>;

/// A task together with its evaluated deadline.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedTask<'a> {
    pub task: &'a Task,
    pub due_at: Option<DateTime<Utc>>,
    pub classification: Classification,
}

/// Classify every task at `now`.
pub fn classify_all<'a, I>(tasks: I, policy: &DeadlinePolicy, now: DateTime<Utc>) -> Vec<ClassifiedTask<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .map(|task| ClassifiedTask {
            task,
            due_at: policy.task_due(task),
            classification: policy.classify(task, now),
        })
        .collect()
}

/// Display label for a task's assignee.
///
/// Falls back to the task's denormalised name, then to the raw id.
pub fn resolve_assignee(task: &Task, directory: &AssigneeDirectory) -> String {
    directory
        .get(&task.assignee_id)
        .filter(|name| !name.trim().is_empty())
        .cloned()
        .or_else(|| {
            task.assignee_name
                .clone()
                .filter(|name| !name.trim().is_empty())
        })
        .unwrap_or_else(|| task.assignee_id.clone())
}

/// Percentage rounded to one decimal; 0 when `total` is 0.
pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}
