//! Aggregation of classified tasks into report figures.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::window::YearMonth;
use super::{percentage, resolve_assignee, AssigneeDirectory, ClassifiedTask};

/// Summary figures over a task set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub on_time: usize,
    pub late: usize,
    pub pct_on_time: f64,
    pub pct_late: f64,
}

/// Per-assignee breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeStats {
    pub assignee_id: String,
    pub name: String,
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub on_time: usize,
    pub late: usize,
    pub pct_on_time: f64,
}

/// One point of the monthly on-time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub label: String,
    pub pct_on_time: f64,
}

/// Summarize a set of classified tasks.
pub fn summarize(tasks: &[ClassifiedTask<'_>]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.task.status.is_completed()).count();
    let on_time = tasks
        .iter()
        .filter(|t| t.classification.counts_as_on_time())
        .count();
    let late = tasks
        .iter()
        .filter(|t| t.classification.counts_as_late())
        .count();

    Stats {
        total,
        completed,
        active: total - completed,
        on_time,
        late,
        pct_on_time: percentage(on_time, total),
        pct_late: percentage(late, total),
    }
}

/// Group tasks by assignee, keeping the order in which assignees first appear.
pub fn by_assignee(
    tasks: &[ClassifiedTask<'_>],
    directory: &AssigneeDirectory,
) -> Vec<AssigneeStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<AssigneeStats> = Vec::new();

    for entry in tasks {
        let task = entry.task;
        let slot = *index.entry(task.assignee_id.as_str()).or_insert_with(|| {
            groups.push(AssigneeStats {
                assignee_id: task.assignee_id.clone(),
                name: resolve_assignee(task, directory),
                total: 0,
                completed: 0,
                active: 0,
                on_time: 0,
                late: 0,
                pct_on_time: 0.0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.total += 1;
        if task.status.is_completed() {
            group.completed += 1;
        } else {
            group.active += 1;
        }
        if entry.classification.counts_as_on_time() {
            group.on_time += 1;
        } else if entry.classification.counts_as_late() {
            group.late += 1;
        }
    }

    for group in &mut groups {
        group.pct_on_time = percentage(group.on_time, group.total);
    }
    groups
}

/// On-time percentage of completions for each of the trailing `month_count`
/// months, oldest first, ending with the month containing `now`.
///
/// Only completed tasks with both a due date and a completion instant count.
/// Months without such tasks report 0.
pub fn monthly_series(
    tasks: &[ClassifiedTask<'_>],
    tz: Tz,
    now: DateTime<Utc>,
    month_count: usize,
) -> Vec<MonthlyPoint> {
    let current = YearMonth::from_date(now.with_timezone(&tz).date_naive());

    (0..month_count)
        .rev()
        .map(|back| {
            let month = current.months_back(back as u32);
            let (mut on_time, mut total) = (0usize, 0usize);

            for entry in tasks {
                let Some(completed_at) = entry.task.completed_at else {
                    continue;
                };
                if entry.due_at.is_none() {
                    continue;
                }
                let local = completed_at.with_timezone(&tz);
                if local.year() != month.year || local.month() != month.month {
                    continue;
                }
                total += 1;
                if entry.classification.counts_as_on_time() {
                    on_time += 1;
                }
            }

            MonthlyPoint {
                month,
                label: month.label(),
                pct_on_time: percentage(on_time, total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::classify_all;
    use super::*;
    use crate::task::{DeadlinePolicy, NOT_LATE_JUSTIFICATION};

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), Stats::default());
        let stats = summarize(&[]);
        assert_eq!(stats.pct_on_time, 0.0);
        assert_eq!(stats.pct_late, 0.0);
    }

    #[test]
    fn test_summarize_mixed() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 12);
        let tasks = vec![
            done("1", "u1", (2024, 3, 10), utc(2024, 3, 9, 10), None),
            done("2", "u1", (2024, 3, 10), utc(2024, 3, 12, 10), None),
            done("3", "u2", (2024, 3, 10), utc(2024, 3, 12, 10), Some("Bank holiday")),
            open("4", "u2", (2024, 3, 1)),
            open("5", "u3", (2024, 3, 25)),
            {
                let mut t = open("6", "u3", (2024, 3, 25));
                t.due_date = None;
                t
            },
        ];
        let classified = classify_all(&tasks, &policy, now);
        let stats = summarize(&classified);

        assert_eq!(stats.total, 6);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.active, 3);
        // 1 completed on time, 3 justified, 5 open and not yet due
        assert_eq!(stats.on_time, 3);
        // 2 completed late, 4 overdue
        assert_eq!(stats.late, 2);
        assert_eq!(stats.pct_on_time, 50.0);
        assert_eq!(stats.pct_late, 33.3);
    }

    #[test]
    fn test_by_assignee_same_person() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 12);
        let tasks = vec![
            done("1", "u1", (2024, 3, 10), utc(2024, 3, 10, 8), None),
            open("2", "u1", (2024, 3, 5)),
        ];
        let classified = classify_all(&tasks, &policy, now);
        let groups = by_assignee(&classified, &AssigneeDirectory::new());

        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.assignee_id, "u1");
        assert_eq!(g.name, "u1");
        assert_eq!(
            (g.total, g.completed, g.active, g.on_time, g.late),
            (2, 1, 1, 1, 1)
        );
        assert_eq!(g.pct_on_time, 50.0);
    }

    #[test]
    fn test_by_assignee_keeps_first_seen_order_and_names() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 12);
        let tasks = vec![
            open("1", "u2", (2024, 3, 25)),
            open("2", "u1", (2024, 3, 25)),
            open("3", "u2", (2024, 3, 25)),
        ];
        let mut directory = AssigneeDirectory::new();
        directory.insert("u1".to_string(), "Carla".to_string());
        directory.insert("u2".to_string(), "Diego".to_string());

        let classified = classify_all(&tasks, &policy, now);
        let groups = by_assignee(&classified, &directory);
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Diego", "Carla"]);
        assert_eq!(groups[0].total, 2);
    }

    #[test]
    fn test_monthly_series_trailing_months() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 12);
        let tasks = vec![
            done("1", "u1", (2024, 3, 10), utc(2024, 3, 9, 10), None),
            done("2", "u1", (2024, 3, 10), utc(2024, 3, 15, 10), None),
            done("3", "u1", (2024, 1, 10), utc(2024, 1, 20, 10), Some(NOT_LATE_JUSTIFICATION)),
            // completed long before the window
            done("4", "u1", (2022, 1, 10), utc(2022, 1, 9, 10), None),
            open("5", "u1", (2024, 2, 10)),
        ];
        let classified = classify_all(&tasks, &policy, now);
        let series = monthly_series(&classified, policy.timezone(), now, 12);

        assert_eq!(series.len(), 12);
        assert_eq!(series[0].label, "Apr/2023");
        assert_eq!(series[11].label, "Mar/2024");
        assert_eq!(series[11].pct_on_time, 50.0);
        assert_eq!(series[10].label, "Feb/2024");
        assert_eq!(series[10].pct_on_time, 0.0);
        assert_eq!(series[9].label, "Jan/2024");
        assert_eq!(series[9].pct_on_time, 100.0);
    }

    #[test]
    fn test_monthly_series_skips_tasks_without_due_date() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 12);
        let mut no_due = done("1", "u1", (2024, 3, 10), utc(2024, 3, 15, 10), None);
        no_due.due_date = None;
        let tasks = vec![no_due];
        let classified = classify_all(&tasks, &policy, now);
        let series = monthly_series(&classified, policy.timezone(), now, 3);

        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|p| p.pct_on_time == 0.0));
    }
}
