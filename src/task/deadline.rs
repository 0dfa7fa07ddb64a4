//! Deadline evaluation.
//!
//! A task's due instant is its due date combined with its due time in the
//! reference timezone, or the last millisecond of the due date when no time
//! was set. Lateness is judged against that instant:
//!
//! - open tasks are late once the deadline has passed *and* the calendar day
//!   of the deadline is over (a task due today is never late today);
//! - completed tasks are late when they were completed after the deadline,
//!   unless the assignee asserted it was not late.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::types::Task;

/// Justification recorded when the assignee states the task was not late.
pub const NOT_LATE_JUSTIFICATION: &str = "user asserted not late";

/// Lateness classification of a task at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Open task without a deadline.
    Pending,
    OnTime,
    Late,
    CompletedOnTime,
    CompletedLate,
    CompletedLateJustified,
}

impl Classification {
    /// Counted in the on-time column of reports.
    pub fn counts_as_on_time(self) -> bool {
        matches!(
            self,
            Self::OnTime | Self::CompletedOnTime | Self::CompletedLateJustified
        )
    }

    /// Counted in the late column of reports.
    pub fn counts_as_late(self) -> bool {
        matches!(self, Self::Late | Self::CompletedLate)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "No deadline",
            Self::OnTime => "On time",
            Self::Late => "Late",
            Self::CompletedOnTime => "Completed on time",
            Self::CompletedLate => "Completed late",
            Self::CompletedLateJustified => "Completed late (justified)",
        }
    }
}

/// Evaluates deadlines in a fixed reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePolicy {
    tz: Tz,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("23:59:59.999 is a valid time")
}

impl DeadlinePolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar date of an instant in the reference timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Effective due instant. `None` when there is no due date.
    pub fn due_instant(
        &self,
        due_date: Option<NaiveDate>,
        due_time: Option<NaiveTime>,
    ) -> Option<DateTime<Utc>> {
        let date = due_date?;
        let time = due_time.unwrap_or_else(end_of_day);
        Some(self.localize(date.and_time(time)))
    }

    pub fn task_due(&self, task: &Task) -> Option<DateTime<Utc>> {
        self.due_instant(task.due_date, task.due_time)
    }

    /// Resolve a wall-clock time in the reference timezone.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant. Times inside
    /// a DST gap keep the offset in effect before the gap.
    fn localize(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => self
                .tz
                .from_local_datetime(&(naive - Duration::hours(3)))
                .earliest()
                .map(|before| {
                    let offset = before.offset().fix().local_minus_utc();
                    (naive - Duration::seconds(i64::from(offset))).and_utc()
                })
                .unwrap_or_else(|| naive.and_utc()),
        }
    }

    /// Whether an open task is past its deadline at `now`.
    ///
    /// The day of the deadline is a grace period: the task only becomes
    /// overdue once that calendar day is over.
    pub fn is_overdue(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self.task_due(task) {
            Some(due) => now > due && self.local_date(now) != self.local_date(due),
            None => false,
        }
    }

    /// Classify a task at `now`.
    ///
    /// `now` only matters for open tasks; completed tasks are judged by their
    /// completion instant.
    pub fn classify(&self, task: &Task, now: DateTime<Utc>) -> Classification {
        if !task.status.is_completed() {
            return match self.task_due(task) {
                None => Classification::Pending,
                Some(_) if self.is_overdue(task, now) => Classification::Late,
                Some(_) => Classification::OnTime,
            };
        }

        let (Some(due), Some(completed)) = (self.task_due(task), task.completed_at) else {
            return Classification::CompletedOnTime;
        };

        if completed <= due {
            return Classification::CompletedOnTime;
        }

        match task.justification_text() {
            Some(NOT_LATE_JUSTIFICATION) => Classification::CompletedOnTime,
            Some(_) => Classification::CompletedLateJustified,
            None => Classification::CompletedLate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::{Priority, TaskStatus};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn task(due: Option<(i32, u32, u32)>, time: Option<(u32, u32)>) -> Task {
        Task {
            id: "t".to_string(),
            description: "Reconcile accounts".to_string(),
            assignee_id: "u1".to_string(),
            assignee_name: None,
            due_date: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            due_time: time.and_then(|(h, min)| NaiveTime::from_hms_opt(h, min, 0)),
            priority: Priority::Low,
            status: TaskStatus::Pending,
            completed_at: None,
            justification: None,
            created_at: None,
        }
    }

    fn completed(mut t: Task, at: DateTime<Utc>, justification: Option<&str>) -> Task {
        t.status = TaskStatus::Completed;
        t.completed_at = Some(at);
        t.justification = justification.map(str::to_string);
        t
    }

    #[test]
    fn test_due_instant_defaults_to_end_of_day() {
        let policy = DeadlinePolicy::default();
        let due = policy
            .due_instant(NaiveDate::from_ymd_opt(2024, 3, 10), None)
            .unwrap();
        assert_eq!(due, utc(2024, 3, 10, 23, 59, 59) + Duration::milliseconds(999));
        assert_eq!(policy.due_instant(None, NaiveTime::from_hms_opt(9, 0, 0)), None);
    }

    #[test]
    fn test_due_instant_uses_reference_timezone() {
        let policy = DeadlinePolicy::new(chrono_tz::America::Sao_Paulo);
        let due = policy
            .due_instant(
                NaiveDate::from_ymd_opt(2024, 3, 10),
                NaiveTime::from_hms_opt(9, 0, 0),
            )
            .unwrap();
        // Sao Paulo has no DST since 2019: UTC-3.
        assert_eq!(due, utc(2024, 3, 10, 12, 0, 0));
    }

    #[test]
    fn test_due_instant_inside_dst_gap() {
        let policy = DeadlinePolicy::new(chrono_tz::America::New_York);
        // 02:30 does not exist on 2024-03-10 in New York; EST (UTC-5) applies.
        let due = policy
            .due_instant(
                NaiveDate::from_ymd_opt(2024, 3, 10),
                NaiveTime::from_hms_opt(2, 30, 0),
            )
            .unwrap();
        assert_eq!(due, utc(2024, 3, 10, 7, 30, 0));
    }

    #[test]
    fn test_open_task_without_deadline_is_pending() {
        let policy = DeadlinePolicy::default();
        let t = task(None, None);
        assert_eq!(
            policy.classify(&t, utc(2030, 1, 1, 0, 0, 0)),
            Classification::Pending
        );
    }

    #[test]
    fn test_open_task_due_before_today_is_late() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 12, 8, 0, 0);
        for (due, time) in [((2024, 3, 11), None), ((2024, 3, 1), Some((9, 0)))] {
            let t = task(Some(due), time);
            assert_eq!(policy.classify(&t, now), Classification::Late);
        }
    }

    #[test]
    fn test_open_task_due_today_is_never_late() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 10, 22, 0, 0);
        for time in [None, Some((0, 1)), Some((9, 0)), Some((21, 59))] {
            let t = task(Some((2024, 3, 10)), time);
            assert_eq!(policy.classify(&t, now), Classification::OnTime);
            assert!(!policy.is_overdue(&t, now));
        }
    }

    #[test]
    fn test_open_task_due_later_is_on_time() {
        let policy = DeadlinePolicy::default();
        let t = task(Some((2024, 3, 20)), Some((9, 0)));
        assert_eq!(
            policy.classify(&t, utc(2024, 3, 10, 12, 0, 0)),
            Classification::OnTime
        );
    }

    #[test]
    fn test_completion_at_end_of_due_day() {
        let policy = DeadlinePolicy::default();
        let on_time = completed(task(Some((2024, 3, 10)), None), utc(2024, 3, 10, 23, 59, 59), None);
        let late = completed(task(Some((2024, 3, 10)), None), utc(2024, 3, 11, 0, 0, 1), None);
        let now = utc(2024, 4, 1, 0, 0, 0);
        assert_eq!(policy.classify(&on_time, now), Classification::CompletedOnTime);
        assert_eq!(policy.classify(&late, now), Classification::CompletedLate);
    }

    #[test]
    fn test_completion_before_deadline_ignores_justification() {
        let policy = DeadlinePolicy::default();
        let t = completed(
            task(Some((2024, 3, 10)), Some((12, 0))),
            utc(2024, 3, 10, 11, 0, 0),
            Some("Traffic"),
        );
        assert_eq!(
            policy.classify(&t, utc(2024, 3, 20, 0, 0, 0)),
            Classification::CompletedOnTime
        );
    }

    #[test]
    fn test_late_completion_with_justification() {
        let policy = DeadlinePolicy::default();
        let done_at = utc(2024, 3, 15, 10, 0, 0);
        let now = utc(2024, 3, 20, 0, 0, 0);

        let justified = completed(task(Some((2024, 3, 10)), None), done_at, Some("Supplier delay"));
        assert_eq!(
            policy.classify(&justified, now),
            Classification::CompletedLateJustified
        );

        let asserted = completed(
            task(Some((2024, 3, 10)), None),
            done_at,
            Some(NOT_LATE_JUSTIFICATION),
        );
        assert_eq!(policy.classify(&asserted, now), Classification::CompletedOnTime);

        let blank = completed(task(Some((2024, 3, 10)), None), done_at, Some("   "));
        assert_eq!(policy.classify(&blank, now), Classification::CompletedLate);
    }

    #[test]
    fn test_completed_without_dates_defaults_to_on_time() {
        let policy = DeadlinePolicy::default();
        let now = utc(2024, 3, 20, 0, 0, 0);

        let no_due = completed(task(None, None), utc(2024, 3, 15, 0, 0, 0), None);
        assert_eq!(policy.classify(&no_due, now), Classification::CompletedOnTime);

        let mut no_completion = task(Some((2024, 3, 10)), None);
        no_completion.status = TaskStatus::Completed;
        assert_eq!(
            policy.classify(&no_completion, now),
            Classification::CompletedOnTime
        );
    }

    #[test]
    fn test_classify_is_idempotent() {
        let policy = DeadlinePolicy::new(chrono_tz::America::Sao_Paulo);
        let t = completed(
            task(Some((2024, 3, 10)), Some((18, 0))),
            utc(2024, 3, 11, 2, 0, 0),
            Some("Power outage"),
        );
        let now = utc(2024, 3, 12, 0, 0, 0);
        let first = policy.classify(&t, now);
        let second = policy.classify(&t, now);
        assert_eq!(first, second);
        assert_eq!(first, Classification::CompletedLateJustified);
    }

    #[test]
    fn test_report_buckets() {
        assert!(Classification::CompletedLateJustified.counts_as_on_time());
        assert!(!Classification::CompletedLateJustified.counts_as_late());
        assert!(Classification::Late.counts_as_late());
        assert!(!Classification::Pending.counts_as_on_time());
        assert!(!Classification::Pending.counts_as_late());
    }
}
