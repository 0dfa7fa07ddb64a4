//! Time-window and assignee filtering for reports.
//!
//! Open tasks are placed in time by their due date, completed tasks by the
//! day they were completed. Records missing that date fall outside every
//! window except [`WindowSelection::All`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::task::Task;

use super::{resolve_assignee, AssigneeDirectory};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowParseError {
    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Invalid month (expected YYYY-MM): {0}")]
    InvalidMonth(String),
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month `n` months before this one.
    pub fn months_back(self, n: u32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) - n as i32;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Short label such as `Mar/2024`.
    pub fn label(self) -> String {
        format!(
            "{}/{}",
            MONTH_ABBREVIATIONS[(self.month - 1) as usize],
            self.year
        )
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WindowParseError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Named relative periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    CurrentMonth,
    PreviousMonth,
    #[serde(rename = "last_3_months")]
    LastThreeMonths,
    #[serde(rename = "last_6_months")]
    LastSixMonths,
    CurrentYear,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CurrentMonth => "current_month",
            Self::PreviousMonth => "previous_month",
            Self::LastThreeMonths => "last_3_months",
            Self::LastSixMonths => "last_6_months",
            Self::CurrentYear => "current_year",
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "current_month" => Ok(Self::CurrentMonth),
            "previous_month" => Ok(Self::PreviousMonth),
            "last_3_months" => Ok(Self::LastThreeMonths),
            "last_6_months" => Ok(Self::LastSixMonths),
            "current_year" => Ok(Self::CurrentYear),
            other => Err(WindowParseError::UnknownPeriod(other.to_string())),
        }
    }
}

/// Which slice of time a report covers.
///
/// A named period and an explicit month are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowSelection {
    #[default]
    All,
    Period(ReportPeriod),
    Month(YearMonth),
}

impl WindowSelection {
    /// Parse from the `period` and `month` query values.
    ///
    /// `"all"` or an empty value means no selection. When both are given the
    /// explicit month wins.
    pub fn parse(period: Option<&str>, month: Option<&str>) -> Result<Self, WindowParseError> {
        let is_set = |v: &&str| !v.trim().is_empty() && v.trim() != "all";
        if let Some(month) = month.filter(is_set) {
            return Ok(Self::Month(month.parse()?));
        }
        if let Some(period) = period.filter(is_set) {
            return Ok(Self::Period(period.parse()?));
        }
        Ok(Self::All)
    }

    /// Whether a task falls inside this window, judged at `now`.
    pub fn contains(&self, task: &Task, tz: Tz, now: DateTime<Utc>) -> bool {
        let (Self::Period(_) | Self::Month(_)) = self else {
            return true;
        };
        let Some(date) = reference_date(task, tz) else {
            return false;
        };
        let today = YearMonth::from_date(now.with_timezone(&tz).date_naive());

        match self {
            Self::All => true,
            Self::Month(month) => month.contains(date),
            Self::Period(ReportPeriod::CurrentMonth) => today.contains(date),
            Self::Period(ReportPeriod::PreviousMonth) => today.months_back(1).contains(date),
            Self::Period(ReportPeriod::LastThreeMonths) => {
                date >= today.months_back(3).first_day()
            }
            Self::Period(ReportPeriod::LastSixMonths) => {
                date >= today.months_back(6).first_day()
            }
            Self::Period(ReportPeriod::CurrentYear) => date.year() == today.year,
        }
    }
}

impl fmt::Display for WindowSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Period(period) => write!(f, "{}", period.as_str()),
            Self::Month(month) => write!(f, "{}", month),
        }
    }
}

/// The date that places a task in time: completion day for completed tasks,
/// due date otherwise.
fn reference_date(task: &Task, tz: Tz) -> Option<NaiveDate> {
    if task.status.is_completed() {
        task.completed_at
            .map(|at| at.with_timezone(&tz).date_naive())
    } else {
        task.due_date
    }
}

/// Filters applied before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub assignee: Option<String>,
    pub window: WindowSelection,
}

impl ReportFilter {
    /// Select a named period; clears any explicit month.
    pub fn select_period(&mut self, period: Option<ReportPeriod>) {
        self.window = period.map_or(WindowSelection::All, WindowSelection::Period);
    }

    /// Select an explicit month; clears any named period.
    pub fn select_month(&mut self, month: Option<YearMonth>) {
        self.window = month.map_or(WindowSelection::All, WindowSelection::Month);
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], tz: Tz, now: DateTime<Utc>) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|task| {
                self.assignee
                    .as_deref()
                    .map_or(true, |id| task.assignee_id == id)
            })
            .filter(|task| self.window.contains(task, tz, now))
            .collect()
    }
}

/// Months that have any activity (creation, completion or due date), newest first.
pub fn available_months(tasks: &[Task], tz: Tz) -> Vec<YearMonth> {
    let mut months = BTreeSet::new();
    for task in tasks {
        let local = |at: DateTime<Utc>| at.with_timezone(&tz).date_naive();
        let dates = [
            task.created_at.map(local),
            task.completed_at.map(local),
            task.due_date,
        ];
        months.extend(dates.into_iter().flatten().map(YearMonth::from_date));
    }
    months.into_iter().rev().collect()
}

/// An entry of the assignee filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeOption {
    pub id: String,
    pub name: String,
}

/// Distinct assignees of `tasks`, sorted by display name.
pub fn assignee_options(tasks: &[Task], directory: &AssigneeDirectory) -> Vec<AssigneeOption> {
    let mut seen: HashMap<&str, String> = HashMap::new();
    for task in tasks {
        seen.entry(task.assignee_id.as_str())
            .or_insert_with(|| resolve_assignee(task, directory));
    }
    let mut options: Vec<AssigneeOption> = seen
        .into_iter()
        .map(|(id, name)| AssigneeOption {
            id: id.to_string(),
            name,
        })
        .collect();
    options.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    options
}
