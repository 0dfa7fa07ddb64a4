//! Spreadsheet export of a report.
//!
//! The workbook is assembled as plain tables first so the content can be
//! inspected without parsing XLSX, then written with `rust_xlsxwriter`.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use super::{resolve_assignee, AssigneeDirectory, AssigneeStats, ClassifiedTask, Stats};

const MISSING: &str = "-";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to build spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("Failed to write report file: {0}")]
    Io(#[from] std::io::Error),
}

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One named table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    fn to_worksheet(&self, header_format: &Format) -> Result<Worksheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&self.name)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, header_format)?;
        }
        for (r, row) in self.rows.iter().enumerate() {
            let row_index = (r + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    CellValue::Text(text) => {
                        worksheet.write_string(row_index, col as u16, text)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(row_index, col as u16, *n)?;
                    }
                }
            }
        }
        Ok(worksheet)
    }
}

/// The Tasks, Summary and Performance tables of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportWorkbook {
    pub sheets: Vec<Sheet>,
}

impl ReportWorkbook {
    pub fn build(
        tasks: &[ClassifiedTask<'_>],
        stats: &Stats,
        by_assignee: &[AssigneeStats],
        directory: &AssigneeDirectory,
        tz: Tz,
    ) -> Self {
        Self {
            sheets: vec![
                tasks_sheet(tasks, directory, tz),
                summary_sheet(stats),
                performance_sheet(by_assignee),
            ],
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Serialize to an XLSX byte buffer.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        let header_format = Format::new().set_bold();
        let mut workbook = Workbook::new();
        for sheet in &self.sheets {
            workbook.push_worksheet(sheet.to_worksheet(&header_format)?);
        }
        Ok(workbook.save_to_buffer()?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let bytes = self.to_xlsx()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Download name for a report generated on `date`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("task-report-{}.xlsx", date.format("%Y-%m-%d"))
}

fn format_instant(instant: Option<DateTime<Utc>>, tz: Tz) -> String {
    instant
        .map(|at| at.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn status_label(entry: &ClassifiedTask<'_>) -> String {
    let task = entry.task;
    if !task.status.is_completed() {
        return task.status.label().to_string();
    }
    if task.due_date.is_none() || task.completed_at.is_none() {
        return task.status.label().to_string();
    }
    entry.classification.label().to_string()
}

fn tasks_sheet(tasks: &[ClassifiedTask<'_>], directory: &AssigneeDirectory, tz: Tz) -> Sheet {
    let mut sheet = Sheet::new(
        "Tasks",
        &[
            "Description",
            "Assignee",
            "Due Date",
            "Due Time",
            "Priority",
            "Status",
            "Created At",
            "Completed At",
            "Justification",
        ],
    );

    for entry in tasks {
        let task = entry.task;
        sheet.push(vec![
            task.description.as_str().into(),
            resolve_assignee(task, directory).into(),
            task.due_date
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| MISSING.to_string())
                .into(),
            task.due_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| MISSING.to_string())
                .into(),
            task.priority.label().into(),
            status_label(entry).into(),
            format_instant(task.created_at, tz).into(),
            format_instant(task.completed_at, tz).into(),
            task.justification_text().unwrap_or(MISSING).into(),
        ]);
    }
    sheet
}

fn summary_sheet(stats: &Stats) -> Sheet {
    let mut sheet = Sheet::new("Summary", &["Indicator", "Value"]);
    let rows = [
        ("Total tasks", stats.total.to_string()),
        ("Completed", stats.completed.to_string()),
        ("Active", stats.active.to_string()),
        (
            "On time",
            format!("{} ({:.1}%)", stats.on_time, stats.pct_on_time),
        ),
        ("Late", format!("{} ({:.1}%)", stats.late, stats.pct_late)),
    ];
    for (indicator, value) in rows {
        sheet.push(vec![indicator.into(), value.into()]);
    }
    sheet
}

fn performance_sheet(by_assignee: &[AssigneeStats]) -> Sheet {
    let mut sheet = Sheet::new(
        "Performance",
        &[
            "Assignee",
            "Total",
            "Completed",
            "Active",
            "On Time",
            "Late",
            "% On Time",
        ],
    );
    for group in by_assignee {
        sheet.push(vec![
            group.name.as_str().into(),
            group.total.into(),
            group.completed.into(),
            group.active.into(),
            group.on_time.into(),
            group.late.into(),
            group.pct_on_time.into(),
        ]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{by_assignee, classify_all, summarize};
    use super::*;
    use crate::task::{DeadlinePolicy, Task};

    fn sample_tasks() -> Vec<Task> {
        vec![
            with_time(
                done("1", "u1", (2024, 3, 10), utc(2024, 3, 9, 15), None),
                18,
                0,
            ),
            done("2", "u1", (2024, 3, 10), utc(2024, 3, 12, 10), Some("Supplier delay")),
            open("3", "u2", (2024, 3, 1)),
            {
                let mut t = done("4", "u2", (2024, 3, 1), utc(2024, 3, 2, 10), None);
                t.due_date = None;
                t
            },
        ]
    }

    fn build(tasks: &[Task]) -> ReportWorkbook {
        let policy = DeadlinePolicy::default();
        let classified = classify_all(tasks, &policy, utc(2024, 3, 20, 12));
        let stats = summarize(&classified);
        let mut directory = AssigneeDirectory::new();
        directory.insert("u1".to_string(), "Ana".to_string());
        let groups = by_assignee(&classified, &directory);
        ReportWorkbook::build(&classified, &stats, &groups, &directory, policy.timezone())
    }

    #[test]
    fn test_three_sheets_in_order() {
        let workbook = build(&sample_tasks());
        let names: Vec<_> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Tasks", "Summary", "Performance"]);
    }

    #[test]
    fn test_task_rows() {
        let workbook = build(&sample_tasks());
        let tasks = workbook.sheet("Tasks").unwrap();
        assert_eq!(tasks.headers.len(), 9);
        assert_eq!(tasks.rows.len(), 4);

        let first = &tasks.rows[0];
        assert_eq!(first[1], CellValue::from("Ana"));
        assert_eq!(first[2], CellValue::from("10/03/2024"));
        assert_eq!(first[3], CellValue::from("18:00"));
        assert_eq!(first[4], CellValue::from("Medium"));
        assert_eq!(first[5], CellValue::from("Completed on time"));
        assert_eq!(first[7], CellValue::from("09/03/2024 15:00"));
        assert_eq!(first[8], CellValue::from("-"));

        assert_eq!(tasks.rows[1][5], CellValue::from("Completed late (justified)"));
        assert_eq!(tasks.rows[1][8], CellValue::from("Supplier delay"));

        // open task: status label, missing completion
        assert_eq!(tasks.rows[2][1], CellValue::from("u2"));
        assert_eq!(tasks.rows[2][5], CellValue::from("Pending"));
        assert_eq!(tasks.rows[2][7], CellValue::from("-"));

        // completed without a due date
        assert_eq!(tasks.rows[3][2], CellValue::from("-"));
        assert_eq!(tasks.rows[3][5], CellValue::from("Completed"));
    }

    #[test]
    fn test_summary_and_performance() {
        let workbook = build(&sample_tasks());
        let summary = workbook.sheet("Summary").unwrap();
        assert_eq!(summary.rows[0][1], CellValue::from("4"));
        // on time: 1, 2 (justified), 4 (no due date); late: 3 (overdue)
        assert_eq!(summary.rows[3][1], CellValue::from("3 (75.0%)"));
        assert_eq!(summary.rows[4][1], CellValue::from("1 (25.0%)"));

        let performance = workbook.sheet("Performance").unwrap();
        assert_eq!(performance.rows.len(), 2);
        assert_eq!(performance.rows[0][0], CellValue::from("Ana"));
        assert_eq!(performance.rows[0][1], CellValue::Number(2.0));
        assert_eq!(performance.rows[0][6], CellValue::Number(100.0));
        assert_eq!(performance.rows[1][6], CellValue::Number(50.0));
    }

    #[test]
    fn test_xlsx_buffer_is_zip() {
        let bytes = build(&sample_tasks()).to_xlsx().unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_report_still_exports() {
        let bytes = build(&[]).to_xlsx().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(report_file_name(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()));
        build(&sample_tasks()).save(&path).unwrap();
        assert!(path.ends_with("task-report-2024-03-20.xlsx"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
