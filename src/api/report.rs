//! Performance report endpoints (admin only).

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::error::ApiError;
use super::routes::AppState;
use crate::report::{
    assignee_options, available_months, by_assignee, classify_all, monthly_series,
    report_file_name, summarize, AssigneeDirectory, AssigneeOption, AssigneeStats, MonthlyPoint,
    ReportFilter, ReportWorkbook, Stats, WindowSelection, YearMonth,
};
use crate::task::Task;

const MONTHS_IN_SERIES: usize = 12;
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_report))
        .route("/export", get(export_report))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub month: Option<String>,
    pub assignee: Option<String>,
}

impl ReportQuery {
    fn to_filter(&self) -> Result<ReportFilter, ApiError> {
        let assignee = self
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != "all")
            .map(str::to_string);
        Ok(ReportFilter {
            assignee,
            window: WindowSelection::parse(self.period.as_deref(), self.month.as_deref())?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AppliedFilter {
    pub window: String,
    pub assignee: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub filter: AppliedFilter,
    pub stats: Stats,
    pub by_assignee: Vec<AssigneeStats>,
    pub monthly: Vec<MonthlyPoint>,
    /// Months with activity, for the month selector.
    pub months: Vec<YearMonth>,
    pub assignees: Vec<AssigneeOption>,
}

async fn load(state: &AppState) -> Result<(Vec<Task>, AssigneeDirectory), ApiError> {
    let tasks = state.store.list_tasks().await?;
    let directory = state
        .store
        .list_active_profiles()
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    Ok((tasks, directory))
}

fn parse_query(query: Result<Query<ReportQuery>, QueryRejection>) -> Result<ReportFilter, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    query.to_filter()
}

fn build_report(
    tasks: &[Task],
    directory: &AssigneeDirectory,
    filter: &ReportFilter,
    state: &AppState,
    now: DateTime<Utc>,
) -> ReportResponse {
    let tz = state.policy.timezone();
    let selected = filter.apply(tasks, tz, now);
    let classified = classify_all(selected, &state.policy, now);

    let everything = classify_all(tasks, &state.policy, now);

    ReportResponse {
        filter: AppliedFilter {
            window: filter.window.to_string(),
            assignee: filter.assignee.clone(),
        },
        stats: summarize(&classified),
        by_assignee: by_assignee(&classified, directory),
        monthly: monthly_series(&everything, tz, now, MONTHS_IN_SERIES),
        months: available_months(tasks, tz),
        assignees: assignee_options(tasks, directory),
    }
}

/// GET /api/report - Statistics for the selected window and assignee.
async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    user.require_admin()?;
    let filter = parse_query(query)?;
    let (tasks, directory) = load(&state).await?;
    Ok(Json(build_report(
        &tasks,
        &directory,
        &filter,
        &state,
        Utc::now(),
    )))
}

/// GET /api/report/export - The filtered report as an XLSX download.
async fn export_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    let filter = parse_query(query)?;
    let (tasks, directory) = load(&state).await?;

    let now = Utc::now();
    let tz = state.policy.timezone();
    let classified = classify_all(filter.apply(&tasks, tz, now), &state.policy, now);
    let stats = summarize(&classified);
    let groups = by_assignee(&classified, &directory);

    let bytes = ReportWorkbook::build(&classified, &stats, &groups, &directory, tz).to_xlsx()?;
    let file_name = report_file_name(state.policy.local_date(now));
    tracing::info!(rows = classified.len(), file = %file_name, "Report exported");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter() {
        let query = ReportQuery {
            period: Some("last_3_months".to_string()),
            month: None,
            assignee: Some("all".to_string()),
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.assignee, None);
        assert_eq!(filter.window.to_string(), "last_3_months");

        let query = ReportQuery {
            period: Some("current_month".to_string()),
            month: Some("2024-02".to_string()),
            assignee: Some("u1".to_string()),
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.assignee.as_deref(), Some("u1"));
        assert_eq!(filter.window.to_string(), "2024-02");

        let bad = ReportQuery {
            month: Some("February".to_string()),
            ..Default::default()
        };
        assert!(bad.to_filter().is_err());
    }
}
