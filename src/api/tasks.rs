//! Task API endpoints.
//!
//! - List tasks (active, archived or all) with their deadline classification
//! - Create, edit and delete tasks (admin)
//! - Complete a task (assignee or admin)
//! - Unarchive a completed task (admin)

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::error::ApiError;
use super::routes::AppState;
use crate::notify::{self, CompletedTaskEmail, NewTaskEmail};
use crate::store::StoreError;
use crate::task::{
    Classification, DeadlinePolicy, Profile, Task, TaskDraft, TaskPatch, NOT_LATE_JUSTIFICATION,
};

/// Create task routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", put(edit_task).delete(delete_task))
        .route("/:id/complete", post(complete_task))
        .route("/:id/unarchive", post(unarchive_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskView {
    #[default]
    Active,
    Archived,
    All,
}

impl TaskView {
    fn includes(self, task: &Task) -> bool {
        match self {
            Self::Active => !task.status.is_completed(),
            Self::Archived => task.status.is_completed(),
            Self::All => true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub view: TaskView,
}

/// A task with its deadline evaluated at request time.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub due_at: Option<DateTime<Utc>>,
    pub classification: Classification,
    pub classification_label: &'static str,
    pub overdue: bool,
}

impl TaskResponse {
    fn new(task: Task, policy: &DeadlinePolicy, now: DateTime<Utc>) -> Self {
        let classification = policy.classify(&task, now);
        Self {
            due_at: policy.task_due(&task),
            classification,
            classification_label: classification.label(),
            overdue: !task.status.is_completed() && policy.is_overdue(&task, now),
            task,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub justification: Option<String>,
    /// The assignee states the task was not actually late.
    #[serde(default)]
    pub not_late: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/profiles - Active profiles tasks can be assigned to.
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.store.list_active_profiles().await?))
}

/// GET /api/tasks - Tasks visible to the caller.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let now = Utc::now();

    let tasks = state
        .store
        .list_tasks()
        .await?
        .into_iter()
        .filter(|task| user.is_admin || task.assignee_id == user.id)
        .filter(|task| query.view.includes(task))
        .map(|task| TaskResponse::new(task, &state.policy, now))
        .collect();
    Ok(Json(tasks))
}

fn parse_draft(payload: Result<Json<TaskDraft>, JsonRejection>) -> Result<TaskDraft, ApiError> {
    let Json(draft) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    draft.validate().map_err(ApiError::BadRequest)?;
    Ok(draft)
}

/// Fill in the assignee's display name, checking the profile exists.
async fn resolve_assignee(state: &AppState, draft: &mut TaskDraft) -> Result<Profile, ApiError> {
    let profile = match state.store.get_profile(draft.assignee_id.trim()).await {
        Ok(profile) => profile,
        Err(StoreError::NotFound(_)) => {
            return Err(ApiError::BadRequest("Assignee not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    draft.assignee_id = profile.id.clone();
    draft.assignee_name = Some(profile.name.clone());
    Ok(profile)
}

fn format_due(task: &Task, policy: &DeadlinePolicy) -> String {
    match (task.due_date, task.due_time) {
        (Some(date), Some(_)) => policy
            .task_due(task)
            .map(|due| {
                due.with_timezone(&policy.timezone())
                    .format("%d/%m/%Y %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| date.format("%d/%m/%Y").to_string()),
        (Some(date), None) => date.format("%d/%m/%Y").to_string(),
        (None, _) => "-".to_string(),
    }
}

/// POST /api/tasks - Create a task and notify the assignee.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    user.require_admin()?;
    let mut draft = parse_draft(payload)?;
    let profile = resolve_assignee(&state, &mut draft).await?;

    let task = state.store.insert_task(&draft).await?;
    tracing::info!(task_id = %task.id, assignee = %task.assignee_id, "Task created");

    match profile.email.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(to) => {
            let due = format_due(&task, &state.policy);
            let email = notify::new_task_email(
                to,
                &NewTaskEmail {
                    assignee_name: &profile.name,
                    description: &task.description,
                    due: &due,
                    priority: task.priority,
                    app_url: state.config.app_url.as_deref(),
                },
            );
            notify::deliver(state.mailer.as_ref(), email).await;
        }
        None => tracing::debug!(assignee = %profile.id, "Assignee has no email, skipping notification"),
    }

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new(task, &state.policy, Utc::now())),
    ))
}

/// PUT /api/tasks/:id - Replace the editable fields of an open task.
async fn edit_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    user.require_admin()?;
    let mut draft = parse_draft(payload)?;

    let existing = state.store.get_task(&id).await?;
    if existing.status.is_completed() {
        return Err(ApiError::BadRequest(
            "Unarchive the task before editing it".to_string(),
        ));
    }
    resolve_assignee(&state, &mut draft).await?;

    let task = state.store.update_task(&id, &TaskPatch::Edit(draft)).await?;
    tracing::info!(task_id = %task.id, "Task updated");
    Ok(Json(TaskResponse::new(task, &state.policy, Utc::now())))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    state.store.delete_task(&id).await?;
    tracing::info!(task_id = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Justification to record for a completion at `now`.
///
/// "Not late" wins over free text. Text is only kept for overdue tasks, where
/// one of the two is required.
///
/// Overdue here honours the same-day grace, while `classify` compares the
/// completion against the exact due instant, so a same-day completion after
/// the due time asks for nothing and still counts as `CompletedLate`.
fn completion_justification(
    task: &Task,
    req: &CompleteRequest,
    policy: &DeadlinePolicy,
    now: DateTime<Utc>,
) -> Result<Option<String>, ApiError> {
    if req.not_late {
        return Ok(Some(NOT_LATE_JUSTIFICATION.to_string()));
    }
    if !policy.is_overdue(task, now) {
        return Ok(None);
    }
    let text = req
        .justification
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "This task is overdue: provide a justification or mark it as not late".to_string(),
            )
        })?;
    Ok(Some(text.to_string()))
}

/// POST /api/tasks/:id/complete
async fn complete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<CompleteRequest>>,
) -> Result<Json<TaskResponse>, ApiError> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let task = state.store.get_task(&id).await?;

    if !user.is_admin && task.assignee_id != user.id {
        return Err(ApiError::Forbidden(
            "Only the assignee or an admin can complete this task".to_string(),
        ));
    }
    if task.status.is_completed() {
        return Err(ApiError::BadRequest("Task is already completed".to_string()));
    }

    let now = Utc::now();
    let justification = completion_justification(&task, &req, &state.policy, now)?;
    let patch = TaskPatch::Complete {
        completed_at: now,
        justification,
    };
    let task = state.store.update_task(&id, &patch).await?;

    let classification = state.policy.classify(&task, now);
    tracing::info!(
        task_id = %task.id,
        classification = classification.label(),
        "Task completed"
    );

    if !state.config.admin_emails.is_empty() {
        let completed_at = task
            .completed_at
            .map(|at| {
                at.with_timezone(&state.policy.timezone())
                    .format("%d/%m/%Y %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        let assignee_name = task
            .assignee_name
            .clone()
            .unwrap_or_else(|| task.assignee_id.clone());
        let data = CompletedTaskEmail {
            assignee_name: &assignee_name,
            description: &task.description,
            completed_at: &completed_at,
            on_time: classification == Classification::CompletedOnTime,
            justification: task
                .justification_text()
                .filter(|j| *j != NOT_LATE_JUSTIFICATION),
        };
        for admin in &state.config.admin_emails {
            notify::deliver(
                state.mailer.as_ref(),
                notify::task_completed_email(admin, &data),
            )
            .await;
        }
    }

    Ok(Json(TaskResponse::new(task, &state.policy, now)))
}

/// POST /api/tasks/:id/unarchive - Return a completed task to pending.
async fn unarchive_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    user.require_admin()?;
    let task = state.store.get_task(&id).await?;
    if !task.status.is_completed() {
        return Err(ApiError::BadRequest("Task is not completed".to_string()));
    }

    let task = state.store.update_task(&id, &TaskPatch::Reopen).await?;
    tracing::info!(task_id = %task.id, "Task unarchived");
    Ok(Json(TaskResponse::new(task, &state.policy, Utc::now())))
}
