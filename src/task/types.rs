//! Records exchanged with the task store.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::timestamp::lenient;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Awaiting,
    Completed,
}

impl TaskStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In progress",
            Self::Awaiting => "Awaiting",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Awaiting => write!(f, "awaiting"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// A task stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee_id: String,
    /// Denormalised display name of the assignee.
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub due_date: Option<NaiveDate>,
    /// Absent means end of the due date.
    #[serde(default, deserialize_with = "lenient::time")]
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Non-empty justification text, if any.
    pub fn justification_text(&self) -> Option<&str> {
        self.justification
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A user profile tasks can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Fields an admin fills in when creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::time")]
    pub due_time: Option<NaiveTime>,
    #[serde(default)]
    pub priority: Priority,
    /// Left unchanged on edit when absent; new tasks start pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskDraft {
    /// Check required fields. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("Description is required".to_string());
        }
        if self.assignee_id.trim().is_empty() {
            return Err("Assignee is required".to_string());
        }
        if self.due_date.is_none() {
            return Err("Due date is required".to_string());
        }
        if self.status.is_some_and(TaskStatus::is_completed) {
            return Err("Use the completion action to complete a task".to_string());
        }
        Ok(())
    }
}

/// A partial update to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPatch {
    /// Replace the admin-editable fields.
    Edit(TaskDraft),
    /// Mark the task completed.
    Complete {
        completed_at: DateTime<Utc>,
        justification: Option<String>,
    },
    /// Undo a completion: back to pending, completion data cleared.
    Reopen,
}

impl TaskPatch {
    /// JSON body for the store's update call. Cleared fields are explicit nulls.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Edit(draft) => {
                let mut body = json!({
                    "description": draft.description.trim(),
                    "assignee_id": draft.assignee_id,
                    "assignee_name": draft.assignee_name,
                    "due_date": draft.due_date,
                    "due_time": draft.due_time,
                    "priority": draft.priority,
                });
                if let Some(status) = draft.status {
                    body["status"] = json!(status);
                }
                body
            }
            Self::Complete {
                completed_at,
                justification,
            } => json!({
                "status": TaskStatus::Completed,
                "completed_at": completed_at,
                "justification": justification,
            }),
            Self::Reopen => json!({
                "status": TaskStatus::Pending,
                "completed_at": null,
                "justification": null,
            }),
        }
    }

    /// Apply the patch to an in-memory record.
    pub fn apply(&self, task: &mut Task) {
        match self {
            Self::Edit(draft) => {
                task.description = draft.description.trim().to_string();
                task.assignee_id = draft.assignee_id.clone();
                task.assignee_name = draft.assignee_name.clone();
                task.due_date = draft.due_date;
                task.due_time = draft.due_time;
                task.priority = draft.priority;
                if let Some(status) = draft.status {
                    task.status = status;
                }
            }
            Self::Complete {
                completed_at,
                justification,
            } => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(*completed_at);
                task.justification = justification.clone();
            }
            Self::Reopen => {
                task.status = TaskStatus::Pending;
                task.completed_at = None;
                task.justification = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn completed_task() -> Task {
        Task {
            id: "t1".to_string(),
            description: "Quarterly filing".to_string(),
            assignee_id: "u1".to_string(),
            assignee_name: Some("Ana".to_string()),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            due_time: None,
            priority: Priority::High,
            status: TaskStatus::Completed,
            completed_at: Some(Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap()),
            justification: Some("Waiting on the bank".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn test_deserialize_backend_row() {
        let row = json!({
            "id": 42,
            "description": "Send invoices",
            "assignee_id": "u1",
            "due_date": "2024-03-10",
            "due_time": "18:00:00",
            "priority": "medium",
            "status": "in_progress",
            "completed_at": null,
            "justification": null,
            "created_at": "2024-03-01 09:00:00"
        });
        let task: Task = serde_json::from_value(row).unwrap();
        assert_eq!(task.id, "42");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.due_time, NaiveTime::from_hms_opt(18, 0, 0));
        assert_eq!(
            task.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_malformed_dates_become_absent() {
        let row = json!({
            "id": "abc",
            "due_date": "not a date",
            "due_time": 1800,
            "completed_at": "soon"
        });
        let task: Task = serde_json::from_value(row).unwrap();
        assert_eq!(task.due_date, None);
        assert_eq!(task.due_time, None);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_reopen_clears_completion() {
        let mut task = completed_task();
        TaskPatch::Reopen.apply(&mut task);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.justification, None);

        let body = TaskPatch::Reopen.to_json();
        assert_eq!(body["status"], "pending");
        assert!(body["completed_at"].is_null());
        assert!(body["justification"].is_null());
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = TaskDraft {
            description: "Prepare payroll".to_string(),
            assignee_id: "u1".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());

        draft.due_date = None;
        assert_eq!(draft.validate().unwrap_err(), "Due date is required");

        draft.due_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        draft.description = "   ".to_string();
        assert_eq!(draft.validate().unwrap_err(), "Description is required");

        draft.description = "Prepare payroll".to_string();
        draft.status = Some(TaskStatus::Completed);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_edit_without_status_keeps_current_status() {
        let mut task = completed_task();
        task.status = TaskStatus::InProgress;
        task.completed_at = None;
        let draft = TaskDraft {
            description: "Quarterly filing v2".to_string(),
            assignee_id: "u1".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            ..Default::default()
        };

        let patch = TaskPatch::Edit(draft);
        assert!(patch.to_json().get("status").is_none());
        patch.apply(&mut task);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.description, "Quarterly filing v2");

        let mut draft = TaskDraft {
            status: Some(TaskStatus::Awaiting),
            ..Default::default()
        };
        draft.description = "x".to_string();
        let patch = TaskPatch::Edit(draft);
        assert_eq!(patch.to_json()["status"], "awaiting");
        patch.apply(&mut task);
        assert_eq!(task.status, TaskStatus::Awaiting);
    }

    #[test]
    fn test_justification_text_ignores_blank() {
        let mut task = completed_task();
        assert_eq!(task.justification_text(), Some("Waiting on the bank"));
        task.justification = Some("  ".to_string());
        assert_eq!(task.justification_text(), None);
    }
}
