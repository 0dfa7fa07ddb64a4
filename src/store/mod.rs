//! Task persistence and authentication backed by Supabase.
//!
//! The service never owns data: tasks and profiles live in PostgREST
//! collections and sessions come from GoTrue. [`MemoryStore`] stands in for
//! the backend in dev mode and tests.

mod memory;
mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{Profile, Task, TaskDraft, TaskPatch};

pub use memory::MemoryStore;
pub use supabase::SupabaseClient;

pub const TASKS: &str = "tasks";
pub const PROFILES: &str = "profiles";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to {operation}: {status} - {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),
}

/// Equality filters and ordering for a collection read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    /// PostgREST query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|(column, value)| format!("{}=eq.{}", column, urlencoding::encode(value)))
            .collect();
        if let Some((column, descending)) = &self.order {
            let direction = if *descending { "desc" } else { "asc" };
            parts.push(format!("order={}.{}", column, direction));
        }
        parts.join("&")
    }
}

/// Access to tasks and profiles.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, id: &str) -> Result<Task, StoreError>;

    async fn insert_task(&self, draft: &TaskDraft) -> Result<Task, StoreError>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError>;

    async fn delete_task(&self, id: &str) -> Result<(), StoreError>;

    /// Active profiles ordered by name.
    async fn list_active_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    async fn get_profile(&self, id: &str) -> Result<Profile, StoreError>;
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

/// Credential flows delegated to the auth provider.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError>;

    /// Send a password recovery email that links back to `redirect_to`.
    async fn send_recovery(&self, email: &str, redirect_to: Option<&str>) -> Result<(), StoreError>;

    /// Set a new password for the user owning `access_token`.
    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), StoreError>;
}
