//! Supabase client for the PostgREST and GoTrue APIs.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{AuthGateway, Query, Session, StoreError, TaskStore, PROFILES, TASKS};
use crate::task::{Profile, Task, TaskDraft, TaskPatch, TaskStatus};

/// Supabase client for database and auth operations.
pub struct SupabaseClient {
    client: Client,
    url: String,
    service_role_key: String,
    anon_key: String,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    ///
    /// Data calls use the service role key; auth calls use the anon key.
    pub fn new(url: &str, service_role_key: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }

    fn with_service_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    async fn read_body(resp: Response, operation: &str) -> Result<String, StoreError> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    // ==================== Collections ====================

    /// Read rows of a collection.
    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<T>, StoreError> {
        let mut url = format!("{}/{}", self.rest_url(), collection);
        let qs = query.to_query_string();
        if !qs.is_empty() {
            url.push('?');
            url.push_str(&qs);
        }

        let resp = self.with_service_headers(self.client.get(url)).send().await?;
        let text = Self::read_body(resp, &format!("query {}", collection)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        collection: &str,
        record: &B,
    ) -> Result<T, StoreError> {
        let resp = self
            .with_service_headers(self.client.post(format!("{}/{}", self.rest_url(), collection)))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let text = Self::read_body(resp, &format!("insert into {}", collection)).await?;
        let rows: Vec<T> = serde_json::from_str(&text)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("Inserted {} row", collection)))
    }

    /// Patch the row with `id` and return it as stored.
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        patch: &B,
    ) -> Result<T, StoreError> {
        let resp = self
            .with_service_headers(self.client.patch(format!(
                "{}/{}?id=eq.{}",
                self.rest_url(),
                collection,
                urlencoding::encode(id)
            )))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        let text = Self::read_body(resp, &format!("update {}", collection)).await?;
        let rows: Vec<T> = serde_json::from_str(&text)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", collection, id)))
    }

    /// Delete the row with `id`.
    pub async fn delete_one(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .with_service_headers(self.client.delete(format!(
                "{}/{}?id=eq.{}",
                self.rest_url(),
                collection,
                urlencoding::encode(id)
            )))
            .send()
            .await?;

        Self::read_body(resp, &format!("delete from {}", collection)).await?;
        Ok(())
    }

    async fn get_one<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T, StoreError> {
        let rows: Vec<T> = self.query(collection, &Query::new().eq("id", id)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", collection, id)))
    }
}

#[async_trait]
impl TaskStore for SupabaseClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.query(TASKS, &Query::new().order_by("created_at", true))
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        self.get_one(TASKS, id).await
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let mut draft = draft.clone();
        draft.status.get_or_insert(TaskStatus::Pending);
        let body = TaskPatch::Edit(draft).to_json();
        let task: Task = self.insert(TASKS, &body).await?;
        tracing::debug!(task_id = %task.id, "Inserted task");
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.update(TASKS, id, &patch.to_json()).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.delete_one(TASKS, id).await
    }

    async fn list_active_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.query(
            PROFILES,
            &Query::new().eq("active", true).order_by("name", false),
        )
        .await
    }

    async fn get_profile(&self, id: &str) -> Result<Profile, StoreError> {
        self.get_one(PROFILES, id).await
    }
}

#[async_trait]
impl AuthGateway for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let resp = self
            .client
            .post(format!("{}/token?grant_type=password", self.auth_url()))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let text = Self::read_body(resp, "sign in").await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_recovery(&self, email: &str, redirect_to: Option<&str>) -> Result<(), StoreError> {
        let mut url = format!("{}/recover", self.auth_url());
        if let Some(redirect) = redirect_to {
            url.push_str("?redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }

        let resp = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        Self::read_body(resp, "send recovery email").await?;
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(format!("{}/user", self.auth_url()))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;

        Self::read_body(resp, "update password").await?;
        Ok(())
    }
}
