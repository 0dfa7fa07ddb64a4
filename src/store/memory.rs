//! In-process store used in dev mode and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::task::{Profile, Task, TaskDraft, TaskPatch};

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    profiles: Vec<Profile>,
}

/// Tasks and profiles held in memory. Lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Store seeded with profiles.
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tasks: HashMap::new(),
                profiles,
            }),
        }
    }

    /// Insert a fully-formed task as-is, replacing any task with the same id.
    pub async fn put_task(&self, task: Task) {
        self.inner.write().await.tasks.insert(task.id.clone(), task);
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        self.inner
            .read()
            .await
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Task {}", id)))
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let mut task = Task {
            id: Uuid::new_v4().to_string(),
            description: String::new(),
            assignee_id: String::new(),
            assignee_name: None,
            due_date: None,
            due_time: None,
            priority: Default::default(),
            status: Default::default(),
            completed_at: None,
            justification: None,
            created_at: Some(Utc::now()),
        };
        TaskPatch::Edit(draft.clone()).apply(&mut task);

        self.inner
            .write()
            .await
            .tasks
            .insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("Task {}", id)))?;
        patch.apply(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Task {}", id)))
    }

    async fn list_active_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<Profile> = inner.profiles.iter().filter(|p| p.active).cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    async fn get_profile(&self, id: &str) -> Result<Profile, StoreError> {
        self.inner
            .read()
            .await
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Profile {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::NaiveDate;

    fn profile(id: &str, name: &str, active: bool) -> Profile {
        Profile {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            active,
        }
    }

    fn draft() -> TaskDraft {
        TaskDraft {
            description: "  Reconcile accounts ".to_string(),
            assignee_id: "u1".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_then_complete_then_reopen() {
        let store = MemoryStore::default();
        let task = store.insert_task(&draft()).await.unwrap();
        assert_eq!(task.description, "Reconcile accounts");
        assert!(task.created_at.is_some());

        let completed = store
            .update_task(
                &task.id,
                &TaskPatch::Complete {
                    completed_at: Utc::now(),
                    justification: Some("Late invoice".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);

        let reopened = store.update_task(&task.id, &TaskPatch::Reopen).await.unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.completed_at, None);
        assert_eq!(reopened.justification, None);
        assert_eq!(store.get_task(&task.id).await.unwrap(), reopened);
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let store = MemoryStore::default();
        let task = store.insert_task(&draft()).await.unwrap();
        store.delete_task(&task.id).await.unwrap();
        assert!(matches!(
            store.get_task(&task.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.delete_task(&task.id).await.is_err());
        assert!(store.update_task("nope", &TaskPatch::Reopen).await.is_err());
    }

    #[tokio::test]
    async fn test_active_profiles_sorted() {
        let store = MemoryStore::with_profiles(vec![
            profile("2", "Bruno", true),
            profile("1", "Ana", true),
            profile("3", "Caio", false),
        ]);
        let names: Vec<_> = store
            .list_active_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Bruno"]);
        assert_eq!(store.get_profile("3").await.unwrap().name, "Caio");
    }
}
