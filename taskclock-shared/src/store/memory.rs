/// In-memory store for tests and local runs
///
/// The whole state sits behind one `tokio::sync::Mutex`. A unit of work holds
/// the lock for its entire lifetime and writes into a staged copy of the
/// state; `commit` swaps the copy in, dropping the unit throws it away. This
/// gives the same guarantees the PostgreSQL store gets from row locks and
/// transactions, only coarser: every unit is serialized, not just units on
/// the same project.
///
/// # Example
///
/// ```
/// use taskclock_shared::models::user::CreateUser;
/// use taskclock_shared::store::{memory::MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let user = store.insert_user(CreateUser {
///     name: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "hash".to_string(),
/// }).await?;
///
/// assert_eq!(store.load_user(user.id).await?.map(|u| u.name), Some("alice".to_string()));
/// # Ok(())
/// # }
/// ```

use crate::models::membership::ProjectMember;
use crate::models::project::{CreateProject, Project, ProjectSnapshot};
use crate::models::task::{CreateTask, Task, TaskDelta, TaskStatus};
use crate::models::user::{CreateUser, User};
use crate::store::{Store, StoreError, StoreResult, UnitOfWork};
use crate::time::{Clock, SystemClock};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    projects: Vec<Project>,
    members: Vec<ProjectMember>,
    tasks: Vec<Task>,
}

impl MemoryState {
    fn snapshot(&self, project_id: Uuid) -> Option<ProjectSnapshot> {
        let project = self.projects.iter().find(|p| p.id == project_id)?.clone();

        Some(ProjectSnapshot {
            member_ids: self
                .members
                .iter()
                .filter(|m| m.project_id == project_id)
                .map(|m| m.user_id)
                .collect(),
            tasks: self
                .tasks
                .iter()
                .filter(|t| t.project_id == project_id)
                .cloned()
                .collect(),
            project,
        })
    }

    fn user(&self, user_id: Uuid) -> Option<User> {
        self.users.iter().find(|u| u.id == user_id).cloned()
    }

    fn require_project(&self, project_id: Uuid) -> StoreResult<()> {
        if self.projects.iter().any(|p| p.id == project_id) {
            Ok(())
        } else {
            Err(StoreError::Integrity(format!("project {} does not exist", project_id)))
        }
    }

    fn require_user(&self, user_id: Uuid) -> StoreResult<()> {
        if self.users.iter().any(|u| u.id == user_id) {
            Ok(())
        } else {
            Err(StoreError::Integrity(format!("user {} does not exist", user_id)))
        }
    }
}

/// Store keeping everything in process memory
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store stamping rows with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamping `created_at`/`updated_at` with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            clock: self.clock.clone(),
        }))
    }

    async fn load_project_snapshot(&self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>> {
        Ok(self.state.lock().await.snapshot(project_id))
    }

    async fn list_project_snapshots(&self) -> StoreResult<Vec<ProjectSnapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .projects
            .iter()
            .filter_map(|p| state.snapshot(p.id))
            .collect())
    }

    async fn list_member_project_snapshots(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<Vec<ProjectSnapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .projects
            .iter()
            .filter(|p| project_ids.is_empty() || project_ids.contains(&p.id))
            .filter_map(|p| state.snapshot(p.id))
            .filter(|s| s.is_member(user_id))
            .collect())
    }

    async fn load_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.user(user_id))
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;

        if state.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate(format!("email {} is taken", data.email)));
        }

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_refresh_token(&self, user_id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        match state.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.refresh_token = token.map(str::to_string);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Unit of work holding the store lock and a staged copy of the state
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn load_project_snapshot(&mut self, project_id: Uuid) -> StoreResult<Option<ProjectSnapshot>> {
        Ok(self.staged.snapshot(project_id))
    }

    async fn load_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.staged.user(user_id))
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        self.staged.require_project(data.project_id)?;
        self.staged.require_user(data.initiator_id)?;

        let now = self.clock.now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            deadline: data.deadline,
            initiator_id: data.initiator_id,
            performer_id: None,
            status: TaskStatus::Created,
            begin_at: None,
            done_at: None,
            spent_time: None,
            created_at: now,
            updated_at: now,
        };
        self.staged.tasks.push(task.clone());

        Ok(task)
    }

    async fn update_task(&mut self, task_id: Uuid, delta: TaskDelta) -> StoreResult<Option<Task>> {
        let now = self.clock.now();

        Ok(self
            .staged
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .map(|task| {
                delta.apply(task, now);
                task.clone()
            }))
    }

    async fn assign_performer(&mut self, task_id: Uuid, performer_id: Uuid) -> StoreResult<Option<Task>> {
        self.staged.require_user(performer_id)?;
        let now = self.clock.now();

        Ok(self
            .staged
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .map(|task| {
                task.performer_id = Some(performer_id);
                task.updated_at = now;
                task.clone()
            }))
    }

    async fn delete_task(&mut self, task_id: Uuid) -> StoreResult<bool> {
        let before = self.staged.tasks.len();
        self.staged.tasks.retain(|t| t.id != task_id);
        Ok(self.staged.tasks.len() < before)
    }

    async fn delete_tasks_by_project(&mut self, project_id: Uuid) -> StoreResult<u64> {
        let before = self.staged.tasks.len();
        self.staged.tasks.retain(|t| t.project_id != project_id);
        Ok((before - self.staged.tasks.len()) as u64)
    }

    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project> {
        self.staged.require_user(data.author_id)?;

        let now = self.clock.now();
        let project = Project {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        self.staged.projects.push(project.clone());

        Ok(project)
    }

    async fn delete_project(&mut self, project_id: Uuid) -> StoreResult<bool> {
        if self.staged.tasks.iter().any(|t| t.project_id == project_id) {
            return Err(StoreError::Integrity(format!(
                "project {} still has tasks",
                project_id
            )));
        }

        let before = self.staged.projects.len();
        self.staged.projects.retain(|p| p.id != project_id);
        self.staged.members.retain(|m| m.project_id != project_id);
        Ok(self.staged.projects.len() < before)
    }

    async fn add_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.staged.require_project(project_id)?;
        self.staged.require_user(user_id)?;

        if self
            .staged
            .members
            .iter()
            .any(|m| m.project_id == project_id && m.user_id == user_id)
        {
            return Err(StoreError::Duplicate(format!(
                "user {} is already a member of project {}",
                user_id, project_id
            )));
        }

        self.staged.members.push(ProjectMember {
            project_id,
            user_id,
            created_at: self.clock.now(),
        });
        Ok(())
    }

    async fn remove_member(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let before = self.staged.members.len();
        self.staged
            .members
            .retain(|m| !(m.project_id == project_id && m.user_id == user_id));
        Ok(self.staged.members.len() < before)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn seed_user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut uow = store.begin().await.unwrap();
        let project = uow
            .insert_project(CreateProject {
                title: "Apollo".to_string(),
                description: None,
                author_id: alice.id,
            })
            .await
            .unwrap();
        uow.add_member(project.id, alice.id).await.unwrap();
        uow.commit().await.unwrap();

        let snapshot = store.load_project_snapshot(project.id).await.unwrap().unwrap();
        assert!(snapshot.is_member(alice.id));
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let project_id = {
            let mut uow = store.begin().await.unwrap();
            let project = uow
                .insert_project(CreateProject {
                    title: "Apollo".to_string(),
                    description: None,
                    author_id: alice.id,
                })
                .await
                .unwrap();
            project.id
        };

        assert!(store.load_project_snapshot(project_id).await.unwrap().is_none());
        assert!(store.list_project_snapshots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_sees_its_own_writes() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut uow = store.begin().await.unwrap();
        let project = uow
            .insert_project(CreateProject {
                title: "Apollo".to_string(),
                description: None,
                author_id: alice.id,
            })
            .await
            .unwrap();
        let task = uow
            .insert_task(CreateTask {
                project_id: project.id,
                initiator_id: alice.id,
                title: "Launch".to_string(),
                description: None,
                deadline: Utc::now(),
            })
            .await
            .unwrap();

        let snapshot = uow.load_project_snapshot(project.id).await.unwrap().unwrap();
        assert_eq!(snapshot.task(task.id).map(|t| t.status), Some(TaskStatus::Created));
    }

    #[tokio::test]
    async fn test_duplicate_membership_rejected() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut uow = store.begin().await.unwrap();
        let project = uow
            .insert_project(CreateProject {
                title: "Apollo".to_string(),
                description: None,
                author_id: alice.id,
            })
            .await
            .unwrap();
        uow.add_member(project.id, alice.id).await.unwrap();

        let err = uow.add_member(project.id, alice.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_member_projects_filter() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        let mut uow = store.begin().await.unwrap();
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            let project = uow
                .insert_project(CreateProject {
                    title: title.to_string(),
                    description: None,
                    author_id: alice.id,
                })
                .await
                .unwrap();
            uow.add_member(project.id, alice.id).await.unwrap();
            ids.push(project.id);
        }
        uow.add_member(ids[1], bob.id).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(
            store.list_member_project_snapshots(alice.id, &[]).await.unwrap().len(),
            3
        );

        let bobs = store.list_member_project_snapshots(bob.id, &[]).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id(), ids[1]);

        // Requested projects bob isn't in are skipped
        let filtered = store
            .list_member_project_snapshots(bob.id, &[ids[0], ids[1]])
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "alice").await;

        let err = store
            .insert_user(CreateUser {
                name: "alice2".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }
}
