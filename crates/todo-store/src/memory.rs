use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use todo_types::{sort_by_id, validate_project_name, Project, Todo, TodoDraft};

use crate::error::{EntityKind, StoreError, StoreResult};
use crate::traits::{require_any, BackendKind, TodoStore};

/// A todo plus the project that owns it, if any.
#[derive(Clone, Debug)]
struct TodoEntry {
    todo: Todo,
    project: Option<String>,
}

#[derive(Clone, Debug)]
struct ProjectEntry {
    name: String,
    /// Owned todo ids in creation order.
    tasks: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: u64,
    projects: HashMap<String, ProjectEntry>,
    todos: HashMap<String, TodoEntry>,
}

impl MemoryState {
    /// Next decimal id not taken by any project or todo.
    fn allocate_id(&mut self) -> String {
        loop {
            self.last_id += 1;
            let id = self.last_id.to_string();
            if !self.projects.contains_key(&id) && !self.todos.contains_key(&id) {
                return id;
            }
        }
    }

    fn project(&self, id: &str, entry: &ProjectEntry) -> Project {
        let tasks = entry
            .tasks
            .iter()
            .filter_map(|todo_id| self.todos.get(todo_id))
            .map(|e| e.todo.clone())
            .collect();
        Project {
            id: id.to_string(),
            name: entry.name.clone(),
            tasks,
        }
    }

    fn insert_todo(&mut self, id: String, draft: TodoDraft, project: Option<String>) {
        let todo = Todo::from_draft(id.clone(), draft, Utc::now());
        self.todos.insert(id, TodoEntry { todo, project });
    }
}

/// In-memory, `HashMap`-based todo store.
///
/// Projects and todos live in one state struct behind a single `RwLock`, so
/// every operation is one critical section. Identifiers come from a shared
/// counter and are rendered as decimal strings. Data is lost on drop.
pub struct InMemoryTodoStore {
    state: RwLock<MemoryState>,
}

impl InMemoryTodoStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Number of projects currently stored.
    pub fn project_count(&self) -> usize {
        self.read().map(|s| s.projects.len()).unwrap_or(0)
    }

    /// Number of todos currently stored, standalone ones included.
    pub fn todo_count(&self) -> usize {
        self.read().map(|s| s.todos.len()).unwrap_or(0)
    }

    /// Remove everything. The id counter keeps counting.
    pub fn clear(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        state.projects.clear();
        state.todos.clear();
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get_todo(&self, id: &str) -> StoreResult<Todo> {
        let state = self.read()?;
        state
            .todos
            .get(id)
            .map(|e| e.todo.clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))
    }

    async fn get_all_todos(&self) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        let todos = state.todos.values().map(|e| e.todo.clone()).collect();
        require_any(todos, EntityKind::Todo)
    }

    async fn get_project(&self, id: &str) -> StoreResult<Project> {
        let state = self.read()?;
        let entry = state
            .projects
            .get(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))?;
        Ok(state.project(id, entry))
    }

    async fn get_all_projects(&self) -> StoreResult<Vec<Project>> {
        let state = self.read()?;
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .map(|(id, entry)| state.project(id, entry))
            .collect();
        sort_by_id(&mut projects, |p| p.id.as_str());
        require_any(projects, EntityKind::Project)
    }

    async fn create_project(&self, name: &str, todos: Vec<TodoDraft>) -> StoreResult<String> {
        validate_project_name(name)?;
        for draft in &todos {
            draft.validate()?;
        }
        let mut state = self.write()?;
        let project_id = state.allocate_id();
        let mut tasks = Vec::with_capacity(todos.len());
        for draft in todos {
            let todo_id = state.allocate_id();
            state.insert_todo(todo_id.clone(), draft, Some(project_id.clone()));
            tasks.push(todo_id);
        }
        state.projects.insert(
            project_id.clone(),
            ProjectEntry {
                name: name.to_string(),
                tasks,
            },
        );
        tracing::debug!(id = %project_id, name, "project created");
        Ok(project_id)
    }

    async fn create_todo(&self, project_id: &str, todo: TodoDraft) -> StoreResult<String> {
        todo.validate()?;
        let mut state = self.write()?;
        if !state.projects.contains_key(project_id) {
            return Err(StoreError::not_found(EntityKind::Project, project_id));
        }
        let todo_id = state.allocate_id();
        state.insert_todo(todo_id.clone(), todo, Some(project_id.to_string()));
        if let Some(entry) = state.projects.get_mut(project_id) {
            entry.tasks.push(todo_id.clone());
        }
        Ok(todo_id)
    }

    async fn create_todo_with_id(&self, id: &str, todo: TodoDraft) -> StoreResult<()> {
        todo.validate()?;
        let mut state = self.write()?;
        if state.todos.contains_key(id) {
            return Err(StoreError::AlreadyInUse { id: id.to_string() });
        }
        state.insert_todo(id.to_string(), todo, None);
        Ok(())
    }

    async fn rename_project(&self, id: &str, new_name: &str) -> StoreResult<()> {
        validate_project_name(new_name)?;
        let mut state = self.write()?;
        let entry = state
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))?;
        entry.name = new_name.to_string();
        Ok(())
    }

    async fn update_todo(&self, id: &str, todo: TodoDraft) -> StoreResult<()> {
        todo.validate()?;
        let mut state = self.write()?;
        let entry = state
            .todos
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))?;
        entry.todo = Todo::from_draft(id, todo, Utc::now());
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> StoreResult<u64> {
        let mut state = self.write()?;
        let entry = state
            .projects
            .remove(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))?;
        for todo_id in &entry.tasks {
            state.todos.remove(todo_id);
        }
        tracing::debug!(id, removed_todos = entry.tasks.len(), "project deleted");
        Ok(1)
    }

    async fn delete_todo(&self, id: &str) -> StoreResult<u64> {
        let mut state = self.write()?;
        let entry = state
            .todos
            .remove(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))?;
        if let Some(project_id) = entry.project {
            if let Some(project) = state.projects.get_mut(&project_id) {
                project.tasks.retain(|t| t != id);
            }
        }
        Ok(1)
    }
}

impl std::fmt::Debug for InMemoryTodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTodoStore")
            .field("project_count", &self.project_count())
            .field("todo_count", &self.todo_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn draft(name: &str) -> TodoDraft {
        TodoDraft::new(name).with_description("x").with_priority("low")
    }

    // -----------------------------------------------------------------------
    // Shared contract
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn passes_conformance_suite() {
        let store = InMemoryTodoStore::new();
        crate::conformance::run_all(&store).await;
    }

    // -----------------------------------------------------------------------
    // Conditional insert
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_with_id_refuses_overwrite() {
        let store = InMemoryTodoStore::new();
        store.create_todo_with_id("1", draft("first")).await.unwrap();

        let err = store
            .create_todo_with_id("1", draft("second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyInUse { ref id } if id == "1"));

        let kept = store.get_todo("1").await.unwrap();
        assert_eq!(kept.name, "first");
    }

    #[tokio::test]
    async fn allocation_skips_caller_chosen_ids() {
        let store = InMemoryTodoStore::new();
        store.create_todo_with_id("1", draft("taken")).await.unwrap();
        let project = store.create_project("p", Vec::new()).await.unwrap();
        assert_eq!(project, "2");
    }

    #[tokio::test]
    async fn standalone_todos_are_listed_but_unowned() {
        let store = InMemoryTodoStore::new();
        store.create_todo_with_id("7", draft("alone")).await.unwrap();
        let project = store.create_project("p", Vec::new()).await.unwrap();

        assert_eq!(store.get_all_todos().await.unwrap().len(), 1);
        assert!(store.get_project(&project).await.unwrap().tasks.is_empty());
        assert_eq!(store.delete_todo("7").await.unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Ownership bookkeeping
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_todo_detaches_from_project() {
        let store = InMemoryTodoStore::new();
        let project = store.create_project("p", vec![draft("a"), draft("b")]).await.unwrap();
        let first = store.get_project(&project).await.unwrap().tasks[0].id.clone();

        store.delete_todo(&first).await.unwrap();
        let remaining = store.get_project(&project).await.unwrap();
        assert_eq!(remaining.tasks.len(), 1);
        assert_eq!(remaining.tasks[0].name, "b");
    }

    #[tokio::test]
    async fn delete_project_drops_owned_todos() {
        let store = InMemoryTodoStore::new();
        let project = store.create_project("p", vec![draft("a"), draft("b")]).await.unwrap();
        assert_eq!(store.todo_count(), 2);

        assert_eq!(store.delete_project(&project).await.unwrap(), 1);
        assert_eq!(store.todo_count(), 0);
        assert_eq!(store.project_count(), 0);
    }

    #[tokio::test]
    async fn projects_list_in_numeric_order() {
        let store = InMemoryTodoStore::new();
        for i in 0..12 {
            store.create_project(&format!("p{i}"), Vec::new()).await.unwrap();
        }
        let ids: Vec<u64> = store
            .get_all_projects()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id.parse().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let store = InMemoryTodoStore::new();
        store.create_project("p", vec![draft("a")]).await.unwrap();
        store.clear().unwrap();
        assert!(store.get_all_projects().await.unwrap_err().is_not_found());
        assert!(store.get_all_todos().await.unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_ids() {
        let store = Arc::new(InMemoryTodoStore::new());
        let project = store.create_project("shared", Vec::new()).await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                let project = project.clone();
                tokio::spawn(async move {
                    store
                        .create_todo(&project, draft(&format!("task {i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
        assert_eq!(store.get_project(&project).await.unwrap().tasks.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_conditional_inserts_have_one_winner() {
        let store = Arc::new(InMemoryTodoStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create_todo_with_id("contested", draft(&format!("writer {i}")))
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => winners += 1,
                Err(StoreError::AlreadyInUse { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryTodoStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryTodoStore"));
        assert!(debug.contains("todo_count"));
    }
}
