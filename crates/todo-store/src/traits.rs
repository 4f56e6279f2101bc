use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use todo_types::{Project, Todo, TodoDraft};

use crate::error::{EntityKind, StoreError, StoreResult};

/// The concrete backend behind a [`TodoStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Memory,
    Mongo,
    Postgres,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Mongo => "mongo",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(StoreError::InvalidInput(format!(
                "the datastore {other:?} is not supported"
            ))),
        }
    }
}

/// Persistence for projects and their todos.
///
/// Identifiers cross this boundary as strings; each backend parses them into
/// its native form. An identifier that cannot be parsed was never issued, so
/// it is reported as [`StoreError::NotFound`] like any other unknown id.
///
/// Implementations must be `Send + Sync`: one instance serves every request.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> BackendKind;

    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Fetch one todo by identifier.
    async fn get_todo(&self, id: &str) -> StoreResult<Todo>;

    /// Fetch every todo of every project.
    ///
    /// Returns `NotFound` when there are none. Order is backend-defined.
    async fn get_all_todos(&self) -> StoreResult<Vec<Todo>>;

    /// Fetch one project together with its todos.
    async fn get_project(&self, id: &str) -> StoreResult<Project>;

    /// Fetch every project. Returns `NotFound` when there are none.
    async fn get_all_projects(&self) -> StoreResult<Vec<Project>>;

    /// Create a project, optionally seeded with todos, and return its id.
    async fn create_project(&self, name: &str, todos: Vec<TodoDraft>) -> StoreResult<String>;

    /// Create a todo inside an existing project and return the todo's id.
    ///
    /// Fails with `NotFound` if `project_id` does not resolve.
    async fn create_todo(&self, project_id: &str, todo: TodoDraft) -> StoreResult<String>;

    /// Create a standalone todo at a caller-chosen identifier.
    ///
    /// Refuses to overwrite: an occupied id yields `AlreadyInUse` and leaves
    /// the existing todo untouched. Backends that always allocate their own
    /// identifiers keep the default, which reports `Unsupported`.
    async fn create_todo_with_id(&self, id: &str, todo: TodoDraft) -> StoreResult<()> {
        let _ = (id, todo);
        Err(StoreError::Unsupported {
            operation: "creating a todo at a chosen ID",
            backend: self.backend(),
        })
    }

    /// Rename a project.
    async fn rename_project(&self, id: &str, new_name: &str) -> StoreResult<()>;

    /// Replace every editable field of a todo. The identifier is kept.
    async fn update_todo(&self, id: &str, todo: TodoDraft) -> StoreResult<()>;

    /// Delete a project and its todos. Returns the number of projects deleted.
    async fn delete_project(&self, id: &str) -> StoreResult<u64>;

    /// Delete a todo. Returns the number of todos deleted.
    async fn delete_todo(&self, id: &str) -> StoreResult<u64>;
}

/// Turn an empty listing into `NotFound`.
pub fn require_any<T>(items: Vec<T>, kind: EntityKind) -> StoreResult<Vec<T>> {
    if items.is_empty() {
        return Err(StoreError::not_found(kind, "*"));
    }
    Ok(items)
}
