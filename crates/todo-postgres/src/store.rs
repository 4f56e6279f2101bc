use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use todo_store::{require_any, BackendKind, EntityKind, StoreError, StoreResult, TodoStore};
use todo_types::{validate_project_name, Project, Todo, TodoDraft};

use crate::rows::{ProjectRow, TodoRow, TODO_COLUMNS};
use crate::schema::SCHEMA;

/// Todo store over the `projects` and `todos` tables.
///
/// Every mutation is a single statement (or one transaction), so concurrent
/// requests never observe a half-applied change.
#[derive(Clone, Debug)]
pub struct PostgresTodoStore {
    pool: PgPool,
}

impl PostgresTodoStore {
    pub async fn connect_with(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect to postgres: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("migrate"))?;
        }
        tracing::info!("postgres schema is up to date");
        Ok(())
    }

    /// Remove every project and todo and restart the id sequences.
    pub async fn truncate(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE todos, projects RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(db_error("truncate"))?;
        Ok(())
    }

    /// A read-only transaction whose statements all see one snapshot.
    async fn snapshot(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error("set snapshot"))?;
        Ok(tx)
    }
}

async fn todos_of(conn: &mut PgConnection, projname: &str) -> StoreResult<Vec<Todo>> {
    let rows = sqlx::query_as::<_, TodoRow>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE projname = $1 ORDER BY id"
    ))
    .bind(projname)
    .fetch_all(conn)
    .await
    .map_err(db_error("select project todos"))?;
    Ok(rows.into_iter().map(Todo::from).collect())
}

/// Ids are serial integers written in canonical decimal; any other
/// spelling (a sign, leading zeros, whitespace) was never issued.
fn parse_id(kind: EntityKind, id: &str) -> StoreResult<i32> {
    let canonical = !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && (id == "0" || !id.starts_with('0'));
    if !canonical {
        return Err(StoreError::not_found(kind, id));
    }
    id.parse::<i32>()
        .map_err(|_| StoreError::not_found(kind, id))
}

fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        tracing::warn!(operation, error = %e, "postgres operation failed");
        StoreError::Backend(format!("{operation}: {e}"))
    }
}

fn require_affected(rows: u64, kind: EntityKind, id: &str) -> StoreResult<u64> {
    if rows == 0 {
        return Err(StoreError::not_found(kind, id));
    }
    Ok(rows)
}

#[async_trait]
impl TodoStore for PostgresTodoStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("ping"))?;
        Ok(())
    }

    async fn get_todo(&self, id: &str) -> StoreResult<Todo> {
        let key = parse_id(EntityKind::Todo, id)?;
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("select todo"))?;
        row.map(Todo::from)
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))
    }

    async fn get_all_todos(&self) -> StoreResult<Vec<Todo>> {
        let rows = sqlx::query_as::<_, TodoRow>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("select todos"))?;
        require_any(rows.into_iter().map(Todo::from).collect(), EntityKind::Todo)
    }

    async fn get_project(&self, id: &str) -> StoreResult<Project> {
        let key = parse_id(EntityKind::Project, id)?;
        let mut tx = self.snapshot().await?;
        let row = sqlx::query_as::<_, ProjectRow>("SELECT id, projname FROM projects WHERE id = $1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("select project"))?
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))?;

        let tasks = todos_of(&mut tx, &row.projname).await?;
        tx.commit().await.map_err(db_error("commit"))?;
        Ok(Project {
            id: row.id.to_string(),
            name: row.projname,
            tasks,
        })
    }

    async fn get_all_projects(&self) -> StoreResult<Vec<Project>> {
        let mut tx = self.snapshot().await?;
        let projects =
            sqlx::query_as::<_, ProjectRow>("SELECT id, projname FROM projects ORDER BY id")
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error("select projects"))?;
        let projects = require_any(projects, EntityKind::Project)?;

        let rows = sqlx::query_as::<_, TodoRow>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos ORDER BY id"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("select todos"))?;
        tx.commit().await.map_err(db_error("commit"))?;

        let mut by_project: HashMap<String, Vec<Todo>> = HashMap::new();
        for row in rows {
            by_project
                .entry(row.projname.clone())
                .or_default()
                .push(Todo::from(row));
        }

        Ok(projects
            .into_iter()
            .map(|row| Project {
                id: row.id.to_string(),
                tasks: by_project.remove(&row.projname).unwrap_or_default(),
                name: row.projname,
            })
            .collect())
    }

    async fn create_project(&self, name: &str, todos: Vec<TodoDraft>) -> StoreResult<String> {
        validate_project_name(name)?;
        for draft in &todos {
            draft.validate()?;
        }

        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;
        let id: i32 = sqlx::query_scalar("INSERT INTO projects (projname) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("insert project"))?;

        for draft in todos {
            sqlx::query(
                "INSERT INTO todos (name, description, duedate, priority, completed, projname)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(draft.name)
            .bind(draft.description)
            .bind(draft.due_date)
            .bind(draft.priority)
            .bind(draft.completed)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert initial todo"))?;
        }
        tx.commit().await.map_err(db_error("commit"))?;

        tracing::debug!(id, name, "project inserted");
        Ok(id.to_string())
    }

    async fn create_todo(&self, project_id: &str, todo: TodoDraft) -> StoreResult<String> {
        todo.validate()?;
        let project = parse_id(EntityKind::Project, project_id)?;

        // Resolving the project name and inserting happen in one statement.
        let id: Option<i32> = sqlx::query_scalar(
            "INSERT INTO todos (name, description, duedate, priority, completed, projname)
             SELECT $1::text, $2::text, $3::timestamptz, $4::text, $5::boolean, projname
             FROM projects WHERE id = $6
             RETURNING id",
        )
        .bind(todo.name)
        .bind(todo.description)
        .bind(todo.due_date)
        .bind(todo.priority)
        .bind(todo.completed)
        .bind(project)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("insert todo"))?;

        id.map(|id| id.to_string())
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, project_id))
    }

    async fn rename_project(&self, id: &str, new_name: &str) -> StoreResult<()> {
        validate_project_name(new_name)?;
        let key = parse_id(EntityKind::Project, id)?;
        let result = sqlx::query("UPDATE projects SET projname = $1 WHERE id = $2")
            .bind(new_name)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("rename project"))?;
        require_affected(result.rows_affected(), EntityKind::Project, id)?;
        Ok(())
    }

    async fn update_todo(&self, id: &str, todo: TodoDraft) -> StoreResult<()> {
        todo.validate()?;
        let key = parse_id(EntityKind::Todo, id)?;
        let result = sqlx::query(
            "UPDATE todos
             SET name = $1, description = $2, duedate = $3, priority = $4,
                 completed = $5, updated_at = now()
             WHERE id = $6",
        )
        .bind(todo.name)
        .bind(todo.description)
        .bind(todo.due_date)
        .bind(todo.priority)
        .bind(todo.completed)
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(db_error("update todo"))?;
        require_affected(result.rows_affected(), EntityKind::Todo, id)?;
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> StoreResult<u64> {
        let key = parse_id(EntityKind::Project, id)?;
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete project"))?;
        require_affected(result.rows_affected(), EntityKind::Project, id)
    }

    async fn delete_todo(&self, id: &str) -> StoreResult<u64> {
        let key = parse_id(EntityKind::Todo, id)?;
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete todo"))?;
        require_affected(result.rows_affected(), EntityKind::Todo, id)
    }
}
