use chrono::{DateTime, Utc};
use todo_types::Todo;

/// Columns selected for every todo query, matching [`TodoRow`].
pub const TODO_COLUMNS: &str =
    "id, name, description, duedate, priority, completed, updated_at, projname";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i32,
    pub projname: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TodoRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub duedate: Option<DateTime<Utc>>,
    pub priority: String,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
    pub projname: String,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            description: row.description,
            due_date: row.duedate,
            priority: row.priority,
            completed: row.completed,
            updated_at: Some(row.updated_at),
        }
    }
}
