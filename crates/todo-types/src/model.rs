use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A stored task.
///
/// `id` is the backend identifier in string form. It is assigned once at
/// creation and never changes; updates replace every other field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Todo {
    /// Materialize a draft under a backend-assigned identifier.
    pub fn from_draft(id: impl Into<String>, draft: TodoDraft, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority,
            completed: draft.completed,
            updated_at: Some(updated_at),
        }
    }

    /// The caller-editable fields of this todo.
    pub fn to_draft(&self) -> TodoDraft {
        TodoDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            priority: self.priority.clone(),
            completed: self.completed,
        }
    }
}

/// The fields of a todo before a backend has assigned it an identifier.
///
/// Used both for creation and for full-replace updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub completed: bool,
}

impl TodoDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Reject drafts no backend should store.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.name.trim().is_empty() {
            return Err(TypeError::EmptyName);
        }
        Ok(())
    }
}

/// A named collection of todos, in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "projname")]
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Todo>,
}

/// Reject project names that are empty or only whitespace.
pub fn validate_project_name(name: &str) -> Result<(), TypeError> {
    if name.trim().is_empty() {
        return Err(TypeError::EmptyProjectName);
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp (e.g. `2025-03-20T02:00:00+08:00`) into UTC.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidDueDate {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_offset_due_date() {
        let parsed = parse_due_date("2025-03-20T02:00:00+08:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 19, 18, 0, 0).unwrap());
    }

    #[test]
    fn reject_garbage_due_date() {
        let err = parse_due_date("next tuesday").unwrap_err();
        assert!(matches!(err, TypeError::InvalidDueDate { .. }));
    }

    #[test]
    fn empty_name_is_invalid() {
        assert_eq!(TodoDraft::new("   ").validate(), Err(TypeError::EmptyName));
        assert!(TodoDraft::new("Water Plants").validate().is_ok());
    }

    #[test]
    fn blank_project_name_is_invalid() {
        assert_eq!(validate_project_name(""), Err(TypeError::EmptyProjectName));
        assert!(validate_project_name("proj1").is_ok());
    }

    #[test]
    fn draft_survives_materialization() {
        let draft = TodoDraft::new("Buy socks")
            .with_description("No show socks")
            .with_priority("mid")
            .with_completed(true);
        let todo = Todo::from_draft("7", draft.clone(), Utc::now());
        assert_eq!(todo.id, "7");
        assert_eq!(todo.to_draft(), draft);
    }

    #[test]
    fn todo_wire_names() {
        let due = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        let todo = Todo::from_draft("1", TodoDraft::new("x").with_due_date(due), due);
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["_id"], "1");
        assert_eq!(json["dueDate"], "2025-03-20T00:00:00Z");
        assert!(json.get("description").is_none());
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn empty_project_serializes_tasks() {
        let json = serde_json::to_value(Project {
            id: "1".into(),
            name: "proj1".into(),
            tasks: Vec::new(),
        })
        .unwrap();
        assert_eq!(json["projname"], "proj1");
        assert_eq!(json["tasks"], serde_json::json!([]));
    }
}
