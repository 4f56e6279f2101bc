use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use todo_types::{Project, Todo, TodoDraft};

/// A project as persisted: the root document of the collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub projname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<TodoDocument>,
}

/// A todo as persisted inside its project's `tasks` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<BsonDateTime>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
}

impl TodoDocument {
    pub fn new(id: ObjectId, draft: TodoDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            due_date: draft.due_date.map(to_bson_datetime),
            priority: draft.priority,
            completed: draft.completed,
            updated_at: Some(to_bson_datetime(now)),
        }
    }
}

impl ProjectDocument {
    /// A new project document; every initial todo gets a fresh ObjectId.
    pub fn new(name: &str, todos: Vec<TodoDraft>, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            projname: name.to_string(),
            tasks: todos
                .into_iter()
                .map(|draft| TodoDocument::new(ObjectId::new(), draft, now))
                .collect(),
        }
    }
}

impl From<TodoDocument> for Todo {
    fn from(doc: TodoDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.name,
            description: doc.description,
            due_date: doc.due_date.and_then(from_bson_datetime),
            priority: doc.priority,
            completed: doc.completed,
            updated_at: doc.updated_at.and_then(from_bson_datetime),
        }
    }
}

impl From<ProjectDocument> for Project {
    fn from(doc: ProjectDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.projname,
            tasks: doc.tasks.into_iter().map(Todo::from).collect(),
        }
    }
}

/// Parse a caller-supplied identifier. Anything that is not 24 hex chars
/// cannot have been issued by this backend.
pub fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn to_bson_datetime(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_datetime(dt: BsonDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(dt.timestamp_millis())
}

// Documents written by older clients may carry `tasks: null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TodoDocument>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TodoDocument>>::deserialize(deserializer)?.unwrap_or_default())
}
