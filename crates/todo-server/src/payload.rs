//! Request bodies, accepted as JSON or as an urlencoded form.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use todo_types::{parse_due_date, validate_project_name, TodoDraft, TypeError};

use crate::error::ApiError;

/// Body extractor that decodes `T` from JSON or form data.
///
/// The content type picks the first decoder; the other one is tried when
/// the first fails. A body that opens with `{` or `[` is only ever decoded
/// as JSON, since the form decoder would accept it as one unknown key.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        decode(&body, form).map(Payload)
    }
}

/// Decode a body, form first when `form` is set.
pub fn decode<T: DeserializeOwned>(body: &[u8], form: bool) -> Result<T, ApiError> {
    let as_json = || serde_json::from_slice::<T>(body).map_err(|e| e.to_string());
    let as_form = || serde_urlencoded::from_bytes::<T>(body).map_err(|e| e.to_string());

    let result = if looks_like_json(body) {
        as_json()
    } else if form {
        as_form().or_else(|first| as_json().map_err(|_| first))
    } else {
        as_json().or_else(|first| as_form().map_err(|_| first))
    };
    result.map_err(|e| ApiError::bad_request(format!("cannot decode request body: {e}")))
}

fn looks_like_json(body: &[u8]) -> bool {
    matches!(
        body.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

/// Fields of a todo as submitted by a client.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TodoPayload {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Description")]
    pub description: Option<String>,
    #[serde(rename = "dueDate", alias = "DueDate")]
    pub due_date: Option<String>,
    #[serde(rename = "dueDateString", alias = "DueDateString")]
    pub due_date_string: Option<String>,
    #[serde(alias = "Priority")]
    pub priority: String,
    #[serde(alias = "Completed")]
    pub completed: bool,
    /// Owning project, for `POST /todo`.
    #[serde(rename = "projectId", alias = "ProjectId", alias = "ProjectID")]
    pub project_id: Option<String>,
}

impl TodoPayload {
    /// Validate and convert into a draft. Empty strings count as absent.
    pub fn into_draft(self) -> Result<TodoDraft, TypeError> {
        let due = self
            .due_date
            .filter(|s| !s.trim().is_empty())
            .or(self.due_date_string.filter(|s| !s.trim().is_empty()));

        let mut draft = TodoDraft::new(self.name)
            .with_priority(self.priority)
            .with_completed(self.completed);
        if let Some(description) = self.description.filter(|d| !d.is_empty()) {
            draft = draft.with_description(description);
        }
        if let Some(due) = due {
            draft = draft.with_due_date(parse_due_date(&due)?);
        }
        draft.validate()?;
        Ok(draft)
    }
}

/// A project as submitted by a client: a name and optional initial todos.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectPayload {
    #[serde(alias = "ProjName", alias = "Projname")]
    pub projname: String,
    #[serde(alias = "Tasks")]
    pub tasks: Vec<TodoPayload>,
}

impl ProjectPayload {
    pub fn into_parts(self) -> Result<(String, Vec<TodoDraft>), TypeError> {
        validate_project_name(&self.projname)?;
        let drafts = self
            .tasks
            .into_iter()
            .map(TodoPayload::into_draft)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.projname, drafts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};

    #[test]
    fn json_todo() {
        let body = br#"{"name":"Water Plants","description":"x","dueDate":"2025-03-20T02:00:00+08:00","priority":"low"}"#;
        let payload: TodoPayload = decode(body, false).unwrap();
        let draft = payload.into_draft().unwrap();
        assert_eq!(draft.name, "Water Plants");
        assert_eq!(draft.description.as_deref(), Some("x"));
        assert_eq!(
            draft.due_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 19, 18, 0, 0).unwrap())
        );
        assert_eq!(draft.priority, "low");
        assert!(!draft.completed);
    }

    #[test]
    fn form_todo_uses_capitalized_fields() {
        let body = b"Name=Buy+socks&Description=No+show+socks&DueDate=2025-03-20T02%3A00%3A00%2B08%3A00&Priority=mid&Completed=true";
        let payload: TodoPayload = decode(body, true).unwrap();
        let draft = payload.into_draft().unwrap();
        assert_eq!(draft.name, "Buy socks");
        assert_eq!(draft.description.as_deref(), Some("No show socks"));
        assert!(draft.due_date.is_some());
        assert!(draft.completed);
    }

    #[test]
    fn form_body_without_form_content_type_still_decodes() {
        let payload: TodoPayload = decode(b"Name=Water+Plants", false).unwrap();
        assert_eq!(payload.name, "Water Plants");
    }

    #[test]
    fn json_body_with_form_content_type_decodes_as_json() {
        let payload: ProjectPayload = decode(br#"{"projname":"renamed"}"#, true).unwrap();
        assert_eq!(payload.projname, "renamed");
    }

    #[test]
    fn due_date_string_is_a_fallback() {
        let payload: TodoPayload =
            decode(br#"{"name":"a","dueDate":"","dueDateString":"2025-03-19T18:00:00Z"}"#, false)
                .unwrap();
        assert!(payload.into_draft().unwrap().due_date.is_some());
    }

    #[test]
    fn bad_due_date_is_a_type_error() {
        let payload: TodoPayload = decode(br#"{"name":"a","dueDate":"tomorrow"}"#, false).unwrap();
        assert!(matches!(
            payload.into_draft(),
            Err(TypeError::InvalidDueDate { .. })
        ));
    }

    #[test]
    fn missing_name_is_a_type_error() {
        let payload: TodoPayload = decode(br#"{"priority":"low"}"#, false).unwrap();
        assert_eq!(payload.into_draft().unwrap_err(), TypeError::EmptyName);
    }

    #[test]
    fn empty_description_is_dropped() {
        let payload: TodoPayload = decode(b"Name=a&Description=", true).unwrap();
        assert_eq!(payload.into_draft().unwrap().description, None);
    }

    #[test]
    fn project_with_tasks() {
        let body = br#"{"projname":"proj2","tasks":[{"name":"Water Plants"},{"name":"Buy socks","completed":true}]}"#;
        let (name, drafts) = decode::<ProjectPayload>(body, false)
            .unwrap()
            .into_parts()
            .unwrap();
        assert_eq!(name, "proj2");
        assert_eq!(drafts.len(), 2);
        assert!(drafts[1].completed);
    }

    #[test]
    fn project_form_name() {
        let payload: ProjectPayload = decode(b"ProjName=proj1", true).unwrap();
        let (name, drafts) = payload.into_parts().unwrap();
        assert_eq!(name, "proj1");
        assert!(drafts.is_empty());
    }

    #[test]
    fn blank_project_name_is_rejected() {
        let payload: ProjectPayload = decode(br#"{"projname":" "}"#, false).unwrap();
        assert_eq!(payload.into_parts().unwrap_err(), TypeError::EmptyProjectName);
    }

    #[test]
    fn undecodable_body_is_bad_request() {
        let err = decode::<TodoPayload>(br#"{"name": 5"#, false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn json_sniffing_skips_whitespace() {
        assert!(looks_like_json(b"  \n{\"a\":1}"));
        assert!(!looks_like_json(b"Name=a"));
        assert!(!looks_like_json(b""));
    }
}
