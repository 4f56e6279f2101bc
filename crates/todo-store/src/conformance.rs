//! Behaviour every [`TodoStore`] must share.
//!
//! Backend crates call [`run_all`] from their tests against a freshly
//! emptied store. Each check panics on the first violation.

use chrono::{TimeZone, Utc};
use todo_types::{Todo, TodoDraft};

use crate::error::StoreError;
use crate::traits::TodoStore;

/// Identifiers no backend ever issues: a counter never yields `0`, and a
/// serial column never reaches the all-`f` ObjectId.
const NEVER_ISSUED: &[&str] = &["0", "ffffffffffffffffffffffff", "not-an-id", ""];

fn sample(name: &str) -> TodoDraft {
    TodoDraft::new(name)
        .with_description("Not too much water for aloe vera")
        .with_due_date(Utc.with_ymd_and_hms(2025, 3, 19, 18, 0, 0).unwrap())
        .with_priority("low")
}

fn assert_not_found<T: std::fmt::Debug>(result: Result<T, StoreError>, what: &str) {
    match result {
        Err(StoreError::NotFound { .. }) => {}
        other => panic!("{what}: expected NotFound, got {other:?}"),
    }
}

/// Field equality between what was submitted and what was stored.
///
/// Due dates compare at millisecond precision, the coarsest any backend keeps.
pub fn assert_matches_draft(todo: &Todo, draft: &TodoDraft) {
    assert_eq!(todo.name, draft.name);
    assert_eq!(todo.description, draft.description);
    assert_eq!(todo.priority, draft.priority);
    assert_eq!(todo.completed, draft.completed);
    assert_eq!(
        todo.due_date.map(|d| d.timestamp_millis()),
        draft.due_date.map(|d| d.timestamp_millis())
    );
}

/// Run every check in order. The store must start empty.
pub async fn run_all(store: &dyn TodoStore) {
    empty_listings_are_not_found(store).await;
    unknown_ids_are_not_found(store).await;
    mutating_unknown_ids_is_not_found(store).await;
    create_project_then_get(store).await;
    blank_names_are_rejected(store).await;
    create_project_with_initial_todos(store).await;
    create_todo_then_get(store).await;
    create_todo_under_missing_project(store).await;
    update_todo_replaces_fields(store).await;
    rename_project(store).await;
    delete_todo_once(store).await;
    delete_project_removes_todos(store).await;
    listings_cover_everything(store).await;
}

pub async fn empty_listings_are_not_found(store: &dyn TodoStore) {
    assert_not_found(store.get_all_todos().await, "get_all_todos on empty store");
    assert_not_found(store.get_all_projects().await, "get_all_projects on empty store");
}

pub async fn unknown_ids_are_not_found(store: &dyn TodoStore) {
    for id in NEVER_ISSUED {
        assert_not_found(store.get_todo(id).await, "get_todo");
        assert_not_found(store.get_project(id).await, "get_project");
    }
}

pub async fn mutating_unknown_ids_is_not_found(store: &dyn TodoStore) {
    for id in NEVER_ISSUED {
        assert_not_found(store.update_todo(id, sample("ghost")).await, "update_todo");
        assert_not_found(store.rename_project(id, "ghost").await, "rename_project");
        assert_not_found(store.delete_todo(id).await, "delete_todo");
        assert_not_found(store.delete_project(id).await, "delete_project");
        assert_not_found(store.create_todo(id, sample("orphan")).await, "create_todo");
    }
}

pub async fn create_project_then_get(store: &dyn TodoStore) {
    let id = store.create_project("proj1", Vec::new()).await.unwrap();
    assert!(!id.is_empty());

    let project = store.get_project(&id).await.unwrap();
    assert_eq!(project.id, id);
    assert_eq!(project.name, "proj1");
    assert!(project.tasks.is_empty());
}

pub async fn blank_names_are_rejected(store: &dyn TodoStore) {
    let invalid = |r: Result<_, StoreError>| matches!(r, Err(StoreError::InvalidInput(_)));
    assert!(invalid(store.create_project("  ", Vec::new()).await.map(|_| ())));
    assert!(invalid(
        store
            .create_project("blank todo", vec![TodoDraft::new("")])
            .await
            .map(|_| ())
    ));

    let id = store.create_project("named", Vec::new()).await.unwrap();
    assert!(invalid(store.rename_project(&id, "").await));
    assert!(invalid(store.create_todo(&id, TodoDraft::new(" ")).await.map(|_| ())));
    assert_eq!(store.get_project(&id).await.unwrap().name, "named");
}

pub async fn create_project_with_initial_todos(store: &dyn TodoStore) {
    let drafts = vec![sample("Water Plants"), sample("Buy socks")];
    let id = store
        .create_project("seeded", drafts.clone())
        .await
        .unwrap();

    let project = store.get_project(&id).await.unwrap();
    assert_eq!(project.tasks.len(), 2);
    for (todo, draft) in project.tasks.iter().zip(&drafts) {
        assert!(!todo.id.is_empty());
        assert_matches_draft(todo, draft);
        assert_eq!(store.get_todo(&todo.id).await.unwrap().id, todo.id);
    }
    assert_ne!(project.tasks[0].id, project.tasks[1].id);
}

pub async fn create_todo_then_get(store: &dyn TodoStore) {
    let project = store.create_project("with-todo", Vec::new()).await.unwrap();
    let draft = sample("Water Plants");
    let todo_id = store.create_todo(&project, draft.clone()).await.unwrap();
    assert!(!todo_id.is_empty());

    let todo = store.get_todo(&todo_id).await.unwrap();
    assert_eq!(todo.id, todo_id);
    assert_matches_draft(&todo, &draft);

    let owner = store.get_project(&project).await.unwrap();
    assert_eq!(owner.tasks.len(), 1);
    assert_eq!(owner.tasks[0].id, todo_id);
}

pub async fn create_todo_under_missing_project(store: &dyn TodoStore) {
    let before = store.get_all_projects().await.map(|p| p.len()).unwrap_or(0);
    assert_not_found(
        store.create_todo("ffffffffffffffffffffffff", sample("orphan")).await,
        "create_todo under missing project",
    );
    let after = store.get_all_projects().await.map(|p| p.len()).unwrap_or(0);
    assert_eq!(before, after, "a missing project must not be fabricated");
}

pub async fn update_todo_replaces_fields(store: &dyn TodoStore) {
    let project = store.create_project("updates", Vec::new()).await.unwrap();
    let todo_id = store.create_todo(&project, sample("before")).await.unwrap();

    let replacement = TodoDraft::new("after").with_completed(true);
    store.update_todo(&todo_id, replacement.clone()).await.unwrap();

    let todo = store.get_todo(&todo_id).await.unwrap();
    assert_eq!(todo.id, todo_id);
    assert_matches_draft(&todo, &replacement);
    assert_eq!(todo.description, None, "update replaces, it does not merge");
    assert_eq!(store.get_project(&project).await.unwrap().tasks.len(), 1);
}

pub async fn rename_project(store: &dyn TodoStore) {
    let id = store.create_project("old name", Vec::new()).await.unwrap();
    store.rename_project(&id, "new name").await.unwrap();
    assert_eq!(store.get_project(&id).await.unwrap().name, "new name");
}

pub async fn delete_todo_once(store: &dyn TodoStore) {
    let project = store.create_project("deletions", Vec::new()).await.unwrap();
    let keep = store.create_todo(&project, sample("keep")).await.unwrap();
    let gone = store.create_todo(&project, sample("gone")).await.unwrap();

    assert_eq!(store.delete_todo(&gone).await.unwrap(), 1);
    assert_not_found(store.get_todo(&gone).await, "get_todo after delete");
    assert_not_found(store.delete_todo(&gone).await, "second delete_todo");

    let remaining = store.get_project(&project).await.unwrap();
    assert_eq!(remaining.tasks.len(), 1);
    assert_eq!(remaining.tasks[0].id, keep);
}

pub async fn delete_project_removes_todos(store: &dyn TodoStore) {
    let project = store
        .create_project("doomed", vec![sample("a")])
        .await
        .unwrap();
    let extra = store.create_todo(&project, sample("b")).await.unwrap();

    assert_eq!(store.delete_project(&project).await.unwrap(), 1);
    assert_not_found(store.get_project(&project).await, "get_project after delete");
    assert_not_found(store.get_todo(&extra).await, "todo of deleted project");
}

pub async fn listings_cover_everything(store: &dyn TodoStore) {
    let id = store
        .create_project("listed", vec![sample("listed todo")])
        .await
        .unwrap();

    let projects = store.get_all_projects().await.unwrap();
    let listed = projects.iter().find(|p| p.id == id).expect("project listed");
    assert_eq!(listed.tasks.len(), 1);

    let todos = store.get_all_todos().await.unwrap();
    assert!(todos.iter().any(|t| t.id == listed.tasks[0].id));
}
