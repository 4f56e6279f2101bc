use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use todo_store::{require_any, BackendKind, EntityKind, StoreError, StoreResult, TodoStore};
use todo_types::{validate_project_name, Project, Todo, TodoDraft};

use crate::document::{parse_object_id, ProjectDocument, TodoDocument};

/// Upper bound on every individual driver call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`MongoTodoStore`].
///
/// ```rust,no_run
/// use todo_mongo::MongoTodoStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MongoTodoStore::builder()
///     .url("mongodb://localhost:27017")
///     .database("todoapp")
///     .collection("projects")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MongoTodoStoreBuilder {
    url: String,
    database: String,
    collection: String,
    timeout: Duration,
    max_pool_size: Option<u32>,
}

impl Default for MongoTodoStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoTodoStoreBuilder {
    pub fn new() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "todoapp".to_string(),
            collection: "projects".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_pool_size: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Per-call timeout. Defaults to [`DEFAULT_TIMEOUT`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Parse the connection string and create the client.
    ///
    /// The driver connects lazily; use [`TodoStore::ping`] to verify the
    /// server is reachable.
    pub async fn build(self) -> StoreResult<MongoTodoStore> {
        let mut options = ClientOptions::parse(self.url.as_str())
            .await
            .map_err(|e| StoreError::Backend(format!("invalid mongo connection string: {e}")))?;
        if let Some(size) = self.max_pool_size {
            options.max_pool_size = Some(size);
        }
        let client = Client::with_options(options).map_err(StoreError::backend)?;
        Ok(MongoTodoStore::from_client(&client, &self.database, &self.collection)
            .with_timeout(self.timeout))
    }
}

/// Todo store over one MongoDB collection of project documents.
///
/// Cloning is cheap: the driver client is reference counted and owns the
/// connection pool shared by all clones.
#[derive(Clone, Debug)]
pub struct MongoTodoStore {
    database: Database,
    collection: Collection<ProjectDocument>,
    timeout: Duration,
}

impl MongoTodoStore {
    pub fn builder() -> MongoTodoStoreBuilder {
        MongoTodoStoreBuilder::new()
    }

    pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
        let database = client.database(database);
        let collection = database.collection::<ProjectDocument>(collection);
        Self {
            database,
            collection,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Index the embedded todo ids so todo lookups avoid a collection scan.
    pub async fn create_indexes(&self) -> StoreResult<()> {
        let index = IndexModel::builder().keys(doc! { "tasks._id": 1 }).build();
        self.bounded("create tasks._id index", self.collection.create_index(index))
            .await?;
        Ok(())
    }

    /// Remove every project document.
    pub async fn clear(&self) -> StoreResult<u64> {
        let result = self
            .bounded("clear collection", self.collection.delete_many(doc! {}))
            .await?;
        Ok(result.deleted_count)
    }

    /// Run one driver call under the per-call timeout.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(operation, error = %e, "mongo operation failed");
                Err(StoreError::Backend(format!("{operation}: {e}")))
            }
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.timeout, "mongo operation timed out");
                Err(StoreError::Backend(format!(
                    "{operation}: timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    async fn all_documents(&self) -> StoreResult<Vec<ProjectDocument>> {
        self.bounded("find projects", async {
            let cursor = self.collection.find(doc! {}).await?;
            cursor.try_collect::<Vec<_>>().await
        })
        .await
    }

    async fn update(
        &self,
        operation: &'static str,
        filter: Document,
        update: Document,
    ) -> StoreResult<mongodb::results::UpdateResult> {
        self.bounded(operation, self.collection.update_one(filter, update))
            .await
    }
}

fn todo_bson(document: &TodoDocument) -> StoreResult<bson::Bson> {
    bson::to_bson(document).map_err(StoreError::backend)
}

fn object_id(kind: EntityKind, id: &str) -> StoreResult<ObjectId> {
    parse_object_id(id).ok_or_else(|| StoreError::not_found(kind, id))
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Mongo
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded("ping", self.database.run_command(doc! { "ping": 1 }))
            .await?;
        Ok(())
    }

    async fn get_todo(&self, id: &str) -> StoreResult<Todo> {
        let oid = object_id(EntityKind::Todo, id)?;
        let project = self
            .bounded(
                "find todo",
                self.collection.find_one(doc! { "tasks._id": oid }),
            )
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))?;

        project
            .tasks
            .into_iter()
            .find(|task| task.id == oid)
            .map(Todo::from)
            .ok_or_else(|| StoreError::not_found(EntityKind::Todo, id))
    }

    async fn get_all_todos(&self) -> StoreResult<Vec<Todo>> {
        let todos = self
            .all_documents()
            .await?
            .into_iter()
            .flat_map(|project| project.tasks)
            .map(Todo::from)
            .collect();
        require_any(todos, EntityKind::Todo)
    }

    async fn get_project(&self, id: &str) -> StoreResult<Project> {
        let oid = object_id(EntityKind::Project, id)?;
        self.bounded("find project", self.collection.find_one(doc! { "_id": oid }))
            .await?
            .map(Project::from)
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))
    }

    async fn get_all_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = self
            .all_documents()
            .await?
            .into_iter()
            .map(Project::from)
            .collect();
        require_any(projects, EntityKind::Project)
    }

    async fn create_project(&self, name: &str, todos: Vec<TodoDraft>) -> StoreResult<String> {
        validate_project_name(name)?;
        for draft in &todos {
            draft.validate()?;
        }
        let document = ProjectDocument::new(name, todos, Utc::now());
        self.bounded("insert project", self.collection.insert_one(&document))
            .await?;
        tracing::debug!(id = %document.id, name, "project inserted");
        Ok(document.id.to_hex())
    }

    async fn create_todo(&self, project_id: &str, todo: TodoDraft) -> StoreResult<String> {
        todo.validate()?;
        let project_oid = object_id(EntityKind::Project, project_id)?;
        let document = TodoDocument::new(ObjectId::new(), todo, Utc::now());
        let task = todo_bson(&document)?;

        // No upsert: a missing project must not be fabricated.
        let result = self
            .update(
                "push todo",
                doc! { "_id": project_oid },
                doc! { "$push": { "tasks": task } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::not_found(EntityKind::Project, project_id));
        }
        Ok(document.id.to_hex())
    }

    async fn rename_project(&self, id: &str, new_name: &str) -> StoreResult<()> {
        validate_project_name(new_name)?;
        let oid = object_id(EntityKind::Project, id)?;
        let result = self
            .update(
                "rename project",
                doc! { "_id": oid },
                doc! { "$set": { "projname": new_name } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::not_found(EntityKind::Project, id));
        }
        Ok(())
    }

    async fn update_todo(&self, id: &str, todo: TodoDraft) -> StoreResult<()> {
        todo.validate()?;
        let oid = object_id(EntityKind::Todo, id)?;
        // The replacement keeps the original _id.
        let task = todo_bson(&TodoDocument::new(oid, todo, Utc::now()))?;
        let result = self
            .update(
                "replace todo",
                doc! { "tasks._id": oid },
                doc! { "$set": { "tasks.$": task } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::not_found(EntityKind::Todo, id));
        }
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> StoreResult<u64> {
        let oid = object_id(EntityKind::Project, id)?;
        let result = self
            .bounded("delete project", self.collection.delete_one(doc! { "_id": oid }))
            .await?;
        if result.deleted_count == 0 {
            return Err(StoreError::not_found(EntityKind::Project, id));
        }
        Ok(result.deleted_count)
    }

    async fn delete_todo(&self, id: &str) -> StoreResult<u64> {
        let oid = object_id(EntityKind::Todo, id)?;
        // The filter only matches the one project holding this todo, and
        // todo ids are unique, so one modified document is one removed todo.
        let result = self
            .update(
                "pull todo",
                doc! { "tasks._id": oid },
                doc! { "$pull": { "tasks": { "_id": oid } } },
            )
            .await?;
        if result.modified_count == 0 {
            return Err(StoreError::not_found(EntityKind::Todo, id));
        }
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const URL_VAR: &str = "TODO_TEST_MONGO_URL";

    async fn live_store() -> MongoTodoStore {
        let url = std::env::var(URL_VAR).unwrap_or_else(|_| panic!("{URL_VAR} must be set"));
        let store = MongoTodoStore::builder()
            .url(url)
            .database("todoapp_test")
            .collection("testTodo")
            .build()
            .await
            .unwrap();
        store.clear().await.unwrap();
        store
    }

    #[test]
    fn builder_defaults() {
        let builder = MongoTodoStoreBuilder::new();
        assert_eq!(builder.url, "mongodb://localhost:27017");
        assert_eq!(builder.collection, "projects");
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert_eq!(builder.max_pool_size, None);
    }

    #[test]
    fn builder_configuration() {
        let builder = MongoTodoStore::builder()
            .url("mongodb://example.com:27017")
            .database("db")
            .collection("coll")
            .timeout(Duration::from_secs(3))
            .max_pool_size(20);
        assert_eq!(builder.database, "db");
        assert_eq!(builder.collection, "coll");
        assert_eq!(builder.timeout, Duration::from_secs(3));
        assert_eq!(builder.max_pool_size, Some(20));
    }

    #[tokio::test]
    async fn build_rejects_bad_connection_string() {
        let err = MongoTodoStore::builder()
            .url("not-a-mongo-url")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn unparseable_ids_short_circuit_to_not_found() {
        // The driver connects lazily, so no server is contacted here.
        let store = MongoTodoStore::builder().build().await.unwrap();
        assert!(store.get_todo("3").await.unwrap_err().is_not_found());
        assert!(store.delete_project("nope").await.unwrap_err().is_not_found());
        assert!(store
            .create_todo("3", TodoDraft::new("x"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires MongoDB; set TODO_TEST_MONGO_URL"]
    #[serial]
    async fn passes_conformance_suite() {
        let store = live_store().await;
        todo_store::conformance::run_all(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires MongoDB; set TODO_TEST_MONGO_URL"]
    #[serial]
    async fn deleting_unknown_todo_reports_not_found() {
        let store = live_store().await;
        let project = store
            .create_project("proj1", vec![TodoDraft::new("Water Plants")])
            .await
            .unwrap();

        let unknown = ObjectId::new().to_hex();
        let err = store.delete_todo(&unknown).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get_project(&project).await.unwrap().tasks.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires MongoDB; set TODO_TEST_MONGO_URL"]
    #[serial]
    async fn create_todo_does_not_upsert_projects() {
        let store = live_store().await;
        let missing = ObjectId::new().to_hex();
        let err = store
            .create_todo(&missing, TodoDraft::new("orphan"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get_all_projects().await.unwrap_err().is_not_found());
    }
}
