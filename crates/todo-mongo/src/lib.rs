//! MongoDB backend for the todo store.
//!
//! One collection holds one document per project. Todos are embedded in the
//! project's `tasks` array, so a todo has no life outside its project and
//! deleting a project needs no cascade. Identifiers are 12-byte ObjectIds,
//! exposed to callers as 24-character hex strings.
//!
//! Every driver call is bounded by a per-call timeout (10 seconds unless the
//! builder says otherwise). An expired call is reported as an ordinary
//! backend error.

pub mod document;
pub mod store;

pub use document::{ProjectDocument, TodoDocument};
pub use store::{MongoTodoStore, MongoTodoStoreBuilder, DEFAULT_TIMEOUT};
