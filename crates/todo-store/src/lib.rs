//! Storage contract for the todo backend.
//!
//! Every backend implements [`TodoStore`]. The HTTP layer holds an
//! `Arc<dyn TodoStore>` and never keeps authoritative state of its own, so
//! the backend is chosen once at startup and nothing else changes.
//!
//! # Storage Backends
//!
//! - [`InMemoryTodoStore`] -- `RwLock`-guarded maps, volatile
//! - `todo-mongo` -- projects as documents with an embedded `tasks` array
//! - `todo-postgres` -- `projects` and `todos` tables joined by project name
//!
//! # Contract Rules
//!
//! 1. Reading an identifier the backend never issued yields
//!    [`StoreError::NotFound`], never a default value.
//! 2. Mutating an identifier that does not resolve yields
//!    [`StoreError::NotFound`], never a silent no-op.
//! 3. Listing an empty collection yields [`StoreError::NotFound`].
//! 4. Identifiers are assigned by the backend and never change.
//! 5. Updates replace every editable field of a todo.
//! 6. Each operation is a single atomic backend step; callers never need a
//!    separate existence check.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(any(test, feature = "conformance"))]
pub mod conformance;

pub use error::{EntityKind, StoreError, StoreResult};
pub use memory::InMemoryTodoStore;
pub use traits::{require_any, BackendKind, TodoStore};
