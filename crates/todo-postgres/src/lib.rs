//! PostgreSQL backend for the todo store.
//!
//! Projects and todos live in two tables. Each todo row carries its
//! project's name as a foreign key with `ON UPDATE CASCADE` and
//! `ON DELETE CASCADE`, so renaming a project carries its todos along and
//! deleting it removes them. Identifiers are serial integers exposed to
//! callers as decimal strings.

pub mod rows;
pub mod schema;
pub mod store;

pub use schema::{schema_sql, SCHEMA};
pub use store::PostgresTodoStore;
