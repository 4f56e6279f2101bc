//! Data model shared by every todo backend crate.
//!
//! The types here are plain value carriers. Backends own identifier
//! generation; callers only ever see identifiers as strings, whatever the
//! backend stores underneath (decimal counters, 24-character ObjectId hex,
//! serial integers).
//!
//! # Key Types
//!
//! - [`Todo`]: a stored task with its backend-assigned identifier
//! - [`TodoDraft`]: the fields of a todo before it has an identifier
//! - [`Project`]: a named, ordered collection of todos
//! - [`compare_ids`]: numeric-aware identifier ordering for listings

pub mod error;
pub mod ids;
pub mod model;

pub use error::TypeError;
pub use ids::{compare_ids, sort_by_id};
pub use model::{parse_due_date, validate_project_name, Project, Todo, TodoDraft};
