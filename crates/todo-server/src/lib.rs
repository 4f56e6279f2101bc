//! HTTP server for the todo service.
//!
//! Routes project and todo CRUD requests to a single [`todo_store::TodoStore`]
//! chosen at startup. Every handler makes exactly one store call and maps the
//! outcome to a status code; error bodies are plain text.

pub mod config;
pub mod error;
pub mod handler;
pub mod payload;
pub mod router;
pub mod server;

pub use config::{
    ConfigError, ConfigOverrides, ConfigResult, MongoConnection, MongoSettings, PostgresSettings,
    ServerConfig,
};
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::{HealthResponse, SharedStore};
pub use server::TodoServer;
