use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, SharedStore};

/// Build the axum router with every todo and project endpoint.
pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/todo", get(handler::list_todos).post(handler::create_todo))
        .route(
            "/todo/:id",
            get(handler::get_todo)
                .post(handler::create_todo_with_id)
                .patch(handler::update_todo)
                .delete(handler::delete_todo),
        )
        .route(
            "/proj",
            get(handler::list_projects).post(handler::create_project),
        )
        .route(
            "/proj/:id",
            get(handler::get_project)
                .post(handler::create_project_todo)
                .patch(handler::rename_project)
                .delete(handler::delete_project),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
