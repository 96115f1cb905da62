//! HTTP surface: JSON routes over the task, project and dashboard services.

mod error;
mod handlers;
mod middleware;
mod models;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use handlers::CACHE_STATUS_HEADER;
pub use models::{ProjectCreateRequest, TaskCreateRequest, TaskListQuery, TaskUpdateRequest};
pub use state::HttpState;

use axum::{Router, middleware as axum_middleware, routing::get};

use middleware::{log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route("/api/dashboard/stats", get(handlers::get_dashboard_stats))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
