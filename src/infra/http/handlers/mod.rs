mod dashboard;
mod projects;
mod tasks;

pub use dashboard::get_dashboard_stats;
pub use projects::{create_project, delete_project, get_project, list_projects};
pub use tasks::{create_task, delete_task, get_task, list_tasks, update_task};

use axum::extract::State;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::cache::CacheStatus;

use super::state::HttpState;

/// Response header reporting how a cached read was served.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

fn cache_header(status: CacheStatus) -> [(HeaderName, &'static str); 1] {
    [(CACHE_STATUS_HEADER, status.as_str())]
}

pub async fn health(State(state): State<HttpState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error("infra::http::health", StatusCode::SERVICE_UNAVAILABLE, &err)
                .attach(&mut response);
            response
        }
    }
}
