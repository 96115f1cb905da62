use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::infra::http::error::ApiError;
use crate::infra::http::state::HttpState;

use super::cache_header;

pub async fn get_dashboard_stats(
    State(state): State<HttpState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.dashboard.get_dashboard_stats().await?;
    Ok((cache_header(stats.status), Json(stats.value)))
}
