use axum::{Router, response::Json as ResponseJson, routing::get};
use utils::response::ApiResponse;

use crate::AppState;

/// GET /api/health
pub async fn health() -> ResponseJson<ApiResponse<&'static str>> {
    ResponseJson(ApiResponse::success("ok"))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
