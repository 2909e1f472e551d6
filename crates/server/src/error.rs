use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::<(), _>::error_with_data(
                    "validation failed",
                    errors,
                )),
            )
                .into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(format!("{what} not found"))),
            )
                .into_response(),
            ApiError::Database(e) => {
                error!(error = %e, "database error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("internal server error")),
                )
                    .into_response()
            }
            ApiError::Other(e) => {
                error!(error = %e, "unhandled error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("internal server error")),
                )
                    .into_response()
            }
        }
    }
}
