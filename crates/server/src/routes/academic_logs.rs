//! Routes for recording and browsing academic logs.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    academic_log::{AcademicLog, CreateAcademicLog, UpdateAcademicLog},
    student::Student,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    validation::{DeclaredSchema, ObjectSchema, Schema, ValidatedJson},
};

static CREATE_ACADEMIC_LOG_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .field("student_id", Schema::uuid())
        .field("subject", Schema::string().trim().min_len(1).max_len(120))
        .field("score", Schema::number().min(0.0))
        .optional_with_default("max_score", Schema::number().min(0.01), serde_json::json!(100))
        .optional("note", Schema::string().trim().max_len(2000))
        .field("occurred_at", Schema::datetime())
        .refine("score", "must not exceed max_score", score_within_max)
        .strict()
});

static UPDATE_ACADEMIC_LOG_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .optional("subject", Schema::string().trim().min_len(1).max_len(120))
        .optional("score", Schema::number().min(0.0))
        .optional("max_score", Schema::number().min(0.01))
        .optional("note", Schema::string().trim().max_len(2000))
        .optional("occurred_at", Schema::datetime())
        .refine("score", "must not exceed max_score", score_within_max)
});

fn score_within_max(obj: &serde_json::Map<String, Value>) -> bool {
    match (
        obj.get("score").and_then(Value::as_f64),
        obj.get("max_score").and_then(Value::as_f64),
    ) {
        (Some(score), Some(max_score)) => score <= max_score,
        _ => true,
    }
}

impl DeclaredSchema for CreateAcademicLog {
    fn schema() -> &'static ObjectSchema {
        &CREATE_ACADEMIC_LOG_SCHEMA
    }
}

impl DeclaredSchema for UpdateAcademicLog {
    fn schema() -> &'static ObjectSchema {
        &UPDATE_ACADEMIC_LOG_SCHEMA
    }
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    pub student_id: Option<Uuid>,
}

/// GET /api/organizations/{org_id}/academic-logs
pub async fn list_academic_logs(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Query(filter): Query<LogFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<AcademicLog>>>, ApiError> {
    let logs = match filter.student_id {
        Some(student_id) => {
            AcademicLog::find_by_student_id(&state.db.pool, org_id, student_id).await?
        }
        None => AcademicLog::find_by_org_id(&state.db.pool, org_id).await?,
    };
    Ok(ResponseJson(ApiResponse::success(logs)))
}

/// POST /api/organizations/{org_id}/academic-logs
pub async fn create_academic_log(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateAcademicLog>,
) -> Result<ResponseJson<ApiResponse<AcademicLog>>, ApiError> {
    Student::find_by_id(&state.db.pool, org_id, payload.student_id)
        .await?
        .ok_or(ApiError::NotFound("student"))?;

    let log = AcademicLog::create(&state.db.pool, Uuid::new_v4(), org_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// GET /api/organizations/{org_id}/academic-logs/{id}
pub async fn get_academic_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<AcademicLog>>, ApiError> {
    let log = AcademicLog::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("academic log"))?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// PATCH /api/organizations/{org_id}/academic-logs/{id}
///
/// The score/max_score refinement runs against the patch body alone, so a
/// patch that changes only one of them is re-checked here against the
/// merged record before writing.
pub async fn update_academic_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateAcademicLog>,
) -> Result<ResponseJson<ApiResponse<AcademicLog>>, ApiError> {
    let existing = AcademicLog::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("academic log"))?;

    let score = payload.score.unwrap_or(existing.score);
    let max_score = payload.max_score.unwrap_or(existing.max_score);
    if score > max_score {
        return Err(ApiError::Validation(vec![
            crate::validation::FieldError::new("score", "must not exceed max_score"),
        ]));
    }

    let log = AcademicLog::update(
        &state.db.pool,
        org_id,
        id,
        payload.subject.unwrap_or(existing.subject),
        score,
        max_score,
        payload.note.or(existing.note),
        payload.occurred_at.unwrap_or(existing.occurred_at),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// DELETE /api/organizations/{org_id}/academic-logs/{id}
pub async fn delete_academic_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = AcademicLog::delete(&state.db.pool, org_id, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("academic log"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/organizations/{org_id}/academic-logs",
        Router::new()
            .route("/", get(list_academic_logs).post(create_academic_log))
            .route(
                "/{id}",
                get(get_academic_log)
                    .patch(update_academic_log)
                    .delete(delete_academic_log),
            ),
    )
}
