//! Routes for recording and browsing behavior logs.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    behavior_log::{BehaviorLog, CreateBehaviorLog, UpdateBehaviorLog},
    category::Category,
    student::Student,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    validation::{DeclaredSchema, ObjectSchema, Schema, ValidatedJson},
};

const SEVERITIES: &[&str] = &["low", "moderate", "high"];

static CREATE_BEHAVIOR_LOG_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .field("student_id", Schema::uuid())
        .field("category_id", Schema::uuid())
        .optional_with_default(
            "severity",
            Schema::one_of(SEVERITIES),
            serde_json::json!("moderate"),
        )
        .optional("note", Schema::string().trim().max_len(2000))
        .optional(
            "tags",
            Schema::array(Schema::string().trim().min_len(1).max_len(40)).max_items(20),
        )
        .field("occurred_at", Schema::datetime())
        .strict()
});

static UPDATE_BEHAVIOR_LOG_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .optional("category_id", Schema::uuid())
        .optional("severity", Schema::one_of(SEVERITIES))
        .optional("note", Schema::string().trim().max_len(2000))
        .optional(
            "tags",
            Schema::array(Schema::string().trim().min_len(1).max_len(40)).max_items(20),
        )
        .optional("occurred_at", Schema::datetime())
});

impl DeclaredSchema for CreateBehaviorLog {
    fn schema() -> &'static ObjectSchema {
        &CREATE_BEHAVIOR_LOG_SCHEMA
    }
}

impl DeclaredSchema for UpdateBehaviorLog {
    fn schema() -> &'static ObjectSchema {
        &UPDATE_BEHAVIOR_LOG_SCHEMA
    }
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    pub student_id: Option<Uuid>,
}

/// GET /api/organizations/{org_id}/behavior-logs
pub async fn list_behavior_logs(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Query(filter): Query<LogFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<BehaviorLog>>>, ApiError> {
    let logs = match filter.student_id {
        Some(student_id) => {
            BehaviorLog::find_by_student_id(&state.db.pool, org_id, student_id).await?
        }
        None => BehaviorLog::find_by_org_id(&state.db.pool, org_id).await?,
    };
    Ok(ResponseJson(ApiResponse::success(logs)))
}

/// POST /api/organizations/{org_id}/behavior-logs
pub async fn create_behavior_log(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateBehaviorLog>,
) -> Result<ResponseJson<ApiResponse<BehaviorLog>>, ApiError> {
    Student::find_by_id(&state.db.pool, org_id, payload.student_id)
        .await?
        .ok_or(ApiError::NotFound("student"))?;
    Category::find_by_id(&state.db.pool, org_id, payload.category_id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    let log = BehaviorLog::create(&state.db.pool, Uuid::new_v4(), org_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// GET /api/organizations/{org_id}/behavior-logs/{id}
pub async fn get_behavior_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<BehaviorLog>>, ApiError> {
    let log = BehaviorLog::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("behavior log"))?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// PATCH /api/organizations/{org_id}/behavior-logs/{id}
pub async fn update_behavior_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateBehaviorLog>,
) -> Result<ResponseJson<ApiResponse<BehaviorLog>>, ApiError> {
    let existing = BehaviorLog::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("behavior log"))?;

    if let Some(category_id) = payload.category_id {
        Category::find_by_id(&state.db.pool, org_id, category_id)
            .await?
            .ok_or(ApiError::NotFound("category"))?;
    }

    let tags = payload.tags.or_else(|| existing.parsed_tags());
    let log = BehaviorLog::update(
        &state.db.pool,
        org_id,
        id,
        payload.category_id.unwrap_or(existing.category_id),
        payload.severity.unwrap_or(existing.severity),
        payload.note.or(existing.note),
        tags,
        payload.occurred_at.unwrap_or(existing.occurred_at),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

/// DELETE /api/organizations/{org_id}/behavior-logs/{id}
pub async fn delete_behavior_log(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = BehaviorLog::delete(&state.db.pool, org_id, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("behavior log"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/organizations/{org_id}/behavior-logs",
        Router::new()
            .route("/", get(list_behavior_logs).post(create_behavior_log))
            .route(
                "/{id}",
                get(get_behavior_log)
                    .patch(update_behavior_log)
                    .delete(delete_behavior_log),
            ),
    )
}
