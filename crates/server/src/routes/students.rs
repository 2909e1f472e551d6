//! Routes for managing an organization's students.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    organization::Organization,
    student::{CreateStudent, Student, UpdateStudent},
};
use once_cell::sync::Lazy;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    validation::{DeclaredSchema, ObjectSchema, Schema, ValidatedJson},
};

fn is_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

fn guardian_schema() -> ObjectSchema {
    Schema::object()
        .field("name", Schema::string().trim().min_len(1).max_len(120))
        .optional("phone", Schema::string().trim().min_len(3).max_len(40))
        .optional(
            "email",
            Schema::string()
                .trim()
                .lowercase()
                .check(is_email, "must be a valid email address"),
        )
}

static CREATE_STUDENT_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .field("first_name", Schema::string().trim().min_len(1).max_len(80))
        .field("last_name", Schema::string().trim().min_len(1).max_len(80))
        .optional(
            "email",
            Schema::string()
                .trim()
                .lowercase()
                .check(is_email, "must be a valid email address"),
        )
        .optional("grade_level", Schema::integer().min(0.0).max(12.0))
        .optional("guardian", guardian_schema())
        .optional("notes", Schema::string().trim().max_len(4000))
        .strict()
});

static UPDATE_STUDENT_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .optional("first_name", Schema::string().trim().min_len(1).max_len(80))
        .optional("last_name", Schema::string().trim().min_len(1).max_len(80))
        .optional(
            "email",
            Schema::string()
                .trim()
                .lowercase()
                .check(is_email, "must be a valid email address"),
        )
        .optional("grade_level", Schema::integer().min(0.0).max(12.0))
        .optional("guardian", guardian_schema())
        .optional("notes", Schema::string().trim().max_len(4000))
});

impl DeclaredSchema for CreateStudent {
    fn schema() -> &'static ObjectSchema {
        &CREATE_STUDENT_SCHEMA
    }
}

impl DeclaredSchema for UpdateStudent {
    fn schema() -> &'static ObjectSchema {
        &UPDATE_STUDENT_SCHEMA
    }
}

/// GET /api/organizations/{org_id}/students
pub async fn list_students(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Student>>>, ApiError> {
    let students = Student::find_by_org_id(&state.db.pool, org_id).await?;
    Ok(ResponseJson(ApiResponse::success(students)))
}

/// POST /api/organizations/{org_id}/students
pub async fn create_student(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateStudent>,
) -> Result<ResponseJson<ApiResponse<Student>>, ApiError> {
    Organization::find_by_id(&state.db.pool, org_id)
        .await?
        .ok_or(ApiError::NotFound("organization"))?;

    let student = Student::create(&state.db.pool, Uuid::new_v4(), org_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(student)))
}

/// GET /api/organizations/{org_id}/students/{id}
pub async fn get_student(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Student>>, ApiError> {
    let student = Student::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("student"))?;
    Ok(ResponseJson(ApiResponse::success(student)))
}

/// PATCH /api/organizations/{org_id}/students/{id}
pub async fn update_student(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateStudent>,
) -> Result<ResponseJson<ApiResponse<Student>>, ApiError> {
    let existing = Student::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("student"))?;

    let guardian = payload.guardian.or_else(|| existing.parsed_guardian());
    let student = Student::update(
        &state.db.pool,
        org_id,
        id,
        payload.first_name.unwrap_or(existing.first_name),
        payload.last_name.unwrap_or(existing.last_name),
        payload.email.or(existing.email),
        payload.grade_level.or(existing.grade_level),
        guardian,
        payload.notes.or(existing.notes),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(student)))
}

/// DELETE /api/organizations/{org_id}/students/{id}
pub async fn delete_student(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Student::delete(&state.db.pool, org_id, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("student"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/organizations/{org_id}/students",
        Router::new()
            .route("/", get(list_students).post(create_student))
            .route(
                "/{id}",
                get(get_student).patch(update_student).delete(delete_student),
            ),
    )
}
