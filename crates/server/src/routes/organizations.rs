//! Routes for managing organizations (schools).

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use once_cell::sync::Lazy;
use regex::Regex;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    validation::{DeclaredSchema, ObjectSchema, Schema, ValidatedJson},
};

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid regex"));

fn is_slug(s: &str) -> bool {
    SLUG_RE.is_match(s)
}

static CREATE_ORGANIZATION_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .field("name", Schema::string().trim().min_len(1).max_len(120))
        .field(
            "slug",
            Schema::string()
                .trim()
                .lowercase()
                .min_len(1)
                .max_len(60)
                .check(is_slug, "must contain only letters, digits, and dashes"),
        )
        .strict()
});

static UPDATE_ORGANIZATION_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .optional("name", Schema::string().trim().min_len(1).max_len(120))
        .optional(
            "slug",
            Schema::string()
                .trim()
                .lowercase()
                .min_len(1)
                .max_len(60)
                .check(is_slug, "must contain only letters, digits, and dashes"),
        )
});

impl DeclaredSchema for CreateOrganization {
    fn schema() -> &'static ObjectSchema {
        &CREATE_ORGANIZATION_SCHEMA
    }
}

impl DeclaredSchema for UpdateOrganization {
    fn schema() -> &'static ObjectSchema {
        &UPDATE_ORGANIZATION_SCHEMA
    }
}

/// GET /api/organizations
pub async fn list_organizations(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Organization>>>, ApiError> {
    let organizations = Organization::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(organizations)))
}

/// POST /api/organizations
pub async fn create_organization(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateOrganization>,
) -> Result<ResponseJson<ApiResponse<Organization>>, ApiError> {
    let organization =
        Organization::create(&state.db.pool, Uuid::new_v4(), &payload).await?;
    Ok(ResponseJson(ApiResponse::success(organization)))
}

/// GET /api/organizations/{org_id}
pub async fn get_organization(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Organization>>, ApiError> {
    let organization = Organization::find_by_id(&state.db.pool, org_id)
        .await?
        .ok_or(ApiError::NotFound("organization"))?;
    Ok(ResponseJson(ApiResponse::success(organization)))
}

/// PATCH /api/organizations/{org_id}
pub async fn update_organization(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateOrganization>,
) -> Result<ResponseJson<ApiResponse<Organization>>, ApiError> {
    let existing = Organization::find_by_id(&state.db.pool, org_id)
        .await?
        .ok_or(ApiError::NotFound("organization"))?;

    let organization = Organization::update(
        &state.db.pool,
        org_id,
        payload.name.unwrap_or(existing.name),
        payload.slug.unwrap_or(existing.slug),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(organization)))
}

/// DELETE /api/organizations/{org_id}
pub async fn delete_organization(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Organization::delete(&state.db.pool, org_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("organization"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/organizations",
        Router::new()
            .route("/", get(list_organizations).post(create_organization))
            .route(
                "/{org_id}",
                get(get_organization)
                    .patch(update_organization)
                    .delete(delete_organization),
            ),
    )
}
