//! Routes for managing an organization's behavior categories.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    category::{Category, CreateCategory, UpdateCategory},
    organization::Organization,
};
use once_cell::sync::Lazy;
use regex::Regex;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    validation::{DeclaredSchema, ObjectSchema, Schema, ValidatedJson},
};

const CATEGORY_KINDS: &[&str] = &["positive", "negative", "neutral"];

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-f]{6}$").expect("valid regex"));

fn is_hex_color(s: &str) -> bool {
    HEX_COLOR_RE.is_match(s)
}

static CREATE_CATEGORY_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .field("name", Schema::string().trim().min_len(1).max_len(60))
        .field(
            "color",
            Schema::string()
                .trim()
                .lowercase()
                .check(is_hex_color, "must be a #rrggbb color"),
        )
        .optional_with_default(
            "kind",
            Schema::one_of(CATEGORY_KINDS),
            serde_json::json!("neutral"),
        )
        .strict()
});

static UPDATE_CATEGORY_SCHEMA: Lazy<ObjectSchema> = Lazy::new(|| {
    Schema::object()
        .optional("name", Schema::string().trim().min_len(1).max_len(60))
        .optional(
            "color",
            Schema::string()
                .trim()
                .lowercase()
                .check(is_hex_color, "must be a #rrggbb color"),
        )
        .optional("kind", Schema::one_of(CATEGORY_KINDS))
});

impl DeclaredSchema for CreateCategory {
    fn schema() -> &'static ObjectSchema {
        &CREATE_CATEGORY_SCHEMA
    }
}

impl DeclaredSchema for UpdateCategory {
    fn schema() -> &'static ObjectSchema {
        &UPDATE_CATEGORY_SCHEMA
    }
}

/// GET /api/organizations/{org_id}/categories
pub async fn list_categories(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = Category::find_by_org_id(&state.db.pool, org_id).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

/// POST /api/organizations/{org_id}/categories
pub async fn create_category(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateCategory>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    Organization::find_by_id(&state.db.pool, org_id)
        .await?
        .ok_or(ApiError::NotFound("organization"))?;

    let category = Category::create(&state.db.pool, Uuid::new_v4(), org_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

/// GET /api/organizations/{org_id}/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    let category = Category::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

/// PATCH /api/organizations/{org_id}/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateCategory>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    let existing = Category::find_by_id(&state.db.pool, org_id, id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    let category = Category::update(
        &state.db.pool,
        org_id,
        id,
        payload.name.unwrap_or(existing.name),
        payload.color.unwrap_or(existing.color),
        payload.kind.unwrap_or(existing.kind),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

/// DELETE /api/organizations/{org_id}/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Category::delete(&state.db.pool, org_id, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("category"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/organizations/{org_id}/categories",
        Router::new()
            .route("/", get(list_categories).post(create_category))
            .route(
                "/{id}",
                get(get_category)
                    .patch(update_category)
                    .delete(delete_category),
            ),
    )
}
