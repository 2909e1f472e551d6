use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Whether logs in this category count for or against a student
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CategoryKind {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Category {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub color: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCategory {
    pub name: String,
    pub color: String,
    pub kind: Option<CategoryKind>,
}

/// Request body for partially updating a category
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
    pub kind: Option<CategoryKind>,
}

const CATEGORY_COLUMNS: &str = "id, org_id, name, color, kind, created_at, updated_at";

impl Category {
    pub async fn find_by_org_id(
        pool: &SqlitePool,
        org_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM categories
             WHERE org_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM categories
             WHERE org_id = $1 AND id = $2"
        ))
        .bind(org_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        org_id: Uuid,
        data: &CreateCategory,
    ) -> Result<Self, sqlx::Error> {
        let kind = data.kind.clone().unwrap_or_default();
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO categories (id, org_id, name, color, kind)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(org_id)
        .bind(&data.name)
        .bind(&data.color)
        .bind(kind)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
        name: String,
        color: String,
        kind: CategoryKind,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE categories
             SET name = $3, color = $4, kind = $5, updated_at = datetime('now', 'subsec')
             WHERE org_id = $1 AND id = $2
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(org_id)
        .bind(id)
        .bind(name)
        .bind(color)
        .bind(kind)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, org_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
