use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating an organization
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
}

/// Request body for partially updating an organization
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl Organization {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"SELECT id, name, slug, created_at, updated_at
               FROM organizations
               ORDER BY created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"SELECT id, name, slug, created_at, updated_at
               FROM organizations
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateOrganization,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"INSERT INTO organizations (id, name, slug)
               VALUES ($1, $2, $3)
               RETURNING id, name, slug, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.slug)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: String,
        slug: String,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"UPDATE organizations
               SET name = $2, slug = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, name, slug, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
