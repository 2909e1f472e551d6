use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Guardian contact details, persisted as a JSON text column
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Guardian {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Student {
    pub id: Uuid,
    pub org_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub grade_level: Option<i32>,
    pub guardian: Option<String>, // JSON-serialized Guardian
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Parse the guardian JSON into a Guardian struct
    pub fn parsed_guardian(&self) -> Option<Guardian> {
        self.guardian
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Request body for enrolling a student
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub grade_level: Option<i32>,
    pub guardian: Option<Guardian>,
    pub notes: Option<String>,
}

/// Request body for partially updating a student
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateStudent {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub grade_level: Option<i32>,
    pub guardian: Option<Guardian>,
    pub notes: Option<String>,
}

const STUDENT_COLUMNS: &str = "id, org_id, first_name, last_name, email, grade_level, guardian, notes, created_at, updated_at";

impl Student {
    pub async fn find_by_org_id(
        pool: &SqlitePool,
        org_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {STUDENT_COLUMNS}
             FROM students
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
            "SELECT {STUDENT_COLUMNS}
             FROM students
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
        data: &CreateStudent,
    ) -> Result<Self, sqlx::Error> {
        let guardian = serialize_guardian(data.guardian.as_ref())?;
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO students (id, org_id, first_name, last_name, email, grade_level, guardian, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(org_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(data.grade_level)
        .bind(guardian)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
        first_name: String,
        last_name: String,
        email: Option<String>,
        grade_level: Option<i32>,
        guardian: Option<Guardian>,
        notes: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let guardian = serialize_guardian(guardian.as_ref())?;
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE students
             SET first_name = $3, last_name = $4, email = $5, grade_level = $6,
                 guardian = $7, notes = $8, updated_at = datetime('now', 'subsec')
             WHERE org_id = $1 AND id = $2
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(org_id)
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(grade_level)
        .bind(guardian)
        .bind(notes)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, org_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM students WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn serialize_guardian(guardian: Option<&Guardian>) -> Result<Option<String>, sqlx::Error> {
    guardian
        .map(|g| serde_json::to_string(g).map_err(|e| sqlx::Error::Protocol(e.to_string())))
        .transpose()
}
