use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AcademicLog {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub score: f64,
    pub max_score: f64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicLog {
    /// Score as a fraction of the maximum, for display
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            0.0
        }
    }
}

/// Request body for recording an academic log
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAcademicLog {
    pub student_id: Uuid,
    pub subject: String,
    pub score: f64,
    pub max_score: Option<f64>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Request body for partially updating an academic log
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateAcademicLog {
    pub subject: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

const ACADEMIC_LOG_COLUMNS: &str = "id, org_id, student_id, subject, score, max_score, note, occurred_at, created_at, updated_at";

impl AcademicLog {
    pub async fn find_by_org_id(
        pool: &SqlitePool,
        org_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {ACADEMIC_LOG_COLUMNS}
             FROM academic_logs
             WHERE org_id = $1
             ORDER BY occurred_at DESC"
        ))
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_student_id(
        pool: &SqlitePool,
        org_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {ACADEMIC_LOG_COLUMNS}
             FROM academic_logs
             WHERE org_id = $1 AND student_id = $2
             ORDER BY occurred_at DESC"
        ))
        .bind(org_id)
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {ACADEMIC_LOG_COLUMNS}
             FROM academic_logs
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
        data: &CreateAcademicLog,
    ) -> Result<Self, sqlx::Error> {
        let max_score = data.max_score.unwrap_or(100.0);
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO academic_logs (id, org_id, student_id, subject, score, max_score, note, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ACADEMIC_LOG_COLUMNS}"
        ))
        .bind(id)
        .bind(org_id)
        .bind(data.student_id)
        .bind(&data.subject)
        .bind(data.score)
        .bind(max_score)
        .bind(&data.note)
        .bind(data.occurred_at)
        .fetch_one(pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
        subject: String,
        score: f64,
        max_score: f64,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE academic_logs
             SET subject = $3, score = $4, max_score = $5, note = $6,
                 occurred_at = $7, updated_at = datetime('now', 'subsec')
             WHERE org_id = $1 AND id = $2
             RETURNING {ACADEMIC_LOG_COLUMNS}"
        ))
        .bind(org_id)
        .bind(id)
        .bind(subject)
        .bind(score)
        .bind(max_score)
        .bind(note)
        .bind(occurred_at)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, org_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM academic_logs WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
