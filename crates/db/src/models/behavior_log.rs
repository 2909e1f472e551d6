use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// How serious an incident was
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Moderate,
    High,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BehaviorLog {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub category_id: Uuid,
    pub severity: Severity,
    pub note: Option<String>,
    pub tags: Option<String>, // JSON-serialized Vec<String>
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BehaviorLog {
    /// Parse the tags JSON into a list
    pub fn parsed_tags(&self) -> Option<Vec<String>> {
        self.tags
            .as_ref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Request body for recording a behavior log
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBehaviorLog {
    pub student_id: Uuid,
    pub category_id: Uuid,
    pub severity: Option<Severity>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub occurred_at: DateTime<Utc>,
}

/// Request body for partially updating a behavior log
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateBehaviorLog {
    pub category_id: Option<Uuid>,
    pub severity: Option<Severity>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
}

const BEHAVIOR_LOG_COLUMNS: &str = "id, org_id, student_id, category_id, severity, note, tags, occurred_at, created_at, updated_at";

impl BehaviorLog {
    pub async fn find_by_org_id(
        pool: &SqlitePool,
        org_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {BEHAVIOR_LOG_COLUMNS}
             FROM behavior_logs
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
            "SELECT {BEHAVIOR_LOG_COLUMNS}
             FROM behavior_logs
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
            "SELECT {BEHAVIOR_LOG_COLUMNS}
             FROM behavior_logs
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
        data: &CreateBehaviorLog,
    ) -> Result<Self, sqlx::Error> {
        let severity = data.severity.clone().unwrap_or_default();
        let tags = serialize_tags(data.tags.as_ref())?;
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO behavior_logs (id, org_id, student_id, category_id, severity, note, tags, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BEHAVIOR_LOG_COLUMNS}"
        ))
        .bind(id)
        .bind(org_id)
        .bind(data.student_id)
        .bind(data.category_id)
        .bind(severity)
        .bind(&data.note)
        .bind(tags)
        .bind(data.occurred_at)
        .fetch_one(pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        org_id: Uuid,
        id: Uuid,
        category_id: Uuid,
        severity: Severity,
        note: Option<String>,
        tags: Option<Vec<String>>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let tags = serialize_tags(tags.as_ref())?;
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE behavior_logs
             SET category_id = $3, severity = $4, note = $5, tags = $6,
                 occurred_at = $7, updated_at = datetime('now', 'subsec')
             WHERE org_id = $1 AND id = $2
             RETURNING {BEHAVIOR_LOG_COLUMNS}"
        ))
        .bind(org_id)
        .bind(id)
        .bind(category_id)
        .bind(severity)
        .bind(note)
        .bind(tags)
        .bind(occurred_at)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, org_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM behavior_logs WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn serialize_tags(tags: Option<&Vec<String>>) -> Result<Option<String>, sqlx::Error> {
    tags.map(|t| serde_json::to_string(t).map_err(|e| sqlx::Error::Protocol(e.to_string())))
        .transpose()
}
