//! Startup validation that the database schema is in place.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables every deployment must have before serving traffic.
pub const REQUIRED_TABLES: &[&str] = &[
    "organizations",
    "students",
    "categories",
    "behavior_logs",
    "academic_logs",
];

#[derive(Debug, Error)]
pub enum SchemaHealthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("missing tables: {0}")]
    MissingTables(String),
}

/// Checks that migrations ran and the expected tables exist.
pub struct SchemaHealthCheck {
    pool: SqlitePool,
}

impl SchemaHealthCheck {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check migration state and table presence, returning a report.
    pub async fn validate(&self) -> Result<SchemaHealthReport, SchemaHealthError> {
        let migrations_table_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?
            > 0;

        if !migrations_table_exists {
            warn!("database not initialized - _sqlx_migrations table does not exist");
            return Ok(SchemaHealthReport {
                is_initialized: false,
                migrations_applied: 0,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;

        let missing_tables = self.missing_tables(REQUIRED_TABLES).await?;

        info!(
            migrations_applied,
            missing = missing_tables.len(),
            "schema health check complete"
        );

        Ok(SchemaHealthReport {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            missing_tables,
        })
    }

    /// Validate and fail hard when the schema is unusable.
    pub async fn require_healthy(&self) -> Result<(), SchemaHealthError> {
        let report = self.validate().await?;
        if !report.is_ok() {
            return Err(SchemaHealthError::MissingTables(
                report.missing_tables.join(", "),
            ));
        }
        Ok(())
    }

    async fn missing_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, SchemaHealthError> {
        let mut missing = Vec::new();

        for table in required_tables {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?
                > 0;

            if !exists {
                missing.push(table.to_string());
            }
        }

        Ok(missing)
    }
}

/// Result of a schema health check
#[derive(Debug, Clone)]
pub struct SchemaHealthReport {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub missing_tables: Vec<String>,
}

impl SchemaHealthReport {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("database OK - {} migrations applied", self.migrations_applied)
        }
    }
}
