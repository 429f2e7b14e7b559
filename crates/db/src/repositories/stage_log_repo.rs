//! Repository for the `data_pipeline_logs` table.

use sqlx::PgPool;

use crate::models::stage_log::{CreateStageLog, StageLog};

/// Column list for data_pipeline_logs queries.
const COLUMNS: &str = "id, stage_name, status, records_processed, total_records, \
    start_time, end_time, duration_ms, created_at";

/// Provides data-access methods for stage logs.
pub struct StageLogRepo;

impl StageLogRepo {
    /// Append a stage log row.
    pub async fn create(pool: &PgPool, input: &CreateStageLog) -> Result<StageLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_pipeline_logs
                (stage_name, status, records_processed, total_records,
                 start_time, end_time, duration_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StageLog>(&query)
            .bind(input.stage.as_str())
            .bind(input.status.as_str())
            .bind(input.records_processed)
            .bind(input.total_records)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.duration_ms)
            .fetch_one(pool)
            .await
    }

    /// List the most recent rows across all stages, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<StageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_pipeline_logs
             ORDER BY id DESC
             LIMIT $1"
        );
        sqlx::query_as::<_, StageLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List rows for one stage in insertion order.
    pub async fn list_for_stage(
        pool: &PgPool,
        stage_name: &str,
        limit: i64,
    ) -> Result<Vec<StageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_pipeline_logs
             WHERE stage_name = $1
             ORDER BY id ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, StageLog>(&query)
            .bind(stage_name)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count rows with the given status.
    pub async fn count_by_status(pool: &PgPool, status: &str) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM data_pipeline_logs WHERE status = $1")
                .bind(status)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
