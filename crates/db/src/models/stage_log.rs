//! Stage log models and DTOs.
//!
//! Defines the database row struct for `data_pipeline_logs` and the create
//! DTO the worker appends on every progress tick.

use jenga_core::progress::StageStatus;
use jenga_core::stage::Stage;
use jenga_core::types::{RecordCount, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stage log row from the `data_pipeline_logs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StageLog {
    pub id: i64,
    pub stage_name: String,
    pub status: String,
    pub records_processed: RecordCount,
    pub total_records: RecordCount,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for appending a stage log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStageLog {
    pub stage: Stage,
    pub status: StageStatus,
    pub records_processed: RecordCount,
    pub total_records: RecordCount,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_ms: Option<i64>,
}

impl CreateStageLog {
    /// A progress row for a stage that is still running.
    pub fn running(
        stage: Stage,
        records_processed: RecordCount,
        total_records: RecordCount,
        start_time: Timestamp,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Running,
            records_processed,
            total_records,
            start_time,
            end_time: None,
            duration_ms: None,
        }
    }

    /// The final row for a stage; `duration_ms` is `end_time - start_time`.
    pub fn completed(
        stage: Stage,
        total_records: RecordCount,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            records_processed: total_records,
            total_records,
            start_time,
            end_time: Some(end_time),
            duration_ms: Some((end_time - start_time).num_milliseconds()),
        }
    }
}
