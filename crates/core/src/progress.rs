//! Batch progress, error records and the tick planner.
//!
//! [`BatchProgress`] and [`BatchError`] are the ephemeral per-batch records
//! kept in the key-value store. They are flat string hashes, so both types
//! convert to and from `(field, value)` pairs here and the storage crate
//! stays a thin transport.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::stage::Stage;
use crate::types::{RecordCount, Timestamp};

/// Records processed per tick unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: RecordCount = 100;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Hash key holding live progress for a batch.
pub fn progress_key(batch_id: &str) -> String {
    format!("batch:{batch_id}")
}

/// Hash key holding the failure record for a batch.
pub fn error_key(batch_id: &str) -> String {
    format!("batch:{batch_id}:error")
}

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Status written to the `status` column of a stage log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Completed,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BatchProgress
// ---------------------------------------------------------------------------

/// Live progress of the batch currently in flight. Overwritten on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub current_stage: Stage,
    pub processed: RecordCount,
    pub total: RecordCount,
}

impl BatchProgress {
    pub const FIELD_STAGE: &'static str = "currentStage";
    pub const FIELD_PROCESSED: &'static str = "processed";
    pub const FIELD_TOTAL: &'static str = "total";

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (Self::FIELD_STAGE, self.current_stage.as_str().to_string()),
            (Self::FIELD_PROCESSED, self.processed.to_string()),
            (Self::FIELD_TOTAL, self.total.to_string()),
        ]
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, CoreError> {
        let current_stage = required(fields, Self::FIELD_STAGE)?.parse()?;
        let processed = parse_count(fields, Self::FIELD_PROCESSED)?;
        let total = parse_count(fields, Self::FIELD_TOTAL)?;
        Ok(Self {
            current_stage,
            processed,
            total,
        })
    }
}

// ---------------------------------------------------------------------------
// BatchError
// ---------------------------------------------------------------------------

/// Failure record for an abandoned batch. Written once, never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub error: String,
    pub timestamp: Timestamp,
}

impl BatchError {
    pub const FIELD_ERROR: &'static str = "error";
    pub const FIELD_TIMESTAMP: &'static str = "timestamp";

    /// Stamp an error message with the current time.
    pub fn now(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (Self::FIELD_ERROR, self.error.clone()),
            (Self::FIELD_TIMESTAMP, self.timestamp.to_rfc3339()),
        ]
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, CoreError> {
        let error = required(fields, Self::FIELD_ERROR)?.to_string();
        let timestamp = chrono::DateTime::parse_from_rfc3339(required(
            fields,
            Self::FIELD_TIMESTAMP,
        )?)
        .map_err(|e| CoreError::Validation(format!("Invalid error timestamp: {e}")))?
        .with_timezone(&Utc);
        Ok(Self { error, timestamp })
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, CoreError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| CoreError::Validation(format!("Missing field \"{name}\"")))
}

fn parse_count(fields: &HashMap<String, String>, name: &str) -> Result<RecordCount, CoreError> {
    required(fields, name)?
        .parse()
        .map_err(|_| CoreError::Validation(format!("Field \"{name}\" is not an integer")))
}

// ---------------------------------------------------------------------------
// Tick planning
// ---------------------------------------------------------------------------

/// Cumulative record counts reported by each tick of a stage.
///
/// Yields `chunk, 2 * chunk, ...` and finishes with exactly `total`. Yields
/// nothing when `total` is not positive.
#[derive(Debug, Clone)]
pub struct ProgressTicks {
    processed: RecordCount,
    total: RecordCount,
    chunk: RecordCount,
}

impl Iterator for ProgressTicks {
    type Item = RecordCount;

    fn next(&mut self) -> Option<RecordCount> {
        if self.processed >= self.total {
            return None;
        }
        self.processed = self.processed.saturating_add(self.chunk).min(self.total);
        Some(self.processed)
    }
}

/// Plan the ticks for a stage processing `total` records in `chunk`-sized steps.
///
/// `chunk` must be positive; configuration rejects zero before it gets here.
pub fn progress_ticks(total: RecordCount, chunk: RecordCount) -> ProgressTicks {
    ProgressTicks {
        processed: 0,
        total,
        chunk: chunk.max(1),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
