//! Queue job payload.
//!
//! Producers push jobs as camelCase JSON onto the pipeline queue. The worker
//! decodes and validates each payload before running it.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::RecordCount;

/// Record count used when a job does not specify one.
pub const DEFAULT_TOTAL_RECORDS: RecordCount = 1000;

/// Maximum length of a batch identifier.
pub const MAX_BATCH_ID_LEN: u64 = 128;

/// One unit of simulated work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[validate(length(min = 1, max = MAX_BATCH_ID_LEN))]
    pub batch_id: String,

    /// Target record count. Absent, `null` and `0` all mean "use the default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub total_records: Option<RecordCount>,
}

impl Job {
    pub fn new(batch_id: impl Into<String>, total_records: RecordCount) -> Self {
        Self {
            batch_id: batch_id.into(),
            total_records: Some(total_records),
        }
    }

    /// Decode and validate a raw queue payload.
    pub fn parse(payload: &str) -> Result<Self, CoreError> {
        let job: Job = serde_json::from_str(payload)
            .map_err(|e| CoreError::InvalidPayload(e.to_string()))?;
        job.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        Ok(job)
    }

    /// The record count the pipeline should process for this job.
    pub fn effective_total(&self, default: RecordCount) -> RecordCount {
        match self.total_records {
            Some(n) if n > 0 => n,
            _ => default,
        }
    }

    pub fn to_payload(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::InvalidPayload(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
