//! The fixed five-phase pipeline.
//!
//! Stages carry no state of their own. They are identified by name in the
//! progress hash and the log table, and always run in the order of
//! [`PIPELINE_STAGES`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One named phase of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DataIngestion,
    DataValidation,
    DataTransformation,
    DataNormalization,
    DataStorage,
}

/// Every stage, in execution order.
pub const PIPELINE_STAGES: [Stage; 5] = [
    Stage::DataIngestion,
    Stage::DataValidation,
    Stage::DataTransformation,
    Stage::DataNormalization,
    Stage::DataStorage,
];

impl Stage {
    /// Name used in the progress hash and the `stage_name` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataIngestion => "data_ingestion",
            Self::DataValidation => "data_validation",
            Self::DataTransformation => "data_transformation",
            Self::DataNormalization => "data_normalization",
            Self::DataStorage => "data_storage",
        }
    }

    /// Zero-based position in [`PIPELINE_STAGES`].
    pub fn index(self) -> usize {
        match self {
            Self::DataIngestion => 0,
            Self::DataValidation => 1,
            Self::DataTransformation => 2,
            Self::DataNormalization => 3,
            Self::DataStorage => 4,
        }
    }

    /// The stage that follows this one, or `None` after the last stage.
    pub fn next(self) -> Option<Stage> {
        PIPELINE_STAGES.get(self.index() + 1).copied()
    }

    pub fn is_last(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PIPELINE_STAGES
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown pipeline stage: \"{s}\"")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
