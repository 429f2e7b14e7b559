//! Per-job lifecycle.
//!
//! ```text
//! Queued -> Running(ingestion) -> ... -> Running(storage) -> Completed
//!                 \_____________________________/
//!                              -> Failed(stage)
//! ```
//!
//! `Completed` and `Failed` are terminal; there is no retry transition.

use std::fmt;

use crate::error::CoreError;
use crate::stage::{Stage, PIPELINE_STAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running(Stage),
    Completed,
    Failed(Stage),
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Check whether moving from `self` to `to` is allowed.
    pub fn can_transition(self, to: JobState) -> bool {
        match (self, to) {
            (Self::Queued, Self::Running(stage)) => stage == PIPELINE_STAGES[0],
            (Self::Running(from), Self::Running(next)) => from.next() == Some(next),
            (Self::Running(from), Self::Completed) => from.is_last(),
            (Self::Running(from), Self::Failed(at)) => from == at,
            _ => false,
        }
    }

    /// Move to `to`, or fail with [`CoreError::InvalidTransition`].
    pub fn transition(self, to: JobState) -> Result<JobState, CoreError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Running(stage) => write!(f, "running({stage})"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn happy_path_walks_every_stage() {
        let mut state = JobState::Queued;
        for stage in PIPELINE_STAGES {
            state = state.transition(JobState::Running(stage)).unwrap();
        }
        state = state.transition(JobState::Completed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn must_start_at_ingestion() {
        assert!(!JobState::Queued.can_transition(JobState::Running(Stage::DataValidation)));
    }

    #[test]
    fn cannot_skip_a_stage() {
        let state = JobState::Running(Stage::DataIngestion);
        assert!(!state.can_transition(JobState::Running(Stage::DataTransformation)));
    }

    #[test]
    fn cannot_complete_early() {
        let state = JobState::Running(Stage::DataNormalization);
        assert_matches!(
            state.transition(JobState::Completed),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn any_running_stage_can_fail() {
        for stage in PIPELINE_STAGES {
            assert!(JobState::Running(stage).can_transition(JobState::Failed(stage)));
        }
    }

    #[test]
    fn failure_names_the_current_stage() {
        let state = JobState::Running(Stage::DataValidation);
        assert!(!state.can_transition(JobState::Failed(Stage::DataStorage)));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let failed = JobState::Failed(Stage::DataIngestion);
        assert!(failed.is_terminal());
        assert!(!failed.can_transition(JobState::Running(Stage::DataIngestion)));
        assert!(!JobState::Completed.can_transition(JobState::Queued));
    }

    #[test]
    fn display_names_stage() {
        assert_eq!(
            JobState::Running(Stage::DataStorage).to_string(),
            "running(data_storage)"
        );
    }
}
