//! The pipeline runner.
//!
//! [`PipelineRunner`] pops one job at a time and walks it through the five
//! stages, reporting progress to the ephemeral store and appending stage
//! history to the durable log. All mutable worker state (the busy flag and
//! the batch in flight) lives on the runner itself, so independent runners
//! never interfere with each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use jenga_core::job::Job;
use jenga_core::job_state::JobState;
use jenga_core::progress::{progress_ticks, BatchError, BatchProgress};
use jenga_core::stage::{Stage, PIPELINE_STAGES};
use jenga_core::types::RecordCount;
use jenga_db::models::stage_log::CreateStageLog;

use crate::config::{LogFailurePolicy, WorkerConfig};
use crate::store::{JobQueue, ProgressStore, StageLogSink, StoreError};

// ---------------------------------------------------------------------------
// Settings and outcomes
// ---------------------------------------------------------------------------

/// Timing and sizing knobs for the simulated stages.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub tick_delay: Duration,
    pub stage_delay: Duration,
    pub chunk_size: RecordCount,
    pub default_total_records: RecordCount,
    pub log_failure_policy: LogFailurePolicy,
}

impl From<&WorkerConfig> for RunnerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            tick_delay: config.tick_delay,
            stage_delay: config.stage_delay,
            chunk_size: config.chunk_size,
            default_total_records: config.default_total_records,
            log_failure_policy: config.log_failure_policy,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

/// A stage aborted by a failed store write.
#[derive(Debug, thiserror::Error)]
#[error("Stage {stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: StoreError,
}

impl StageError {
    fn new(stage: Stage, source: StoreError) -> Self {
        Self { stage, source }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed {
        batch_id: String,
        stages: usize,
    },
    Failed {
        batch_id: String,
        stage: Stage,
        error: String,
    },
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A job was already in flight; the queue was not touched.
    Busy,
    /// The queue was empty.
    Empty,
    /// A payload was popped but could not be decoded; it is dropped.
    Discarded,
    Processed(JobOutcome),
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct PipelineRunner {
    queue: Arc<dyn JobQueue>,
    progress: Arc<dyn ProgressStore>,
    logs: Arc<dyn StageLogSink>,
    settings: RunnerSettings,
    busy: AtomicBool,
    current_batch: Mutex<Option<String>>,
}

impl PipelineRunner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        progress: Arc<dyn ProgressStore>,
        logs: Arc<dyn StageLogSink>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            queue,
            progress,
            logs,
            settings,
            busy: AtomicBool::new(false),
            current_batch: Mutex::new(None),
        }
    }

    /// Whether a job is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Batch id of the job in flight, if any.
    pub fn current_batch(&self) -> Option<String> {
        self.current_batch_slot().clone()
    }

    /// Pop one job and run it to completion or failure.
    ///
    /// Skips the queue entirely while another job is in flight. A queue
    /// error is returned to the caller; everything after the pop is handled
    /// here and reported through [`PollOutcome`].
    pub async fn poll_once(&self) -> Result<PollOutcome, StoreError> {
        let Some(_in_flight) = InFlight::acquire(self) else {
            tracing::debug!("Job in flight, skipping poll");
            return Ok(PollOutcome::Busy);
        };

        let Some(payload) = self.queue.pop().await? else {
            return Ok(PollOutcome::Empty);
        };

        let job = match Job::parse(&payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, payload = %payload, "Dropping undecodable job");
                return Ok(PollOutcome::Discarded);
            }
        };

        *self.current_batch_slot() = Some(job.batch_id.clone());
        Ok(PollOutcome::Processed(self.run_job(&job).await))
    }

    /// Walk `job` through every stage in order, stopping at the first failure.
    async fn run_job(&self, job: &Job) -> JobOutcome {
        let batch_id = job.batch_id.as_str();
        let total = job.effective_total(self.settings.default_total_records);
        tracing::info!(batch_id, total, "Processing batch");

        let mut state = JobState::Queued;
        for stage in PIPELINE_STAGES {
            state = advance(batch_id, state, JobState::Running(stage));

            if let Err(e) = self.process_stage(stage, batch_id, total).await {
                state = advance(batch_id, state, JobState::Failed(stage));
                tracing::error!(batch_id, %state, error = %e, "Error processing batch");
                self.record_error(batch_id, &e).await;
                return JobOutcome::Failed {
                    batch_id: batch_id.to_string(),
                    stage,
                    error: e.to_string(),
                };
            }

            tokio::time::sleep(self.settings.stage_delay).await;
        }

        state = advance(batch_id, state, JobState::Completed);
        tracing::info!(batch_id, %state, "Completed batch");
        JobOutcome::Completed {
            batch_id: batch_id.to_string(),
            stages: PIPELINE_STAGES.len(),
        }
    }

    /// Simulate one stage in `chunk_size` increments.
    ///
    /// Writes a start row, then per tick a `running` row and the batch
    /// progress hash, and finally a `completed` row. The `completed` row is
    /// always the last row written for the stage.
    async fn process_stage(
        &self,
        stage: Stage,
        batch_id: &str,
        total: RecordCount,
    ) -> Result<(), StageError> {
        let start_time = Utc::now();
        tracing::debug!(batch_id, %stage, total, "Processing stage");

        self.append_log(CreateStageLog::running(stage, 0, total, start_time))
            .await?;

        for processed in progress_ticks(total, self.settings.chunk_size) {
            tokio::time::sleep(self.settings.tick_delay).await;

            self.append_log(CreateStageLog::running(stage, processed, total, start_time))
                .await?;

            let progress = BatchProgress {
                current_stage: stage,
                processed,
                total,
            };
            self.progress
                .set_progress(batch_id, &progress)
                .await
                .map_err(|e| StageError::new(stage, e))?;

            tracing::debug!(batch_id, %stage, processed, total, "Stage progress");
        }

        let completed = CreateStageLog::completed(stage, total, start_time, Utc::now());
        let duration_ms = completed.duration_ms;
        self.append_log(completed).await?;

        tracing::info!(batch_id, %stage, total, duration_ms, "Completed stage");
        Ok(())
    }

    /// Append a stage log row, applying the configured failure policy.
    async fn append_log(&self, entry: CreateStageLog) -> Result<(), StageError> {
        match self.logs.append(&entry).await {
            Ok(()) => Ok(()),
            Err(e) => match self.settings.log_failure_policy {
                LogFailurePolicy::BestEffort => {
                    tracing::warn!(
                        stage = %entry.stage,
                        status = %entry.status,
                        error = %e,
                        "Error logging stage",
                    );
                    Ok(())
                }
                LogFailurePolicy::Abort => Err(StageError::new(entry.stage, e)),
            },
        }
    }

    /// Write the failure record for an abandoned batch. Errors here are only logged.
    async fn record_error(&self, batch_id: &str, error: &StageError) {
        let record = BatchError::now(error.to_string());
        if let Err(e) = self.progress.set_error(batch_id, &record).await {
            tracing::error!(batch_id, error = %e, "Error recording batch failure");
        }
    }

    fn current_batch_slot(&self) -> MutexGuard<'_, Option<String>> {
        // The slot only ever holds a plain value, so a poisoned lock is still usable.
        self.current_batch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Move `from` to `to` through [`JobState::transition`].
///
/// An illegal step is logged and `to` is still taken, so a bug in the walk
/// never stalls the worker.
fn advance(batch_id: &str, from: JobState, to: JobState) -> JobState {
    from.transition(to).unwrap_or_else(|e| {
        tracing::error!(batch_id, error = %e, "Unexpected job state transition");
        to
    })
}

/// Holds the busy flag for the lifetime of one poll.
///
/// Dropping the guard (including when the poll future itself is dropped on
/// shutdown) clears both the busy flag and the batch in flight.
struct InFlight<'a> {
    runner: &'a PipelineRunner,
}

impl<'a> InFlight<'a> {
    fn acquire(runner: &'a PipelineRunner) -> Option<Self> {
        runner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { runner })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.runner.current_batch_slot() = None;
        self.runner.busy.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
