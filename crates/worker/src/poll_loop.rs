//! Timer-driven poll loop.
//!
//! Checks the queue on a fixed interval and hands each tick to the
//! [`PipelineRunner`]. Runs until `cancel` is triggered; a job still in
//! flight at that point is abandoned at its next suspension point.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::runner::{JobOutcome, PipelineRunner, PollOutcome};

/// Run the poll loop until `cancel` fires.
pub async fn run(runner: Arc<PipelineRunner>, poll_interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = poll_interval.as_secs_f64(),
        "Worker is ready and listening for jobs"
    );

    let mut interval = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Poll loop stopping");
                break;
            }
            _ = interval.tick() => {
                if runner.is_busy() {
                    continue;
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::warn!(
                            batch_id = ?runner.current_batch(),
                            "Shutdown requested mid-job, abandoning batch"
                        );
                        break;
                    }
                    result = runner.poll_once() => match result {
                        Ok(PollOutcome::Processed(JobOutcome::Failed { batch_id, stage, .. })) => {
                            tracing::debug!(batch_id, %stage, "Batch abandoned, resuming polling");
                        }
                        Ok(outcome) => {
                            tracing::trace!(?outcome, "Poll finished");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Error checking for jobs");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use jenga_core::job::Job;
    use jenga_core::progress::{BatchError, BatchProgress};
    use jenga_db::models::stage_log::CreateStageLog;

    use super::*;
    use crate::runner::RunnerSettings;
    use crate::store::{JobQueue, ProgressStore, StageLogSink, StoreError};

    #[derive(Default)]
    struct Queue(Mutex<VecDeque<String>>);

    #[async_trait]
    impl JobQueue for Queue {
        async fn pop(&self) -> Result<Option<String>, StoreError> {
            Ok(self.0.lock().unwrap().pop_front())
        }
    }

    #[derive(Default)]
    struct Sink {
        finished: Mutex<Vec<String>>,
        progress: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProgressStore for Sink {
        async fn set_progress(
            &self,
            batch_id: &str,
            _progress: &BatchProgress,
        ) -> Result<(), StoreError> {
            self.progress.lock().unwrap().push(batch_id.to_string());
            Ok(())
        }

        async fn set_error(&self, _batch_id: &str, _error: &BatchError) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[async_trait]
    impl StageLogSink for Sink {
        async fn append(&self, entry: &CreateStageLog) -> Result<(), StoreError> {
            if entry.stage.is_last() && entry.duration_ms.is_some() {
                self.finished.lock().unwrap().push(entry.stage.to_string());
            }
            Ok(())
        }
    }

    fn runner_with(jobs: &[Job], sink: &Arc<Sink>) -> Arc<PipelineRunner> {
        let queue = Queue::default();
        for job in jobs {
            queue.0.lock().unwrap().push_back(job.to_payload().unwrap());
        }
        let settings = RunnerSettings {
            tick_delay: Duration::ZERO,
            stage_delay: Duration::ZERO,
            ..Default::default()
        };
        Arc::new(PipelineRunner::new(
            Arc::new(queue),
            sink.clone(),
            sink.clone(),
            settings,
        ))
    }

    #[tokio::test]
    async fn stops_immediately_when_cancelled() {
        let sink = Arc::new(Sink::default());
        let runner = runner_with(&[Job::new("b1", 10)], &sink);
        let cancel = CancellationToken::new();
        cancel.cancel();

        run(runner, Duration::from_millis(10), cancel).await;
        assert!(sink.progress.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drains_one_job_per_tick_until_cancelled() {
        let sink = Arc::new(Sink::default());
        let runner = runner_with(&[Job::new("b1", 10), Job::new("b2", 10)], &sink);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(runner.clone(), Duration::from_millis(10), cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(sink.finished.lock().unwrap().len(), 2);
        let progress = sink.progress.lock().unwrap().clone();
        let first_b2 = progress.iter().position(|id| id == "b2").unwrap();
        assert!(progress[..first_b2].iter().all(|id| id == "b1"));
        assert!(!runner.is_busy());
    }
}
