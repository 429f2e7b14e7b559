//! Repository for the pipeline job queue (a single Redis list).
//!
//! Producers append with RPUSH and the worker consumes with LPOP, so jobs
//! leave the queue in the order they were pushed. There is no
//! acknowledgement: a popped payload is gone whether or not it is processed.

use jenga_core::job::Job;
use redis::AsyncCommands;

use crate::{CacheConn, CacheError};

/// Default name of the queue list.
pub const DEFAULT_QUEUE: &str = "pipeline_queue";

/// Provides access to the job queue list.
pub struct QueueRepo;

impl QueueRepo {
    /// Pop the oldest raw payload, or `None` when the queue is empty.
    pub async fn pop(conn: &mut CacheConn, queue: &str) -> Result<Option<String>, CacheError> {
        let payload: Option<String> = conn.lpop(queue, None).await?;
        Ok(payload)
    }

    /// Append a job to the tail of the queue. Returns the new queue length.
    pub async fn push(conn: &mut CacheConn, queue: &str, job: &Job) -> Result<i64, CacheError> {
        let payload = job.to_payload()?;
        let len: i64 = conn.rpush(queue, payload).await?;
        tracing::debug!(queue, batch_id = %job.batch_id, len, "Job enqueued");
        Ok(len)
    }

    /// Number of jobs waiting in the queue.
    pub async fn len(conn: &mut CacheConn, queue: &str) -> Result<i64, CacheError> {
        let len: i64 = conn.llen(queue).await?;
        Ok(len)
    }
}
