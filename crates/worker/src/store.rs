//! Storage seams used by the pipeline runner.
//!
//! The runner only sees these three traits. Production wires them to Redis
//! and PostgreSQL; tests swap in in-memory fakes.

use async_trait::async_trait;
use jenga_cache::{BatchErrorRepo, BatchProgressRepo, CacheConn, CacheError, QueueRepo};
use jenga_core::progress::{BatchError, BatchProgress};
use jenga_db::models::stage_log::CreateStageLog;
use jenga_db::repositories::StageLogRepo;
use jenga_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Source of raw job payloads.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Remove and return the oldest payload, if any.
    async fn pop(&self) -> Result<Option<String>, StoreError>;
}

/// Ephemeral per-batch records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn set_progress(&self, batch_id: &str, progress: &BatchProgress)
        -> Result<(), StoreError>;

    async fn set_error(&self, batch_id: &str, error: &BatchError) -> Result<(), StoreError>;
}

/// Durable, append-only stage history.
#[async_trait]
pub trait StageLogSink: Send + Sync {
    async fn append(&self, entry: &CreateStageLog) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Redis
// ---------------------------------------------------------------------------

/// Job queue backed by a Redis list.
pub struct RedisQueue {
    conn: CacheConn,
    queue: String,
}

impl RedisQueue {
    pub fn new(conn: CacheConn, queue: impl Into<String>) -> Self {
        Self {
            conn,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn pop(&self) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(QueueRepo::pop(&mut conn, &self.queue).await?)
    }
}

/// Batch progress and error hashes in Redis.
pub struct RedisProgressStore {
    conn: CacheConn,
}

impl RedisProgressStore {
    pub fn new(conn: CacheConn) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn set_progress(
        &self,
        batch_id: &str,
        progress: &BatchProgress,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        Ok(BatchProgressRepo::set(&mut conn, batch_id, progress).await?)
    }

    async fn set_error(&self, batch_id: &str, error: &BatchError) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        Ok(BatchErrorRepo::set(&mut conn, batch_id, error).await?)
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Stage history in the `data_pipeline_logs` table.
pub struct PgStageLogSink {
    pool: DbPool,
}

impl PgStageLogSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StageLogSink for PgStageLogSink {
    async fn append(&self, entry: &CreateStageLog) -> Result<(), StoreError> {
        StageLogRepo::create(&self.pool, entry).await?;
        Ok(())
    }
}
