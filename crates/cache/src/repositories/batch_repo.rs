//! Repositories for the per-batch `batch:{id}` and `batch:{id}:error` hashes.
//!
//! No expiry is set on either key.

use std::collections::HashMap;

use jenga_core::progress::{error_key, progress_key, BatchError, BatchProgress};
use redis::AsyncCommands;

use crate::{CacheConn, CacheError};

/// Live progress hash for a batch.
pub struct BatchProgressRepo;

impl BatchProgressRepo {
    /// Overwrite the progress fields for `batch_id`.
    pub async fn set(
        conn: &mut CacheConn,
        batch_id: &str,
        progress: &BatchProgress,
    ) -> Result<(), CacheError> {
        let fields = progress.to_fields();
        let _: () = conn
            .hset_multiple(progress_key(batch_id), fields.as_slice())
            .await?;
        Ok(())
    }

    /// Read the progress for `batch_id`, or `None` if nothing was recorded.
    pub async fn get(
        conn: &mut CacheConn,
        batch_id: &str,
    ) -> Result<Option<BatchProgress>, CacheError> {
        let fields: HashMap<String, String> = conn.hgetall(progress_key(batch_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(BatchProgress::from_fields(&fields)?))
    }
}

/// Failure record hash for a batch.
pub struct BatchErrorRepo;

impl BatchErrorRepo {
    /// Record why `batch_id` was abandoned.
    pub async fn set(
        conn: &mut CacheConn,
        batch_id: &str,
        error: &BatchError,
    ) -> Result<(), CacheError> {
        let fields = error.to_fields();
        let _: () = conn
            .hset_multiple(error_key(batch_id), fields.as_slice())
            .await?;
        Ok(())
    }

    /// Read the failure record for `batch_id`, if any.
    pub async fn get(conn: &mut CacheConn, batch_id: &str) -> Result<Option<BatchError>, CacheError> {
        let fields: HashMap<String, String> = conn.hgetall(error_key(batch_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(BatchError::from_fields(&fields)?))
    }
}
