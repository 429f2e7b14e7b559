//! Integration tests for the queue and batch-hash repositories.
//!
//! These need a live Redis reachable through `REDIS_URL` (default
//! `redis://localhost:6379`); run them with
//! `cargo test -p jenga-cache -- --ignored`. Every test uses its own keys and
//! deletes them afterwards.

use jenga_cache::{BatchErrorRepo, BatchProgressRepo, CacheConn, QueueRepo};
use jenga_core::job::Job;
use jenga_core::progress::{error_key, progress_key, BatchError, BatchProgress};
use jenga_core::stage::Stage;
use redis::AsyncCommands;

async fn conn() -> CacheConn {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let mut conn = jenga_cache::connect(&url).await.unwrap();
    jenga_cache::health_check(&mut conn).await.unwrap();
    conn
}

/// Key name private to one test run.
fn scoped(name: &str) -> String {
    format!("jenga_test:{}:{name}", std::process::id())
}

async fn cleanup(conn: &mut CacheConn, keys: &[String]) {
    let _: i64 = conn.del(keys).await.unwrap();
}

// -- queue -------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_queue_is_fifo() {
    let mut conn = conn().await;
    let queue = scoped("queue_fifo");
    cleanup(&mut conn, &[queue.clone()]).await;

    assert_eq!(QueueRepo::push(&mut conn, &queue, &Job::new("b1", 10)).await.unwrap(), 1);
    assert_eq!(QueueRepo::push(&mut conn, &queue, &Job::new("b2", 20)).await.unwrap(), 2);
    assert_eq!(QueueRepo::len(&mut conn, &queue).await.unwrap(), 2);

    let first = QueueRepo::pop(&mut conn, &queue).await.unwrap().unwrap();
    assert_eq!(Job::parse(&first).unwrap(), Job::new("b1", 10));
    let second = QueueRepo::pop(&mut conn, &queue).await.unwrap().unwrap();
    assert_eq!(Job::parse(&second).unwrap(), Job::new("b2", 20));

    assert_eq!(QueueRepo::len(&mut conn, &queue).await.unwrap(), 0);
    cleanup(&mut conn, &[queue]).await;
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_pop_empty_queue() {
    let mut conn = conn().await;
    let queue = scoped("queue_empty");
    cleanup(&mut conn, &[queue.clone()]).await;

    assert_eq!(QueueRepo::pop(&mut conn, &queue).await.unwrap(), None);
    assert_eq!(QueueRepo::len(&mut conn, &queue).await.unwrap(), 0);
}

// -- batch progress ----------------------------------------------------------

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_progress_is_overwritten() {
    let mut conn = conn().await;
    let batch_id = scoped("progress");

    let first = BatchProgress {
        current_stage: Stage::DataIngestion,
        processed: 100,
        total: 250,
    };
    BatchProgressRepo::set(&mut conn, &batch_id, &first).await.unwrap();

    let latest = BatchProgress {
        current_stage: Stage::DataValidation,
        processed: 200,
        total: 250,
    };
    BatchProgressRepo::set(&mut conn, &batch_id, &latest).await.unwrap();

    let stored = BatchProgressRepo::get(&mut conn, &batch_id).await.unwrap();
    assert_eq!(stored, Some(latest));

    let raw: std::collections::HashMap<String, String> =
        conn.hgetall(progress_key(&batch_id)).await.unwrap();
    assert_eq!(raw.get("currentStage").map(String::as_str), Some("data_validation"));

    cleanup(&mut conn, &[progress_key(&batch_id)]).await;
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_missing_progress_is_none() {
    let mut conn = conn().await;
    let batch_id = scoped("progress_missing");
    assert_eq!(BatchProgressRepo::get(&mut conn, &batch_id).await.unwrap(), None);
}

// -- batch error -------------------------------------------------------------

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_error_record_keeps_timestamp() {
    let mut conn = conn().await;
    let batch_id = scoped("error");

    let error = BatchError::now("connection refused");
    BatchErrorRepo::set(&mut conn, &batch_id, &error).await.unwrap();

    let stored = BatchErrorRepo::get(&mut conn, &batch_id).await.unwrap().unwrap();
    assert_eq!(stored.error, "connection refused");
    assert_eq!(stored.timestamp, error.timestamp);
    assert_eq!(BatchProgressRepo::get(&mut conn, &batch_id).await.unwrap(), None);

    cleanup(&mut conn, &[error_key(&batch_id)]).await;
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_missing_error_is_none() {
    let mut conn = conn().await;
    let batch_id = scoped("error_missing");
    assert!(BatchErrorRepo::get(&mut conn, &batch_id).await.unwrap().is_none());
}
