use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jenga_cache::CacheConn;
use jenga_db::DbPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jenga_worker::config::{LogFormat, WorkerConfig};
use jenga_worker::poll_loop;
use jenga_worker::runner::{PipelineRunner, RunnerSettings};
use jenga_worker::store::{PgStageLogSink, RedisProgressStore, RedisQueue};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    // Tracing is configured from `log_format`, so this loads first.
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            tracing::error!(error = %e, "Invalid worker configuration");
            std::process::exit(1);
        }
    };

    // --- Tracing ---
    init_tracing(config.log_format);

    tracing::info!("Starting Jenga data pipeline worker");
    tracing::info!(
        queue = %config.queue_name,
        poll_interval_secs = config.poll_interval.as_secs(),
        chunk_size = config.chunk_size,
        log_failure_policy = %config.log_failure_policy,
        "Loaded worker configuration"
    );

    // --- Stores ---
    let (conn, pool) = match connect_stores(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Failed to start worker");
            std::process::exit(1);
        }
    };

    // --- Runner ---
    let runner = Arc::new(PipelineRunner::new(
        Arc::new(RedisQueue::new(conn.clone(), config.queue_name.clone())),
        Arc::new(RedisProgressStore::new(conn.clone())),
        Arc::new(PgStageLogSink::new(pool.clone())),
        RunnerSettings::from(&config),
    ));

    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(poll_loop::run(
        Arc::clone(&runner),
        config.poll_interval,
        cancel.clone(),
    ));

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), loop_handle).await;
    tracing::info!("Poll loop stopped");

    // The runner holds the remaining connection handles.
    drop(runner);
    drop(conn);
    pool.close().await;
    tracing::info!("Redis and PostgreSQL connections closed");
}

/// Connect to Redis and PostgreSQL, verifying both before any job is polled.
async fn connect_stores(config: &WorkerConfig) -> anyhow::Result<(CacheConn, DbPool)> {
    let mut conn = jenga_cache::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    jenga_cache::health_check(&mut conn)
        .await
        .context("Redis health check failed")?;
    tracing::info!("Connected to Redis");

    let pool = jenga_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    jenga_db::health_check(&pool)
        .await
        .context("PostgreSQL health check failed")?;
    tracing::info!("Connected to PostgreSQL");

    if config.run_migrations {
        jenga_db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");
    }

    Ok((conn, pool))
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jenga_worker=debug,jenga_cache=info,jenga_db=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), gracefully shutting down worker");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
