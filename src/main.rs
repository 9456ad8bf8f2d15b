use std::time::Duration;

use jobmarket_backend::config::{get_config, init_config};
use jobmarket_backend::database::pool::create_pool;
use jobmarket_backend::middleware::rate_limit::RateLimiter;
use jobmarket_backend::{app, AppState};

const WORKER_IDLE_SLEEP: Duration = Duration::from_millis(750);
const STALE_JOB_AGE: Duration = Duration::from_secs(300);
const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobmarket_backend=info,tower_http=info".into()),
        )
        .init();

    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState::new(pool);

    // AI scoring worker. Polls when idle; drains back-to-back otherwise.
    let worker_state = state.clone();
    tokio::spawn(async move {
        loop {
            match worker_state.queue_service.run_once(&worker_state).await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(WORKER_IDLE_SLEEP).await,
                Err(e) => {
                    tracing::error!(error = %e, "ai worker iteration failed");
                    tokio::time::sleep(WORKER_IDLE_SLEEP).await;
                }
            }
        }
    });

    // Returns jobs orphaned by a crashed worker to the queue.
    let sweeper_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(STALE_SWEEP_INTERVAL).await;
            match sweeper_state.queue_service.requeue_stale(STALE_JOB_AGE).await {
                Ok(0) => {}
                Ok(n) => tracing::warn!(count = n, "requeued stale ai jobs"),
                Err(e) => tracing::error!(error = %e, "stale job sweep failed"),
            }
        }
    });

    let router = app(state, RateLimiter::new(config.api_rps));

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    tracing::info!(address = %config.server_address, "server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
