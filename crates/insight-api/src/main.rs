use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insight_api::config::AppConfig;
use insight_api::services::{JiraConfig, JiraIssueSource, UnconfiguredIssueSource};
use insight_api::{router, AppState};
use insight_core::defaults::JOB_MAX_ATTEMPTS;
use insight_core::{IssueSource, JobQueue};
use insight_inference::OpenAIGateway;
use insight_jobs::{InsightJobHandler, InsightProducer, WorkerBuilder, WorkerConfig};
use insight_store::{
    create_pool_with_config, log_pool_metrics, MemoryJobQueue, PgJobQueue, PoolConfig, Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "insight_api=debug,insight_jobs=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("insight-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env();
    let max_attempts = std::env::var("JOB_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(JOB_MAX_ATTEMPTS);
    let worker_config = WorkerConfig::from_env();

    // Storage and queue share one backend
    let (storage, queue): (Storage, Arc<dyn JobQueue>) = match config.database_url.as_deref() {
        Some(database_url) => {
            info!("Connecting to database...");
            let pool = create_pool_with_config(database_url, PoolConfig::from_env()).await?;
            info!("Running database migrations...");
            insight_store::migrate(&pool).await?;
            log_pool_metrics(&pool);
            info!("Database ready");
            let queue: Arc<dyn JobQueue> = Arc::new(
                PgJobQueue::new(pool.clone())
                    .with_max_attempts(max_attempts)
                    .with_stale_after(Duration::from_secs(2 * worker_config.job_timeout_secs)),
            );
            (Storage::postgres(pool), queue)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage; state is lost on restart");
            let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::with_max_attempts(max_attempts));
            (Storage::memory(), queue)
        }
    };

    let issues: Arc<dyn IssueSource> = match JiraConfig::from_env() {
        Some(jira) => Arc::new(JiraIssueSource::new(jira)?) as Arc<dyn IssueSource>,
        None => {
            warn!("JIRA_BASE_URL, JIRA_EMAIL or JIRA_API_TOKEN not set; project endpoints will fail");
            Arc::new(UnconfiguredIssueSource)
        }
    };

    let gateway = Arc::new(OpenAIGateway::from_env()?);

    info!("Starting job worker...");
    let worker = WorkerBuilder::new(queue.clone())
        .with_config(worker_config)
        .with_handler(InsightJobHandler::new(storage.clone(), gateway))
        .build()
        .await
        .start();

    let producer = InsightProducer::new(queue, storage, issues);
    let app = router(AppState::new(producer)).layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(config.origin_headers()))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(3600)),
    );

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining job worker");
    worker.shutdown_and_wait().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
