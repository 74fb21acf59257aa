use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chunker::app;
use chunker::config::settings::AppConfig;
use chunker::hls::creator::HlsCreator;
use chunker::hls::registry::CancellationRegistry;
use chunker::infrastructure::process::EncoderProcessRunner;
use chunker::infrastructure::queue::job_queue::JobQueue;
use chunker::infrastructure::queue::rabbitmq::RabbitMqService;
use chunker::infrastructure::storage::s3::StorageService;
use chunker::notifications::RabbitMqNotifier;
use chunker::state::AppState;
use chunker::workers::file_processor::FileProcessor;
use chunker::workers::transcoder::TranscoderWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting chunker...");

    let config = AppConfig::new()?;

    tokio::fs::create_dir_all(&config.scratch_root)
        .await
        .with_context(|| format!("Failed to create scratch root {}", config.scratch_root.display()))?;

    let storage = StorageService::new(
        &config.minio_url,
        &config.aws_region,
        &config.minio_access_key,
        &config.minio_secret_key,
    );
    let rabbitmq = RabbitMqService::new(&config.rabbitmq_url).await?;

    let queue = JobQueue::new(config.queue_warn_depth);
    let registry = CancellationRegistry::new();
    let stop = CancellationToken::new();

    let processor = FileProcessor::new(
        Arc::new(storage),
        Arc::new(RabbitMqNotifier::new(rabbitmq, config.notification_queue.clone())),
        HlsCreator::new(Arc::new(EncoderProcessRunner::new(config.kill_grace))),
        registry.clone(),
        config.scratch_root.clone(),
        config.hls.clone(),
    );

    let worker = TranscoderWorker::new(queue.clone(), Arc::new(processor), stop.clone());
    let state = AppState::new(queue, registry, worker.state());
    let worker = tokio::spawn(worker.run());

    let app = app::create_app(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running on http://{}", addr);

    let shutdown = stop.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    stop.cancel();
    if let Err(e) = worker.await {
        error!("Transcoder Worker task failed: {}", e);
    }

    info!("Chunker stopped");
    Ok(())
}
