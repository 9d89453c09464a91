use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nextsus::config::Config;
use nextsus::engine::Engine;
use nextsus::notify::NotifyHub;
use nextsus::{http, reaper};

fn init_logger() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(env_filter)
        .try_init()?;
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, draining requests");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger()?;
    let config = Config::load();
    nextsus::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(config.wal_path(), notify, config.policy)?);

    tokio::spawn(reaper::run_overdue_sweep(engine.clone(), config.sweep_interval));
    tokio::spawn(reaper::run_compactor(engine.clone(), config.compact_threshold));

    let app = http::router(engine.clone(), config.request_timeout);
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("nextsus listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!(
        "  opening hours: {}-{}",
        nextsus::model::format_clock(config.policy.opening_hours.start),
        nextsus::model::format_clock(config.policy.opening_hours.end)
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leave a compact log behind for the next start.
    match engine.compact_wal().await {
        Ok(_) => {}
        Err(e) => tracing::warn!("final compaction failed: {e}"),
    }
    info!("nextsus stopped");
    Ok(())
}
