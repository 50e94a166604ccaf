use anyhow::Result;
use camera_core::{CameraRepository, InMemoryCameraRepository};
use connection_engine::{
    CameraConnectionService, ConnectionHealthMonitor, EngineConfig, StrategyRegistry,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_with_service("connection-engine");

    let config = EngineConfig::from_env();
    info!(?config, "connection engine starting");

    let repository: Arc<dyn CameraRepository> = Arc::new(InMemoryCameraRepository::new());
    let registry = Arc::new(StrategyRegistry::with_default_strategies(&config)?);
    let service = Arc::new(CameraConnectionService::new(
        Arc::clone(&repository),
        Arc::clone(&registry),
    ));

    let monitor = ConnectionHealthMonitor::new(
        Arc::clone(&repository),
        Arc::clone(&registry),
        Arc::clone(&service),
        &config,
    );

    let cancel = CancellationToken::new();
    let monitor_cancel = cancel.clone();
    let monitor_task = tokio::spawn(async move {
        monitor.run(monitor_cancel).await;
    });

    info!("connection engine running");
    shutdown_signal().await;

    cancel.cancel();
    let _ = monitor_task.await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
