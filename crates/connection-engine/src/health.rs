use crate::config::EngineConfig;
use crate::registry::StrategyRegistry;
use crate::service::CameraConnectionService;
use camera_core::{Camera, CameraRepository};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Periodically sweeps connected cameras and decides whether each
/// connection is still alive. A stale heartbeat triggers a re-probe of the
/// strategy that owns the connection; repeated probe failures disconnect
/// the camera and mark it unreachable.
pub struct ConnectionHealthMonitor {
    repository: Arc<dyn CameraRepository>,
    registry: Arc<StrategyRegistry>,
    service: Arc<CameraConnectionService>,
    check_interval: Duration,
    heartbeat_max_age: chrono::Duration,
    max_consecutive_failures: u32,
    check_concurrency: usize,
    failures: Arc<Mutex<HashMap<Uuid, u32>>>,
}

impl ConnectionHealthMonitor {
    pub fn new(
        repository: Arc<dyn CameraRepository>,
        registry: Arc<StrategyRegistry>,
        service: Arc<CameraConnectionService>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            repository,
            registry,
            service,
            check_interval: config.health_check_interval,
            heartbeat_max_age: chrono::Duration::from_std(config.heartbeat_max_age)
                .unwrap_or_else(|_| chrono::Duration::seconds(30)),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            check_concurrency: config.probe_concurrency.max(1),
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run the monitoring loop until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        info!("connection health monitor started");

        loop {
            if let Err(e) = self.run_health_checks(&cancel).await {
                error!("health check cycle failed: {:#}", e);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("connection health monitor stopped");
                    return;
                }
                _ = sleep(self.check_interval) => {}
            }
        }
    }

    /// One sweep over every connected camera, with bounded concurrency
    pub async fn run_health_checks(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        let cameras = self.repository.list_connected().await?;
        if cameras.is_empty() {
            return Ok(());
        }

        info!("checking connection health for {} cameras", cameras.len());

        let mut tasks = Vec::new();
        for camera in cameras {
            let registry = Arc::clone(&self.registry);
            let service = Arc::clone(&self.service);
            let failures = Arc::clone(&self.failures);
            let cancel = cancel.clone();
            let max_age = self.heartbeat_max_age;
            let max_failures = self.max_consecutive_failures;

            let task = tokio::spawn(async move {
                if let Err(e) = Self::check_camera(
                    camera,
                    registry,
                    service,
                    failures,
                    cancel,
                    max_age,
                    max_failures,
                )
                .await
                {
                    error!("failed to check camera connection: {:#}", e);
                }
            });
            tasks.push(task);

            if tasks.len() >= self.check_concurrency {
                for task in tasks.drain(..) {
                    let _ = task.await;
                }
            }
        }

        for task in tasks {
            let _ = task.await;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_camera(
        camera: Camera,
        registry: Arc<StrategyRegistry>,
        service: Arc<CameraConnectionService>,
        failures: Arc<Mutex<HashMap<Uuid, u32>>>,
        cancel: CancellationToken,
        max_age: chrono::Duration,
        max_failures: u32,
    ) -> anyhow::Result<()> {
        if camera.is_connection_healthy(max_age) {
            metrics::ENGINE_HEALTH_CHECKS
                .with_label_values(&["healthy"])
                .inc();
            failures.lock().await.remove(&camera.id);
            return Ok(());
        }

        // Raced with a disconnect between the sweep and this check
        let Some(conn) = camera.connection.as_ref().filter(|c| c.is_connected) else {
            return Ok(());
        };

        // Heartbeat is stale; ask the owning strategy whether the device
        // still answers before deciding anything
        let strategy = match registry.strategy_by_name(&conn.connection_type).await {
            Ok(strategy) => strategy,
            Err(_) => {
                warn!(
                    camera = %camera.name,
                    strategy = %conn.connection_type,
                    "connection owned by an unregistered strategy; disconnecting"
                );
                service.mark_unreachable(camera.id).await?;
                failures.lock().await.remove(&camera.id);
                return Ok(());
            }
        };

        let outcome = strategy.test_connection(&camera, &cancel).await;
        if outcome.success {
            metrics::ENGINE_HEALTH_CHECKS
                .with_label_values(&["recovered"])
                .inc();
            failures.lock().await.remove(&camera.id);
            service.heartbeat(camera.id).await?;
            info!(
                camera = %camera.name,
                strategy = %strategy.name(),
                "stale connection answered probe; heartbeat refreshed"
            );
            return Ok(());
        }

        let failure_count = {
            let mut failures = failures.lock().await;
            let count = failures.entry(camera.id).or_insert(0);
            *count += 1;
            *count
        };
        metrics::ENGINE_HEALTH_CHECKS
            .with_label_values(&["failed"])
            .inc();

        if failure_count >= max_failures {
            error!(
                camera = %camera.name,
                consecutive_failures = failure_count,
                error = ?outcome.error,
                "connection lost; marking camera unreachable"
            );
            service.mark_unreachable(camera.id).await?;
            failures.lock().await.remove(&camera.id);
        } else {
            warn!(
                camera = %camera.name,
                consecutive_failures = failure_count,
                error = ?outcome.error,
                "connection stale"
            );
        }

        Ok(())
    }
}
