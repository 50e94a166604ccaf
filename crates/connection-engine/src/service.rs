use crate::analyzer::{HeuristicAnalyzer, StrategyAnalysis};
use crate::error::EngineError;
use crate::registry::StrategyRegistry;
use crate::strategy::ConnectionStrategy;
use camera_core::{Camera, CameraRepository, CameraStatus, ConnectionInfo};
use std::collections::HashMap;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Application surface of the connection engine: resolve, connect, probe,
/// snapshot, disconnect. Callers (API layers, schedulers) depend on this
/// service, never on individual strategies.
///
/// Connect flows are serialized per camera identity so concurrent callers
/// cannot race select + connect + persist against each other.
pub struct CameraConnectionService {
    repository: Arc<dyn CameraRepository>,
    registry: Arc<StrategyRegistry>,
    analyzer: HeuristicAnalyzer,
    connect_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CameraConnectionService {
    pub fn new(repository: Arc<dyn CameraRepository>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            repository,
            registry,
            analyzer: HeuristicAnalyzer::new(),
            connect_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Verify-and-connect with the best available strategy
    pub async fn connect_with_best_strategy(
        &self,
        camera_id: Uuid,
    ) -> Result<ConnectionInfo, EngineError> {
        let lock = self.camera_lock(camera_id).await;
        let _guard = lock.lock().await;

        let camera = self.load(camera_id).await?;
        let cancel = CancellationToken::new();
        let selected = self.registry.best_strategy(&camera, &cancel).await?;
        if !selected.verified {
            warn!(
                camera = %camera.name,
                strategy = %selected.strategy.name(),
                "connecting with unverified fallback strategy"
            );
        }

        self.connect_and_persist(camera, selected.strategy).await
    }

    /// Connect with an explicitly named strategy. Naming a strategy that
    /// does not support the camera is a reported failure.
    pub async fn connect_with_strategy(
        &self,
        camera_id: Uuid,
        strategy_name: &str,
    ) -> Result<ConnectionInfo, EngineError> {
        let lock = self.camera_lock(camera_id).await;
        let _guard = lock.lock().await;

        let camera = self.load(camera_id).await?;
        let strategy = self.registry.strategy_by_name(strategy_name).await?;
        if !strategy.supports_camera(&camera) {
            return Err(EngineError::StrategyUnsupported {
                strategy: strategy.name().to_string(),
                camera: camera.name.clone(),
            });
        }

        self.connect_and_persist(camera, strategy).await
    }

    /// Names of strategies structurally compatible with the camera
    pub async fn supported_strategies(&self, camera_id: Uuid) -> Result<Vec<String>, EngineError> {
        let camera = self.load(camera_id).await?;
        Ok(self
            .registry
            .supported_strategies(&camera)
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect())
    }

    /// Probe every supported strategy, reporting success per name
    pub async fn test_all_strategies(
        &self,
        camera_id: Uuid,
    ) -> Result<HashMap<String, bool>, EngineError> {
        let camera = self.load(camera_id).await?;
        let cancel = CancellationToken::new();
        Ok(self
            .registry
            .probe_all(&camera, &cancel)
            .await
            .into_iter()
            .map(|report| (report.strategy, report.success))
            .collect())
    }

    /// Grab a still image, preferring the strategy that owns the live
    /// connection when there is one
    pub async fn capture_snapshot_with_best_strategy(
        &self,
        camera_id: Uuid,
    ) -> Result<Vec<u8>, EngineError> {
        let camera = self.load(camera_id).await?;

        let strategy: Arc<dyn ConnectionStrategy> = match camera
            .connection
            .as_ref()
            .filter(|conn| conn.is_connected)
        {
            Some(conn) => self.registry.strategy_by_name(&conn.connection_type).await?,
            None => {
                let cancel = CancellationToken::new();
                self.registry.best_strategy(&camera, &cancel).await?.strategy
            }
        };

        strategy
            .capture_snapshot(&camera)
            .await
            .map_err(|e| EngineError::SnapshotFailed(format!("{:#}", e)))
    }

    /// Advisory, probe-free analysis of likely-compatible strategies
    pub async fn analyze(&self, camera_id: Uuid) -> Result<StrategyAnalysis, EngineError> {
        let camera = self.load(camera_id).await?;
        Ok(self.analyzer.analyze(&camera))
    }

    /// Refresh the connection heartbeat and persist the new timestamp
    pub async fn heartbeat(&self, camera_id: Uuid) -> Result<(), EngineError> {
        let lock = self.camera_lock(camera_id).await;
        let _guard = lock.lock().await;

        let mut camera = self.load(camera_id).await?;
        camera.update_connection_heartbeat()?;
        self.repository.update(camera).await?;
        Ok(())
    }

    /// Drop the camera's connection and set it Inactive
    pub async fn disconnect(&self, camera_id: Uuid) -> Result<(), EngineError> {
        let lock = self.camera_lock(camera_id).await;
        let _guard = lock.lock().await;

        let mut camera = self.load(camera_id).await?;
        camera.disconnect();
        self.repository.update(camera).await?;
        self.refresh_connected_gauge().await;
        Ok(())
    }

    /// Drop the connection and mark the camera Error; used when repeated
    /// health checks fail
    pub async fn mark_unreachable(&self, camera_id: Uuid) -> Result<(), EngineError> {
        let lock = self.camera_lock(camera_id).await;
        let _guard = lock.lock().await;

        let mut camera = self.load(camera_id).await?;
        camera.disconnect();
        camera.set_status(CameraStatus::Error)?;
        self.repository.update(camera).await?;
        self.refresh_connected_gauge().await;
        Ok(())
    }

    async fn connect_and_persist(
        &self,
        mut camera: Camera,
        strategy: Arc<dyn ConnectionStrategy>,
    ) -> Result<ConnectionInfo, EngineError> {
        let info = strategy
            .connect(&camera)
            .await
            .map_err(|e| EngineError::ConnectFailed(format!("{:#}", e)))?;

        camera.set_connection_info(info.clone())?;
        self.repository.update(camera.clone()).await?;
        self.refresh_connected_gauge().await;

        info!(
            camera = %camera.name,
            strategy = %strategy.name(),
            stream_url = %info.stream_url,
            "camera connected"
        );
        Ok(info)
    }

    async fn load(&self, camera_id: Uuid) -> Result<Camera, EngineError> {
        self.repository
            .find(camera_id)
            .await?
            .ok_or(EngineError::CameraNotFound(camera_id))
    }

    async fn camera_lock(&self, camera_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.connect_locks.lock().await;
        Arc::clone(
            locks
                .entry(camera_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn refresh_connected_gauge(&self) {
        if let Ok(connected) = self.repository.list_connected().await {
            metrics::ENGINE_CONNECTED_CAMERAS.set(connected.len() as i64);
        }
    }
}
