use crate::camera::Camera;
use crate::error::DomainError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence seam for camera records. Storage itself lives outside this
/// core; callers inject whichever implementation the deployment uses.
#[async_trait]
pub trait CameraRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Camera>, DomainError>;

    /// Persist changes to an existing camera.
    ///
    /// Optimistic: rejects the write with `VersionConflict` when the stored
    /// version no longer matches the one the caller read.
    async fn update(&self, camera: Camera) -> Result<Camera, DomainError>;

    /// Insert a new camera record
    async fn save(&self, camera: Camera) -> Result<Camera, DomainError>;

    async fn list(&self) -> Result<Vec<Camera>, DomainError>;

    /// Cameras currently holding a live connection (health-monitor sweep set)
    async fn list_connected(&self) -> Result<Vec<Camera>, DomainError>;
}

/// In-memory repository for the composition root and tests
#[derive(Default)]
pub struct InMemoryCameraRepository {
    cameras: RwLock<HashMap<Uuid, Camera>>,
}

impl InMemoryCameraRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CameraRepository for InMemoryCameraRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Camera>, DomainError> {
        let cameras = self.cameras.read().await;
        Ok(cameras.get(&id).cloned())
    }

    async fn update(&self, camera: Camera) -> Result<Camera, DomainError> {
        let mut cameras = self.cameras.write().await;
        let stored = cameras
            .get_mut(&camera.id)
            .ok_or(DomainError::NotFound(camera.id))?;

        if stored.version != camera.version {
            return Err(DomainError::VersionConflict {
                expected: camera.version,
                actual: stored.version,
            });
        }

        let mut updated = camera;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn save(&self, camera: Camera) -> Result<Camera, DomainError> {
        let mut cameras = self.cameras.write().await;
        cameras.insert(camera.id, camera.clone());
        Ok(camera)
    }

    async fn list(&self) -> Result<Vec<Camera>, DomainError> {
        let cameras = self.cameras.read().await;
        Ok(cameras.values().cloned().collect())
    }

    async fn list_connected(&self) -> Result<Vec<Camera>, DomainError> {
        let cameras = self.cameras.read().await;
        Ok(cameras
            .values()
            .filter(|c| c.is_connected())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfiguration, CameraLocation, CameraNetwork, CameraType};
    use crate::connection::ConnectionInfo;

    fn sample_camera() -> Camera {
        Camera::new(
            "Yard Camera",
            CameraLocation::new("192.168.1.30"),
            CameraNetwork::new("192.168.1.30", 554),
            CameraType::Ip,
            CameraConfiguration::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryCameraRepository::new();
        let camera = repo.save(sample_camera()).await.unwrap();

        let found = repo.find(camera.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Yard Camera");

        assert!(repo.find(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemoryCameraRepository::new();
        let mut camera = repo.save(sample_camera()).await.unwrap();

        camera
            .set_connection_info(
                ConnectionInfo::new("rtsp://192.168.1.30:554/stream", "rtsp").unwrap(),
            )
            .unwrap();
        let updated = repo.update(camera).await.unwrap();
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_stale_update_rejected() {
        let repo = InMemoryCameraRepository::new();
        let camera = repo.save(sample_camera()).await.unwrap();

        let stale = camera.clone();
        repo.update(camera).await.unwrap();

        let result = repo.update(stale).await;
        assert!(matches!(result, Err(DomainError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_list_connected_filters() {
        let repo = InMemoryCameraRepository::new();
        let mut connected = repo.save(sample_camera()).await.unwrap();
        connected
            .set_connection_info(
                ConnectionInfo::new("rtsp://192.168.1.30:554/stream", "rtsp").unwrap(),
            )
            .unwrap();
        repo.update(connected).await.unwrap();
        repo.save(sample_camera()).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.list_connected().await.unwrap().len(), 1);
    }
}
