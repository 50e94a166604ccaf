use crate::config::EngineConfig;
use crate::strategies::{ffmpeg_single_frame, run_probe};
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use async_trait::async_trait;
use camera_core::{strategy_names, Camera, CameraType, ConnectionInfo};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_DEVICE_PATH: &str = "/dev/video0";

/// Locally attached V4L2 devices
pub struct UsbStrategy {
    priority: i32,
    probe_timeout: Duration,
    snapshot_timeout: Duration,
}

impl UsbStrategy {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            priority: config.priorities.usb,
            probe_timeout: config.probe_timeout,
            snapshot_timeout: config.snapshot_timeout,
        }
    }

    fn device_path(camera: &Camera) -> String {
        camera
            .configuration
            .additional_str("device_path")
            .unwrap_or(DEFAULT_DEVICE_PATH)
            .to_string()
    }

    async fn probe_device_node(camera: &Camera) -> Result<(), String> {
        let path = Self::device_path(camera);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| format!("device node {} not accessible: {}", path, e))?;
        if metadata.is_dir() {
            return Err(format!("device node {} is a directory", path));
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionStrategy for UsbStrategy {
    fn name(&self) -> &str {
        strategy_names::USB
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_camera(&self, camera: &Camera) -> bool {
        camera.camera_type == CameraType::Usb
    }

    async fn test_connection(&self, camera: &Camera, cancel: &CancellationToken) -> ProbeOutcome {
        run_probe(self.probe_timeout, cancel, Self::probe_device_node(camera)).await
    }

    async fn connect(&self, camera: &Camera) -> anyhow::Result<ConnectionInfo> {
        let path = Self::device_path(camera);
        if let Err(message) = Self::probe_device_node(camera).await {
            anyhow::bail!(message);
        }
        Ok(ConnectionInfo::new(path, strategy_names::USB)?)
    }

    async fn capture_snapshot(&self, camera: &Camera) -> anyhow::Result<Vec<u8>> {
        let path = Self::device_path(camera);
        ffmpeg_single_frame(&["-f", "v4l2", "-i", &path], self.snapshot_timeout).await
    }
}
