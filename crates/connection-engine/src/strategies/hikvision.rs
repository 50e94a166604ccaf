use crate::config::EngineConfig;
use crate::strategies::{http_client, run_probe, userinfo};
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use anyhow::Context;
use async_trait::async_trait;
use camera_core::{strategy_names, Camera, CameraType, ConnectionInfo};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Hikvision devices via their ISAPI HTTP surface
pub struct HikvisionStrategy {
    priority: i32,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl HikvisionStrategy {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            priority: config.priorities.hikvision,
            probe_timeout: config.probe_timeout,
            client: http_client(config.probe_timeout)?,
        })
    }

    fn device_info_url(camera: &Camera) -> String {
        format!(
            "http://{}:{}/ISAPI/System/deviceInfo",
            camera.network.ip, camera.network.port
        )
    }

    async fn probe_isapi(&self, camera: &Camera) -> Result<(), String> {
        let url = Self::device_info_url(camera);
        let mut request = self.client.get(&url);
        if let (Some(user), Some(pass)) = (
            camera.network.username.as_deref(),
            camera.network.password.as_deref(),
        ) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("isapi request failed: {}", e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(format!("isapi error: {}", status))
        }
    }
}

#[async_trait]
impl ConnectionStrategy for HikvisionStrategy {
    fn name(&self) -> &str {
        strategy_names::HIKVISION
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_camera(&self, camera: &Camera) -> bool {
        camera
            .configuration
            .brand_lowercase()
            .is_some_and(|brand| brand.contains("hikvision"))
            && camera.camera_type != CameraType::Usb
            && camera.network.is_configured()
    }

    async fn test_connection(&self, camera: &Camera, cancel: &CancellationToken) -> ProbeOutcome {
        run_probe(self.probe_timeout, cancel, self.probe_isapi(camera)).await
    }

    async fn connect(&self, camera: &Camera) -> anyhow::Result<ConnectionInfo> {
        let creds = userinfo(&camera.network);
        let info = ConnectionInfo::new(
            format!(
                "rtsp://{}{}:554/Streaming/Channels/101",
                creds, camera.network.ip
            ),
            strategy_names::HIKVISION,
        )?
        .with_backup_stream_url(format!(
            "rtsp://{}{}:554/Streaming/Channels/102",
            creds, camera.network.ip
        ))
        .with_snapshot_url(format!(
            "http://{}:{}/ISAPI/Streaming/channels/101/picture",
            camera.network.ip, camera.network.port
        ));
        Ok(info)
    }

    async fn capture_snapshot(&self, camera: &Camera) -> anyhow::Result<Vec<u8>> {
        let url = format!(
            "http://{}:{}/ISAPI/Streaming/channels/101/picture",
            camera.network.ip, camera.network.port
        );
        let mut request = self.client.get(&url);
        if let (Some(user), Some(pass)) = (
            camera.network.username.as_deref(),
            camera.network.password.as_deref(),
        ) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.context("snapshot request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("snapshot fetch failed: {}", response.status());
        }
        let bytes = response.bytes().await.context("snapshot body read failed")?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_core::{CameraConfiguration, CameraLocation, CameraNetwork};

    fn strategy() -> HikvisionStrategy {
        HikvisionStrategy::new(&EngineConfig::default()).unwrap()
    }

    fn branded_camera(brand: Option<&str>, camera_type: CameraType) -> Camera {
        let mut configuration = CameraConfiguration::default();
        configuration.brand = brand.map(|b| b.to_string());
        let network = if camera_type == CameraType::Usb {
            CameraNetwork::default()
        } else {
            CameraNetwork::new("10.0.0.8", 8000)
        };
        Camera::new(
            "Parking Camera",
            CameraLocation::default(),
            network,
            camera_type,
            configuration,
        )
        .unwrap()
    }

    #[test]
    fn test_requires_matching_brand() {
        let strategy = strategy();
        assert!(strategy.supports_camera(&branded_camera(Some("Hikvision DS-2CD2"), CameraType::Ip)));
        assert!(strategy.supports_camera(&branded_camera(Some("HIKVISION"), CameraType::Ip)));
        assert!(!strategy.supports_camera(&branded_camera(Some("Dahua"), CameraType::Ip)));
        assert!(!strategy.supports_camera(&branded_camera(None, CameraType::Ip)));
    }

    #[test]
    fn test_usb_cameras_excluded_even_with_brand() {
        assert!(!strategy().supports_camera(&branded_camera(Some("Hikvision"), CameraType::Usb)));
    }

    #[tokio::test]
    async fn test_connect_builds_isapi_urls() {
        let camera = branded_camera(Some("Hikvision"), CameraType::Ip);
        let info = strategy().connect(&camera).await.unwrap();

        assert_eq!(info.stream_url, "rtsp://10.0.0.8:554/Streaming/Channels/101");
        assert_eq!(
            info.backup_stream_url.as_deref(),
            Some("rtsp://10.0.0.8:554/Streaming/Channels/102")
        );
        assert_eq!(
            info.snapshot_url.as_deref(),
            Some("http://10.0.0.8:8000/ISAPI/Streaming/channels/101/picture")
        );
        assert_eq!(info.connection_type, "hikvision-sdk");
    }
}
