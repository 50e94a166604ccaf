use crate::config::EngineConfig;
use crate::strategies::{http_client, run_probe};
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use anyhow::Context;
use async_trait::async_trait;
use camera_core::{strategy_names, Camera, CameraType, ConnectionInfo};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Plain HTTP/MJPEG cameras and webcams with an HTTP API
pub struct HttpStrategy {
    priority: i32,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl HttpStrategy {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            priority: config.priorities.http,
            probe_timeout: config.probe_timeout,
            client: http_client(config.probe_timeout)?,
        })
    }

    fn base_url(camera: &Camera) -> String {
        format!("http://{}:{}", camera.network.ip, camera.network.port)
    }

    async fn probe_root(&self, camera: &Camera) -> Result<(), String> {
        let url = Self::base_url(camera);
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
            .map_err(|e| format!("http request failed: {}", e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(format!("http error: {}", status))
        }
    }
}

#[async_trait]
impl ConnectionStrategy for HttpStrategy {
    fn name(&self) -> &str {
        strategy_names::HTTP
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_camera(&self, camera: &Camera) -> bool {
        matches!(camera.camera_type, CameraType::Http | CameraType::Ip)
            && camera.network.is_configured()
    }

    async fn test_connection(&self, camera: &Camera, cancel: &CancellationToken) -> ProbeOutcome {
        run_probe(self.probe_timeout, cancel, self.probe_root(camera)).await
    }

    async fn connect(&self, camera: &Camera) -> anyhow::Result<ConnectionInfo> {
        let base = Self::base_url(camera);
        let info = ConnectionInfo::new(format!("{}/video", base), strategy_names::HTTP)?
            .with_snapshot_url(format!("{}/snapshot.jpg", base));
        Ok(info)
    }

    async fn capture_snapshot(&self, camera: &Camera) -> anyhow::Result<Vec<u8>> {
        let url = format!("{}/snapshot.jpg", Self::base_url(camera));
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
