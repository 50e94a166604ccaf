use crate::config::EngineConfig;
use crate::strategies::{http_client, run_probe, userinfo};
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use anyhow::Context;
use async_trait::async_trait;
use camera_core::{strategy_names, Camera, CameraType, ConnectionInfo};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Unauthenticated device-service call most ONVIF cameras answer; used only
/// to establish that an ONVIF endpoint is listening.
const GET_SYSTEM_DATE_AND_TIME: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    <tds:GetSystemDateAndTime xmlns:tds="http://www.onvif.org/ver10/device/wsdl"/>
  </s:Body>
</s:Envelope>"#;

/// ONVIF-conformant cameras, reached through the device service endpoint
pub struct OnvifStrategy {
    priority: i32,
    probe_timeout: Duration,
    client: reqwest::Client,
}

impl OnvifStrategy {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            priority: config.priorities.onvif,
            probe_timeout: config.probe_timeout,
            client: http_client(config.probe_timeout)?,
        })
    }

    fn device_service_url(camera: &Camera) -> String {
        format!(
            "http://{}:{}/onvif/device_service",
            camera.network.ip, camera.network.port
        )
    }

    async fn probe_device_service(&self, camera: &Camera) -> Result<(), String> {
        let url = Self::device_service_url(camera);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .body(GET_SYSTEM_DATE_AND_TIME);
        if let (Some(user), Some(pass)) = (
            camera.network.username.as_deref(),
            camera.network.password.as_deref(),
        ) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("onvif request failed: {}", e))?;

        let status = response.status();
        // 401 still proves an ONVIF service answered; only the creds are off
        if status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        if !status.is_success() {
            return Err(format!("onvif device service error: {}", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("onvif body read failed: {}", e))?;
        if is_soap_envelope(&body) {
            Ok(())
        } else {
            Err("onvif reply was not a SOAP envelope".to_string())
        }
    }
}

fn is_soap_envelope(body: &str) -> bool {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => return e.local_name().as_ref() == b"Envelope",
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

#[async_trait]
impl ConnectionStrategy for OnvifStrategy {
    fn name(&self) -> &str {
        strategy_names::ONVIF
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_camera(&self, camera: &Camera) -> bool {
        camera.camera_type == CameraType::Onvif
            || (camera.camera_type == CameraType::Ip && matches!(camera.network.port, 80 | 8080))
    }

    async fn test_connection(&self, camera: &Camera, cancel: &CancellationToken) -> ProbeOutcome {
        run_probe(self.probe_timeout, cancel, self.probe_device_service(camera)).await
    }

    async fn connect(&self, camera: &Camera) -> anyhow::Result<ConnectionInfo> {
        let creds = userinfo(&camera.network);
        let info = ConnectionInfo::new(
            format!("rtsp://{}{}:554/onvif1", creds, camera.network.ip),
            strategy_names::ONVIF,
        )?
        .with_backup_stream_url(format!("rtsp://{}{}:554/onvif2", creds, camera.network.ip))
        .with_snapshot_url(format!(
            "http://{}:{}/onvif/snapshot",
            camera.network.ip, camera.network.port
        ));
        Ok(info)
    }

    async fn capture_snapshot(&self, camera: &Camera) -> anyhow::Result<Vec<u8>> {
        let url = format!(
            "http://{}:{}/onvif/snapshot",
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
