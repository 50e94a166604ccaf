#![allow(dead_code)]

use async_trait::async_trait;
use camera_core::{
    Camera, CameraConfiguration, CameraLocation, CameraNetwork, CameraType, ConnectionInfo,
};
use connection_engine::{ConnectionStrategy, ProbeOutcome};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a scripted probe should do when exercised
pub enum ProbeScript {
    Succeed(Duration),
    Fail,
    Hang,
}

/// Scripted stand-in for a live protocol, used where a real test rig would
/// talk to a deployed device
pub struct ScriptedStrategy {
    name: &'static str,
    priority: i32,
    supports_all: bool,
    script: ProbeScript,
    connect_delay: Duration,
    pub connect_count: AtomicU32,
}

impl ScriptedStrategy {
    pub fn working(name: &'static str, priority: i32, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supports_all: true,
            script: ProbeScript::Succeed(latency),
            connect_delay: Duration::ZERO,
            connect_count: AtomicU32::new(0),
        })
    }

    pub fn failing(name: &'static str, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supports_all: true,
            script: ProbeScript::Fail,
            connect_delay: Duration::ZERO,
            connect_count: AtomicU32::new(0),
        })
    }

    pub fn hanging(name: &'static str, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supports_all: true,
            script: ProbeScript::Hang,
            connect_delay: Duration::ZERO,
            connect_count: AtomicU32::new(0),
        })
    }

    pub fn unsupported(name: &'static str, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supports_all: false,
            script: ProbeScript::Fail,
            connect_delay: Duration::ZERO,
            connect_count: AtomicU32::new(0),
        })
    }

    pub fn with_connect_delay(
        name: &'static str,
        priority: i32,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supports_all: true,
            script: ProbeScript::Succeed(Duration::from_millis(5)),
            connect_delay: delay,
            connect_count: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ConnectionStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_camera(&self, _camera: &Camera) -> bool {
        self.supports_all
    }

    async fn test_connection(&self, _camera: &Camera, _cancel: &CancellationToken) -> ProbeOutcome {
        match &self.script {
            ProbeScript::Succeed(latency) => ProbeOutcome::ok(*latency),
            ProbeScript::Fail => ProbeOutcome::failed(Duration::from_millis(5), "unreachable"),
            ProbeScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ProbeOutcome::failed(Duration::ZERO, "unreachable")
            }
        }
    }

    async fn connect(&self, _camera: &Camera) -> anyhow::Result<ConnectionInfo> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        Ok(ConnectionInfo::new(
            format!("mock://{}/stream", self.name),
            self.name,
        )?)
    }

    async fn capture_snapshot(&self, _camera: &Camera) -> anyhow::Result<Vec<u8>> {
        // JPEG magic, enough for callers that sniff the content
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

pub fn ip_camera(name: &str) -> Camera {
    Camera::new(
        name,
        CameraLocation::new("192.168.1.20:554"),
        CameraNetwork::new("192.168.1.20", 554),
        CameraType::Ip,
        CameraConfiguration::default(),
    )
    .unwrap()
}

pub fn usb_camera(name: &str) -> Camera {
    Camera::new(
        name,
        CameraLocation::default(),
        CameraNetwork::default(),
        CameraType::Usb,
        CameraConfiguration::default(),
    )
    .unwrap()
}
