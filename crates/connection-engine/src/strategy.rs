use async_trait::async_trait;
use camera_core::{Camera, ConnectionInfo};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a single bounded-time connectivity probe.
///
/// Ordinary network failures are reported here, never raised: a probe that
/// cannot reach the device is a failed outcome with a message.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub success: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn ok(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
            error: None,
        }
    }

    pub fn failed(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            success: false,
            latency,
            error: Some(error.into()),
        }
    }
}

/// A protocol-specific way of reaching a camera.
///
/// One implementation per wire protocol; the registry owns the set and
/// treats them uniformly.
#[async_trait]
pub trait ConnectionStrategy: Send + Sync {
    /// Unique strategy name; the registry keys on it case-insensitively
    fn name(&self) -> &str;

    /// Static precedence, higher wins ties before latency
    fn priority(&self) -> i32;

    /// Structural compatibility check. Pure, no I/O.
    fn supports_camera(&self, camera: &Camera) -> bool;

    /// Bounded-time live probe. Cancellation is a normal failed outcome.
    async fn test_connection(&self, camera: &Camera, cancel: &CancellationToken) -> ProbeOutcome;

    /// Establish the connection, computing the protocol's URL scheme
    async fn connect(&self, camera: &Camera) -> anyhow::Result<ConnectionInfo>;

    /// Retrieve a single still image using the protocol's mechanism
    async fn capture_snapshot(&self, camera: &Camera) -> anyhow::Result<Vec<u8>>;
}
