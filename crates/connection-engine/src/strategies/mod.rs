pub mod dahua;
pub mod hikvision;
pub mod http;
pub mod onvif;
pub mod rtsp;
pub mod usb;

pub use dahua::DahuaStrategy;
pub use hikvision::HikvisionStrategy;
pub use http::HttpStrategy;
pub use onvif::OnvifStrategy;
pub use rtsp::RtspStrategy;
pub use usb::UsbStrategy;

use crate::config::EngineConfig;
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use camera_core::CameraNetwork;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// All built-in strategy variants, constructed from configuration
pub fn default_strategies(config: &EngineConfig) -> anyhow::Result<Vec<Arc<dyn ConnectionStrategy>>> {
    Ok(vec![
        Arc::new(HikvisionStrategy::new(config)?),
        Arc::new(DahuaStrategy::new(config)?),
        Arc::new(OnvifStrategy::new(config)?),
        Arc::new(RtspStrategy::new(config)),
        Arc::new(HttpStrategy::new(config)?),
        Arc::new(UsbStrategy::new(config)),
    ])
}

/// Run a probe body under the strategy's timeout, treating cancellation and
/// deadline expiry as ordinary failed outcomes.
pub(crate) async fn run_probe<F>(
    probe_timeout: Duration,
    cancel: &CancellationToken,
    probe: F,
) -> ProbeOutcome
where
    F: Future<Output = Result<(), String>>,
{
    let started = Instant::now();
    tokio::select! {
        _ = cancel.cancelled() => ProbeOutcome::failed(started.elapsed(), "probe cancelled"),
        result = timeout(probe_timeout, probe) => match result {
            Ok(Ok(())) => ProbeOutcome::ok(started.elapsed()),
            Ok(Err(message)) => ProbeOutcome::failed(started.elapsed(), message),
            Err(_) => ProbeOutcome::failed(started.elapsed(), "probe timed out"),
        },
    }
}

/// `user:pass@` userinfo fragment for stream URLs, empty without credentials
pub(crate) fn userinfo(network: &CameraNetwork) -> String {
    match (network.username.as_deref(), network.password.as_deref()) {
        (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
        _ => String::new(),
    }
}

/// Shared HTTP client with the probe timeout applied
pub(crate) fn http_client(probe_timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(probe_timeout).build()?)
}

/// Grab a single frame through ffmpeg, bounded by `grab_timeout`.
///
/// Input arguments are passed as an argv array, never through a shell.
pub(crate) async fn ffmpeg_single_frame(
    input_args: &[&str],
    grab_timeout: Duration,
) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context;
    use std::process::Stdio;
    use tokio::process::Command;

    let mut args: Vec<&str> = vec!["-v", "error"];
    args.extend_from_slice(input_args);
    args.extend_from_slice(&["-frames:v", "1", "-f", "image2", "pipe:1"]);

    let output = timeout(
        grab_timeout,
        Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .context("snapshot grab timed out")?
    .context("failed to execute ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg failed: {}", stderr.trim());
    }
    if output.stdout.is_empty() {
        anyhow::bail!("ffmpeg produced no image data");
    }

    Ok(output.stdout)
}
