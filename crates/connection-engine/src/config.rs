use std::env;
use std::time::Duration;

/// Static precedence values per strategy. Vendor SDKs outrank generic
/// protocols by convention; all values are configuration, not policy baked
/// into the strategies themselves.
#[derive(Debug, Clone)]
pub struct StrategyPriorities {
    pub hikvision: i32,
    pub dahua: i32,
    pub onvif: i32,
    pub rtsp: i32,
    pub http: i32,
    pub usb: i32,
}

impl Default for StrategyPriorities {
    fn default() -> Self {
        Self {
            hikvision: 100,
            dahua: 95,
            onvif: 80,
            rtsp: 60,
            http: 40,
            usb: 20,
        }
    }
}

impl StrategyPriorities {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hikvision: env_i32("STRATEGY_PRIORITY_HIKVISION", defaults.hikvision),
            dahua: env_i32("STRATEGY_PRIORITY_DAHUA", defaults.dahua),
            onvif: env_i32("STRATEGY_PRIORITY_ONVIF", defaults.onvif),
            rtsp: env_i32("STRATEGY_PRIORITY_RTSP", defaults.rtsp),
            http: env_i32("STRATEGY_PRIORITY_HTTP", defaults.http),
            usb: env_i32("STRATEGY_PRIORITY_USB", defaults.usb),
        }
    }
}

/// Engine tuning knobs, loaded from the environment at process start
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-probe timeout applied inside each strategy
    pub probe_timeout: Duration,
    /// Timeout for snapshot captures (HTTP fetch or ffmpeg grab)
    pub snapshot_timeout: Duration,
    /// Bounded fan-out for concurrent probes
    pub probe_concurrency: usize,
    /// Aggregate deadline for best-strategy verification
    pub selection_deadline: Duration,
    /// Heartbeat age beyond which a connection counts as stale
    pub heartbeat_max_age: Duration,
    /// Interval between health-monitor sweeps
    pub health_check_interval: Duration,
    /// Stale probes tolerated before a camera is marked unreachable
    pub max_consecutive_failures: u32,
    pub priorities: StrategyPriorities,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            snapshot_timeout: Duration::from_secs(10),
            probe_concurrency: 4,
            selection_deadline: Duration::from_secs(15),
            heartbeat_max_age: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(30),
            max_consecutive_failures: 3,
            priorities: StrategyPriorities::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            probe_timeout: Duration::from_secs(env_u64("PROBE_TIMEOUT_SECS", 5)),
            snapshot_timeout: Duration::from_secs(env_u64("SNAPSHOT_TIMEOUT_SECS", 10)),
            probe_concurrency: env_u64("PROBE_CONCURRENCY", 4).max(1) as usize,
            selection_deadline: Duration::from_secs(env_u64("SELECTION_DEADLINE_SECS", 15)),
            heartbeat_max_age: Duration::from_secs(env_u64("HEARTBEAT_MAX_AGE_SECS", 30)),
            health_check_interval: Duration::from_secs(env_u64("HEALTH_CHECK_INTERVAL_SECS", 30)),
            max_consecutive_failures: env_u64("MAX_CONSECUTIVE_FAILURES", 3) as u32,
            priorities: StrategyPriorities::from_env(),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
