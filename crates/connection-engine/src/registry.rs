use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::strategies::default_strategies;
use crate::strategy::{ConnectionStrategy, ProbeOutcome};
use camera_core::Camera;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of probing one strategy against one camera
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub strategy: String,
    pub success: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

/// The registry's answer to "how should this camera be reached"
#[derive(Clone)]
pub struct SelectedStrategy {
    pub strategy: Arc<dyn ConnectionStrategy>,
    /// False when no live probe succeeded and this is the static fallback
    pub verified: bool,
    pub latency: Option<Duration>,
}

/// Owns the set of registered connection strategies and resolves the best
/// usable one per camera. Mutation is rare (process start); reads take a
/// snapshot and then operate lock-free.
pub struct StrategyRegistry {
    strategies: tokio::sync::RwLock<HashMap<String, Arc<dyn ConnectionStrategy>>>,
    probe_concurrency: usize,
    selection_deadline: Duration,
}

impl StrategyRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            strategies: tokio::sync::RwLock::new(HashMap::new()),
            probe_concurrency: config.probe_concurrency.max(1),
            selection_deadline: config.selection_deadline,
        }
    }

    /// Registry pre-loaded with every built-in protocol variant
    pub fn with_default_strategies(config: &EngineConfig) -> anyhow::Result<Self> {
        let mut map = HashMap::new();
        for strategy in default_strategies(config)? {
            map.insert(strategy.name().to_lowercase(), strategy);
        }
        Ok(Self {
            strategies: tokio::sync::RwLock::new(map),
            probe_concurrency: config.probe_concurrency.max(1),
            selection_deadline: config.selection_deadline,
        })
    }

    /// Register a strategy under its name. Re-registering an existing name
    /// replaces the previous entry (configuration overrides work this way).
    pub async fn register(&self, strategy: Arc<dyn ConnectionStrategy>) {
        let key = strategy.name().to_lowercase();
        let mut strategies = self.strategies.write().await;
        if strategies.insert(key.clone(), strategy).is_some() {
            info!(strategy = %key, "strategy replaced");
        } else {
            debug!(strategy = %key, "strategy registered");
        }
    }

    /// Remove a strategy by name; unknown names are a benign no-op
    pub async fn unregister(&self, name: &str) -> bool {
        let mut strategies = self.strategies.write().await;
        strategies.remove(&name.to_lowercase()).is_some()
    }

    /// Snapshot of all registered strategies
    pub async fn all_strategies(&self) -> Vec<Arc<dyn ConnectionStrategy>> {
        let strategies = self.strategies.read().await;
        strategies.values().cloned().collect()
    }

    pub async fn strategy_by_name(
        &self,
        name: &str,
    ) -> Result<Arc<dyn ConnectionStrategy>, EngineError> {
        let strategies = self.strategies.read().await;
        strategies
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| EngineError::StrategyNotFound(name.to_string()))
    }

    /// Strategies structurally compatible with the camera, highest priority
    /// first. An empty result is success, not an error.
    pub async fn supported_strategies(&self, camera: &Camera) -> Vec<Arc<dyn ConnectionStrategy>> {
        let mut supported: Vec<_> = self
            .all_strategies()
            .await
            .into_iter()
            .filter(|s| s.supports_camera(camera))
            .collect();
        supported.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        supported
    }

    /// Probe every supported strategy with bounded fan-out. Individual
    /// failures (including panicking probes) are recorded per strategy and
    /// never abort the rest of the batch.
    pub async fn probe_all(
        &self,
        camera: &Camera,
        cancel: &CancellationToken,
    ) -> Vec<ProbeReport> {
        let supported = self.supported_strategies(camera).await;
        self.probe_strategies(camera, &supported, cancel)
            .await
            .into_iter()
            .map(|(_, report)| report)
            .collect()
    }

    async fn probe_strategies(
        &self,
        camera: &Camera,
        strategies: &[Arc<dyn ConnectionStrategy>],
        cancel: &CancellationToken,
    ) -> Vec<(Arc<dyn ConnectionStrategy>, ProbeReport)> {
        let mut results = Vec::with_capacity(strategies.len());
        let mut in_flight = Vec::new();

        for strategy in strategies {
            let task_strategy = Arc::clone(strategy);
            let task_camera = camera.clone();
            let task_cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let outcome = task_strategy
                    .test_connection(&task_camera, &task_cancel)
                    .await;
                record_probe(task_strategy.name(), &task_camera, &outcome);
                ProbeReport {
                    strategy: task_strategy.name().to_string(),
                    success: outcome.success,
                    latency: outcome.latency,
                    error: outcome.error,
                }
            });
            in_flight.push((Arc::clone(strategy), handle));

            if in_flight.len() >= self.probe_concurrency {
                for (strategy, handle) in in_flight.drain(..) {
                    results.push(join_probe(strategy, handle).await);
                }
            }
        }

        for (strategy, handle) in in_flight {
            results.push(join_probe(strategy, handle).await);
        }

        results
    }

    /// Strategies whose live probe succeeded, ordered by
    /// (priority desc, latency asc)
    pub async fn working_strategies(
        &self,
        camera: &Camera,
        cancel: &CancellationToken,
    ) -> Vec<Arc<dyn ConnectionStrategy>> {
        let supported = self.supported_strategies(camera).await;
        let mut working: Vec<_> = self
            .probe_strategies(camera, &supported, cancel)
            .await
            .into_iter()
            .filter(|(_, report)| report.success)
            .collect();
        working.sort_by(|a, b| {
            b.0.priority()
                .cmp(&a.0.priority())
                .then(a.1.latency.cmp(&b.1.latency))
        });
        working.into_iter().map(|(strategy, _)| strategy).collect()
    }

    /// Resolve the best strategy for the camera: the top verified one, or —
    /// when nothing verifies within the deadline — the highest-priority
    /// supported strategy, unverified, with a warning.
    pub async fn best_strategy(
        &self,
        camera: &Camera,
        cancel: &CancellationToken,
    ) -> Result<SelectedStrategy, EngineError> {
        let supported = self.supported_strategies(camera).await;
        let Some(fallback) = supported.first().cloned() else {
            return Err(EngineError::NoSupportedStrategy {
                camera: camera.name.clone(),
            });
        };

        let probe_cancel = cancel.child_token();
        let probed = match timeout(
            self.selection_deadline,
            self.probe_strategies(camera, &supported, &probe_cancel),
        )
        .await
        {
            Ok(probed) => probed,
            Err(_) => {
                probe_cancel.cancel();
                warn!(
                    camera = %camera.name,
                    deadline_secs = self.selection_deadline.as_secs(),
                    "strategy verification did not finish before the deadline"
                );
                Vec::new()
            }
        };

        let mut working: Vec<_> = probed
            .into_iter()
            .filter(|(_, report)| report.success)
            .collect();
        working.sort_by(|a, b| {
            b.0.priority()
                .cmp(&a.0.priority())
                .then(a.1.latency.cmp(&b.1.latency))
        });

        if let Some((strategy, report)) = working.into_iter().next() {
            info!(
                camera = %camera.name,
                strategy = %strategy.name(),
                latency_ms = report.latency.as_millis() as u64,
                "selected verified strategy"
            );
            metrics::ENGINE_STRATEGY_SELECTIONS
                .with_label_values(&[strategy.name(), "true"])
                .inc();
            return Ok(SelectedStrategy {
                latency: Some(report.latency),
                strategy,
                verified: true,
            });
        }

        warn!(
            camera = %camera.name,
            strategy = %fallback.name(),
            "no strategy verified; falling back to highest-priority supported strategy"
        );
        metrics::ENGINE_STRATEGY_SELECTIONS
            .with_label_values(&[fallback.name(), "false"])
            .inc();
        Ok(SelectedStrategy {
            strategy: fallback,
            verified: false,
            latency: None,
        })
    }
}

fn record_probe(strategy: &str, camera: &Camera, outcome: &ProbeOutcome) {
    let label = if outcome.success { "success" } else { "failure" };
    metrics::ENGINE_PROBE_TOTAL
        .with_label_values(&[strategy, label])
        .inc();
    metrics::ENGINE_PROBE_DURATION
        .with_label_values(&[strategy])
        .observe(outcome.latency.as_secs_f64());
    debug!(
        camera = %camera.name,
        strategy = %strategy,
        success = outcome.success,
        latency_ms = outcome.latency.as_millis() as u64,
        error = ?outcome.error,
        "probe finished"
    );
}

async fn join_probe(
    strategy: Arc<dyn ConnectionStrategy>,
    handle: tokio::task::JoinHandle<ProbeReport>,
) -> (Arc<dyn ConnectionStrategy>, ProbeReport) {
    let name = strategy.name().to_string();
    match handle.await {
        Ok(report) => (strategy, report),
        Err(e) => {
            warn!(strategy = %name, error = %e, "probe task aborted");
            let report = ProbeReport {
                strategy: name,
                success: false,
                latency: Duration::ZERO,
                error: Some(format!("probe task aborted: {}", e)),
            };
            (strategy, report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use camera_core::{
        CameraConfiguration, CameraLocation, CameraNetwork, CameraType, ConnectionInfo,
    };

    enum ProbeScript {
        Succeed(Duration),
        Fail,
        Panic,
        Hang,
    }

    struct ScriptedStrategy {
        name: &'static str,
        priority: i32,
        supports: bool,
        script: ProbeScript,
    }

    impl ScriptedStrategy {
        fn new(name: &'static str, priority: i32, script: ProbeScript) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                supports: true,
                script,
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
            self.supports
        }

        async fn test_connection(
            &self,
            _camera: &Camera,
            _cancel: &CancellationToken,
        ) -> ProbeOutcome {
            match &self.script {
                ProbeScript::Succeed(latency) => ProbeOutcome::ok(*latency),
                ProbeScript::Fail => ProbeOutcome::failed(Duration::from_millis(5), "unreachable"),
                ProbeScript::Panic => panic!("probe blew up"),
                ProbeScript::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    ProbeOutcome::failed(Duration::ZERO, "unreachable")
                }
            }
        }

        async fn connect(&self, _camera: &Camera) -> anyhow::Result<ConnectionInfo> {
            Ok(ConnectionInfo::new(
                format!("mock://{}", self.name),
                self.name,
            )?)
        }

        async fn capture_snapshot(&self, _camera: &Camera) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xFF, 0xD8])
        }
    }

    fn test_camera() -> Camera {
        Camera::new(
            "Test Camera",
            CameraLocation::new("192.168.1.20:554"),
            CameraNetwork::new("192.168.1.20", 554),
            CameraType::Ip,
            CameraConfiguration::default(),
        )
        .unwrap()
    }

    fn registry() -> StrategyRegistry {
        StrategyRegistry::new(&EngineConfig::default())
    }

    #[tokio::test]
    async fn test_register_last_write_wins() {
        let registry = registry();
        registry
            .register(ScriptedStrategy::new("rtsp", 10, ProbeScript::Fail))
            .await;
        registry
            .register(ScriptedStrategy::new("RTSP", 99, ProbeScript::Fail))
            .await;

        assert_eq!(registry.all_strategies().await.len(), 1);
        let strategy = registry.strategy_by_name("rtsp").await.unwrap();
        assert_eq!(strategy.priority(), 99);
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_benign() {
        let registry = registry();
        assert!(!registry.unregister("nothing").await);

        registry
            .register(ScriptedStrategy::new("rtsp", 10, ProbeScript::Fail))
            .await;
        assert!(registry.unregister("RTSP").await);
        assert!(registry.all_strategies().await.is_empty());
    }

    #[tokio::test]
    async fn test_strategy_by_name_not_found() {
        let result = registry().strategy_by_name("onvif").await;
        assert!(matches!(result, Err(EngineError::StrategyNotFound(_))));
    }

    #[tokio::test]
    async fn test_usb_camera_supported_set() {
        let registry = StrategyRegistry::with_default_strategies(&EngineConfig::default()).unwrap();
        let camera = Camera::new(
            "Desk Webcam",
            CameraLocation::default(),
            CameraNetwork::default(),
            CameraType::Usb,
            CameraConfiguration::default(),
        )
        .unwrap();

        let names: Vec<_> = registry
            .supported_strategies(&camera)
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["usb"]);
    }

    #[tokio::test]
    async fn test_priority_then_latency_ranking() {
        let registry = registry();
        registry
            .register(ScriptedStrategy::new(
                "rtsp",
                30,
                ProbeScript::Succeed(Duration::from_millis(50)),
            ))
            .await;
        registry
            .register(ScriptedStrategy::new(
                "http",
                20,
                ProbeScript::Succeed(Duration::from_millis(120)),
            ))
            .await;

        let selected = registry
            .best_strategy(&test_camera(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(selected.strategy.name(), "rtsp");
        assert!(selected.verified);
        assert_eq!(selected.latency, Some(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_latency_breaks_priority_ties() {
        let registry = registry();
        registry
            .register(ScriptedStrategy::new(
                "rtsp",
                30,
                ProbeScript::Succeed(Duration::from_millis(90)),
            ))
            .await;
        registry
            .register(ScriptedStrategy::new(
                "onvif",
                30,
                ProbeScript::Succeed(Duration::from_millis(15)),
            ))
            .await;

        let working = registry
            .working_strategies(&test_camera(), &CancellationToken::new())
            .await;
        assert_eq!(working[0].name(), "onvif");
        assert_eq!(working[1].name(), "rtsp");
    }

    #[tokio::test]
    async fn test_panicking_probe_does_not_abort_batch() {
        let registry = registry();
        registry
            .register(ScriptedStrategy::new("onvif", 80, ProbeScript::Panic))
            .await;
        registry
            .register(ScriptedStrategy::new(
                "rtsp",
                30,
                ProbeScript::Succeed(Duration::from_millis(40)),
            ))
            .await;

        let camera = test_camera();
        let reports = registry.probe_all(&camera, &CancellationToken::new()).await;
        assert_eq!(reports.len(), 2);

        let working = registry
            .working_strategies(&camera, &CancellationToken::new())
            .await;
        assert_eq!(working.len(), 1);
        assert_eq!(working[0].name(), "rtsp");
    }

    #[tokio::test]
    async fn test_fallback_to_highest_priority_supported() {
        let registry = registry();
        registry
            .register(ScriptedStrategy::new("rtsp", 30, ProbeScript::Fail))
            .await;
        registry
            .register(ScriptedStrategy::new("http", 20, ProbeScript::Fail))
            .await;

        let selected = registry
            .best_strategy(&test_camera(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(selected.strategy.name(), "rtsp");
        assert!(!selected.verified);
        assert_eq!(selected.latency, None);
    }

    #[tokio::test]
    async fn test_no_supported_strategy_is_an_error() {
        let registry = registry();
        registry
            .register(Arc::new(ScriptedStrategy {
                name: "usb",
                priority: 20,
                supports: false,
                script: ProbeScript::Fail,
            }))
            .await;

        let result = registry
            .best_strategy(&test_camera(), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(EngineError::NoSupportedStrategy { .. })
        ));
    }

    #[tokio::test]
    async fn test_selection_deadline_forces_fallback() {
        let mut config = EngineConfig::default();
        config.selection_deadline = Duration::from_millis(100);
        let registry = StrategyRegistry::new(&config);
        registry
            .register(ScriptedStrategy::new("onvif", 80, ProbeScript::Hang))
            .await;

        let selected = registry
            .best_strategy(&test_camera(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(selected.strategy.name(), "onvif");
        assert!(!selected.verified);
    }
}
