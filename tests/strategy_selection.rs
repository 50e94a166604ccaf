mod support;

use connection_engine::{EngineConfig, EngineError, StrategyRegistry};
use std::time::Duration;
use support::{ip_camera, usb_camera, ScriptedStrategy};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_usb_camera_gets_usb_strategy_only() {
    let registry = StrategyRegistry::with_default_strategies(&EngineConfig::default()).unwrap();
    let camera = usb_camera("Desk Webcam");

    let names: Vec<String> = registry
        .supported_strategies(&camera)
        .await
        .iter()
        .map(|s| s.name().to_string())
        .collect();

    assert_eq!(names, vec!["usb"]);
}

#[tokio::test]
async fn test_ip_camera_excludes_usb_and_vendor_strategies() {
    let registry = StrategyRegistry::with_default_strategies(&EngineConfig::default()).unwrap();
    let camera = ip_camera("Lobby Camera");

    let names: Vec<String> = registry
        .supported_strategies(&camera)
        .await
        .iter()
        .map(|s| s.name().to_string())
        .collect();

    // Port 554 and no brand: rtsp and http apply, onvif/usb/vendor do not
    assert_eq!(names, vec!["rtsp", "http"]);
}

#[tokio::test]
async fn test_verified_strategy_wins_over_slower_lower_priority() {
    let registry = StrategyRegistry::new(&EngineConfig::default());
    registry
        .register(ScriptedStrategy::working(
            "rtsp",
            30,
            Duration::from_millis(50),
        ))
        .await;
    registry
        .register(ScriptedStrategy::working(
            "http",
            20,
            Duration::from_millis(120),
        ))
        .await;

    let selected = registry
        .best_strategy(&ip_camera("Lobby Camera"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(selected.strategy.name(), "rtsp");
    assert!(selected.verified);
}

#[tokio::test]
async fn test_all_probes_failing_falls_back_to_highest_priority() {
    let registry = StrategyRegistry::new(&EngineConfig::default());
    registry.register(ScriptedStrategy::failing("rtsp", 30)).await;
    registry.register(ScriptedStrategy::failing("http", 20)).await;

    let selected = registry
        .best_strategy(&ip_camera("Lobby Camera"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(selected.strategy.name(), "rtsp");
    assert!(!selected.verified);
}

#[tokio::test]
async fn test_no_supported_strategy_is_reported() {
    let registry = StrategyRegistry::new(&EngineConfig::default());
    registry
        .register(ScriptedStrategy::unsupported("usb", 20))
        .await;

    let result = registry
        .best_strategy(&ip_camera("Lobby Camera"), &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(EngineError::NoSupportedStrategy { .. })
    ));
}

#[tokio::test]
async fn test_hanging_probe_hits_deadline_and_falls_back() {
    let config = EngineConfig {
        selection_deadline: Duration::from_millis(150),
        ..EngineConfig::default()
    };
    let registry = StrategyRegistry::new(&config);
    registry.register(ScriptedStrategy::hanging("onvif", 80)).await;
    registry
        .register(ScriptedStrategy::working(
            "rtsp",
            30,
            Duration::from_millis(10),
        ))
        .await;

    // The hanging probe occupies its fan-out slot past the deadline, so the
    // registry must give up verifying and fall back by priority
    let started = std::time::Instant::now();
    let selected = registry
        .best_strategy(&ip_camera("Lobby Camera"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(selected.strategy.name(), "onvif");
    assert!(!selected.verified);
}

#[tokio::test]
async fn test_reregistering_replaces_entry() {
    let registry = StrategyRegistry::new(&EngineConfig::default());
    registry.register(ScriptedStrategy::failing("rtsp", 30)).await;
    registry
        .register(ScriptedStrategy::working(
            "rtsp",
            77,
            Duration::from_millis(10),
        ))
        .await;

    assert_eq!(registry.all_strategies().await.len(), 1);
    let strategy = registry.strategy_by_name("RTSP").await.unwrap();
    assert_eq!(strategy.priority(), 77);
}
