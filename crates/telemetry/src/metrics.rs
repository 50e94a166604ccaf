use lazy_static::lazy_static;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Connection Engine Metrics ====
    pub static ref ENGINE_PROBE_TOTAL: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "engine_probe_total",
                "Total number of strategy connectivity probes",
            ),
            &["strategy", "outcome"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ENGINE_PROBE_DURATION: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "engine_probe_duration_seconds",
                "Duration of strategy connectivity probes",
            ),
            &["strategy"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ENGINE_STRATEGY_SELECTIONS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "engine_strategy_selections_total",
                "Total number of best-strategy selections",
            ),
            &["strategy", "verified"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ENGINE_CONNECTED_CAMERAS: IntGauge = {
        let metric = IntGauge::new(
            "engine_connected_cameras",
            "Number of cameras with a live connection",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ENGINE_HEALTH_CHECKS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "engine_health_checks_total",
                "Total number of connection health checks",
            ),
            &["result"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}
