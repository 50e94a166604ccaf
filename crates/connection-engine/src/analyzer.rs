use camera_core::{strategy_names, Camera, CameraType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const URL_SCHEME_CONFIDENCE: f64 = 0.35;
const TYPE_CONFIDENCE: f64 = 0.30;
const BRAND_CONFIDENCE: f64 = 0.30;
const CONFIG_HINT_CONFIDENCE: f64 = 0.25;
const PORT_CONFIDENCE: f64 = 0.15;

/// Advisory ranking for one camera: accumulated per-strategy scores, the
/// derived recommendation order, and how confident the signals were.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAnalysis {
    pub camera_name: String,
    pub camera_type: CameraType,
    pub scores: HashMap<String, i32>,
    pub recommended: Vec<String>,
    pub confidence: f64,
}

/// Scores strategies from static signals only — declared type, address
/// text, any existing stream URL, and configuration hints. Performs no I/O;
/// the live-probing registry stays authoritative for verified selection.
#[derive(Debug, Default, Clone)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, camera: &Camera) -> StrategyAnalysis {
        let mut scores: HashMap<String, i32> = HashMap::new();
        let mut confidence = 0.0_f64;

        self.score_declared_type(camera, &mut scores, &mut confidence);
        self.score_address_text(camera, &mut scores, &mut confidence);
        self.score_existing_url(camera, &mut scores, &mut confidence);
        self.score_configuration(camera, &mut scores, &mut confidence);

        let mut ranked: Vec<(String, i32)> = scores
            .iter()
            .filter(|(_, score)| **score > 0)
            .map(|(name, score)| (name.clone(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let recommended = ranked.into_iter().map(|(name, _)| name).collect();

        let analysis = StrategyAnalysis {
            camera_name: camera.name.clone(),
            camera_type: camera.camera_type,
            scores,
            recommended,
            confidence: confidence.min(1.0),
        };
        debug!(
            camera = %analysis.camera_name,
            recommended = ?analysis.recommended,
            confidence = analysis.confidence,
            "camera analysis finished"
        );
        analysis
    }

    fn score_declared_type(
        &self,
        camera: &Camera,
        scores: &mut HashMap<String, i32>,
        confidence: &mut f64,
    ) {
        match camera.camera_type {
            CameraType::Onvif => {
                bump(scores, strategy_names::ONVIF, 40);
                *confidence += TYPE_CONFIDENCE;
            }
            CameraType::Usb => {
                bump(scores, strategy_names::USB, 45);
                *confidence += TYPE_CONFIDENCE;
            }
            CameraType::Rtsp => {
                bump(scores, strategy_names::RTSP, 40);
                *confidence += TYPE_CONFIDENCE;
            }
            CameraType::Http => {
                bump(scores, strategy_names::HTTP, 35);
                *confidence += TYPE_CONFIDENCE;
            }
            // A bare IP label narrows nothing down; spread a small boost
            // over the network protocols
            CameraType::Ip => {
                bump(scores, strategy_names::ONVIF, 10);
                bump(scores, strategy_names::RTSP, 10);
                bump(scores, strategy_names::HTTP, 10);
            }
        }
    }

    fn score_address_text(
        &self,
        camera: &Camera,
        scores: &mut HashMap<String, i32>,
        confidence: &mut f64,
    ) {
        let mut text = camera.location.address.to_lowercase();
        if camera.network.is_configured() {
            text.push(' ');
            text.push_str(&format!("{}:{}", camera.network.ip, camera.network.port));
        }

        if text.contains(":554") {
            bump(scores, strategy_names::RTSP, 25);
            *confidence += PORT_CONFIDENCE;
        }
        if text.contains(":3702") {
            bump(scores, strategy_names::ONVIF, 30);
            *confidence += PORT_CONFIDENCE;
        } else if text.contains(":8080") || text.contains(":80") {
            bump(scores, strategy_names::HTTP, 20);
            *confidence += PORT_CONFIDENCE;
        }

        if text.contains("10.") || text.contains("192.168.") || is_private_172(&text) {
            bump(scores, strategy_names::RTSP, 5);
            bump(scores, strategy_names::HTTP, 5);
            bump(scores, strategy_names::ONVIF, 5);
        }
        if text.contains("127.0.0.1") || text.contains("localhost") {
            bump(scores, strategy_names::USB, 15);
        }
    }

    fn score_existing_url(
        &self,
        camera: &Camera,
        scores: &mut HashMap<String, i32>,
        confidence: &mut f64,
    ) {
        let Some(conn) = camera.connection.as_ref() else {
            return;
        };
        let url = conn.stream_url.to_lowercase();

        if url.starts_with("rtsp://") {
            bump(scores, strategy_names::RTSP, 40);
            *confidence += URL_SCHEME_CONFIDENCE;
        } else if url.starts_with("http://") || url.starts_with("https://") {
            bump(scores, strategy_names::HTTP, 35);
            *confidence += URL_SCHEME_CONFIDENCE;
        } else if url.starts_with("usb://") || url.starts_with("/dev/") {
            bump(scores, strategy_names::USB, 40);
            *confidence += URL_SCHEME_CONFIDENCE;
        }

        if url.contains("onvif") {
            bump(scores, strategy_names::ONVIF, 20);
        }
        if url.contains("mjpeg") || url.contains("snapshot") {
            bump(scores, strategy_names::HTTP, 15);
        }
    }

    fn score_configuration(
        &self,
        camera: &Camera,
        scores: &mut HashMap<String, i32>,
        confidence: &mut f64,
    ) {
        if let Some(brand) = camera.configuration.brand_lowercase() {
            if brand.contains("hikvision") {
                bump(scores, strategy_names::HIKVISION, 40);
                *confidence += BRAND_CONFIDENCE;
            }
            if brand.contains("dahua") {
                bump(scores, strategy_names::DAHUA, 40);
                *confidence += BRAND_CONFIDENCE;
            }
            if brand.contains("webcam") {
                bump(scores, strategy_names::USB, 20);
            }
        }

        let Some(settings) = camera
            .configuration
            .additional
            .as_ref()
            .and_then(|v| v.as_object())
        else {
            return;
        };

        for (key, value) in settings {
            let key = key.to_lowercase();
            let value_str = value.as_str().map(|s| s.to_lowercase()).unwrap_or_default();

            if key.contains("protocol") || key.contains("strategy") {
                if let Some(name) = known_strategy(&value_str) {
                    bump(scores, name, 50);
                    *confidence += CONFIG_HINT_CONFIDENCE;
                }
            }
            if key.contains("device_path") && value_str.contains("/dev/") {
                bump(scores, strategy_names::USB, 45);
            }
            if key.contains("sdk") || key.contains("native") {
                bump(scores, strategy_names::HIKVISION, 10);
                bump(scores, strategy_names::DAHUA, 10);
            }
        }
    }

    /// Non-scoring variant: an ordered, deduplicated candidate list from the
    /// same signals, defaulting to network protocols first when nothing
    /// matches.
    pub fn auto_select(&self, camera: &Camera) -> Vec<String> {
        let mut candidates: Vec<&'static str> = Vec::new();
        let mut push = |name: &'static str, list: &mut Vec<&'static str>| {
            if !list.contains(&name) {
                list.push(name);
            }
        };

        if let Some(settings) = camera
            .configuration
            .additional
            .as_ref()
            .and_then(|v| v.as_object())
        {
            for (key, value) in settings {
                let key = key.to_lowercase();
                if key.contains("protocol") || key.contains("strategy") {
                    if let Some(name) =
                        value.as_str().and_then(|v| known_strategy(&v.to_lowercase()))
                    {
                        push(name, &mut candidates);
                    }
                }
            }
        }

        if let Some(conn) = camera.connection.as_ref() {
            let url = conn.stream_url.to_lowercase();
            if url.starts_with("rtsp://") {
                push(strategy_names::RTSP, &mut candidates);
            } else if url.starts_with("http://") || url.starts_with("https://") {
                push(strategy_names::HTTP, &mut candidates);
            } else if url.starts_with("usb://") || url.starts_with("/dev/") {
                push(strategy_names::USB, &mut candidates);
            }
        }

        if let Some(brand) = camera.configuration.brand_lowercase() {
            if brand.contains("hikvision") {
                push(strategy_names::HIKVISION, &mut candidates);
            }
            if brand.contains("dahua") {
                push(strategy_names::DAHUA, &mut candidates);
            }
        }

        match camera.camera_type {
            CameraType::Onvif => push(strategy_names::ONVIF, &mut candidates),
            CameraType::Rtsp => push(strategy_names::RTSP, &mut candidates),
            CameraType::Http => push(strategy_names::HTTP, &mut candidates),
            CameraType::Usb => push(strategy_names::USB, &mut candidates),
            CameraType::Ip => {}
        }

        match camera.network.port {
            554 => push(strategy_names::RTSP, &mut candidates),
            3702 => push(strategy_names::ONVIF, &mut candidates),
            80 | 8080 => push(strategy_names::HTTP, &mut candidates),
            _ => {}
        }

        if candidates.is_empty() {
            // Safe default: try everything, network protocols first
            candidates = vec![
                strategy_names::ONVIF,
                strategy_names::RTSP,
                strategy_names::HTTP,
                strategy_names::USB,
            ];
        }

        candidates.into_iter().map(|s| s.to_string()).collect()
    }
}

fn bump(scores: &mut HashMap<String, i32>, name: &str, delta: i32) {
    *scores.entry(name.to_string()).or_insert(0) += delta;
}

/// Map a hint value to a known strategy name, accepting bare vendor names
fn known_strategy(value: &str) -> Option<&'static str> {
    let value = value.trim();
    match value {
        strategy_names::RTSP => Some(strategy_names::RTSP),
        strategy_names::HTTP => Some(strategy_names::HTTP),
        strategy_names::USB => Some(strategy_names::USB),
        strategy_names::ONVIF => Some(strategy_names::ONVIF),
        strategy_names::HIKVISION | "hikvision" => Some(strategy_names::HIKVISION),
        strategy_names::DAHUA | "dahua" => Some(strategy_names::DAHUA),
        _ => None,
    }
}

/// 172.16.0.0/12 private block
fn is_private_172(text: &str) -> bool {
    (16..=31).any(|octet| text.contains(&format!("172.{}.", octet)))
}
