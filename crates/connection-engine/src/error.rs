use camera_core::DomainError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("camera not found: {0}")]
    CameraNotFound(Uuid),

    #[error("strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("no supported strategy found for camera {camera}")]
    NoSupportedStrategy { camera: String },

    #[error("strategy {strategy} does not support camera {camera}")]
    StrategyUnsupported { strategy: String, camera: String },

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("snapshot capture failed: {0}")]
    SnapshotFailed(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
