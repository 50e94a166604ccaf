pub mod camera;
pub mod connection;
pub mod error;
pub mod repository;

pub use camera::{
    strategy_names, Camera, CameraConfiguration, CameraLocation, CameraNetwork, CameraStatus,
    CameraType, NetworkType,
};
pub use connection::ConnectionInfo;
pub use error::DomainError;
pub use repository::{CameraRepository, InMemoryCameraRepository};
