use crate::connection::ConnectionInfo;
use crate::error::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Canonical strategy names, shared by the domain heuristics and the engine
/// registry so the two never disagree on vocabulary.
pub mod strategy_names {
    pub const RTSP: &str = "rtsp";
    pub const HTTP: &str = "http";
    pub const USB: &str = "usb";
    pub const ONVIF: &str = "onvif";
    pub const HIKVISION: &str = "hikvision-sdk";
    pub const DAHUA: &str = "dahua-sdk";

    /// All known strategies, vendor SDKs first
    pub const ALL: [&str; 6] = [HIKVISION, DAHUA, ONVIF, RTSP, HTTP, USB];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Ip,
    Onvif,
    Rtsp,
    Http,
    Usb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Inactive,
    Active,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Lan,
    Wan,
    Vpn,
}

impl Default for NetworkType {
    fn default() -> Self {
        Self::Lan
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraLocation {
    pub address: String,
    pub zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CameraLocation {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraNetwork {
    pub ip: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub network_type: NetworkType,
}

impl CameraNetwork {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.ip.trim().is_empty() && self.port > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraConfiguration {
    pub resolution: Option<String>,
    pub frame_rate: Option<i32>,
    pub codec: Option<String>,
    pub brand: Option<String>,
    /// Free-form installer-supplied settings (protocol hints, device paths)
    pub additional: Option<JsonValue>,
}

impl CameraConfiguration {
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Lowercased brand string for case-insensitive vendor matching
    pub fn brand_lowercase(&self) -> Option<String> {
        self.brand.as_ref().map(|b| b.to_lowercase())
    }

    /// Look up a string-valued key in the free-form settings
    pub fn additional_str(&self, key: &str) -> Option<&str> {
        self.additional
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
    }
}

/// The camera device record.
///
/// Invariant: `status == Active` exactly when a connected `ConnectionInfo`
/// is present. All mutation goes through the domain operations below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub id: Uuid,
    pub name: String,
    pub location: CameraLocation,
    pub network: CameraNetwork,
    pub camera_type: CameraType,
    pub status: CameraStatus,
    pub connection: Option<ConnectionInfo>,
    pub configuration: CameraConfiguration,
    pub last_active_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency stamp, bumped by the repository on update
    pub version: u64,
}

impl Camera {
    /// Validated factory operation
    pub fn new(
        name: impl Into<String>,
        location: CameraLocation,
        network: CameraNetwork,
        camera_type: CameraType,
        configuration: CameraConfiguration,
    ) -> Result<Self, DomainError> {
        let name = name.into();

        common::validation::validate_name(&name, "camera name")
            .map_err(|e| DomainError::Validation(e.to_string()))?;
        common::validation::validate_length(
            &location.address,
            common::validation::MAX_ADDRESS_LENGTH,
            "address",
        )
        .map_err(|e| DomainError::Validation(e.to_string()))?;

        if camera_type == CameraType::Usb {
            if let Some(path) = configuration.additional_str("device_path") {
                common::validation::validate_uri(path, "device_path")
                    .map_err(|e| DomainError::Validation(e.to_string()))?;
            }
        } else {
            common::validation::validate_non_empty(&network.ip, "ip")
                .map_err(|e| DomainError::Validation(e.to_string()))?;
            common::validation::validate_port(network.port)
                .map_err(|e| DomainError::Validation(e.to_string()))?;
        }

        if let Some(rate) = configuration.frame_rate {
            common::validation::validate_range(rate, 1, 240, "frame_rate")
                .map_err(|e| DomainError::Validation(e.to_string()))?;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            location,
            network,
            camera_type,
            status: CameraStatus::Inactive,
            connection: None,
            configuration,
            last_active_at: None,
            updated_at: Utc::now(),
            version: 0,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_connected)
    }

    /// Store connection state produced by a strategy.
    ///
    /// A connected info activates the camera; a failed one marks it Error.
    pub fn set_connection_info(&mut self, info: ConnectionInfo) -> Result<(), DomainError> {
        let now = Utc::now();
        if info.is_connected {
            self.status = CameraStatus::Active;
            self.last_active_at = Some(now);
        } else {
            self.status = CameraStatus::Error;
        }
        self.connection = Some(info);
        self.updated_at = now;
        Ok(())
    }

    /// Refresh the connection heartbeat; fails when there is nothing alive
    /// to refresh.
    pub fn update_connection_heartbeat(&mut self) -> Result<(), DomainError> {
        let conn = self
            .connection
            .as_ref()
            .ok_or_else(|| DomainError::not_connected("no connection info"))?;
        if !conn.is_connected {
            return Err(DomainError::not_connected("connection is closed"));
        }

        let now = Utc::now();
        self.connection = Some(conn.with_heartbeat(now));
        self.last_active_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Drop the connection; the record of it is retained, marked closed.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.as_ref() {
            self.connection = Some(conn.disconnected());
        }
        self.status = CameraStatus::Inactive;
        self.updated_at = Utc::now();
    }

    /// Explicit status transition, guarded so the Active/connected invariant
    /// cannot be broken.
    pub fn set_status(&mut self, status: CameraStatus) -> Result<(), DomainError> {
        match status {
            CameraStatus::Active if !self.is_connected() => {
                return Err(DomainError::InvalidTransition(
                    "cannot activate a camera without a live connection".to_string(),
                ));
            }
            CameraStatus::Inactive | CameraStatus::Error if self.is_connected() => {
                return Err(DomainError::InvalidTransition(
                    "disconnect the camera before demoting its status".to_string(),
                ));
            }
            _ => {}
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the connection produced a liveness signal recently enough
    pub fn is_connection_healthy(&self, max_heartbeat_age: Duration) -> bool {
        match self.connection.as_ref() {
            Some(conn) if conn.is_connected => conn.heartbeat_age(Utc::now()) < max_heartbeat_age,
            _ => false,
        }
    }

    // ---- Static compatibility heuristics -----------------------------------
    // Brand/type/port checks only; the engine's analyzer and live-probing
    // registry remain authoritative for ranking and verified selection.

    /// Structural check whether a named strategy could plausibly drive this
    /// camera. Case-insensitive on the strategy name.
    pub fn can_use_strategy(&self, name: &str) -> bool {
        let brand = self.configuration.brand_lowercase().unwrap_or_default();
        match name.to_lowercase().as_str() {
            strategy_names::RTSP => {
                matches!(self.camera_type, CameraType::Rtsp | CameraType::Ip)
                    && self.network.is_configured()
            }
            strategy_names::HTTP => {
                matches!(self.camera_type, CameraType::Http | CameraType::Ip)
                    && self.network.is_configured()
            }
            strategy_names::USB => self.camera_type == CameraType::Usb,
            strategy_names::ONVIF => {
                self.camera_type == CameraType::Onvif
                    || (self.camera_type == CameraType::Ip
                        && matches!(self.network.port, 80 | 8080))
            }
            strategy_names::HIKVISION => {
                brand.contains("hikvision")
                    && self.camera_type != CameraType::Usb
                    && self.network.is_configured()
            }
            strategy_names::DAHUA => {
                brand.contains("dahua")
                    && self.camera_type != CameraType::Usb
                    && self.network.is_configured()
            }
            _ => false,
        }
    }

    /// All structurally plausible strategies, vendor SDKs first
    pub fn supported_strategy_names(&self) -> Vec<&'static str> {
        strategy_names::ALL
            .iter()
            .copied()
            .filter(|name| self.can_use_strategy(name))
            .collect()
    }

    /// Single best static guess, without any probing
    pub fn preferred_strategy(&self) -> &'static str {
        let brand = self.configuration.brand_lowercase().unwrap_or_default();
        if brand.contains("hikvision") && self.camera_type != CameraType::Usb {
            return strategy_names::HIKVISION;
        }
        if brand.contains("dahua") && self.camera_type != CameraType::Usb {
            return strategy_names::DAHUA;
        }
        match self.camera_type {
            CameraType::Onvif => strategy_names::ONVIF,
            CameraType::Rtsp => strategy_names::RTSP,
            CameraType::Http => strategy_names::HTTP,
            CameraType::Usb => strategy_names::USB,
            CameraType::Ip => match self.network.port {
                554 => strategy_names::RTSP,
                80 | 8080 => strategy_names::ONVIF,
                _ => strategy_names::RTSP,
            },
        }
    }
}
