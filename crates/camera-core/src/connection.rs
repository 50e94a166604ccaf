use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of an established camera connection.
///
/// Immutable value: heartbeat updates and disconnects produce a new instance
/// instead of mutating in place. Owned exclusively by its camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub stream_url: String,
    pub snapshot_url: Option<String>,
    pub backup_stream_url: Option<String>,
    /// Name of the strategy that produced this connection
    pub connection_type: String,
    pub is_connected: bool,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl ConnectionInfo {
    pub fn new(
        stream_url: impl Into<String>,
        connection_type: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let stream_url = stream_url.into();
        let connection_type = connection_type.into();

        common::validation::validate_uri(&stream_url, "stream_url")
            .map_err(|e| DomainError::Validation(e.to_string()))?;
        common::validation::validate_non_empty(&connection_type, "connection_type")
            .map_err(|e| DomainError::Validation(e.to_string()))?;

        let now = Utc::now();
        Ok(Self {
            stream_url,
            snapshot_url: None,
            backup_stream_url: None,
            connection_type,
            is_connected: true,
            connected_at: now,
            last_heartbeat: Some(now),
        })
    }

    pub fn with_snapshot_url(mut self, url: impl Into<String>) -> Self {
        self.snapshot_url = Some(url.into());
        self
    }

    pub fn with_backup_stream_url(mut self, url: impl Into<String>) -> Self {
        self.backup_stream_url = Some(url.into());
        self
    }

    /// New instance with a refreshed heartbeat timestamp
    pub fn with_heartbeat(&self, at: DateTime<Utc>) -> Self {
        Self {
            last_heartbeat: Some(at),
            ..self.clone()
        }
    }

    /// New instance marked as no longer connected
    pub fn disconnected(&self) -> Self {
        Self {
            is_connected: false,
            ..self.clone()
        }
    }

    /// Age of the most recent liveness signal, falling back to connect time
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_heartbeat.unwrap_or(self.connected_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_stream_url() {
        assert!(ConnectionInfo::new("", "rtsp").is_err());
        assert!(ConnectionInfo::new("rtsp://10.0.0.5:554/stream", "").is_err());
        assert!(ConnectionInfo::new("rtsp://10.0.0.5:554/stream", "rtsp").is_ok());
    }

    #[test]
    fn test_heartbeat_returns_new_instance() {
        let info = ConnectionInfo::new("rtsp://10.0.0.5:554/stream", "rtsp").unwrap();
        let later = Utc::now() + chrono::Duration::seconds(10);
        let refreshed = info.with_heartbeat(later);

        assert_eq!(refreshed.last_heartbeat, Some(later));
        assert_ne!(info.last_heartbeat, refreshed.last_heartbeat);
        assert_eq!(info.stream_url, refreshed.stream_url);
    }

    #[test]
    fn test_disconnected_preserves_urls() {
        let info = ConnectionInfo::new("rtsp://10.0.0.5:554/stream", "rtsp")
            .unwrap()
            .with_snapshot_url("http://10.0.0.5/snap.jpg");
        let dropped = info.disconnected();

        assert!(!dropped.is_connected);
        assert!(info.is_connected);
        assert_eq!(dropped.snapshot_url.as_deref(), Some("http://10.0.0.5/snap.jpg"));
    }
}
