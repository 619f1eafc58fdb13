pub mod poller;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout for any single backend request. Keeps a hung backend from
/// wedging the poll task or a one-shot CLI call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Detection state as reported by the checkpoint backend's `/status`
/// endpoint. Only `access_granted` is guaranteed to be present; the rest
/// defaults so a minimal body still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionStatus {
    pub access_granted: bool,
    #[serde(default)]
    pub is_scanning: bool,
    /// Consecutive positive camera frames so far. The backend requires a
    /// run of these before it flips `access_granted`.
    #[serde(default)]
    pub consecutive_frames: u32,
    #[serde(default)]
    pub debug_mode: bool,
}

#[derive(Debug, Deserialize)]
struct DebugToggled {
    debug_mode: bool,
}

/// HTTP client for the detection backend. Cheap to clone; the poll task
/// gets its own copy.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_ok(&self, path: &str) -> Result<reqwest::Response, BackendError> {
        let response = self.http.get(self.endpoint(path)).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        Ok(response)
    }

    /// Ask the backend to begin camera detection. The response body is
    /// ignored; a 2xx is the acknowledgement.
    pub async fn start_scan(&self) -> Result<(), BackendError> {
        self.get_ok("start_scan").await?;
        Ok(())
    }

    /// Fetch the current detection state.
    pub async fn fetch_status(&self) -> Result<DetectionStatus, BackendError> {
        let status = self.get_ok("status").await?.json().await?;
        Ok(status)
    }

    /// Ask the backend to clear its detection state for the next person.
    pub async fn reset(&self) -> Result<(), BackendError> {
        self.get_ok("reset").await?;
        Ok(())
    }

    /// Flip the backend's debug overlay. Returns the new flag value.
    pub async fn toggle_debug(&self) -> Result<bool, BackendError> {
        let toggled: DebugToggled = self.get_ok("toggle_debug").await?.json().await?;
        Ok(toggled.debug_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_full_backend_body() {
        // Shape the checkpoint backend actually serves, extra fields included
        let body = r#"{
            "is_scanning": true,
            "access_granted": false,
            "consecutive_frames": 7,
            "debug_mode": true,
            "vit_active": true
        }"#;
        let status: DetectionStatus = serde_json::from_str(body).unwrap();
        assert!(status.is_scanning);
        assert!(!status.access_granted);
        assert_eq!(status.consecutive_frames, 7);
        assert!(status.debug_mode);
    }

    #[test]
    fn status_parses_minimal_body() {
        let status: DetectionStatus =
            serde_json::from_str(r#"{"access_granted": true}"#).unwrap();
        assert!(status.access_granted);
        assert!(!status.is_scanning);
        assert_eq!(status.consecutive_frames, 0);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = BackendClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.endpoint("status"), "http://localhost:5000/status");
    }
}
