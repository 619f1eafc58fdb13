use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_notifications() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the detection backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// How often to ask the backend for detection status while scanning
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Audio file played when access is granted (skipped when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chime_path: Option<PathBuf>,

    /// Show a desktop notification when access is granted
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
            chime_path: None,
            notifications: default_notifications(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("garita");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            backend_url: "http://kiosk-cam.local:5000".to_string(),
            poll_interval_ms: 250,
            chime_path: Some(PathBuf::from("/usr/share/sounds/chime.wav")),
            notifications: false,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.backend_url, deserialized.backend_url);
        assert_eq!(config.poll_interval_ms, deserialized.poll_interval_ms);
        assert_eq!(config.chime_path, deserialized.chime_path);
        assert_eq!(config.notifications, deserialized.notifications);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend_url, "http://127.0.0.1:5000");
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.chime_path.is_none());
        assert!(config.notifications);
    }
}
