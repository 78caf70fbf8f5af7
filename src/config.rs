//! Configuration management for Gamma VJ
//!
//! Handles loading and validation of the YAML configuration file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::midi::log::MAX_LOG_SIZE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// MIDI input configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MidiConfig {
    /// Client name registered with the platform MIDI system
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Device to open on startup: exact port name or port index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Maximum number of entries kept in the message log
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

/// Terminal monitor configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MonitorConfig {
    /// Entries shown by `log` when no count is given
    #[serde(default = "default_recent")]
    pub recent: usize,
    /// Poll period of the streaming monitor in milliseconds
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

fn default_client_name() -> String {
    "Gamma VJ".to_string()
}

fn default_log_limit() -> usize {
    MAX_LOG_SIZE
}

fn default_recent() -> usize {
    50
}

fn default_poll_ms() -> u64 {
    50
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            device: None,
            log_limit: default_log_limit(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            recent: default_recent(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            info!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.midi.client_name.trim().is_empty() {
            bail!("midi.client_name must not be empty");
        }
        if self.midi.log_limit == 0 {
            bail!("midi.log_limit must be at least 1");
        }
        if self.monitor.recent == 0 {
            bail!("monitor.recent must be at least 1");
        }
        if self.monitor.poll_ms == 0 {
            bail!("monitor.poll_ms must be at least 1");
        }
        Ok(())
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.midi.client_name, "Gamma VJ");
        assert_eq!(config.midi.log_limit, 1000);
        assert_eq!(config.midi.device, None);
        assert_eq!(config.monitor.recent, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = AppConfig::from_yaml("midi:\n  device: \"DDJ-REV1\"\n").unwrap();

        assert_eq!(config.midi.device.as_deref(), Some("DDJ-REV1"));
        assert_eq!(config.midi.client_name, "Gamma VJ");
        assert_eq!(config.monitor, MonitorConfig::default());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AppConfig::from_yaml("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_limit() {
        let err = AppConfig::from_yaml("midi:\n  log_limit: 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("log_limit"));
    }

    #[test]
    fn test_validation_rejects_zero_poll() {
        assert!(AppConfig::from_yaml("monitor:\n  poll_ms: 0\n").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamma.yaml");
        let path = path.to_str().unwrap();

        let mut config = AppConfig::default();
        config.midi.device = Some("0".to_string());
        config.monitor.poll_ms = 20;
        config.save(path).await.unwrap();

        assert_eq!(AppConfig::load(path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let config = AppConfig::load_or_default(path.to_str().unwrap()).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(AppConfig::load(path.to_str().unwrap()).await.is_err());
    }
}
