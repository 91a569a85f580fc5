//! Configuration loading

use anyhow::{Context, Result};
use canquery_discovery::{DEFAULT_INTERFACE_PREFIX, DEFAULT_SYSFS_NET};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Interfaces to query when none are given on the command line
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Name prefix used when enumerating host interfaces
    #[serde(default = "default_prefix")]
    pub interface_prefix: String,
    /// Directory listing the host's network interfaces
    #[serde(default = "default_sysfs_net")]
    pub sysfs_net: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            interface_prefix: default_prefix(),
            sysfs_net: default_sysfs_net(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_INTERFACE_PREFIX.to_string()
}

fn default_sysfs_net() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_NET)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Load configuration from file, falling back to defaults if it does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("canbus-query.toml")).unwrap();

        assert!(config.discovery.interfaces.is_empty());
        assert_eq!(config.discovery.interface_prefix, "can");
        assert_eq!(config.discovery.sysfs_net, PathBuf::from("/sys/class/net"));
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("canbus-query.toml");
        std::fs::write(
            &path,
            r#"
[discovery]
interfaces = ["can0", "can1"]

[output]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.discovery.interfaces, vec!["can0", "can1"]);
        assert_eq!(config.discovery.interface_prefix, "can");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("canbus-query.toml");
        std::fs::write(&path, "[output]\nformat = \"xml\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
