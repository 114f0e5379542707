//! Configuration Types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub host: HostConfig,
    pub keygen: KeygenConfig,
    pub logging: LoggingConfig,
}

/// Where the listener document is written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

/// Public IP discovery and port selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Skips the lookup when set
    pub public_ip: Option<String>,
    pub ip_endpoints: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub lookup_timeout: Duration,
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub port_attempts: u32,
}

/// External Reality key generator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeygenConfig {
    pub binary: String,
    pub args: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/etc/mihomo"),
            file_name: "config.yaml".to_string(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            public_ip: None,
            ip_endpoints: vec![
                "https://api.ipify.org".to_string(),
                "https://ifconfig.me/ip".to_string(),
                "https://icanhazip.com".to_string(),
            ],
            lookup_timeout: Duration::from_secs(5),
            port_range_start: 20000,
            port_range_end: 60000,
            port_attempts: 100,
        }
    }
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            binary: "mihomo".to_string(),
            args: vec!["generate".to_string(), "reality-keypair".to_string()],
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl OutputConfig {
    /// Full path of the listener document
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}
