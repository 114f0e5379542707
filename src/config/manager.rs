//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::debug!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        Self::load_from_vars(|name| std::env::var(name).ok())
    }

    /// Apply `PROXYFORGE_*` overrides read through `var` on top of the defaults
    pub fn load_from_vars<F>(var: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = var("PROXYFORGE_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }

        if let Some(ip) = var("PROXYFORGE_PUBLIC_IP") {
            config.host.public_ip = Some(ip);
        }

        if let Some(binary) = var("PROXYFORGE_KEYGEN_BINARY") {
            config.keygen.binary = binary;
        }

        if let Some(timeout) = var("PROXYFORGE_KEYGEN_TIMEOUT") {
            config.keygen.timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid PROXYFORGE_KEYGEN_TIMEOUT: {}", timeout))?;
        }

        if let Some(log_level) = var("PROXYFORGE_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_output_config()
            .with_context(|| "Output configuration validation failed")?;

        self.validate_host_config()
            .with_context(|| "Host configuration validation failed")?;

        self.validate_keygen_config()
            .with_context(|| "Keygen configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_output_config(&self) -> Result<()> {
        if self.output.dir.as_os_str().is_empty() {
            bail!("output.dir must not be empty");
        }

        let name = self.output.file_name.trim();
        if name.is_empty() {
            bail!("output.file_name must not be empty");
        }

        if name.contains('/') || name.contains('\\') {
            bail!("output.file_name must be a plain file name, got {}", name);
        }

        Ok(())
    }

    fn validate_host_config(&self) -> Result<()> {
        if let Some(ip) = &self.host.public_ip {
            ip.parse::<IpAddr>()
                .with_context(|| format!("host.public_ip is not an IP address: {}", ip))?;
        }

        if self.host.public_ip.is_none() && self.host.ip_endpoints.is_empty() {
            bail!("host.ip_endpoints must not be empty when host.public_ip is unset");
        }

        for endpoint in &self.host.ip_endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                bail!("host.ip_endpoints entry must be an http(s) URL: {}", endpoint);
            }
        }

        if self.host.lookup_timeout.is_zero() {
            bail!("host.lookup_timeout must be greater than 0");
        }

        if self.host.port_range_start == 0 {
            bail!("host.port_range_start must be greater than 0");
        }

        if self.host.port_range_start > self.host.port_range_end {
            bail!(
                "host.port_range_start ({}) must not exceed host.port_range_end ({})",
                self.host.port_range_start,
                self.host.port_range_end
            );
        }

        if self.host.port_attempts == 0 {
            bail!("host.port_attempts must be greater than 0");
        }

        Ok(())
    }

    fn validate_keygen_config(&self) -> Result<()> {
        if self.keygen.binary.trim().is_empty() {
            bail!("keygen.binary must not be empty");
        }

        if self.keygen.timeout.is_zero() {
            bail!("keygen.timeout must be greater than 0");
        }

        if self.keygen.timeout.as_secs() > 300 {
            bail!("keygen.timeout cannot exceed 5 minutes");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        output_dir: Option<&Path>,
        public_ip: Option<&str>,
        log_level: Option<&str>,
    ) {
        if let Some(dir) = output_dir {
            self.output.dir = dir.to_path_buf();
            tracing::info!("CLI override: output directory set to {}", dir.display());
        }

        if let Some(ip) = public_ip {
            self.host.public_ip = Some(ip.to_string());
            tracing::info!("CLI override: public IP set to {}", ip);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }
    }
}
