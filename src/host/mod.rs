//! Host Collaborators
//!
//! Public IP discovery, free port selection and document writing. Used by the
//! command line front end only; the compiler core never touches the network or
//! the filesystem.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rand::Rng;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::listener::ListenerDocument;
use crate::Result;

/// Resolve the server's public IP: an explicit value wins, otherwise the
/// configured endpoints are tried in order
pub async fn lookup_public_ip(config: &HostConfig) -> Result<String> {
    if let Some(ip) = &config.public_ip {
        let ip = ip
            .trim()
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid public IP: {}", ip))?;
        return Ok(ip.to_string());
    }

    let client = reqwest::Client::builder()
        .timeout(config.lookup_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    for endpoint in &config.ip_endpoints {
        debug!("Querying public IP from {}", endpoint);
        let response = match client.get(endpoint).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("{} answered with {}", endpoint, response.status());
                continue;
            }
            Err(e) => {
                warn!("Public IP lookup via {} failed: {}", endpoint, e);
                continue;
            }
        };

        match response.text().await {
            Ok(body) => match body.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    info!("Detected public IP {}", ip);
                    return Ok(ip.to_string());
                }
                Err(_) => warn!("{} did not return an IP address", endpoint),
            },
            Err(e) => warn!("Failed to read response from {}: {}", endpoint, e),
        }
    }

    bail!(
        "Could not determine the public IP from {} endpoint(s); pass --public-ip",
        config.ip_endpoints.len()
    )
}

/// Whether both TCP and UDP can bind `0.0.0.0:port`
pub async fn port_is_free(port: u16) -> bool {
    let tcp = TcpListener::bind(("0.0.0.0", port)).await;
    let udp = UdpSocket::bind(("0.0.0.0", port)).await;
    tcp.is_ok() && udp.is_ok()
}

/// Pick a random port in the configured range that is free for TCP and UDP
pub async fn random_free_port(config: &HostConfig) -> Result<u16> {
    let (start, end) = (config.port_range_start, config.port_range_end);
    if start == 0 || start > end {
        bail!("Invalid port range {}-{}", start, end);
    }

    for attempt in 1..=config.port_attempts {
        let port = rand::thread_rng().gen_range(start..=end);
        if port_is_free(port).await {
            debug!("Selected free port {} after {} attempt(s)", port, attempt);
            return Ok(port);
        }
        debug!("Port {} is in use", port);
    }

    bail!(
        "No free port found in {}-{} after {} attempts",
        start,
        end,
        config.port_attempts
    )
}

/// Create `dir` if needed and write the canonical YAML document into it
pub async fn write_document(
    dir: &Path,
    file_name: &str,
    document: &ListenerDocument,
) -> Result<PathBuf> {
    let yaml = document.to_yaml()?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write listener document: {}", path.display()))?;

    info!("Listener document written to {}", path.display());
    Ok(path)
}
