//! Reality keypair and short ID generation
//!
//! Key generation is delegated to the proxy engine's own tooling
//! (`mihomo generate reality-keypair`); this module only runs it and parses the
//! two labelled output lines.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};
use crate::generate::Entropy;
use crate::params::ShortId;
use crate::protocol::constants::REALITY_SHORT_ID_BYTES;

const PRIVATE_KEY_LABEL: &str = "PrivateKey:";
const PUBLIC_KEY_LABEL: &str = "PublicKey:";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// X25519 keypair used by the Reality extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealityKeypair {
    pub private_key: String,
    pub public_key: String,
}

/// External Reality key generator
pub trait RealityKeygen: Send + Sync {
    fn generate_keypair(&self) -> DeployResult<RealityKeypair>;
}

/// Parse `PrivateKey: ...` / `PublicKey: ...` lines
pub fn parse_keypair_output(output: &str) -> DeployResult<RealityKeypair> {
    if output.trim().is_empty() {
        return Err(DeployError::keypair("key generator produced no output"));
    }

    let mut private_key = None;
    let mut public_key = None;

    for line in output.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix(PRIVATE_KEY_LABEL) {
            private_key = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix(PUBLIC_KEY_LABEL) {
            public_key = Some(value.trim().to_string());
        }
    }

    match (private_key, public_key) {
        (Some(private_key), Some(public_key))
            if !private_key.is_empty() && !public_key.is_empty() =>
        {
            Ok(RealityKeypair {
                private_key,
                public_key,
            })
        }
        _ => Err(DeployError::keypair(format!(
            "could not find both {} and {} in key generator output",
            PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL
        ))),
    }
}

/// Random 16 character lowercase hex short ID
pub fn generate_short_id(entropy: &dyn Entropy) -> DeployResult<ShortId> {
    let bytes = entropy.random_bytes(REALITY_SHORT_ID_BYTES);
    ShortId::parse(&hex::encode(bytes))
}

/// Runs the engine binary to create a Reality keypair
#[derive(Debug, Clone)]
pub struct MihomoKeygen {
    binary: String,
    args: Vec<String>,
    timeout: Duration,
}

impl MihomoKeygen {
    pub fn new(binary: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            args,
            timeout,
        }
    }

    fn run(&self) -> DeployResult<String> {
        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DeployError::keypair(format!("failed to run {}: {}", self.binary, e)))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DeployError::keypair(format!(
                        "{} did not finish within {}",
                        self.binary,
                        humantime::format_duration(self.timeout)
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(DeployError::keypair(format!(
                        "failed to wait for {}: {}",
                        self.binary, e
                    )))
                }
            }
        };

        if !status.success() {
            return Err(DeployError::keypair(format!(
                "{} exited with {}",
                self.binary, status
            )));
        }

        let mut stdout = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_string(&mut stdout)
                .map_err(|e| DeployError::keypair(format!("unreadable output: {}", e)))?;
        }
        Ok(stdout)
    }
}

impl Default for MihomoKeygen {
    fn default() -> Self {
        Self::new(
            "mihomo",
            vec!["generate".to_string(), "reality-keypair".to_string()],
            Duration::from_secs(10),
        )
    }
}

impl RealityKeygen for MihomoKeygen {
    fn generate_keypair(&self) -> DeployResult<RealityKeypair> {
        debug!("Running {} {}", self.binary, self.args.join(" "));
        let output = self.run()?;
        let keypair = parse_keypair_output(&output)?;
        info!("Generated Reality keypair (public key {})", keypair.public_key);
        Ok(keypair)
    }
}
