//! Deterministic capabilities shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use proxyforge::generate::{Capabilities, Entropy, RealityKeygen, RealityKeypair};
use proxyforge::params::{CertSource, TlsRequest};
use proxyforge::{DeployError, DeployResult, EncodeContext};

pub const PRIVATE_KEY: &str = "cKl0Yh8fQh2iLRbf1LxkK4vB-4rH7N0yq7e3S6Z6s2E";
pub const PUBLIC_KEY: &str = "2Zs0n4dJ0GJ6vX-3yQ7l0mKpXGfW1qQeD9c8nX7uVx0";
pub const PUBLIC_IP: &str = "1.2.3.4";

/// Counter backed entropy; every call yields a new but reproducible value
#[derive(Debug, Default)]
pub struct SeqEntropy {
    counter: AtomicU64,
}

impl SeqEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Entropy for SeqEntropy {
    fn random_uuid(&self) -> String {
        format!("00000000-0000-4000-8000-{:012}", self.next())
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let seed = self.next();
        (0..len).map(|i| (seed as usize + i) as u8).collect()
    }
}

/// Returns a fixed keypair
#[derive(Debug, Default)]
pub struct StubKeygen;

impl RealityKeygen for StubKeygen {
    fn generate_keypair(&self) -> DeployResult<RealityKeypair> {
        Ok(RealityKeypair {
            private_key: PRIVATE_KEY.to_string(),
            public_key: PUBLIC_KEY.to_string(),
        })
    }
}

/// Always fails, like a missing engine binary
#[derive(Debug, Default)]
pub struct FailingKeygen;

impl RealityKeygen for FailingKeygen {
    fn generate_keypair(&self) -> DeployResult<RealityKeypair> {
        Err(DeployError::keypair("mihomo: command not found"))
    }
}

pub fn caps<'a>(entropy: &'a SeqEntropy, keygen: &'a dyn RealityKeygen) -> Capabilities<'a> {
    Capabilities::new(entropy, keygen)
}

pub fn ctx() -> EncodeContext {
    EncodeContext::new(PUBLIC_IP)
}

pub fn acme(domain: &str) -> TlsRequest {
    TlsRequest {
        domain: domain.to_string(),
        cert: CertSource::Acme {
            email: "admin@example.com".to_string(),
        },
    }
}

pub fn self_signed(domain: &str) -> TlsRequest {
    TlsRequest {
        domain: domain.to_string(),
        cert: CertSource::SelfSigned,
    }
}
