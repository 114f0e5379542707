//! Randomness Capability

use rand::RngCore;
use uuid::Uuid;

/// Source of random identifiers and bytes
pub trait Entropy: Send + Sync {
    /// RFC 4122 style random identifier
    fn random_uuid(&self) -> String;

    /// `len` cryptographically random bytes
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

/// Operating system backed entropy
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn random_uuid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }
}
