//! Credential & Secondary-Transport Generators
//!
//! Fill in defaults for everything the user left unset. Randomness and key
//! generation come from injected capabilities so the whole pipeline can run
//! deterministically in tests.

pub mod entropy;
pub mod reality;
pub mod secrets;
pub mod transport;

pub use entropy::{Entropy, OsEntropy};
pub use reality::{
    generate_short_id, parse_keypair_output, MihomoKeygen, RealityKeygen, RealityKeypair,
};
pub use secrets::{password_or_uuid, random_bytes_base64, shadowsocks_password, validate_2022_key};
pub use transport::{resolve_kcp, resolve_shadow_tls};

/// External capabilities the generators draw on
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub entropy: &'a dyn Entropy,
    pub keygen: &'a dyn RealityKeygen,
}

impl<'a> Capabilities<'a> {
    pub fn new(entropy: &'a dyn Entropy, keygen: &'a dyn RealityKeygen) -> Self {
        Self { entropy, keygen }
    }
}
