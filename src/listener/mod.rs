//! Listener Config Compiler
//!
//! Canonical server-side listener representation and the single YAML writer
//! for the engine configuration document.

pub mod document;
pub mod types;

pub use document::ListenerDocument;
pub use types::*;

use crate::protocol::constants::{BIND_ADDRESS, CERTIFICATE_PATH, PRIVATE_KEY_PATH};
use crate::params::ProtocolKind;

/// Listener skeleton shared by every protocol compiler
pub fn base_listener(
    kind: ProtocolKind,
    port: u16,
    credentials: Credentials,
    extensions: ProtocolExtensions,
) -> CompiledListener {
    CompiledListener {
        name: kind.listener_name().to_string(),
        listener_type: kind.listener_type().to_string(),
        port,
        listen: BIND_ADDRESS.to_string(),
        credentials,
        extensions,
    }
}

/// `./server.crt` / `./server.key`
pub fn certificate_files() -> CertificateFiles {
    CertificateFiles {
        certificate: CERTIFICATE_PATH.to_string(),
        private_key: PRIVATE_KEY_PATH.to_string(),
    }
}
