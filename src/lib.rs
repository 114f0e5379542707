//! proxyforge Library
//!
//! Compiles proxy deployment parameters into a mihomo listener configuration
//! and the matching client descriptors (structured YAML, compact flow record
//! and share URI) for Trojan, AnyTLS, Hysteria2, TUIC v5, Mieru and
//! Shadowsocks.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod generate;
pub mod host;
pub mod listener;
pub mod params;
pub mod protocol;

pub use config::Config;
pub use descriptor::{ClientDescriptors, EncodeContext};
pub use error::{DeployError, DeployResult};
pub use generate::{Capabilities, Entropy, MihomoKeygen, OsEntropy, RealityKeygen};
pub use listener::{CompiledListener, ListenerDocument};
pub use params::{DeploymentRequest, ListenerParams, ProtocolKind};
pub use protocol::{Deployment, DeploymentSummary, Registry};

/// Common error type for the application layer
pub type Result<T> = anyhow::Result<T>;
