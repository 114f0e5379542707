//! Compiled Listener Types
//!
//! The canonical server-side listener. Field order in these structs is the key
//! order of the written YAML document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::params::KcpTunables;

/// One entry under `listeners:` in the engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledListener {
    pub name: String,
    #[serde(rename = "type")]
    pub listener_type: String,
    pub port: u16,
    pub listen: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(flatten)]
    pub extensions: ProtocolExtensions,
}

/// `{username, password}` entry of a user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

/// Credential layouts accepted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    /// `users: [{username, password}]`
    UserList { users: Vec<UserEntry> },
    /// `users: {name: password}`
    UserMap { users: BTreeMap<String, String> },
    /// `cipher` + `password`
    Cipher { cipher: String, password: String },
}

impl Credentials {
    /// Single-user map
    pub fn single_user(username: impl Into<String>, password: impl Into<String>) -> Self {
        let mut users = BTreeMap::new();
        users.insert(username.into(), password.into());
        Credentials::UserMap { users }
    }

    /// First `(username, password)` pair, whatever the layout
    pub fn first_user(&self) -> Option<(&str, &str)> {
        match self {
            Credentials::UserList { users } => users
                .first()
                .map(|u| (u.username.as_str(), u.password.as_str())),
            Credentials::UserMap { users } => users
                .iter()
                .next()
                .map(|(name, password)| (name.as_str(), password.as_str())),
            Credentials::Cipher { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CertificateFiles {
    pub certificate: String,
    pub private_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RealityBlock {
    pub dest: String,
    pub private_key: String,
    pub short_id: Vec<String>,
    pub server_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria2Block {
    pub up: u32,
    pub down: u32,
    pub ignore_client_bandwidth: bool,
    pub masquerade: String,
    pub alpn: Vec<String>,
    pub certificate: String,
    pub private_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TuicBlock {
    pub certificate: String,
    pub private_key: String,
    pub congestion_controller: String,
    pub max_idle_time: u32,
    pub authentication_timeout: u32,
    pub alpn: Vec<String>,
    pub max_udp_relay_packet_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeBlock {
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowTlsUserEntry {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowTlsBlock {
    pub enable: bool,
    pub version: u8,
    pub handshake: HandshakeBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<ShadowTlsUserEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KcpTunBlock {
    pub enable: bool,
    pub key: String,
    pub crypt: String,
    pub mode: String,
    #[serde(flatten)]
    pub tunables: KcpTunables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShadowsocksBlock {
    pub udp: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_tls: Option<ShadowTlsBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcp_tun: Option<KcpTunBlock>,
}

/// Protocol specific listener keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProtocolExtensions {
    Tls(CertificateFiles),
    Reality {
        #[serde(rename = "reality-config")]
        reality_config: RealityBlock,
    },
    Hysteria2(Hysteria2Block),
    Tuic(TuicBlock),
    Mieru { transport: String },
    Shadowsocks(ShadowsocksBlock),
}

impl ProtocolExtensions {
    /// Certificate file paths, for listeners that terminate TLS
    pub fn certificate_files(&self) -> Option<(&str, &str)> {
        match self {
            ProtocolExtensions::Tls(files) => Some((&files.certificate, &files.private_key)),
            ProtocolExtensions::Hysteria2(block) => Some((&block.certificate, &block.private_key)),
            ProtocolExtensions::Tuic(block) => Some((&block.certificate, &block.private_key)),
            _ => None,
        }
    }
}
