//! Deployment Requests
//!
//! Unresolved user intent as gathered at the boundary (CLI flags, prompts).
//! `None` and empty strings mean "generate a default".

use crate::params::types::{
    CertSource, Cipher, CongestionController, KcpCrypt, KcpMode, MieruTransport, ProtocolKind,
};

/// Domain plus certificate choice as supplied by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsRequest {
    pub domain: String,
    pub cert: CertSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrojanModeRequest {
    Tls(TlsRequest),
    Reality { fake_domain: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrojanRequest {
    pub port: u16,
    pub password: Option<String>,
    pub mode: TrojanModeRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyTlsRequest {
    pub port: u16,
    pub password: Option<String>,
    pub tls: TlsRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObfsRequest {
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2Request {
    pub port: u16,
    pub tls: TlsRequest,
    pub username: Option<String>,
    pub password: Option<String>,
    pub up_mbps: Option<u32>,
    pub down_mbps: Option<u32>,
    pub obfs: Option<ObfsRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuicRequest {
    pub port: u16,
    pub tls: TlsRequest,
    pub username: Option<String>,
    pub password: Option<String>,
    pub congestion_controller: CongestionController,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MieruRequest {
    pub port: u16,
    pub transport: MieruTransport,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One Shadow-TLS v3 user; missing fields get `user{n}` / the default password
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShadowTlsUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowTlsRequest {
    pub version: u8,
    pub handshake_dest: Option<String>,
    /// Shared password, v2 only
    pub password: Option<String>,
    /// Number of v3 users to create when fewer are supplied
    pub user_count: Option<usize>,
    pub users: Vec<ShadowTlsUserRequest>,
}

impl ShadowTlsRequest {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            handshake_dest: None,
            password: None,
            user_count: None,
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KcpRequest {
    pub mode: KcpMode,
    pub crypt: KcpCrypt,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubTransportRequest {
    #[default]
    None,
    ShadowTls(ShadowTlsRequest),
    Kcp(KcpRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowsocksRequest {
    pub port: u16,
    pub cipher: Cipher,
    pub password: Option<String>,
    pub sub_transport: SubTransportRequest,
}

/// User intent for one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentRequest {
    Trojan(TrojanRequest),
    AnyTls(AnyTlsRequest),
    Hysteria2(Hysteria2Request),
    Tuic(TuicRequest),
    Mieru(MieruRequest),
    Shadowsocks(ShadowsocksRequest),
}

impl DeploymentRequest {
    pub fn kind(&self) -> ProtocolKind {
        match self {
            DeploymentRequest::Trojan(_) => ProtocolKind::Trojan,
            DeploymentRequest::AnyTls(_) => ProtocolKind::AnyTls,
            DeploymentRequest::Hysteria2(_) => ProtocolKind::Hysteria2,
            DeploymentRequest::Tuic(_) => ProtocolKind::TuicV5,
            DeploymentRequest::Mieru(_) => ProtocolKind::Mieru,
            DeploymentRequest::Shadowsocks(_) => ProtocolKind::Shadowsocks,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            DeploymentRequest::Trojan(r) => r.port,
            DeploymentRequest::AnyTls(r) => r.port,
            DeploymentRequest::Hysteria2(r) => r.port,
            DeploymentRequest::Tuic(r) => r.port,
            DeploymentRequest::Mieru(r) => r.port,
            DeploymentRequest::Shadowsocks(r) => r.port,
        }
    }
}
