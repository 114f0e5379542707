//! Resolved Listener Parameters
//!
//! Typed, fully resolved deployment intent. A `ListenerParams` is built once per
//! run by a protocol generator and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use crate::error::DeployError;
use crate::protocol::constants::*;

/// Supported proxy protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolKind {
    Trojan,
    AnyTls,
    Hysteria2,
    TuicV5,
    Mieru,
    Shadowsocks,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 6] = [
        ProtocolKind::Trojan,
        ProtocolKind::AnyTls,
        ProtocolKind::Hysteria2,
        ProtocolKind::TuicV5,
        ProtocolKind::Mieru,
        ProtocolKind::Shadowsocks,
    ];

    /// Human readable protocol name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProtocolKind::Trojan => "Trojan",
            ProtocolKind::AnyTls => "AnyTLS",
            ProtocolKind::Hysteria2 => "Hysteria2",
            ProtocolKind::TuicV5 => "TUIC V5",
            ProtocolKind::Mieru => "Mieru",
            ProtocolKind::Shadowsocks => "Shadowsocks",
        }
    }

    /// Listener `type` understood by the proxy engine
    pub fn listener_type(&self) -> &'static str {
        match self {
            ProtocolKind::Trojan => "trojan",
            ProtocolKind::AnyTls => "anytls",
            ProtocolKind::Hysteria2 => "hysteria2",
            ProtocolKind::TuicV5 => "tuic",
            ProtocolKind::Mieru => "mieru",
            ProtocolKind::Shadowsocks => "shadowsocks",
        }
    }

    /// Fixed listener name
    pub fn listener_name(&self) -> &'static str {
        match self {
            ProtocolKind::Trojan => TROJAN_LISTENER_NAME,
            ProtocolKind::AnyTls => ANYTLS_LISTENER_NAME,
            ProtocolKind::Hysteria2 => HYSTERIA2_LISTENER_NAME,
            ProtocolKind::TuicV5 => TUIC_LISTENER_NAME,
            ProtocolKind::Mieru => MIERU_LISTENER_NAME,
            ProtocolKind::Shadowsocks => SHADOWSOCKS_LISTENER_NAME,
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where the TLS certificate comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertSource {
    Acme { email: String },
    SelfSigned,
}

impl CertSource {
    /// Clients must skip certificate verification for self-signed certificates
    pub fn skip_verify(&self) -> bool {
        matches!(self, CertSource::SelfSigned)
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            CertSource::Acme { email } => Some(email),
            CertSource::SelfSigned => None,
        }
    }
}

/// Domain plus certificate origin for TLS-bearing listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsEndpoint {
    pub domain: String,
    pub cert: CertSource,
}

/// Reality camouflage parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealityParams {
    pub fake_domain: String,
    pub private_key: String,
    pub public_key: String,
    pub short_id: ShortId,
}

/// 16 lowercase hex characters identifying a Reality client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortId(String);

impl ShortId {
    /// Parse and validate an existing short ID
    pub fn parse(value: &str) -> Result<Self, DeployError> {
        let valid = value.len() == REALITY_SHORT_ID_LEN
            && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(DeployError::validation(
                ProtocolKind::Trojan,
                "short-id",
                value,
                format!("expected {} lowercase hex characters", REALITY_SHORT_ID_LEN),
            ));
        }
        Ok(ShortId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trojan security layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrojanMode {
    Tls(TlsEndpoint),
    Reality(RealityParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrojanParams {
    pub port: u16,
    pub password: String,
    pub mode: TrojanMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyTlsParams {
    pub port: u16,
    pub password: String,
    pub tls: TlsEndpoint,
}

/// Salamander QUIC obfuscation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obfs {
    pub password: String,
}

impl Obfs {
    pub fn obfs_type(&self) -> &'static str {
        HYSTERIA2_OBFS_SALAMANDER
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2Params {
    pub port: u16,
    pub tls: TlsEndpoint,
    pub username: String,
    pub password: String,
    pub up_mbps: u32,
    pub down_mbps: u32,
    pub obfs: Option<Obfs>,
}

/// TUIC congestion control algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CongestionController {
    #[default]
    Bbr,
    Cubic,
    NewReno,
}

impl CongestionController {
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionController::Bbr => "bbr",
            CongestionController::Cubic => "cubic",
            CongestionController::NewReno => "new_reno",
        }
    }
}

impl FromStr for CongestionController {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bbr" => Ok(CongestionController::Bbr),
            "cubic" => Ok(CongestionController::Cubic),
            "new_reno" | "newreno" | "new-reno" => Ok(CongestionController::NewReno),
            _ => Err(DeployError::validation(
                ProtocolKind::TuicV5,
                "congestion-controller",
                s,
                "expected one of bbr, cubic, new_reno",
            )),
        }
    }
}

impl fmt::Display for CongestionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuicParams {
    pub port: u16,
    pub tls: TlsEndpoint,
    pub username: String,
    pub password: String,
    pub congestion_controller: CongestionController,
}

/// Mieru transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MieruTransport {
    #[default]
    Tcp,
    Udp,
}

impl MieruTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            MieruTransport::Tcp => "TCP",
            MieruTransport::Udp => "UDP",
        }
    }
}

impl FromStr for MieruTransport {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TCP" => Ok(MieruTransport::Tcp),
            "UDP" => Ok(MieruTransport::Udp),
            _ => Err(DeployError::validation(
                ProtocolKind::Mieru,
                "transport",
                s,
                "expected TCP or UDP",
            )),
        }
    }
}

impl fmt::Display for MieruTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MieruParams {
    pub port: u16,
    pub transport: MieruTransport,
    pub username: String,
    pub password: String,
}

/// Shadowsocks AEAD ciphers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Blake3Aes128Gcm,
    Blake3Aes256Gcm,
    Blake3Chacha20Poly1305,
    Aes128Gcm,
    Aes256Gcm,
    Chacha20IetfPoly1305,
    Xchacha20IetfPoly1305,
}

impl Cipher {
    pub const ALL: [Cipher; 7] = [
        Cipher::Blake3Aes128Gcm,
        Cipher::Blake3Aes256Gcm,
        Cipher::Blake3Chacha20Poly1305,
        Cipher::Aes128Gcm,
        Cipher::Aes256Gcm,
        Cipher::Chacha20IetfPoly1305,
        Cipher::Xchacha20IetfPoly1305,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cipher::Blake3Aes128Gcm => "2022-blake3-aes-128-gcm",
            Cipher::Blake3Aes256Gcm => "2022-blake3-aes-256-gcm",
            Cipher::Blake3Chacha20Poly1305 => "2022-blake3-chacha20-poly1305",
            Cipher::Aes128Gcm => "aes-128-gcm",
            Cipher::Aes256Gcm => "aes-256-gcm",
            Cipher::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
            Cipher::Xchacha20IetfPoly1305 => "xchacha20-ietf-poly1305",
        }
    }

    /// Shadowsocks 2022 ciphers take a raw base64 key instead of a password
    pub fn is_2022(&self) -> bool {
        matches!(
            self,
            Cipher::Blake3Aes128Gcm | Cipher::Blake3Aes256Gcm | Cipher::Blake3Chacha20Poly1305
        )
    }

    /// Decoded key length required by 2022 ciphers
    pub fn key_len(&self) -> Option<usize> {
        match self {
            Cipher::Blake3Aes128Gcm => Some(16),
            Cipher::Blake3Aes256Gcm | Cipher::Blake3Chacha20Poly1305 => Some(32),
            _ => None,
        }
    }
}

impl FromStr for Cipher {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Cipher::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                DeployError::validation(
                    ProtocolKind::Shadowsocks,
                    "cipher",
                    s,
                    "unsupported cipher",
                )
            })
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shadow-TLS user (v3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowTlsUser {
    pub name: String,
    pub password: String,
}

/// Shadow-TLS wrapper, one variant per protocol version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowTlsConfig {
    V1 {
        handshake_dest: String,
    },
    V2 {
        handshake_dest: String,
        password: String,
    },
    V3 {
        handshake_dest: String,
        users: Vec<ShadowTlsUser>,
    },
}

impl ShadowTlsConfig {
    pub fn version(&self) -> u8 {
        match self {
            ShadowTlsConfig::V1 { .. } => 1,
            ShadowTlsConfig::V2 { .. } => 2,
            ShadowTlsConfig::V3 { .. } => 3,
        }
    }

    pub fn handshake_dest(&self) -> &str {
        match self {
            ShadowTlsConfig::V1 { handshake_dest }
            | ShadowTlsConfig::V2 { handshake_dest, .. }
            | ShadowTlsConfig::V3 { handshake_dest, .. } => handshake_dest,
        }
    }
}

/// KCP transmission presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KcpMode {
    Fast3,
    Fast2,
    #[default]
    Fast,
    Normal,
}

impl KcpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KcpMode::Fast3 => "fast3",
            KcpMode::Fast2 => "fast2",
            KcpMode::Fast => "fast",
            KcpMode::Normal => "normal",
        }
    }
}

impl FromStr for KcpMode {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast3" => Ok(KcpMode::Fast3),
            "fast2" => Ok(KcpMode::Fast2),
            "fast" => Ok(KcpMode::Fast),
            "normal" => Ok(KcpMode::Normal),
            _ => Err(DeployError::validation(
                ProtocolKind::Shadowsocks,
                "kcp-mode",
                s,
                "expected one of fast3, fast2, fast, normal",
            )),
        }
    }
}

impl fmt::Display for KcpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// KCP block encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KcpCrypt {
    #[default]
    Aes,
    Aes128,
    Aes192,
    Salsa20,
    None,
}

impl KcpCrypt {
    pub fn as_str(&self) -> &'static str {
        match self {
            KcpCrypt::Aes => "aes",
            KcpCrypt::Aes128 => "aes-128",
            KcpCrypt::Aes192 => "aes-192",
            KcpCrypt::Salsa20 => "salsa20",
            KcpCrypt::None => "none",
        }
    }
}

impl FromStr for KcpCrypt {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes" => Ok(KcpCrypt::Aes),
            "aes-128" => Ok(KcpCrypt::Aes128),
            "aes-192" => Ok(KcpCrypt::Aes192),
            "salsa20" => Ok(KcpCrypt::Salsa20),
            "none" => Ok(KcpCrypt::None),
            _ => Err(DeployError::validation(
                ProtocolKind::Shadowsocks,
                "kcp-crypt",
                s,
                "expected one of aes, aes-128, aes-192, salsa20, none",
            )),
        }
    }
}

impl fmt::Display for KcpCrypt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed kcptun tunables
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KcpTunables {
    pub conn: u32,
    pub autoexpire: u32,
    pub scavengettl: u32,
    pub mtu: u32,
    pub sndwnd: u32,
    pub rcvwnd: u32,
    pub datashard: u32,
    pub parityshard: u32,
    pub dscp: u32,
    pub nocomp: bool,
    pub acknodelay: bool,
    pub nodelay: u32,
    pub interval: u32,
    pub resend: u32,
    pub sockbuf: u32,
    pub smuxver: u32,
    pub smuxbuf: u32,
    pub streambuf: u32,
    pub keepalive: u32,
}

impl KcpTunables {
    /// Names of every tunable, in document order
    pub const NAMES: [&'static str; 19] = [
        "conn",
        "autoexpire",
        "scavengettl",
        "mtu",
        "sndwnd",
        "rcvwnd",
        "datashard",
        "parityshard",
        "dscp",
        "nocomp",
        "acknodelay",
        "nodelay",
        "interval",
        "resend",
        "sockbuf",
        "smuxver",
        "smuxbuf",
        "streambuf",
        "keepalive",
    ];
}

impl Default for KcpTunables {
    fn default() -> Self {
        Self {
            conn: 1,
            autoexpire: 0,
            scavengettl: 600,
            mtu: 1350,
            sndwnd: 128,
            rcvwnd: 512,
            datashard: 10,
            parityshard: 3,
            dscp: 0,
            nocomp: false,
            acknodelay: false,
            nodelay: 0,
            interval: 50,
            resend: 0,
            sockbuf: 4194304,
            smuxver: 1,
            smuxbuf: 4194304,
            streambuf: 2097152,
            keepalive: 10,
        }
    }
}

/// kcptun wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KcpConfig {
    pub mode: KcpMode,
    pub crypt: KcpCrypt,
    pub key: String,
    pub tunables: KcpTunables,
}

/// Optional transport layered beneath Shadowsocks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubTransport {
    #[default]
    None,
    ShadowTls(ShadowTlsConfig),
    Kcp(KcpConfig),
}

impl SubTransport {
    /// Short tag used in client names and URI fragments
    pub fn tag(&self) -> &'static str {
        match self {
            SubTransport::None => "SS",
            SubTransport::ShadowTls(_) => "SS-ShadowTLS",
            SubTransport::Kcp(_) => "SS-KCP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowsocksParams {
    pub port: u16,
    pub cipher: Cipher,
    pub password: String,
    pub sub_transport: SubTransport,
}

/// Fully resolved parameters for one listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerParams {
    Trojan(TrojanParams),
    AnyTls(AnyTlsParams),
    Hysteria2(Hysteria2Params),
    Tuic(TuicParams),
    Mieru(MieruParams),
    Shadowsocks(ShadowsocksParams),
}

impl ListenerParams {
    pub fn kind(&self) -> ProtocolKind {
        match self {
            ListenerParams::Trojan(_) => ProtocolKind::Trojan,
            ListenerParams::AnyTls(_) => ProtocolKind::AnyTls,
            ListenerParams::Hysteria2(_) => ProtocolKind::Hysteria2,
            ListenerParams::Tuic(_) => ProtocolKind::TuicV5,
            ListenerParams::Mieru(_) => ProtocolKind::Mieru,
            ListenerParams::Shadowsocks(_) => ProtocolKind::Shadowsocks,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            ListenerParams::Trojan(p) => p.port,
            ListenerParams::AnyTls(p) => p.port,
            ListenerParams::Hysteria2(p) => p.port,
            ListenerParams::Tuic(p) => p.port,
            ListenerParams::Mieru(p) => p.port,
            ListenerParams::Shadowsocks(p) => p.port,
        }
    }

    /// TLS endpoint, for protocols that terminate TLS with a real certificate
    pub fn tls(&self) -> Option<&TlsEndpoint> {
        match self {
            ListenerParams::Trojan(TrojanParams {
                mode: TrojanMode::Tls(tls),
                ..
            }) => Some(tls),
            ListenerParams::AnyTls(p) => Some(&p.tls),
            ListenerParams::Hysteria2(p) => Some(&p.tls),
            ListenerParams::Tuic(p) => Some(&p.tls),
            _ => None,
        }
    }
}
