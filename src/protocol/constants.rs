//! Listener and Client Constants

// Listener bind address
pub const BIND_ADDRESS: &str = "0.0.0.0";

// Certificate files, relative to the deployment directory
pub const CERTIFICATE_PATH: &str = "./server.crt";
pub const PRIVATE_KEY_PATH: &str = "./server.key";

// Listener names
pub const TROJAN_LISTENER_NAME: &str = "trojan-in-1";
pub const ANYTLS_LISTENER_NAME: &str = "anytls-in-1";
pub const HYSTERIA2_LISTENER_NAME: &str = "hy2-in";
pub const TUIC_LISTENER_NAME: &str = "tuicv5-in";
pub const MIERU_LISTENER_NAME: &str = "mieru-in-1";
pub const SHADOWSOCKS_LISTENER_NAME: &str = "ss-in";

// Fixed users
pub const TROJAN_USERNAME: &str = "user1";
pub const ANYTLS_USERNAME: &str = "username1";
pub const MIERU_DEFAULT_USERNAME: &str = "user1";

// Reality
pub const REALITY_DEFAULT_FAKE_DOMAIN: &str = "www.microsoft.com";
pub const REALITY_DEST_PORT: u16 = 443;
pub const REALITY_SHORT_ID_BYTES: usize = 8;
pub const REALITY_SHORT_ID_LEN: usize = REALITY_SHORT_ID_BYTES * 2;

// QUIC based protocols
pub const ALPN_H3: &str = "h3";

// Hysteria2
pub const HYSTERIA2_DEFAULT_MBPS: u32 = 1000;
pub const HYSTERIA2_OBFS_SALAMANDER: &str = "salamander";

// TUIC v5
pub const TUIC_MAX_IDLE_TIME: u32 = 15000;
pub const TUIC_AUTHENTICATION_TIMEOUT: u32 = 1000;
pub const TUIC_MAX_UDP_RELAY_PACKET_SIZE: u32 = 1500;
pub const TUIC_UDP_RELAY_MODE: &str = "native";

// Shadow-TLS
pub const SHADOW_TLS_DEFAULT_HANDSHAKE_DEST: &str = "www.bing.com:443";
pub const SHADOW_TLS_DEFAULT_PASSWORD: &str = "password";
pub const SHADOW_TLS_DEFAULT_USER_COUNT: usize = 1;
pub const SHADOW_TLS_MAX_USERS: usize = 256;

// KCP
pub const KCP_DEFAULT_KEY: &str = "it's a secrect";

// Client descriptors
pub const CLIENT_FINGERPRINT: &str = "chrome";
