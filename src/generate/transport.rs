//! Shadow-TLS and KCP sub-transport resolution

use tracing::warn;

use crate::error::{DeployError, DeployResult};
use crate::params::validate::validate_handshake_dest;
use crate::params::{
    KcpConfig, KcpRequest, KcpTunables, ProtocolKind, ShadowTlsConfig, ShadowTlsRequest,
    ShadowTlsUser,
};
use crate::protocol::constants::{
    KCP_DEFAULT_KEY, SHADOW_TLS_DEFAULT_HANDSHAKE_DEST, SHADOW_TLS_DEFAULT_PASSWORD,
    SHADOW_TLS_DEFAULT_USER_COUNT, SHADOW_TLS_MAX_USERS,
};
use crate::protocol::non_blank;

/// Resolve a Shadow-TLS request into a versioned config
pub fn resolve_shadow_tls(request: &ShadowTlsRequest) -> DeployResult<ShadowTlsConfig> {
    let handshake_dest = match non_blank(request.handshake_dest.as_deref()) {
        Some(dest) => validate_handshake_dest(ProtocolKind::Shadowsocks, dest)?,
        None => SHADOW_TLS_DEFAULT_HANDSHAKE_DEST.to_string(),
    };

    match request.version {
        1 => Ok(ShadowTlsConfig::V1 { handshake_dest }),
        2 => {
            let password = match non_blank(request.password.as_deref()) {
                Some(password) => password.to_string(),
                None => {
                    warn!("Shadow-TLS v2 password not set, using the built-in default");
                    SHADOW_TLS_DEFAULT_PASSWORD.to_string()
                }
            };
            Ok(ShadowTlsConfig::V2 {
                handshake_dest,
                password,
            })
        }
        3 => {
            let count = request
                .user_count
                .unwrap_or(SHADOW_TLS_DEFAULT_USER_COUNT)
                .max(request.users.len());
            if count == 0 {
                return Err(DeployError::validation(
                    ProtocolKind::Shadowsocks,
                    "shadow-tls-users",
                    "0",
                    "Shadow-TLS v3 needs at least one user",
                ));
            }
            if count > SHADOW_TLS_MAX_USERS {
                return Err(DeployError::validation(
                    ProtocolKind::Shadowsocks,
                    "shadow-tls-users",
                    count.to_string(),
                    format!(
                        "at most {} Shadow-TLS v3 users are supported",
                        SHADOW_TLS_MAX_USERS
                    ),
                ));
            }

            let mut defaulted = 0;
            let users = (0..count)
                .map(|i| {
                    let supplied = request.users.get(i);
                    let name = non_blank(supplied.and_then(|u| u.name.as_deref()))
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("user{}", i + 1));
                    let password = match non_blank(supplied.and_then(|u| u.password.as_deref())) {
                        Some(password) => password.to_string(),
                        None => {
                            defaulted += 1;
                            SHADOW_TLS_DEFAULT_PASSWORD.to_string()
                        }
                    };
                    ShadowTlsUser { name, password }
                })
                .collect::<Vec<_>>();

            if defaulted > 0 {
                warn!(
                    "{} Shadow-TLS v3 user(s) use the built-in default password",
                    defaulted
                );
            }
            Ok(ShadowTlsConfig::V3 {
                handshake_dest,
                users,
            })
        }
        other => Err(DeployError::validation(
            ProtocolKind::Shadowsocks,
            "shadow-tls-version",
            other.to_string(),
            "expected 1, 2 or 3",
        )),
    }
}

/// Resolve a KCP request; the tunables are always the fixed set
pub fn resolve_kcp(request: &KcpRequest) -> KcpConfig {
    let key = match non_blank(request.key.as_deref()) {
        Some(key) => key.to_string(),
        None => {
            warn!("KCP key not set, using the built-in default");
            KCP_DEFAULT_KEY.to_string()
        }
    };

    KcpConfig {
        mode: request.mode,
        crypt: request.crypt,
        key,
        tunables: KcpTunables::default(),
    }
}
