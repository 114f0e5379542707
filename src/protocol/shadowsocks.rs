//! Shadowsocks with optional Shadow-TLS or KCP sub-transport

use tracing::debug;

use crate::descriptor::{uri, ClientDescriptors, ClientProxy, EncodeContext, FieldValue};
use crate::error::{DeployError, DeployResult};
use crate::generate::{resolve_kcp, resolve_shadow_tls, shadowsocks_password, Capabilities};
use crate::listener::{
    base_listener, CompiledListener, Credentials, HandshakeBlock, KcpTunBlock, ProtocolExtensions,
    ShadowTlsBlock, ShadowTlsUserEntry, ShadowsocksBlock,
};
use crate::params::validate::validate_port;
use crate::params::{
    DeploymentRequest, KcpConfig, ListenerParams, ProtocolKind, ShadowTlsConfig,
    ShadowsocksParams, SubTransport, SubTransportRequest,
};
use crate::protocol::{
    expect_listener, params_mismatch, request_mismatch, Compiler, Encoder, Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::Shadowsocks;

#[derive(Debug, Clone, Copy, Default)]
pub struct Shadowsocks;

impl Protocol for Shadowsocks {
    const KIND: ProtocolKind = KIND;
}

impl Generator for Shadowsocks {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::Shadowsocks(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        let port = validate_port(KIND, request.port)?;
        let password =
            shadowsocks_password(request.cipher, request.password.as_deref(), caps.entropy)?;
        let sub_transport = match &request.sub_transport {
            SubTransportRequest::None => SubTransport::None,
            SubTransportRequest::ShadowTls(shadow_tls) => {
                SubTransport::ShadowTls(resolve_shadow_tls(shadow_tls)?)
            }
            SubTransportRequest::Kcp(kcp) => SubTransport::Kcp(resolve_kcp(kcp)),
        };
        debug!("Shadowsocks {} over {}", request.cipher, sub_transport.tag());

        Ok(ListenerParams::Shadowsocks(ShadowsocksParams {
            port,
            cipher: request.cipher,
            password,
            sub_transport,
        }))
    }
}

fn shadow_tls_block(config: &ShadowTlsConfig) -> ShadowTlsBlock {
    let (password, users) = match config {
        ShadowTlsConfig::V1 { .. } => (None, None),
        ShadowTlsConfig::V2 { password, .. } => (Some(password.clone()), None),
        ShadowTlsConfig::V3 { users, .. } => (
            None,
            Some(
                users
                    .iter()
                    .map(|u| ShadowTlsUserEntry {
                        name: u.name.clone(),
                        password: u.password.clone(),
                    })
                    .collect(),
            ),
        ),
    };

    ShadowTlsBlock {
        enable: true,
        version: config.version(),
        handshake: HandshakeBlock {
            dest: config.handshake_dest().to_string(),
        },
        password,
        users,
    }
}

fn kcp_tun_block(config: &KcpConfig) -> KcpTunBlock {
    KcpTunBlock {
        enable: true,
        key: config.key.clone(),
        crypt: config.crypt.as_str().to_string(),
        mode: config.mode.as_str().to_string(),
        tunables: config.tunables.clone(),
    }
}

impl Compiler for Shadowsocks {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::Shadowsocks(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        let (shadow_tls, kcp_tun) = match &params.sub_transport {
            SubTransport::None => (None, None),
            SubTransport::ShadowTls(config) => (Some(shadow_tls_block(config)), None),
            SubTransport::Kcp(config) => (None, Some(kcp_tun_block(config))),
        };

        Ok(base_listener(
            KIND,
            params.port,
            Credentials::Cipher {
                cipher: params.cipher.as_str().to_string(),
                password: params.password.clone(),
            },
            ProtocolExtensions::Shadowsocks(ShadowsocksBlock {
                udp: true,
                shadow_tls,
                kcp_tun,
            }),
        ))
    }
}

/// Host part of a `host:port` handshake destination
fn handshake_host(dest: &str) -> &str {
    dest.rsplit_once(':').map(|(host, _)| host).unwrap_or(dest)
}

/// Client plugin password: the shared v2 password or the first v3 user's
fn shadow_tls_client_password(block: &ShadowTlsBlock) -> Option<&str> {
    block.password.as_deref().or_else(|| {
        block
            .users
            .as_ref()
            .and_then(|users| users.first())
            .map(|u| u.password.as_str())
    })
}

impl Encoder for Shadowsocks {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        let ListenerParams::Shadowsocks(params) = params else {
            return Err(params_mismatch(KIND, params));
        };
        expect_listener(KIND, listener)?;
        let Credentials::Cipher { cipher, password } = &listener.credentials else {
            return Err(DeployError::encoding(
                KIND,
                "cipher",
                "listener has no cipher credentials",
            ));
        };
        let ProtocolExtensions::Shadowsocks(block) = &listener.extensions else {
            return Err(DeployError::encoding(
                KIND,
                "extensions",
                "listener has no shadowsocks settings",
            ));
        };

        let tag = match (&params.sub_transport, &block.shadow_tls, &block.kcp_tun) {
            (SubTransport::None, None, None)
            | (SubTransport::ShadowTls(_), Some(_), None)
            | (SubTransport::Kcp(_), None, Some(_)) => params.sub_transport.tag(),
            _ => {
                return Err(DeployError::encoding(
                    KIND,
                    "sub-transport",
                    "sub-transport does not match the compiled listener",
                ))
            }
        };

        let ip = &ctx.public_ip;
        let name = format!("{}|{}", ip, tag);
        let mut proxy = ClientProxy::new()
            .field("name", &name)
            .field("type", "ss")
            .field("server", ip)
            .field("port", listener.port)
            .field("cipher", cipher)
            .field("password", password)
            .field("udp", block.udp);

        if let Some(shadow_tls) = &block.shadow_tls {
            let mut opts = vec![(
                "host".to_string(),
                FieldValue::from(handshake_host(&shadow_tls.handshake.dest)),
            )];
            if let Some(password) = shadow_tls_client_password(shadow_tls) {
                opts.push(("password".to_string(), FieldValue::from(password)));
            }
            opts.push(("version".to_string(), FieldValue::from(shadow_tls.version)));
            proxy = proxy
                .field("plugin", "shadow-tls")
                .field("plugin-opts", FieldValue::Map(opts));
        } else if let Some(kcp) = &block.kcp_tun {
            proxy = proxy.field("plugin", "kcptun").field(
                "plugin-opts",
                FieldValue::map([
                    ("mode", kcp.mode.as_str()),
                    ("key", kcp.key.as_str()),
                    ("crypt", kcp.crypt.as_str()),
                ]),
            );
        }

        let link = format!(
            "ss://{}@{}#{}",
            uri::ss_userinfo(cipher, password),
            uri::authority(ip, listener.port),
            name
        );

        ClientDescriptors::from_proxy(KIND, &proxy, Some(link))
    }
}
