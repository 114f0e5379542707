//! Trojan over TLS or Reality

use tracing::debug;

use crate::descriptor::{uri, ClientDescriptors, ClientProxy, EncodeContext, FieldValue};
use crate::error::{DeployError, DeployResult};
use crate::generate::{generate_short_id, password_or_uuid, Capabilities};
use crate::listener::{
    base_listener, certificate_files, CompiledListener, Credentials, ProtocolExtensions,
    RealityBlock, UserEntry,
};
use crate::params::validate::{validate_domain, validate_port, validate_tls};
use crate::params::{
    DeploymentRequest, ListenerParams, ProtocolKind, RealityParams, TrojanMode, TrojanModeRequest,
    TrojanParams,
};
use crate::protocol::constants::{
    CLIENT_FINGERPRINT, REALITY_DEFAULT_FAKE_DOMAIN, REALITY_DEST_PORT, TROJAN_USERNAME,
};
use crate::protocol::{
    expect_listener, listener_user, non_blank, params_mismatch, request_mismatch, Compiler,
    Encoder, Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::Trojan;

/// Trojan generator, compiler and encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Trojan;

impl Protocol for Trojan {
    const KIND: ProtocolKind = KIND;
}

impl Generator for Trojan {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::Trojan(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        let port = validate_port(KIND, request.port)?;
        let mode = match &request.mode {
            TrojanModeRequest::Tls(tls) => TrojanMode::Tls(validate_tls(KIND, tls)?),
            TrojanModeRequest::Reality { fake_domain } => {
                let fake_domain = match non_blank(fake_domain.as_deref()) {
                    Some(domain) => validate_domain(KIND, "fake-domain", domain)?,
                    None => REALITY_DEFAULT_FAKE_DOMAIN.to_string(),
                };
                let keypair = caps.keygen.generate_keypair()?;
                let short_id = generate_short_id(caps.entropy)?;
                debug!("Reality camouflage domain {}, short id {}", fake_domain, short_id);

                TrojanMode::Reality(RealityParams {
                    fake_domain,
                    private_key: keypair.private_key,
                    public_key: keypair.public_key,
                    short_id,
                })
            }
        };
        let password = password_or_uuid(request.password.as_deref(), caps.entropy);

        Ok(ListenerParams::Trojan(TrojanParams {
            port,
            password,
            mode,
        }))
    }
}

impl Compiler for Trojan {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::Trojan(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        let credentials = Credentials::UserList {
            users: vec![UserEntry {
                username: TROJAN_USERNAME.to_string(),
                password: params.password.clone(),
            }],
        };
        let extensions = match &params.mode {
            TrojanMode::Tls(_) => ProtocolExtensions::Tls(certificate_files()),
            TrojanMode::Reality(reality) => ProtocolExtensions::Reality {
                reality_config: RealityBlock {
                    dest: format!("{}:{}", reality.fake_domain, REALITY_DEST_PORT),
                    private_key: reality.private_key.clone(),
                    short_id: vec![reality.short_id.to_string()],
                    server_names: vec![reality.fake_domain.clone()],
                },
            },
        };

        Ok(base_listener(KIND, params.port, credentials, extensions))
    }
}

impl Encoder for Trojan {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        let ListenerParams::Trojan(params) = params else {
            return Err(params_mismatch(KIND, params));
        };
        expect_listener(KIND, listener)?;
        let (_, password) = listener_user(KIND, listener)?;
        let port = listener.port;

        let (proxy, uri) = match (&params.mode, &listener.extensions) {
            (TrojanMode::Reality(reality), ProtocolExtensions::Reality { reality_config }) => {
                let sni = reality_config.server_names.first().ok_or_else(|| {
                    DeployError::encoding(KIND, "server-names", "reality-config has no server name")
                })?;
                let short_id = reality_config.short_id.first().ok_or_else(|| {
                    DeployError::encoding(KIND, "short-id", "reality-config has no short id")
                })?;
                let host = &ctx.public_ip;
                let tag = format!("Trojan|Reality|{}", sni);

                let proxy = ClientProxy::new()
                    .field("name", &tag)
                    .field("type", KIND.listener_type())
                    .field("server", host)
                    .field("port", port)
                    .field("password", &password)
                    .field("udp", true)
                    .field("sni", sni)
                    .field(
                        "reality-opts",
                        FieldValue::map([
                            ("public-key", reality.public_key.as_str()),
                            ("short-id", short_id.as_str()),
                        ]),
                    )
                    .field("client-fingerprint", CLIENT_FINGERPRINT);

                let query = uri::query(&[
                    ("security", "reality"),
                    ("sni", sni.as_str()),
                    ("fp", CLIENT_FINGERPRINT),
                    ("pbk", reality.public_key.as_str()),
                    ("sid", short_id.as_str()),
                    ("type", "tcp"),
                    ("headerType", "none"),
                ]);
                let uri = format!(
                    "trojan://{}@{}?{}#{}",
                    password,
                    uri::authority(host, port),
                    query,
                    tag
                );
                (proxy, uri)
            }
            (TrojanMode::Tls(tls), ProtocolExtensions::Tls(_)) => {
                let skip_verify = tls.cert.skip_verify();
                let domain = &tls.domain;
                let tag = format!("Trojan|TLS|{}", domain);

                let proxy = ClientProxy::new()
                    .field("name", &tag)
                    .field("type", KIND.listener_type())
                    .field("server", domain)
                    .field("port", port)
                    .field("password", &password)
                    .field("udp", true)
                    .field("sni", domain)
                    .field("skip-cert-verify", skip_verify)
                    .field("client-fingerprint", CLIENT_FINGERPRINT);

                let query = uri::query(&[
                    ("security", "tls"),
                    ("sni", domain.as_str()),
                    ("fp", CLIENT_FINGERPRINT),
                    ("type", "tcp"),
                    ("headerType", "none"),
                ]);
                let uri = format!("trojan://{}@{}:{}?{}#{}", password, domain, port, query, tag);
                (proxy, uri)
            }
            _ => {
                return Err(DeployError::encoding(
                    KIND,
                    "mode",
                    "security mode does not match the compiled listener",
                ))
            }
        };

        ClientDescriptors::from_proxy(KIND, &proxy, Some(uri))
    }
}
