//! Hysteria2

use crate::descriptor::{uri, ClientDescriptors, ClientProxy, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::{password_or_uuid, Capabilities};
use crate::listener::{
    base_listener, certificate_files, CompiledListener, Credentials, Hysteria2Block,
    ProtocolExtensions,
};
use crate::params::validate::{validate_bandwidth, validate_port, validate_tls};
use crate::params::{DeploymentRequest, Hysteria2Params, ListenerParams, Obfs, ProtocolKind};
use crate::protocol::constants::{ALPN_H3, HYSTERIA2_DEFAULT_MBPS};
use crate::protocol::{
    expect_listener, listener_user, params_mismatch, request_mismatch, Compiler, Encoder,
    Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::Hysteria2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Hysteria2;

impl Protocol for Hysteria2 {
    const KIND: ProtocolKind = KIND;
}

impl Generator for Hysteria2 {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::Hysteria2(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        let port = validate_port(KIND, request.port)?;
        let tls = validate_tls(KIND, &request.tls)?;
        let up_mbps = validate_bandwidth(
            KIND,
            "up",
            request.up_mbps.unwrap_or(HYSTERIA2_DEFAULT_MBPS),
        )?;
        let down_mbps = validate_bandwidth(
            KIND,
            "down",
            request.down_mbps.unwrap_or(HYSTERIA2_DEFAULT_MBPS),
        )?;

        let obfs = request.obfs.as_ref().map(|obfs| Obfs {
            password: password_or_uuid(obfs.password.as_deref(), caps.entropy),
        });

        Ok(ListenerParams::Hysteria2(Hysteria2Params {
            port,
            tls,
            username: password_or_uuid(request.username.as_deref(), caps.entropy),
            password: password_or_uuid(request.password.as_deref(), caps.entropy),
            up_mbps,
            down_mbps,
            obfs,
        }))
    }
}

impl Compiler for Hysteria2 {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::Hysteria2(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        let files = certificate_files();
        let block = Hysteria2Block {
            up: params.up_mbps,
            down: params.down_mbps,
            ignore_client_bandwidth: false,
            masquerade: String::new(),
            alpn: vec![ALPN_H3.to_string()],
            certificate: files.certificate,
            private_key: files.private_key,
            obfs: params.obfs.as_ref().map(|o| o.obfs_type().to_string()),
            obfs_password: params.obfs.as_ref().map(|o| o.password.clone()),
        };

        Ok(base_listener(
            KIND,
            params.port,
            Credentials::single_user(params.username.clone(), params.password.clone()),
            ProtocolExtensions::Hysteria2(block),
        ))
    }
}

impl Encoder for Hysteria2 {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        _ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        let ListenerParams::Hysteria2(params) = params else {
            return Err(params_mismatch(KIND, params));
        };
        expect_listener(KIND, listener)?;
        let ProtocolExtensions::Hysteria2(block) = &listener.extensions else {
            return Err(DeployError::encoding(
                KIND,
                "extensions",
                "listener has no hysteria2 settings",
            ));
        };

        let (_, password) = listener_user(KIND, listener)?;
        let obfs = match (&block.obfs, &block.obfs_password) {
            (Some(kind), Some(password)) => Some((kind.as_str(), password.as_str())),
            (None, None) => None,
            _ => {
                return Err(DeployError::encoding(
                    KIND,
                    "obfs",
                    "obfs and obfs-password must be set together",
                ))
            }
        };

        let domain = &params.tls.domain;
        let port = listener.port;
        let skip_verify = params.tls.cert.skip_verify();
        let name = format!("{}|Hysteria2", domain);

        let mut proxy = ClientProxy::new()
            .field("name", &name)
            .field("type", KIND.listener_type())
            .field("server", domain)
            .field("port", port)
            .field("password", &password)
            .field("skip-cert-verify", skip_verify)
            .field("sni", domain)
            .field("alpn", block.alpn.clone());
        if let Some((obfs_type, obfs_password)) = obfs {
            proxy = proxy
                .field("obfs", obfs_type)
                .field("obfs-password", obfs_password);
        }
        let proxy = proxy
            .field("up", block.up)
            .field("down", block.down)
            .field("udp", true);

        let mut query = vec![
            ("sni", domain.clone()),
            ("insecure", uri::insecure_flag(skip_verify).to_string()),
        ];
        if let Some((obfs_type, obfs_password)) = obfs {
            query.push(("obfs", obfs_type.to_string()));
            query.push(("obfs-password", uri::encode_component(obfs_password)));
        }
        let query = query
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect::<Vec<_>>();

        let link = format!(
            "hysteria2://{}@{}:{}?{}#{}",
            uri::encode_component(&password),
            domain,
            port,
            uri::query(&query),
            uri::encode_component(&name)
        );

        ClientDescriptors::from_proxy(KIND, &proxy, Some(link))
    }
}
