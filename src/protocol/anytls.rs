//! AnyTLS

use crate::descriptor::{uri, ClientDescriptors, ClientProxy, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::{password_or_uuid, Capabilities};
use crate::listener::{
    base_listener, certificate_files, CompiledListener, Credentials, ProtocolExtensions,
};
use crate::params::validate::{validate_port, validate_tls};
use crate::params::{AnyTlsParams, DeploymentRequest, ListenerParams, ProtocolKind};
use crate::protocol::constants::{ANYTLS_USERNAME, CLIENT_FINGERPRINT};
use crate::protocol::{
    expect_listener, listener_user, params_mismatch, request_mismatch, Compiler, Encoder,
    Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::AnyTls;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnyTls;

impl Protocol for AnyTls {
    const KIND: ProtocolKind = KIND;
}

impl Generator for AnyTls {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::AnyTls(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        Ok(ListenerParams::AnyTls(AnyTlsParams {
            port: validate_port(KIND, request.port)?,
            tls: validate_tls(KIND, &request.tls)?,
            password: password_or_uuid(request.password.as_deref(), caps.entropy),
        }))
    }
}

impl Compiler for AnyTls {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::AnyTls(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        Ok(base_listener(
            KIND,
            params.port,
            Credentials::single_user(ANYTLS_USERNAME, params.password.clone()),
            ProtocolExtensions::Tls(certificate_files()),
        ))
    }
}

impl Encoder for AnyTls {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        _ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        let ListenerParams::AnyTls(params) = params else {
            return Err(params_mismatch(KIND, params));
        };
        expect_listener(KIND, listener)?;
        if !matches!(listener.extensions, ProtocolExtensions::Tls(_)) {
            return Err(DeployError::encoding(
                KIND,
                "certificate",
                "listener has no certificate files",
            ));
        }

        let (_, password) = listener_user(KIND, listener)?;
        let domain = &params.tls.domain;
        let port = listener.port;
        let skip_verify = params.tls.cert.skip_verify();
        let name = format!("{}|AnyTLS", domain);

        let proxy = ClientProxy::new()
            .field("name", &name)
            .field("type", KIND.listener_type())
            .field("server", domain)
            .field("port", port)
            .field("password", &password)
            .field("skip-cert-verify", skip_verify)
            .field("sni", domain)
            .field("udp", true)
            .field("tfo", true)
            .field("tls", true)
            .field("client-fingerprint", CLIENT_FINGERPRINT);

        let query = uri::query(&[
            ("peer", domain.as_str()),
            ("insecure", uri::insecure_flag(skip_verify)),
            ("fastopen", "1"),
            ("udp", "1"),
        ]);
        let link = format!("anytls://{}@{}:{}?{}#{}", password, domain, port, query, name);

        ClientDescriptors::from_proxy(KIND, &proxy, Some(link))
    }
}
