//! Mieru
//!
//! Clients are configured by hand, so no share link is produced.

use crate::descriptor::{ClientDescriptors, ClientProxy, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::{password_or_uuid, Capabilities};
use crate::listener::{base_listener, CompiledListener, Credentials, ProtocolExtensions};
use crate::params::validate::validate_port;
use crate::params::{DeploymentRequest, ListenerParams, MieruParams, ProtocolKind};
use crate::protocol::constants::MIERU_DEFAULT_USERNAME;
use crate::protocol::{
    expect_listener, listener_user, non_blank, params_mismatch, request_mismatch, Compiler,
    Encoder, Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::Mieru;

#[derive(Debug, Clone, Copy, Default)]
pub struct Mieru;

impl Protocol for Mieru {
    const KIND: ProtocolKind = KIND;
}

impl Generator for Mieru {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::Mieru(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        let username = non_blank(request.username.as_deref())
            .unwrap_or(MIERU_DEFAULT_USERNAME)
            .to_string();

        Ok(ListenerParams::Mieru(MieruParams {
            port: validate_port(KIND, request.port)?,
            transport: request.transport,
            username,
            password: password_or_uuid(request.password.as_deref(), caps.entropy),
        }))
    }
}

impl Compiler for Mieru {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::Mieru(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        Ok(base_listener(
            KIND,
            params.port,
            Credentials::single_user(params.username.clone(), params.password.clone()),
            ProtocolExtensions::Mieru {
                transport: params.transport.as_str().to_string(),
            },
        ))
    }
}

impl Encoder for Mieru {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        if !matches!(params, ListenerParams::Mieru(_)) {
            return Err(params_mismatch(KIND, params));
        }
        expect_listener(KIND, listener)?;
        let ProtocolExtensions::Mieru { transport } = &listener.extensions else {
            return Err(DeployError::encoding(
                KIND,
                "transport",
                "listener has no mieru transport",
            ));
        };

        let (username, password) = listener_user(KIND, listener)?;
        let name = format!("Mieru|{}|{}", transport, ctx.public_ip);

        let proxy = ClientProxy::new()
            .field("name", &name)
            .field("type", KIND.listener_type())
            .field("server", &ctx.public_ip)
            .field("port", listener.port)
            .field("transport", transport)
            .field("username", &username)
            .field("password", &password)
            .field("udp", true);

        ClientDescriptors::from_proxy(KIND, &proxy, None)
    }
}
