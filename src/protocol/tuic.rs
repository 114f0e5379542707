//! TUIC v5

use crate::descriptor::{uri, ClientDescriptors, ClientProxy, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::{password_or_uuid, Capabilities};
use crate::listener::{
    base_listener, certificate_files, CompiledListener, Credentials, ProtocolExtensions,
    TuicBlock,
};
use crate::params::validate::{validate_port, validate_tls};
use crate::params::{DeploymentRequest, ListenerParams, ProtocolKind, TuicParams};
use crate::protocol::constants::{
    ALPN_H3, TUIC_AUTHENTICATION_TIMEOUT, TUIC_MAX_IDLE_TIME, TUIC_MAX_UDP_RELAY_PACKET_SIZE,
    TUIC_UDP_RELAY_MODE,
};
use crate::protocol::{
    expect_listener, listener_user, params_mismatch, request_mismatch, Compiler, Encoder,
    Generator, Protocol,
};

const KIND: ProtocolKind = ProtocolKind::TuicV5;

#[derive(Debug, Clone, Copy, Default)]
pub struct Tuic;

impl Protocol for Tuic {
    const KIND: ProtocolKind = KIND;
}

impl Generator for Tuic {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams> {
        let DeploymentRequest::Tuic(request) = request else {
            return Err(request_mismatch(KIND, request));
        };

        Ok(ListenerParams::Tuic(TuicParams {
            port: validate_port(KIND, request.port)?,
            tls: validate_tls(KIND, &request.tls)?,
            username: password_or_uuid(request.username.as_deref(), caps.entropy),
            password: password_or_uuid(request.password.as_deref(), caps.entropy),
            congestion_controller: request.congestion_controller,
        }))
    }
}

impl Compiler for Tuic {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener> {
        let ListenerParams::Tuic(params) = params else {
            return Err(params_mismatch(KIND, params));
        };

        let files = certificate_files();
        let block = TuicBlock {
            certificate: files.certificate,
            private_key: files.private_key,
            congestion_controller: params.congestion_controller.as_str().to_string(),
            max_idle_time: TUIC_MAX_IDLE_TIME,
            authentication_timeout: TUIC_AUTHENTICATION_TIMEOUT,
            alpn: vec![ALPN_H3.to_string()],
            max_udp_relay_packet_size: TUIC_MAX_UDP_RELAY_PACKET_SIZE,
        };

        Ok(base_listener(
            KIND,
            params.port,
            Credentials::single_user(params.username.clone(), params.password.clone()),
            ProtocolExtensions::Tuic(block),
        ))
    }
}

/// `pe(pe(username) ":" pe(password))`, so the separator travels as `%3A`
pub fn tuic_userinfo(username: &str, password: &str) -> String {
    uri::encode_component(&format!(
        "{}:{}",
        uri::encode_component(username),
        uri::encode_component(password)
    ))
}

impl Encoder for Tuic {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        _ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors> {
        let ListenerParams::Tuic(params) = params else {
            return Err(params_mismatch(KIND, params));
        };
        expect_listener(KIND, listener)?;
        let ProtocolExtensions::Tuic(block) = &listener.extensions else {
            return Err(DeployError::encoding(
                KIND,
                "extensions",
                "listener has no tuic settings",
            ));
        };

        let (username, password) = listener_user(KIND, listener)?;
        let domain = &params.tls.domain;
        let port = listener.port;
        let skip_verify = params.tls.cert.skip_verify();
        let name = format!("{}|TUIC-V5", domain);

        let proxy = ClientProxy::new()
            .field("name", &name)
            .field("type", KIND.listener_type())
            .field("server", domain)
            .field("port", port)
            .field("uuid", &username)
            .field("password", &password)
            .field("skip-cert-verify", skip_verify)
            .field("sni", domain)
            .field("alpn", block.alpn.clone())
            .field("congestion-controller", &block.congestion_controller)
            .field("udp-relay-mode", TUIC_UDP_RELAY_MODE)
            .field("udp", true)
            .field("disable-sni", false);

        let query = uri::query(&[
            ("sni", domain.as_str()),
            ("alpn", ALPN_H3),
            ("congestion_control", block.congestion_controller.as_str()),
            ("allow_insecure", uri::insecure_flag(skip_verify)),
        ]);
        let link = format!(
            "tuic://{}@{}:{}?{}#{}",
            tuic_userinfo(&username, &password),
            domain,
            port,
            query,
            uri::encode_component(&name)
        );

        ClientDescriptors::from_proxy(KIND, &proxy, Some(link))
    }
}
