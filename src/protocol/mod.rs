//! Protocol Implementations
//!
//! Each protocol module provides one `Generator`, `Compiler` and `Encoder`.
//! The registry wires them together into the deployment pipeline.

pub mod anytls;
pub mod constants;
pub mod hysteria2;
pub mod mieru;
pub mod registry;
pub mod shadowsocks;
pub mod summary;
pub mod trojan;
pub mod tuic;

pub use constants::*;
pub use registry::{Deployment, ProtocolEntry, Registry};
pub use summary::{DeploymentSummary, FirewallRule, L4Protocol};

use crate::descriptor::{ClientDescriptors, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::Capabilities;
use crate::listener::CompiledListener;
use crate::params::{DeploymentRequest, ListenerParams, ProtocolKind};

/// Fills defaults and validates a request
pub trait Generator: Send + Sync {
    fn resolve(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
    ) -> DeployResult<ListenerParams>;
}

/// Maps resolved parameters to the canonical listener
pub trait Compiler: Send + Sync {
    fn compile(&self, params: &ListenerParams) -> DeployResult<CompiledListener>;
}

/// Produces the client descriptors from a compiled listener
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        listener: &CompiledListener,
        params: &ListenerParams,
        ctx: &EncodeContext,
    ) -> DeployResult<ClientDescriptors>;
}

/// A complete protocol implementation, bound to the kind it handles
pub trait Protocol: Generator + Compiler + Encoder + Clone + 'static {
    const KIND: ProtocolKind;
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn request_mismatch(expected: ProtocolKind, request: &DeploymentRequest) -> DeployError {
    DeployError::validation(
        expected,
        "protocol",
        request.kind().to_string(),
        format!("{} generator cannot resolve this request", expected),
    )
}

pub(crate) fn params_mismatch(expected: ProtocolKind, params: &ListenerParams) -> DeployError {
    DeployError::encoding(
        expected,
        "params",
        format!("got {} parameters", params.kind()),
    )
}

/// The listener must have been compiled for `kind`
pub(crate) fn expect_listener(kind: ProtocolKind, listener: &CompiledListener) -> DeployResult<()> {
    if listener.listener_type != kind.listener_type() {
        return Err(DeployError::encoding(
            kind,
            "type",
            format!(
                "expected a {} listener, got {}",
                kind.listener_type(),
                listener.listener_type
            ),
        ));
    }
    Ok(())
}

/// First user of the listener, as `(username, password)`
pub(crate) fn listener_user(
    kind: ProtocolKind,
    listener: &CompiledListener,
) -> DeployResult<(String, String)> {
    listener
        .credentials
        .first_user()
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .ok_or_else(|| DeployError::encoding(kind, "users", "listener has no users"))
}
