//! Protocol Registry
//!
//! One `(Generator, Compiler, Encoder)` triad per protocol, and the
//! resolve → compile → encode pipeline over them.

use serde::Serialize;
use tracing::{debug, info};

use crate::descriptor::{ClientDescriptors, EncodeContext};
use crate::error::{DeployError, DeployResult};
use crate::generate::Capabilities;
use crate::listener::{CompiledListener, ListenerDocument};
use crate::params::{DeploymentRequest, ListenerParams, ProtocolKind};
use crate::protocol::anytls::AnyTls;
use crate::protocol::hysteria2::Hysteria2;
use crate::protocol::mieru::Mieru;
use crate::protocol::shadowsocks::Shadowsocks;
use crate::protocol::trojan::Trojan;
use crate::protocol::tuic::Tuic;
use crate::protocol::{Compiler, Encoder, Generator, Protocol};

/// Registered protocol implementation
pub struct ProtocolEntry {
    pub kind: ProtocolKind,
    pub generator: Box<dyn Generator>,
    pub compiler: Box<dyn Compiler>,
    pub encoder: Box<dyn Encoder>,
}

impl ProtocolEntry {
    /// Entry whose three stages are all provided by `imp`, keyed by `T::KIND`
    pub fn of<T: Protocol>(imp: T) -> Self {
        Self {
            kind: T::KIND,
            generator: Box::new(imp.clone()),
            compiler: Box::new(imp.clone()),
            encoder: Box::new(imp),
        }
    }
}

impl std::fmt::Debug for ProtocolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEntry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Result of one successful deployment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    #[serde(skip)]
    pub params: ListenerParams,
    pub listener: CompiledListener,
    pub descriptors: ClientDescriptors,
}

impl Deployment {
    pub fn kind(&self) -> ProtocolKind {
        self.params.kind()
    }

    /// Engine configuration holding this deployment's listener
    pub fn document(&self) -> ListenerDocument {
        ListenerDocument::single(self.listener.clone())
    }
}

/// Lookup table of protocol implementations
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<ProtocolEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six supported protocols
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ProtocolEntry::of(Trojan));
        registry.register(ProtocolEntry::of(AnyTls));
        registry.register(ProtocolEntry::of(Hysteria2));
        registry.register(ProtocolEntry::of(Tuic));
        registry.register(ProtocolEntry::of(Mieru));
        registry.register(ProtocolEntry::of(Shadowsocks));
        registry
    }

    /// Add or replace the entry for `entry.kind`
    pub fn register(&mut self, entry: ProtocolEntry) {
        self.entries.retain(|e| e.kind != entry.kind);
        self.entries.push(entry);
    }

    pub fn get(&self, kind: ProtocolKind) -> Option<&ProtocolEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn kinds(&self) -> Vec<ProtocolKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    fn entry(&self, kind: ProtocolKind) -> DeployResult<&ProtocolEntry> {
        self.get(kind).ok_or_else(|| {
            DeployError::validation(
                kind,
                "protocol",
                kind.to_string(),
                "protocol is not registered",
            )
        })
    }

    /// Compile already resolved parameters and encode the client descriptors
    pub fn compile_and_encode(
        &self,
        params: ListenerParams,
        ctx: &EncodeContext,
    ) -> DeployResult<Deployment> {
        let entry = self.entry(params.kind())?;

        let listener = entry.compiler.compile(&params)?;
        debug!("Compiled listener {} on port {}", listener.name, listener.port);

        let descriptors = entry.encoder.encode(&listener, &params, ctx)?;

        Ok(Deployment {
            params,
            listener,
            descriptors,
        })
    }

    /// Run the full pipeline for one request; nothing is returned on failure
    pub fn deploy(
        &self,
        request: &DeploymentRequest,
        caps: &Capabilities<'_>,
        ctx: &EncodeContext,
    ) -> DeployResult<Deployment> {
        let kind = request.kind();
        info!("Resolving {} deployment on port {}", kind, request.port());

        let params = self.entry(kind)?.generator.resolve(request, caps)?;
        let deployment = self.compile_and_encode(params, ctx)?;

        info!("{} deployment ready: {}", kind, deployment.descriptors.name);
        Ok(deployment)
    }
}
