//! Client Descriptor Encoder
//!
//! Turns one `ClientProxy` field list into the three client-facing formats:
//! structured block YAML, a compact flow record and (for most protocols) a
//! share URI.

pub mod render;
pub mod types;
pub mod uri;

use serde::Serialize;

pub use render::{flow_scalar, render_compact, render_structured};
pub use types::{ClientProxy, FieldValue};

use crate::error::DeployResult;
use crate::params::ProtocolKind;

/// Host facts the encoders need but the listener does not carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeContext {
    pub public_ip: String,
}

impl EncodeContext {
    pub fn new(public_ip: impl Into<String>) -> Self {
        Self {
            public_ip: public_ip.into(),
        }
    }
}

/// The three client descriptor encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDescriptors {
    pub name: String,
    pub structured: String,
    pub compact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl ClientDescriptors {
    /// Render structured and compact forms from `proxy`
    pub fn from_proxy(
        kind: ProtocolKind,
        proxy: &ClientProxy,
        uri: Option<String>,
    ) -> DeployResult<Self> {
        Ok(Self {
            name: proxy.name().unwrap_or_default().to_string(),
            structured: render_structured(kind, proxy)?,
            compact: render_compact(proxy),
            uri,
        })
    }
}
