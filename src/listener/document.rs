//! Listener document writer

use anyhow::Context;
use serde::Serialize;

use crate::listener::CompiledListener;
use crate::Result;

/// Top-level engine configuration: `listeners: [...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerDocument {
    pub listeners: Vec<CompiledListener>,
}

impl ListenerDocument {
    pub fn new(listeners: Vec<CompiledListener>) -> Self {
        Self { listeners }
    }

    pub fn single(listener: CompiledListener) -> Self {
        Self::new(vec![listener])
    }

    /// Canonical block-style YAML; identical listeners give identical bytes
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize listener document")
    }
}
