//! Deployment Errors
//!
//! Structured failures raised by the generator, compiler and encoder stages.
//! Every variant carries enough context to reproduce the failing input.

use thiserror::Error;

use crate::params::ProtocolKind;

/// Errors raised by the configuration compiler core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployError {
    /// Malformed user input (domain, email, port, key length, enum value...)
    #[error("{protocol}: invalid {field} {value:?}: {reason}")]
    Validation {
        protocol: ProtocolKind,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The external Reality key generator failed or produced unparsable output
    #[error("reality keypair generation failed: {reason}")]
    KeypairGeneration { reason: String },

    /// A compiled listener does not carry what the encoder for its protocol needs
    #[error("{protocol}: cannot encode {field}: {reason}")]
    Encoding {
        protocol: ProtocolKind,
        field: &'static str,
        reason: String,
    },
}

impl DeployError {
    /// Build a validation error
    pub fn validation(
        protocol: ProtocolKind,
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DeployError::Validation {
            protocol,
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Build a keypair generation error
    pub fn keypair(reason: impl Into<String>) -> Self {
        DeployError::KeypairGeneration {
            reason: reason.into(),
        }
    }

    /// Build an encoding error
    pub fn encoding(
        protocol: ProtocolKind,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        DeployError::Encoding {
            protocol,
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller may re-prompt and try again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeployError::Validation { .. })
    }
}

/// Result type of the compiler core
pub type DeployResult<T> = std::result::Result<T, DeployError>;
