//! Parameter Model
//!
//! Deployment requests as supplied by the user and the resolved listener
//! parameters the compiler works from.

pub mod request;
pub mod types;
pub mod validate;

pub use request::*;
pub use types::*;
