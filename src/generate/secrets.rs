//! Password, UUID and Shadowsocks 2022 key generation

use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use crate::error::{DeployError, DeployResult};
use crate::generate::Entropy;
use crate::params::{Cipher, ProtocolKind};

/// Return the supplied value, or a random UUID when it is absent or blank
pub fn password_or_uuid(supplied: Option<&str>, entropy: &dyn Entropy) -> String {
    match supplied.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None => entropy.random_uuid(),
    }
}

/// Standard base64 of `len` random bytes
pub fn random_bytes_base64(len: usize, entropy: &dyn Entropy) -> String {
    general_purpose::STANDARD.encode(entropy.random_bytes(len))
}

/// Resolve the Shadowsocks password for `cipher`.
///
/// 2022 ciphers need a base64 key that decodes to exactly `cipher.key_len()`
/// bytes; a fresh key is generated when none is supplied. Legacy ciphers take any
/// non-empty password and fall back to a random UUID.
pub fn shadowsocks_password(
    cipher: Cipher,
    supplied: Option<&str>,
    entropy: &dyn Entropy,
) -> DeployResult<String> {
    let Some(key_len) = cipher.key_len() else {
        return Ok(password_or_uuid(supplied, entropy));
    };

    match supplied.map(str::trim).filter(|value| !value.is_empty()) {
        None => {
            debug!("Generating {}-byte key for {}", key_len, cipher);
            Ok(random_bytes_base64(key_len, entropy))
        }
        Some(key) => {
            validate_2022_key(cipher, key)?;
            Ok(key.to_string())
        }
    }
}

/// Check that `key` is base64 and decodes to the key length of `cipher`
pub fn validate_2022_key(cipher: Cipher, key: &str) -> DeployResult<()> {
    let Some(key_len) = cipher.key_len() else {
        return Ok(());
    };

    let decoded = general_purpose::STANDARD.decode(key).map_err(|e| {
        DeployError::validation(
            ProtocolKind::Shadowsocks,
            "password",
            key,
            format!("{} needs a base64 key: {}", cipher, e),
        )
    })?;

    if decoded.len() != key_len {
        return Err(DeployError::validation(
            ProtocolKind::Shadowsocks,
            "password",
            key,
            format!(
                "{} needs a {}-byte key, got {} bytes",
                cipher,
                key_len,
                decoded.len()
            ),
        ));
    }
    Ok(())
}
