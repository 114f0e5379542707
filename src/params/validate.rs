//! Input Validation
//!
//! Syntactic checks applied by the generators before a `ListenerParams` is built.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DeployError, DeployResult};
use crate::params::request::TlsRequest;
use crate::params::types::{CertSource, ProtocolKind, TlsEndpoint};

fn domain_regex() -> &'static Regex {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    DOMAIN.get_or_init(|| {
        Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$")
            .expect("domain pattern is valid")
    })
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Validate a fully qualified domain name
pub fn validate_domain(
    protocol: ProtocolKind,
    field: &'static str,
    domain: &str,
) -> DeployResult<String> {
    let domain = domain.trim();
    if domain.len() > 253 || !domain_regex().is_match(domain) {
        return Err(DeployError::validation(
            protocol,
            field,
            domain,
            "not a valid domain name",
        ));
    }
    Ok(domain.to_ascii_lowercase())
}

/// Validate an ACME contact address
pub fn validate_email(protocol: ProtocolKind, email: &str) -> DeployResult<String> {
    let email = email.trim();
    if !email_regex().is_match(email) {
        return Err(DeployError::validation(
            protocol,
            "email",
            email,
            "not a valid email address",
        ));
    }
    Ok(email.to_string())
}

/// Port 0 cannot be listened on
pub fn validate_port(protocol: ProtocolKind, port: u16) -> DeployResult<u16> {
    if port == 0 {
        return Err(DeployError::validation(
            protocol,
            "port",
            port.to_string(),
            "port must be between 1 and 65535",
        ));
    }
    Ok(port)
}

/// `host:port` destination used for TLS handshakes
pub fn validate_handshake_dest(protocol: ProtocolKind, dest: &str) -> DeployResult<String> {
    let dest = dest.trim();
    let invalid = |reason: &str| DeployError::validation(protocol, "handshake-dest", dest, reason);

    let (host, port) = dest
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid("port must be between 1 and 65535")),
        Ok(_) => Ok(dest.to_string()),
    }
}

/// Bandwidth hints must be positive
pub fn validate_bandwidth(
    protocol: ProtocolKind,
    field: &'static str,
    mbps: u32,
) -> DeployResult<u32> {
    if mbps == 0 {
        return Err(DeployError::validation(
            protocol,
            field,
            mbps.to_string(),
            "bandwidth must be a positive number of Mbps",
        ));
    }
    Ok(mbps)
}

/// Validate the domain and, for ACME, the contact email
pub fn validate_tls(protocol: ProtocolKind, request: &TlsRequest) -> DeployResult<TlsEndpoint> {
    let domain = validate_domain(protocol, "domain", &request.domain)?;
    let cert = match &request.cert {
        CertSource::Acme { email } => CertSource::Acme {
            email: validate_email(protocol, email)?,
        },
        CertSource::SelfSigned => CertSource::SelfSigned,
    };
    Ok(TlsEndpoint { domain, cert })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_validation() {
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "proxy.example.com").is_ok());
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "a-b.example.co.uk").is_ok());
        assert_eq!(
            validate_domain(ProtocolKind::AnyTls, "domain", " Example.COM ").unwrap(),
            "example.com"
        );

        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "").is_err());
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "localhost").is_err());
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "-bad.example.com").is_err());
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "exa mple.com").is_err());
        assert!(validate_domain(ProtocolKind::AnyTls, "domain", "1.2.3.4").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email(ProtocolKind::TuicV5, "admin@example.com").is_ok());
        assert!(validate_email(ProtocolKind::TuicV5, "first.last+tag@mail.example.org").is_ok());

        assert!(validate_email(ProtocolKind::TuicV5, "admin").is_err());
        assert!(validate_email(ProtocolKind::TuicV5, "admin@").is_err());
        assert!(validate_email(ProtocolKind::TuicV5, "@example.com").is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(validate_port(ProtocolKind::Mieru, 0).is_err());
        assert_eq!(validate_port(ProtocolKind::Mieru, 1).unwrap(), 1);
        assert_eq!(validate_port(ProtocolKind::Mieru, 65535).unwrap(), 65535);
    }

    #[test]
    fn test_handshake_dest_validation() {
        assert!(validate_handshake_dest(ProtocolKind::Shadowsocks, "www.bing.com:443").is_ok());
        assert!(validate_handshake_dest(ProtocolKind::Shadowsocks, "www.bing.com").is_err());
        assert!(validate_handshake_dest(ProtocolKind::Shadowsocks, ":443").is_err());
        assert!(validate_handshake_dest(ProtocolKind::Shadowsocks, "www.bing.com:0").is_err());
        assert!(validate_handshake_dest(ProtocolKind::Shadowsocks, "www.bing.com:https").is_err());
    }

    #[test]
    fn test_acme_requires_valid_email() {
        let request = TlsRequest {
            domain: "example.com".to_string(),
            cert: CertSource::Acme {
                email: "not-an-email".to_string(),
            },
        };

        match validate_tls(ProtocolKind::Hysteria2, &request) {
            Err(DeployError::Validation { field, .. }) => assert_eq!(field, "email"),
            other => panic!("Expected email validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_signed_needs_only_domain() {
        let request = TlsRequest {
            domain: "example.com".to_string(),
            cert: CertSource::SelfSigned,
        };

        let endpoint = validate_tls(ProtocolKind::Hysteria2, &request).unwrap();
        assert_eq!(endpoint.domain, "example.com");
        assert!(endpoint.cert.skip_verify());
    }
}
