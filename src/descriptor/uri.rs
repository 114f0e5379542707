//! Share-link helpers

use std::net::Ipv6Addr;

use base64::{engine::general_purpose, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 3986 component encoding: everything except unreserved characters
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a URI component
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// `host:port`, with IPv6 literals in brackets
pub fn authority(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// SIP002 userinfo: unpadded URL-safe base64 of `cipher:password`
pub fn ss_userinfo(cipher: &str, password: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(format!("{}:{}", cipher, password))
}

/// `1` when certificate verification must be skipped
pub fn insecure_flag(skip_verify: bool) -> &'static str {
    if skip_verify {
        "1"
    } else {
        "0"
    }
}

/// `k=v&k=v` query string; values are used as given
pub fn query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("p@ss"), "p%40ss");
        assert_eq!(encode_component("example.com|TUIC-V5"), "example.com%7CTUIC-V5");
        assert_eq!(encode_component("a b/c:d"), "a%20b%2Fc%3Ad");
        assert_eq!(encode_component("Az09-._~"), "Az09-._~");
        assert_eq!(encode_component("密码"), "%E5%AF%86%E7%A0%81");
    }

    #[test]
    fn test_authority() {
        assert_eq!(authority("1.2.3.4", 443), "1.2.3.4:443");
        assert_eq!(authority("example.com", 8443), "example.com:8443");
        assert_eq!(authority("2001:db8::1", 8388), "[2001:db8::1]:8388");
    }

    #[test]
    fn test_ss_userinfo() {
        assert_eq!(ss_userinfo("aes-256-gcm", "secret"), "YWVzLTI1Ni1nY206c2VjcmV0");
        assert!(!ss_userinfo("aes-128-gcm", "x").contains('='));
    }

    #[test]
    fn test_query() {
        assert_eq!(
            query(&[("sni", "example.com"), ("insecure", "0")]),
            "sni=example.com&insecure=0"
        );
        assert_eq!(insecure_flag(true), "1");
        assert_eq!(insecure_flag(false), "0");
    }
}
