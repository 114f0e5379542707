//! Client Descriptor Integration Tests

mod common;

use common::{acme, caps, ctx, self_signed, SeqEntropy, StubKeygen, PUBLIC_KEY};
use proxyforge::params::*;
use proxyforge::protocol::{Compiler, Encoder, Generator};
use proxyforge::{ClientDescriptors, DeployError, EncodeContext, Registry};
use serde_yaml::Value;

fn encode(params: ListenerParams) -> ClientDescriptors {
    Registry::standard()
        .compile_and_encode(params, &ctx())
        .unwrap()
        .descriptors
}

fn structured_field(descriptors: &ClientDescriptors, key: &str) -> Value {
    let parsed: Vec<Value> = serde_yaml::from_str(&descriptors.structured).unwrap();
    parsed[0][key].clone()
}

fn compact_field(descriptors: &ClientDescriptors, key: &str) -> Value {
    let parsed: Vec<Value> = serde_yaml::from_str(&descriptors.compact).unwrap();
    parsed[0][key].clone()
}

/// Value of the URI's insecure query parameter, if it carries one
fn uri_insecure(uri: &str) -> Option<bool> {
    let query = uri.split_once('?')?.1.split('#').next()?;
    query.split('&').find_map(|pair| match pair.split_once('=') {
        Some(("insecure" | "allow_insecure", value)) => Some(value == "1"),
        _ => None,
    })
}

fn endpoint(domain: &str, cert: CertSource) -> TlsEndpoint {
    TlsEndpoint {
        domain: domain.to_string(),
        cert,
    }
}

fn acme_cert() -> CertSource {
    CertSource::Acme {
        email: "admin@example.com".to_string(),
    }
}

#[test]
fn test_tuic_uri_double_encodes_userinfo() {
    let descriptors = encode(ListenerParams::Tuic(TuicParams {
        port: 4433,
        tls: endpoint("example.com", acme_cert()),
        username: "alice".to_string(),
        password: "p@ss".to_string(),
        congestion_controller: CongestionController::Bbr,
    }));

    assert_eq!(
        descriptors.uri.as_deref(),
        Some("tuic://alice%3Ap%2540ss@example.com:4433?sni=example.com&alpn=h3&congestion_control=bbr&allow_insecure=0#example.com%7CTUIC-V5")
    );
    assert_eq!(descriptors.name, "example.com|TUIC-V5");
    assert_eq!(structured_field(&descriptors, "uuid").as_str(), Some("alice"));
    assert_eq!(structured_field(&descriptors, "udp-relay-mode").as_str(), Some("native"));
    assert_eq!(structured_field(&descriptors, "disable-sni").as_bool(), Some(false));
}

#[test]
fn test_shadowsocks_uri() {
    let descriptors = encode(ListenerParams::Shadowsocks(ShadowsocksParams {
        port: 8388,
        cipher: Cipher::Aes256Gcm,
        password: "secret".to_string(),
        sub_transport: SubTransport::None,
    }));

    assert_eq!(
        descriptors.uri.as_deref(),
        Some("ss://YWVzLTI1Ni1nY206c2VjcmV0@1.2.3.4:8388#1.2.3.4|SS")
    );
    assert_eq!(
        descriptors.compact,
        "- {name: \"1.2.3.4|SS\", type: ss, server: 1.2.3.4, port: 8388, cipher: aes-256-gcm, password: secret, udp: true}"
    );
    assert!(structured_field(&descriptors, "plugin").is_null());
}

#[test]
fn test_ipv6_server_is_bracketed_in_uri() {
    let v6 = EncodeContext::new("2001:db8::1");
    let registry = Registry::standard();

    let descriptors = registry
        .compile_and_encode(
            ListenerParams::Shadowsocks(ShadowsocksParams {
                port: 8388,
                cipher: Cipher::Aes256Gcm,
                password: "secret".to_string(),
                sub_transport: SubTransport::None,
            }),
            &v6,
        )
        .unwrap()
        .descriptors;
    assert_eq!(
        descriptors.uri.as_deref(),
        Some("ss://YWVzLTI1Ni1nY206c2VjcmV0@[2001:db8::1]:8388#2001:db8::1|SS")
    );
    assert_eq!(compact_field(&descriptors, "server").as_str(), Some("2001:db8::1"));
    assert_eq!(structured_field(&descriptors, "server").as_str(), Some("2001:db8::1"));

    let entropy = SeqEntropy::new();
    let request = DeploymentRequest::Trojan(TrojanRequest {
        port: 443,
        password: Some("hunter2x".to_string()),
        mode: TrojanModeRequest::Reality { fake_domain: None },
    });
    let deployment = registry
        .deploy(&request, &caps(&entropy, &StubKeygen), &v6)
        .unwrap();
    let uri = deployment.descriptors.uri.unwrap();
    assert!(uri.starts_with("trojan://hunter2x@[2001:db8::1]:443?security=reality&"));
}

#[test]
fn test_skip_verify_agrees_across_formats() {
    for self_signed_cert in [false, true] {
        let cert = if self_signed_cert {
            CertSource::SelfSigned
        } else {
            acme_cert()
        };

        let all = [
            ListenerParams::Trojan(TrojanParams {
                port: 443,
                password: "hunter2x".to_string(),
                mode: TrojanMode::Tls(endpoint("trojan.example.com", cert.clone())),
            }),
            ListenerParams::AnyTls(AnyTlsParams {
                port: 8443,
                password: "hunter2x".to_string(),
                tls: endpoint("anytls.example.com", cert.clone()),
            }),
            ListenerParams::Hysteria2(Hysteria2Params {
                port: 9443,
                tls: endpoint("hy.example.com", cert.clone()),
                username: "alice".to_string(),
                password: "hunter2x".to_string(),
                up_mbps: 1000,
                down_mbps: 1000,
                obfs: None,
            }),
            ListenerParams::Tuic(TuicParams {
                port: 4433,
                tls: endpoint("tuic.example.com", cert.clone()),
                username: "alice".to_string(),
                password: "hunter2x".to_string(),
                congestion_controller: CongestionController::Bbr,
            }),
        ];

        for params in all {
            let kind = params.kind();
            let descriptors = encode(params);

            assert_eq!(
                structured_field(&descriptors, "skip-cert-verify").as_bool(),
                Some(self_signed_cert),
                "{} structured",
                kind
            );
            assert_eq!(
                compact_field(&descriptors, "skip-cert-verify").as_bool(),
                Some(self_signed_cert),
                "{} compact",
                kind
            );
            let uri = descriptors.uri.as_deref().unwrap();
            match kind {
                ProtocolKind::Trojan => assert_eq!(uri_insecure(uri), None),
                _ => assert_eq!(uri_insecure(uri), Some(self_signed_cert), "{} uri", kind),
            }
        }
    }
}

#[test]
fn test_trojan_reality_descriptors() {
    let entropy = SeqEntropy::new();
    let registry = Registry::standard();
    let request = DeploymentRequest::Trojan(TrojanRequest {
        port: 443,
        password: Some("hunter2x".to_string()),
        mode: TrojanModeRequest::Reality {
            fake_domain: Some("www.apple.com".to_string()),
        },
    });

    let deployment = registry
        .deploy(&request, &caps(&entropy, &StubKeygen), &ctx())
        .unwrap();
    let descriptors = &deployment.descriptors;

    assert_eq!(descriptors.name, "Trojan|Reality|www.apple.com");
    assert_eq!(
        descriptors.uri.as_deref(),
        Some(
            format!(
                "trojan://hunter2x@1.2.3.4:443?security=reality&sni=www.apple.com&fp=chrome&pbk={}&sid=0102030405060708&type=tcp&headerType=none#Trojan|Reality|www.apple.com",
                PUBLIC_KEY
            )
            .as_str()
        )
    );

    let opts = structured_field(descriptors, "reality-opts");
    assert_eq!(opts["public-key"].as_str(), Some(PUBLIC_KEY));
    assert_eq!(opts["short-id"].as_str(), Some("0102030405060708"));
    assert!(structured_field(descriptors, "skip-cert-verify").is_null());
    assert!(descriptors
        .compact
        .contains("short-id: \"0102030405060708\""));
    assert_eq!(
        compact_field(descriptors, "reality-opts")["short-id"].as_str(),
        Some("0102030405060708")
    );
}

#[test]
fn test_hysteria2_obfs_in_uri() {
    let descriptors = encode(ListenerParams::Hysteria2(Hysteria2Params {
        port: 9443,
        tls: endpoint("hy.example.com", CertSource::SelfSigned),
        username: "alice".to_string(),
        password: "pa ss".to_string(),
        up_mbps: 100,
        down_mbps: 500,
        obfs: Some(Obfs {
            password: "cl@ak".to_string(),
        }),
    }));

    assert_eq!(
        descriptors.uri.as_deref(),
        Some("hysteria2://pa%20ss@hy.example.com:9443?sni=hy.example.com&insecure=1&obfs=salamander&obfs-password=cl%40ak#hy.example.com%7CHysteria2")
    );
    assert_eq!(structured_field(&descriptors, "obfs").as_str(), Some("salamander"));
    assert_eq!(structured_field(&descriptors, "obfs-password").as_str(), Some("cl@ak"));
    assert_eq!(compact_field(&descriptors, "up").as_u64(), Some(100));
    assert_eq!(compact_field(&descriptors, "down").as_u64(), Some(500));
}

#[test]
fn test_anytls_uri() {
    let descriptors = encode(ListenerParams::AnyTls(AnyTlsParams {
        port: 8443,
        password: "hunter2x".to_string(),
        tls: endpoint("example.com", CertSource::SelfSigned),
    }));

    assert_eq!(
        descriptors.uri.as_deref(),
        Some("anytls://hunter2x@example.com:8443?peer=example.com&insecure=1&fastopen=1&udp=1#example.com|AnyTLS")
    );
    assert_eq!(structured_field(&descriptors, "tfo").as_bool(), Some(true));
    assert_eq!(structured_field(&descriptors, "client-fingerprint").as_str(), Some("chrome"));
}

#[test]
fn test_mieru_has_no_uri() {
    let descriptors = encode(ListenerParams::Mieru(MieruParams {
        port: 2999,
        transport: MieruTransport::Udp,
        username: "user1".to_string(),
        password: "hunter2x".to_string(),
    }));

    assert!(descriptors.uri.is_none());
    assert_eq!(descriptors.name, "Mieru|UDP|1.2.3.4");
    assert_eq!(
        descriptors.compact,
        "- {name: \"Mieru|UDP|1.2.3.4\", type: mieru, server: 1.2.3.4, port: 2999, transport: UDP, username: user1, password: hunter2x, udp: true}"
    );
}

#[test]
fn test_shadowsocks_plugin_opts() {
    let shadow_tls = encode(ListenerParams::Shadowsocks(ShadowsocksParams {
        port: 8388,
        cipher: Cipher::Aes128Gcm,
        password: "secret".to_string(),
        sub_transport: SubTransport::ShadowTls(ShadowTlsConfig::V3 {
            handshake_dest: "www.apple.com:443".to_string(),
            users: vec![ShadowTlsUser {
                name: "alice".to_string(),
                password: "first".to_string(),
            }],
        }),
    }));
    assert_eq!(shadow_tls.name, "1.2.3.4|SS-ShadowTLS");
    assert!(shadow_tls.uri.as_deref().unwrap().ends_with("#1.2.3.4|SS-ShadowTLS"));
    assert_eq!(structured_field(&shadow_tls, "plugin").as_str(), Some("shadow-tls"));
    assert!(shadow_tls.compact.ends_with(
        "plugin: shadow-tls, plugin-opts: {host: www.apple.com, password: first, version: 3}}"
    ));

    let kcp = encode(ListenerParams::Shadowsocks(ShadowsocksParams {
        port: 8388,
        cipher: Cipher::Aes128Gcm,
        password: "secret".to_string(),
        sub_transport: SubTransport::Kcp(KcpConfig {
            mode: KcpMode::Fast,
            crypt: KcpCrypt::Aes,
            key: "kcp-key".to_string(),
            tunables: KcpTunables::default(),
        }),
    }));
    assert_eq!(kcp.name, "1.2.3.4|SS-KCP");
    let opts = structured_field(&kcp, "plugin-opts");
    assert_eq!(opts["mode"].as_str(), Some("fast"));
    assert_eq!(opts["key"].as_str(), Some("kcp-key"));
    assert_eq!(opts["crypt"].as_str(), Some("aes"));
}

#[test]
fn test_structured_and_compact_share_fields() {
    let entropy = SeqEntropy::new();
    let registry = Registry::standard();
    let request = DeploymentRequest::Hysteria2(Hysteria2Request {
        port: 9443,
        tls: acme("hy.example.com"),
        username: None,
        password: None,
        up_mbps: None,
        down_mbps: None,
        obfs: None,
    });

    let deployment = registry
        .deploy(&request, &caps(&entropy, &StubKeygen), &ctx())
        .unwrap();
    let structured: Vec<Value> = serde_yaml::from_str(&deployment.descriptors.structured).unwrap();
    let compact: Vec<Value> = serde_yaml::from_str(&deployment.descriptors.compact).unwrap();
    assert_eq!(structured, compact);
}

#[test]
fn test_encoder_rejects_mismatched_listener() {
    let registry = Registry::standard();
    let entropy = SeqEntropy::new();
    let mieru = DeploymentRequest::Mieru(MieruRequest {
        port: 2999,
        transport: MieruTransport::Tcp,
        username: None,
        password: None,
    });
    let tuic = DeploymentRequest::Tuic(TuicRequest {
        port: 4433,
        tls: self_signed("example.com"),
        username: None,
        password: None,
        congestion_controller: CongestionController::NewReno,
    });

    let mieru_params = registry
        .get(ProtocolKind::Mieru)
        .unwrap()
        .generator
        .resolve(&mieru, &caps(&entropy, &StubKeygen))
        .unwrap();
    let tuic_params = registry
        .get(ProtocolKind::TuicV5)
        .unwrap()
        .generator
        .resolve(&tuic, &caps(&entropy, &StubKeygen))
        .unwrap();
    let mieru_listener = registry
        .get(ProtocolKind::Mieru)
        .unwrap()
        .compiler
        .compile(&mieru_params)
        .unwrap();

    let encoder = &registry.get(ProtocolKind::TuicV5).unwrap().encoder;
    let result = encoder.encode(&mieru_listener, &tuic_params, &ctx());
    assert!(matches!(result, Err(DeployError::Encoding { .. })));

    let result = encoder.encode(&mieru_listener, &mieru_params, &ctx());
    assert!(matches!(result, Err(DeployError::Encoding { .. })));
}
