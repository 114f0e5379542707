//! Listener Compiler Integration Tests

mod common;

use common::{acme, caps, ctx, self_signed, SeqEntropy, StubKeygen, PRIVATE_KEY};
use proxyforge::host;
use proxyforge::listener::{Credentials, ListenerDocument, ProtocolExtensions};
use proxyforge::params::*;
use proxyforge::protocol::{Compiler, Generator};
use proxyforge::Registry;
use serde_yaml::Value;
use tempfile::TempDir;

fn all_requests() -> Vec<DeploymentRequest> {
    vec![
        DeploymentRequest::Trojan(TrojanRequest {
            port: 443,
            password: None,
            mode: TrojanModeRequest::Tls(acme("trojan.example.com")),
        }),
        DeploymentRequest::AnyTls(AnyTlsRequest {
            port: 8443,
            password: None,
            tls: self_signed("anytls.example.com"),
        }),
        DeploymentRequest::Hysteria2(Hysteria2Request {
            port: 9443,
            tls: acme("hy.example.com"),
            username: None,
            password: None,
            up_mbps: Some(100),
            down_mbps: Some(500),
            obfs: Some(ObfsRequest::default()),
        }),
        DeploymentRequest::Tuic(TuicRequest {
            port: 4433,
            tls: self_signed("tuic.example.com"),
            username: None,
            password: None,
            congestion_controller: CongestionController::Bbr,
        }),
        DeploymentRequest::Mieru(MieruRequest {
            port: 2999,
            transport: MieruTransport::Tcp,
            username: None,
            password: None,
        }),
        DeploymentRequest::Shadowsocks(ShadowsocksRequest {
            port: 8388,
            cipher: Cipher::Blake3Aes256Gcm,
            password: None,
            sub_transport: SubTransportRequest::Kcp(KcpRequest::default()),
        }),
    ]
}

fn resolve(request: &DeploymentRequest) -> ListenerParams {
    let registry = Registry::standard();
    let entropy = SeqEntropy::new();
    let entry = registry.get(request.kind()).unwrap();
    entry
        .generator
        .resolve(request, &caps(&entropy, &StubKeygen))
        .unwrap()
}

fn parse_listener(yaml: &str) -> Value {
    let document: Value = serde_yaml::from_str(yaml).unwrap();
    document["listeners"][0].clone()
}

#[test]
fn test_compile_is_deterministic() {
    let registry = Registry::standard();

    for request in all_requests() {
        let params = resolve(&request);
        let compiler = &registry.get(params.kind()).unwrap().compiler;

        let first = compiler.compile(&params).unwrap();
        let second = compiler.compile(&params).unwrap();
        assert_eq!(first, second, "{} listener differs", params.kind());

        let first_yaml = ListenerDocument::single(first).to_yaml().unwrap();
        let second_yaml = ListenerDocument::single(second).to_yaml().unwrap();
        assert_eq!(first_yaml, second_yaml, "{} document differs", params.kind());
    }
}

#[test]
fn test_listener_names_and_types() {
    let registry = Registry::standard();
    let expected = [
        ("trojan-in-1", "trojan"),
        ("anytls-in-1", "anytls"),
        ("hy2-in", "hysteria2"),
        ("tuicv5-in", "tuic"),
        ("mieru-in-1", "mieru"),
        ("ss-in", "shadowsocks"),
    ];

    for (request, (name, listener_type)) in all_requests().iter().zip(expected) {
        let params = resolve(request);
        let listener = registry.get(params.kind()).unwrap().compiler.compile(&params).unwrap();
        assert_eq!(listener.name, name);
        assert_eq!(listener.listener_type, listener_type);
        assert_eq!(listener.listen, "0.0.0.0");
        assert_eq!(listener.port, request.port());
    }
}

#[test]
fn test_tls_listeners_reference_certificate_files() {
    let registry = Registry::standard();

    for request in all_requests() {
        let params = resolve(&request);
        let listener = registry.get(params.kind()).unwrap().compiler.compile(&params).unwrap();
        match params.kind() {
            ProtocolKind::Mieru | ProtocolKind::Shadowsocks => {
                assert!(listener.extensions.certificate_files().is_none())
            }
            _ => assert_eq!(
                listener.extensions.certificate_files(),
                Some(("./server.crt", "./server.key"))
            ),
        }
    }
}

#[tokio::test]
async fn test_trojan_tls_document_written_to_disk() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::standard();
    let params = ListenerParams::Trojan(TrojanParams {
        port: 443,
        password: "hunter2x".to_string(),
        mode: TrojanMode::Tls(TlsEndpoint {
            domain: "example.com".to_string(),
            cert: CertSource::SelfSigned,
        }),
    });

    let deployment = registry.compile_and_encode(params, &ctx()).unwrap();
    let path = host::write_document(temp_dir.path(), "config.yaml", &deployment.document())
        .await
        .unwrap();

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(
        written,
        "listeners:\n\
         - name: trojan-in-1\n  \
           type: trojan\n  \
           port: 443\n  \
           listen: 0.0.0.0\n  \
           users:\n  \
           - username: user1\n    \
             password: hunter2x\n  \
           certificate: ./server.crt\n  \
           private-key: ./server.key\n"
    );
}

#[tokio::test]
async fn test_write_document_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("etc").join("mihomo");
    let registry = Registry::standard();
    let params = ListenerParams::Shadowsocks(ShadowsocksParams {
        port: 8388,
        cipher: Cipher::Aes256Gcm,
        password: "secret".to_string(),
        sub_transport: SubTransport::None,
    });

    let deployment = registry.compile_and_encode(params, &ctx()).unwrap();
    let path = host::write_document(&dir, "config.yaml", &deployment.document())
        .await
        .unwrap();

    assert_eq!(path, dir.join("config.yaml"));
    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(
        written,
        "listeners:\n- name: ss-in\n  type: shadowsocks\n  port: 8388\n  listen: 0.0.0.0\n  cipher: aes-256-gcm\n  password: secret\n  udp: true\n"
    );
}

#[test]
fn test_trojan_reality_block() {
    let registry = Registry::standard();
    let request = DeploymentRequest::Trojan(TrojanRequest {
        port: 443,
        password: Some("hunter2x".to_string()),
        mode: TrojanModeRequest::Reality {
            fake_domain: Some("www.apple.com".to_string()),
        },
    });
    let params = resolve(&request);
    let listener = registry.get(ProtocolKind::Trojan).unwrap().compiler.compile(&params).unwrap();

    let yaml = ListenerDocument::single(listener).to_yaml().unwrap();
    let parsed = parse_listener(&yaml);
    let reality = &parsed["reality-config"];
    assert_eq!(reality["dest"].as_str(), Some("www.apple.com:443"));
    assert_eq!(reality["private-key"].as_str(), Some(PRIVATE_KEY));
    assert_eq!(reality["server-names"][0].as_str(), Some("www.apple.com"));
    assert_eq!(reality["short-id"][0].as_str().map(str::len), Some(16));
    assert!(parsed.get("certificate").is_none());
}

#[test]
fn test_hysteria2_obfs_keys_follow_params() {
    let registry = Registry::standard();
    let compiler = &registry.get(ProtocolKind::Hysteria2).unwrap().compiler;
    let base = Hysteria2Params {
        port: 9443,
        tls: TlsEndpoint {
            domain: "hy.example.com".to_string(),
            cert: CertSource::SelfSigned,
        },
        username: "alice".to_string(),
        password: "s3cret".to_string(),
        up_mbps: 50,
        down_mbps: 200,
        obfs: None,
    };

    let plain = compiler.compile(&ListenerParams::Hysteria2(base.clone())).unwrap();
    let plain = parse_listener(&ListenerDocument::single(plain).to_yaml().unwrap());
    assert!(plain.get("obfs").is_none());
    assert!(plain.get("obfs-password").is_none());
    assert_eq!(plain["users"]["alice"].as_str(), Some("s3cret"));
    assert_eq!(plain["up"].as_u64(), Some(50));
    assert_eq!(plain["down"].as_u64(), Some(200));
    assert_eq!(plain["ignore-client-bandwidth"].as_bool(), Some(false));
    assert_eq!(plain["masquerade"].as_str(), Some(""));
    assert_eq!(plain["alpn"][0].as_str(), Some("h3"));

    let obfuscated = compiler
        .compile(&ListenerParams::Hysteria2(Hysteria2Params {
            obfs: Some(Obfs {
                password: "cloak".to_string(),
            }),
            ..base
        }))
        .unwrap();
    let obfuscated = parse_listener(&ListenerDocument::single(obfuscated).to_yaml().unwrap());
    assert_eq!(obfuscated["obfs"].as_str(), Some("salamander"));
    assert_eq!(obfuscated["obfs-password"].as_str(), Some("cloak"));
}

#[test]
fn test_tuic_block() {
    let registry = Registry::standard();
    let params = ListenerParams::Tuic(TuicParams {
        port: 4433,
        tls: TlsEndpoint {
            domain: "example.com".to_string(),
            cert: CertSource::SelfSigned,
        },
        username: "alice".to_string(),
        password: "p@ss".to_string(),
        congestion_controller: CongestionController::Cubic,
    });

    let listener = registry.get(ProtocolKind::TuicV5).unwrap().compiler.compile(&params).unwrap();
    let parsed = parse_listener(&ListenerDocument::single(listener).to_yaml().unwrap());
    assert_eq!(parsed["users"]["alice"].as_str(), Some("p@ss"));
    assert_eq!(parsed["congestion-controller"].as_str(), Some("cubic"));
    assert_eq!(parsed["max-idle-time"].as_u64(), Some(15000));
    assert_eq!(parsed["authentication-timeout"].as_u64(), Some(1000));
    assert_eq!(parsed["max-udp-relay-packet-size"].as_u64(), Some(1500));
}

#[test]
fn test_kcp_block_carries_every_tunable() {
    let registry = Registry::standard();
    let request = DeploymentRequest::Shadowsocks(ShadowsocksRequest {
        port: 8388,
        cipher: Cipher::Aes128Gcm,
        password: Some("secret".to_string()),
        sub_transport: SubTransportRequest::Kcp(KcpRequest {
            mode: KcpMode::Fast3,
            crypt: KcpCrypt::Salsa20,
            key: Some("kcp-key".to_string()),
        }),
    });
    let params = resolve(&request);
    let listener = registry
        .get(ProtocolKind::Shadowsocks)
        .unwrap()
        .compiler
        .compile(&params)
        .unwrap();

    let parsed = parse_listener(&ListenerDocument::single(listener).to_yaml().unwrap());
    assert!(parsed.get("shadow-tls").is_none());
    let kcp = parsed["kcp-tun"].as_mapping().expect("kcp-tun block");
    assert_eq!(kcp.len(), 4 + KcpTunables::NAMES.len());
    for name in KcpTunables::NAMES {
        assert!(kcp.contains_key(name), "missing tunable {}", name);
    }
    assert_eq!(parsed["kcp-tun"]["enable"].as_bool(), Some(true));
    assert_eq!(parsed["kcp-tun"]["key"].as_str(), Some("kcp-key"));
    assert_eq!(parsed["kcp-tun"]["crypt"].as_str(), Some("salsa20"));
    assert_eq!(parsed["kcp-tun"]["mode"].as_str(), Some("fast3"));
    assert_eq!(parsed["kcp-tun"]["mtu"].as_u64(), Some(1350));
    assert_eq!(parsed["kcp-tun"]["nocomp"].as_bool(), Some(false));
}

#[test]
fn test_shadow_tls_versions() {
    let registry = Registry::standard();
    let compiler = &registry.get(ProtocolKind::Shadowsocks).unwrap().compiler;
    let with = |config: ShadowTlsConfig| {
        let params = ListenerParams::Shadowsocks(ShadowsocksParams {
            port: 8388,
            cipher: Cipher::Aes128Gcm,
            password: "secret".to_string(),
            sub_transport: SubTransport::ShadowTls(config),
        });
        let listener = compiler.compile(&params).unwrap();
        parse_listener(&ListenerDocument::single(listener).to_yaml().unwrap())["shadow-tls"].clone()
    };

    let v2 = with(ShadowTlsConfig::V2 {
        handshake_dest: "www.bing.com:443".to_string(),
        password: "shared".to_string(),
    });
    assert_eq!(v2["enable"].as_bool(), Some(true));
    assert_eq!(v2["version"].as_u64(), Some(2));
    assert_eq!(v2["handshake"]["dest"].as_str(), Some("www.bing.com:443"));
    assert_eq!(v2["password"].as_str(), Some("shared"));
    assert!(v2.get("users").is_none());

    let v3 = with(ShadowTlsConfig::V3 {
        handshake_dest: "www.apple.com:443".to_string(),
        users: vec![
            ShadowTlsUser {
                name: "alice".to_string(),
                password: "one".to_string(),
            },
            ShadowTlsUser {
                name: "bob".to_string(),
                password: "two".to_string(),
            },
        ],
    });
    assert_eq!(v3["version"].as_u64(), Some(3));
    assert!(v3.get("password").is_none());
    assert_eq!(v3["users"][1]["name"].as_str(), Some("bob"));
    assert_eq!(v3["users"][1]["password"].as_str(), Some("two"));
}

#[test]
fn test_anytls_uses_fixed_username() {
    let registry = Registry::standard();
    let anytls = ListenerParams::AnyTls(AnyTlsParams {
        port: 8443,
        password: "hunter2x".to_string(),
        tls: TlsEndpoint {
            domain: "example.com".to_string(),
            cert: CertSource::SelfSigned,
        },
    });
    let listener = registry.get(ProtocolKind::AnyTls).unwrap().compiler.compile(&anytls).unwrap();
    assert_eq!(
        listener.credentials.first_user(),
        Some(("username1", "hunter2x"))
    );
    assert!(matches!(listener.credentials, Credentials::UserMap { .. }));
    assert!(matches!(listener.extensions, ProtocolExtensions::Tls(_)));
}
