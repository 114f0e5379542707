//! Post-deployment summary: server facts, secrets to keep and ports to open

use std::fmt;

use serde::Serialize;

use crate::descriptor::EncodeContext;
use crate::params::{
    ListenerParams, MieruTransport, ShadowTlsConfig, SubTransport, TrojanMode,
};
use crate::protocol::registry::Deployment;

/// Transport protocol of a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum L4Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for L4Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            L4Protocol::Tcp => f.write_str("tcp"),
            L4Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// One port that must be reachable from clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    pub port: u16,
    pub protocol: L4Protocol,
}

impl FirewallRule {
    /// `ufw allow` command for this rule
    pub fn ufw(&self) -> String {
        format!("ufw allow {}/{}", self.port, self.protocol)
    }

    /// `firewall-cmd` command for this rule
    pub fn firewalld(&self) -> String {
        format!("firewall-cmd --permanent --add-port={}/{}", self.port, self.protocol)
    }
}

/// Human and machine readable digest of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    pub protocol: String,
    pub server_ip: String,
    pub port: u16,
    /// Labelled values worth keeping (passwords, keys, ...)
    pub details: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub firewall: Vec<FirewallRule>,
}

fn both(port: u16) -> Vec<FirewallRule> {
    vec![
        FirewallRule {
            port,
            protocol: L4Protocol::Tcp,
        },
        FirewallRule {
            port,
            protocol: L4Protocol::Udp,
        },
    ]
}

/// Ports clients need; every protocol opens TCP and UDP except Mieru
pub fn firewall_rules(params: &ListenerParams) -> Vec<FirewallRule> {
    let port = params.port();
    match params {
        ListenerParams::Mieru(mieru) => vec![FirewallRule {
            port,
            protocol: match mieru.transport {
                MieruTransport::Tcp => L4Protocol::Tcp,
                MieruTransport::Udp => L4Protocol::Udp,
            },
        }],
        _ => both(port),
    }
}

fn details(params: &ListenerParams) -> Vec<(String, String)> {
    let mut out: Vec<(&str, String)> = Vec::new();
    match params {
        ListenerParams::Trojan(p) => {
            out.push(("password", p.password.clone()));
            match &p.mode {
                TrojanMode::Tls(tls) => {
                    out.push(("mode", "TLS".to_string()));
                    out.push(("domain", tls.domain.clone()));
                }
                TrojanMode::Reality(reality) => {
                    out.push(("mode", "Reality".to_string()));
                    out.push(("fake domain", reality.fake_domain.clone()));
                    out.push(("private key", reality.private_key.clone()));
                    out.push(("public key", reality.public_key.clone()));
                    out.push(("short id", reality.short_id.to_string()));
                }
            }
        }
        ListenerParams::AnyTls(p) => {
            out.push(("domain", p.tls.domain.clone()));
            out.push(("password", p.password.clone()));
        }
        ListenerParams::Hysteria2(p) => {
            out.push(("domain", p.tls.domain.clone()));
            out.push(("username", p.username.clone()));
            out.push(("password", p.password.clone()));
            out.push(("bandwidth", format!("{} / {} Mbps", p.up_mbps, p.down_mbps)));
            if let Some(obfs) = &p.obfs {
                out.push(("obfs password", obfs.password.clone()));
            }
        }
        ListenerParams::Tuic(p) => {
            out.push(("domain", p.tls.domain.clone()));
            out.push(("uuid", p.username.clone()));
            out.push(("password", p.password.clone()));
            out.push(("congestion controller", p.congestion_controller.to_string()));
        }
        ListenerParams::Mieru(p) => {
            out.push(("transport", p.transport.to_string()));
            out.push(("username", p.username.clone()));
            out.push(("password", p.password.clone()));
        }
        ListenerParams::Shadowsocks(p) => {
            out.push(("cipher", p.cipher.to_string()));
            out.push(("password", p.password.clone()));
            out.push(("transport", p.sub_transport.tag().to_string()));
            match &p.sub_transport {
                SubTransport::None => {}
                SubTransport::ShadowTls(config) => {
                    out.push(("shadow-tls version", config.version().to_string()));
                    out.push(("handshake dest", config.handshake_dest().to_string()));
                    match config {
                        ShadowTlsConfig::V1 { .. } => {}
                        ShadowTlsConfig::V2 { password, .. } => {
                            out.push(("shadow-tls password", password.clone()));
                        }
                        ShadowTlsConfig::V3 { users, .. } => {
                            for user in users {
                                out.push((
                                    "shadow-tls user",
                                    format!("{}: {}", user.name, user.password),
                                ));
                            }
                        }
                    }
                }
                SubTransport::Kcp(kcp) => {
                    out.push(("kcp mode", kcp.mode.to_string()));
                    out.push(("kcp crypt", kcp.crypt.to_string()));
                    out.push(("kcp key", kcp.key.clone()));
                }
            }
        }
    }
    if let Some(tls) = params.tls() {
        match tls.cert.email() {
            Some(email) => out.push(("acme email", email.to_string())),
            None => out.push(("certificate source", "self-signed".to_string())),
        }
    }
    out.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl DeploymentSummary {
    pub fn from_deployment(deployment: &Deployment, ctx: &EncodeContext) -> Self {
        let files = deployment.listener.extensions.certificate_files();
        Self {
            protocol: deployment.kind().display_name().to_string(),
            server_ip: ctx.public_ip.clone(),
            port: deployment.listener.port,
            details: details(&deployment.params),
            certificate: files.map(|(cert, _)| cert.to_string()),
            private_key: files.map(|(_, key)| key.to_string()),
            firewall: firewall_rules(&deployment.params),
        }
    }
}

impl fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} deployment", self.protocol)?;
        writeln!(f, "  server ip: {}", self.server_ip)?;
        writeln!(f, "  port: {}", self.port)?;
        for (label, value) in &self.details {
            writeln!(f, "  {}: {}", label, value)?;
        }
        if let (Some(cert), Some(key)) = (&self.certificate, &self.private_key) {
            writeln!(f, "  certificate: {}", cert)?;
            writeln!(f, "  private key: {}", key)?;
        }
        writeln!(f, "  firewall:")?;
        for rule in &self.firewall {
            writeln!(f, "    {}", rule.ufw())?;
        }
        for rule in &self.firewall {
            writeln!(f, "    {}", rule.firewalld())?;
        }
        write!(f, "    firewall-cmd --reload")
    }
}
