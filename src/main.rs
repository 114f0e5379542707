//! proxyforge - mihomo listener and client descriptor generator

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxyforge::{
    config::{Config, ConfigManager},
    generate::Capabilities,
    host,
    params::{
        AnyTlsRequest, CertSource, Cipher, CongestionController, DeploymentRequest,
        Hysteria2Request, KcpCrypt, KcpMode, KcpRequest, MieruRequest, MieruTransport,
        ObfsRequest, ShadowTlsRequest, ShadowTlsUserRequest, ShadowsocksRequest,
        SubTransportRequest, TlsRequest, TrojanModeRequest, TrojanRequest, TuicRequest,
    },
    Deployment, DeploymentSummary, EncodeContext, MihomoKeygen, OsEntropy, Registry,
};

/// CLI arguments for proxyforge
#[derive(Parser, Debug)]
#[command(name = "proxyforge")]
#[command(about = "Generate mihomo listener configs and client share links")]
#[command(version)]
#[command(long_about = "
proxyforge - mihomo listener and client descriptor generator

Compiles deployment parameters for Trojan (TLS/Reality), AnyTLS, Hysteria2,
TUIC v5, Mieru and Shadowsocks (optionally over Shadow-TLS or KCP) into a
mihomo `listeners:` document plus YAML, compact and URI client descriptors.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  PROXYFORGE_OUTPUT_DIR      - Directory for the listener document
  PROXYFORGE_PUBLIC_IP       - Server public IP (skips the lookup)
  PROXYFORGE_KEYGEN_BINARY   - Reality key generator binary (default: mihomo)
  PROXYFORGE_KEYGEN_TIMEOUT  - Key generator timeout (e.g., 10s)
  PROXYFORGE_LOG_LEVEL       - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "proxyforge.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Output directory (overrides config file)
    #[arg(short, long, help = "Directory for the listener document")]
    pub output_dir: Option<PathBuf>,

    /// Public IP (overrides config file and skips the lookup)
    #[arg(long, help = "Server public IP")]
    pub public_ip: Option<String>,

    /// Print a JSON report instead of text
    #[arg(long, help = "Print a JSON report")]
    pub json: bool,

    /// Print the listener document instead of writing it
    #[arg(long, help = "Do not write the listener document")]
    pub dry_run: bool,

    #[command(subcommand)]
    pub protocol: ProtocolCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProtocolCommand {
    /// Trojan over TLS or Reality
    Trojan(TrojanArgs),
    /// AnyTLS
    Anytls(AnyTlsArgs),
    /// Hysteria2
    Hysteria2(Hysteria2Args),
    /// TUIC v5
    Tuic(TuicArgs),
    /// Mieru
    Mieru(MieruArgs),
    /// Shadowsocks, optionally over Shadow-TLS or KCP
    Shadowsocks(ShadowsocksArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Listening port; a random free port is picked when omitted
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Clone)]
pub struct TlsArgs {
    /// Domain name pointing at this server
    #[arg(long)]
    pub domain: Option<String>,

    /// ACME account email
    #[arg(long, conflicts_with = "self_signed")]
    pub email: Option<String>,

    /// Use a self-signed certificate (clients skip verification)
    #[arg(long)]
    pub self_signed: bool,
}

impl TlsArgs {
    fn to_request(&self) -> Result<TlsRequest> {
        let domain = self.domain.clone().context("--domain is required")?;
        let cert = if self.self_signed {
            CertSource::SelfSigned
        } else {
            let email = self
                .email
                .clone()
                .context("--email is required unless --self-signed is given")?;
            CertSource::Acme { email }
        };
        Ok(TlsRequest { domain, cert })
    }
}

#[derive(Args, Debug, Clone)]
pub struct TrojanArgs {
    #[command(flatten)]
    pub port: PortArgs,

    #[arg(long)]
    pub password: Option<String>,

    /// Use Reality instead of a certificate
    #[arg(long)]
    pub reality: bool,

    /// Reality camouflage domain
    #[arg(long, requires = "reality")]
    pub fake_domain: Option<String>,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnyTlsArgs {
    #[command(flatten)]
    pub port: PortArgs,

    #[arg(long)]
    pub password: Option<String>,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Args, Debug, Clone)]
pub struct Hysteria2Args {
    #[command(flatten)]
    pub port: PortArgs,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Upload bandwidth in Mbps
    #[arg(long)]
    pub up: Option<u32>,

    /// Download bandwidth in Mbps
    #[arg(long)]
    pub down: Option<u32>,

    /// Enable salamander QUIC obfuscation
    #[arg(long)]
    pub obfs: bool,

    /// Obfuscation password (implies --obfs)
    #[arg(long)]
    pub obfs_password: Option<String>,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TuicArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// Client UUID
    #[arg(long)]
    pub uuid: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// bbr, cubic or new_reno
    #[arg(long, default_value = "bbr")]
    pub congestion_controller: CongestionController,

    #[command(flatten)]
    pub tls: TlsArgs,
}

#[derive(Args, Debug, Clone)]
pub struct MieruArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// TCP or UDP
    #[arg(long, default_value = "TCP")]
    pub transport: MieruTransport,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShadowsocksArgs {
    #[command(flatten)]
    pub port: PortArgs,

    #[arg(long, default_value = "2022-blake3-aes-128-gcm")]
    pub cipher: Cipher,

    /// Password, or base64 key for 2022 ciphers
    #[arg(long)]
    pub password: Option<String>,

    /// Wrap in Shadow-TLS of the given version (1, 2 or 3)
    #[arg(long, conflicts_with = "kcp")]
    pub shadow_tls: Option<u8>,

    /// Shadow-TLS handshake destination (host:port)
    #[arg(long, requires = "shadow_tls")]
    pub handshake_dest: Option<String>,

    /// Shadow-TLS v2 password
    #[arg(long, requires = "shadow_tls")]
    pub shadow_tls_password: Option<String>,

    /// Number of Shadow-TLS v3 users
    #[arg(long, requires = "shadow_tls")]
    pub shadow_tls_users: Option<usize>,

    /// Shadow-TLS v3 user as name:password (repeatable)
    #[arg(long = "shadow-tls-user", requires = "shadow_tls")]
    pub shadow_tls_user: Vec<String>,

    /// Tunnel over KCP
    #[arg(long)]
    pub kcp: bool,

    /// fast3, fast2, fast or normal (default fast)
    #[arg(long, requires = "kcp")]
    pub kcp_mode: Option<KcpMode>,

    /// aes, aes-128, aes-192, salsa20 or none (default aes)
    #[arg(long, requires = "kcp")]
    pub kcp_crypt: Option<KcpCrypt>,

    #[arg(long, requires = "kcp")]
    pub kcp_key: Option<String>,
}

impl ShadowsocksArgs {
    fn sub_transport(&self) -> SubTransportRequest {
        if let Some(version) = self.shadow_tls {
            let users = self
                .shadow_tls_user
                .iter()
                .map(|entry| match entry.split_once(':') {
                    Some((name, password)) => ShadowTlsUserRequest {
                        name: Some(name.to_string()),
                        password: Some(password.to_string()),
                    },
                    None => ShadowTlsUserRequest {
                        name: Some(entry.clone()),
                        password: None,
                    },
                })
                .collect();

            SubTransportRequest::ShadowTls(ShadowTlsRequest {
                version,
                handshake_dest: self.handshake_dest.clone(),
                password: self.shadow_tls_password.clone(),
                user_count: self.shadow_tls_users,
                users,
            })
        } else if self.kcp {
            SubTransportRequest::Kcp(KcpRequest {
                mode: self.kcp_mode.unwrap_or_default(),
                crypt: self.kcp_crypt.unwrap_or_default(),
                key: self.kcp_key.clone(),
            })
        } else {
            SubTransportRequest::None
        }
    }
}

impl ProtocolCommand {
    fn port(&self) -> Option<u16> {
        match self {
            ProtocolCommand::Trojan(a) => a.port.port,
            ProtocolCommand::Anytls(a) => a.port.port,
            ProtocolCommand::Hysteria2(a) => a.port.port,
            ProtocolCommand::Tuic(a) => a.port.port,
            ProtocolCommand::Mieru(a) => a.port.port,
            ProtocolCommand::Shadowsocks(a) => a.port.port,
        }
    }

    /// Build the deployment request for `port`
    fn to_request(&self, port: u16) -> Result<DeploymentRequest> {
        let request = match self {
            ProtocolCommand::Trojan(a) => {
                let mode = if a.reality {
                    TrojanModeRequest::Reality {
                        fake_domain: a.fake_domain.clone(),
                    }
                } else {
                    TrojanModeRequest::Tls(a.tls.to_request()?)
                };
                DeploymentRequest::Trojan(TrojanRequest {
                    port,
                    password: a.password.clone(),
                    mode,
                })
            }
            ProtocolCommand::Anytls(a) => DeploymentRequest::AnyTls(AnyTlsRequest {
                port,
                password: a.password.clone(),
                tls: a.tls.to_request()?,
            }),
            ProtocolCommand::Hysteria2(a) => {
                let obfs = (a.obfs || a.obfs_password.is_some()).then(|| ObfsRequest {
                    password: a.obfs_password.clone(),
                });
                DeploymentRequest::Hysteria2(Hysteria2Request {
                    port,
                    tls: a.tls.to_request()?,
                    username: a.username.clone(),
                    password: a.password.clone(),
                    up_mbps: a.up,
                    down_mbps: a.down,
                    obfs,
                })
            }
            ProtocolCommand::Tuic(a) => DeploymentRequest::Tuic(TuicRequest {
                port,
                tls: a.tls.to_request()?,
                username: a.uuid.clone(),
                password: a.password.clone(),
                congestion_controller: a.congestion_controller,
            }),
            ProtocolCommand::Mieru(a) => DeploymentRequest::Mieru(MieruRequest {
                port,
                transport: a.transport,
                username: a.username.clone(),
                password: a.password.clone(),
            }),
            ProtocolCommand::Shadowsocks(a) => DeploymentRequest::Shadowsocks(ShadowsocksRequest {
                port,
                cipher: a.cipher,
                password: a.password.clone(),
                sub_transport: a.sub_transport(),
            }),
        };
        Ok(request)
    }
}

/// Machine readable run report
#[derive(Serialize)]
struct Report<'a> {
    protocol: &'a str,
    #[serde(flatten)]
    deployment: &'a Deployment,
    summary: &'a DeploymentSummary,
    document_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.output_dir.as_deref(),
        args.public_ip.as_deref(),
        args.log_level.as_deref(),
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config)?;

    info!("Starting proxyforge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    run(&args, &config).await
}

async fn run(args: &CliArgs, config: &Config) -> Result<()> {
    let port = match args.protocol.port() {
        Some(port) => port,
        None => {
            let port = host::random_free_port(&config.host).await?;
            warn!("No port given, using random free port {}", port);
            port
        }
    };

    let request = args.protocol.to_request(port)?;
    let public_ip = host::lookup_public_ip(&config.host).await?;
    let ctx = EncodeContext::new(public_ip);

    let keygen = MihomoKeygen::new(
        config.keygen.binary.clone(),
        config.keygen.args.clone(),
        config.keygen.timeout,
    );
    let task_ctx = ctx.clone();
    let deployment = tokio::task::spawn_blocking(move || {
        let entropy = OsEntropy;
        let caps = Capabilities::new(&entropy, &keygen);
        Registry::standard().deploy(&request, &caps, &task_ctx)
    })
    .await
    .context("Deployment task failed")??;

    let document = deployment.document();
    let document_path = if args.dry_run {
        None
    } else {
        Some(host::write_document(&config.output.dir, &config.output.file_name, &document).await?)
    };

    let summary = DeploymentSummary::from_deployment(&deployment, &ctx);

    if args.json {
        let report = Report {
            protocol: deployment.kind().display_name(),
            deployment: &deployment,
            summary: &summary,
            document_path: document_path.as_ref().map(|p| p.display().to_string()),
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to encode JSON report")?;
        println!("{}", json);
        return Ok(());
    }

    if args.dry_run {
        println!("---[ {} ]---", config.output.file_name);
        println!("{}", document.to_yaml()?);
    }

    let descriptors = &deployment.descriptors;
    println!("---[ YAML ]---");
    println!("{}\n", descriptors.structured);
    println!("---[ Compact ]---");
    println!("{}\n", descriptors.compact);
    match &descriptors.uri {
        Some(uri) => {
            println!("---[ URI ]---");
            println!("{}\n", uri);
        }
        None => println!("({} has no share link; add the node manually)\n", deployment.kind()),
    }
    println!("{}", summary);

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
