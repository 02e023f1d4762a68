//! ingress-defaulter - mutating admission webhook for Ingress default annotations

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ingress_defaulter::policy::PolicyTable;
use ingress_defaulter::server::{start_server, ServerConfig};
use ingress_defaulter::webhook::WebhookState;
use ingress_defaulter::{
    DEFAULT_ANNOTATION_CFG_FILE, DEFAULT_TLS_CERT_FILE, DEFAULT_TLS_KEY_FILE, DEFAULT_WEBHOOK_PORT,
};

/// Mutating admission webhook that applies default annotations to Ingresses
#[derive(Parser, Debug)]
#[command(name = "ingress-defaulter", version, about, long_about = None)]
struct Cli {
    /// Webhook server port
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// File containing the x509 certificate for HTTPS
    #[arg(
        long,
        alias = "tlsCertFile",
        env = "WEBHOOK_TLS_CERT_FILE",
        default_value = DEFAULT_TLS_CERT_FILE
    )]
    tls_cert_file: PathBuf,

    /// File containing the x509 private key matching --tls-cert-file
    #[arg(
        long,
        alias = "tlsKeyFile",
        env = "WEBHOOK_TLS_KEY_FILE",
        default_value = DEFAULT_TLS_KEY_FILE
    )]
    tls_key_file: PathBuf,

    /// File containing default annotations for each named Ingress
    #[arg(
        long,
        alias = "annotationCfgFile",
        env = "WEBHOOK_ANNOTATION_CFG_FILE",
        default_value = DEFAULT_ANNOTATION_CFG_FILE
    )]
    annotation_cfg_file: PathBuf,

    /// Print the parsed policy as YAML and exit
    #[arg(long)]
    print_config: bool,
}

/// Long flags deployment manifests pass with a single dash
const SINGLE_DASH_FLAGS: &[&str] = &["port", "tlsCertFile", "tlsKeyFile", "annotationCfgFile"];

/// Rewrite `-tlsCertFile x` and `-port=443` style arguments to their
/// double-dash form so existing manifests keep working.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(flag) = arg.to_str().and_then(|s| s.strip_prefix('-')) else {
                return arg;
            };
            let name = flag.split('=').next().unwrap_or_default();
            if !flag.starts_with('-') && SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("--{flag}"))
            } else {
                arg
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install aws-lc-rs crypto provider: {:?}. \
             The webhook cannot serve TLS without it.",
            e
        );
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));

    if cli.print_config {
        let table = PolicyTable::try_load(&cli.annotation_cfg_file)?;
        let yaml = serde_yaml::to_string(&table)
            .map_err(|e| anyhow::anyhow!("Failed to serialize policy: {}", e))?;
        println!("{yaml}");
        return Ok(());
    }

    let table = PolicyTable::load(&cli.annotation_cfg_file);
    let state = Arc::new(WebhookState::new(table));
    let config = ServerConfig::new(cli.port, cli.tls_cert_file, cli.tls_key_file);

    start_server(config, state).await?;
    Ok(())
}
