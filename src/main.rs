// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, Subcommand};
use devca::{
    new_trust_store, teardown, CertificateAuthorityManager, Config, Context, Error, OsCommandRunner,
    OsFileSystem, Paths, Result, ServerCertificateIssuer, SystemClock, TrustConfig,
};
use devca::{CaMaterial, LeafRequest};
use rand::rngs::OsRng;
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Trust-store commands may prompt for credentials, so the bound is generous.
const TRUST_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

#[derive(Parser)]
#[command(name = "devca")]
#[command(about = "Local development CA: issue certificates and install OS trust")]
#[command(version)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the CA and a server certificate, and trust the CA system-wide
    Setup {
        /// Host to include in the server certificate (repeatable)
        #[arg(long = "host")]
        hosts: Vec<String>,

        /// Skip installing the CA into the OS trust store
        #[arg(long)]
        no_trust: bool,
    },
    /// Issue or renew a server certificate without touching the trust store
    Issue {
        /// Host to include in the server certificate (repeatable)
        #[arg(long = "host")]
        hosts: Vec<String>,
    },
    /// Withdraw trust and delete all certificate material
    Uninstall,
    /// Show the state of the CA and server certificate
    Status,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::new()?;
    let config = Config::load(&paths.config)?;

    match cli.command {
        Commands::Setup { hosts, no_trust } => cmd_setup(&paths, &config, hosts, no_trust),
        Commands::Issue { hosts } => {
            let ca = ensure_ca(&paths, &config)?;
            issue_leaf(&paths, &config, &ca, hosts)?;
            Ok(())
        }
        Commands::Uninstall => cmd_uninstall(&paths),
        Commands::Status => cmd_status(&paths),
    }
}

fn ensure_ca(paths: &Paths, config: &Config) -> Result<CaMaterial> {
    let mut manager = CertificateAuthorityManager::new(
        config.ca_config(paths.base.clone()),
        OsFileSystem,
        SystemClock,
        OsRng,
    );
    manager.ensure(&Context::background())
}

fn issue_leaf(
    paths: &Paths,
    config: &Config,
    ca: &CaMaterial,
    hosts: Vec<String>,
) -> Result<()> {
    let hosts = if hosts.is_empty() {
        DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
    } else {
        hosts
    };
    let request = LeafRequest {
        hosts,
        certificate_path: paths.leaf_certificate.clone(),
        key_path: paths.leaf_key.clone(),
    };
    let mut issuer =
        ServerCertificateIssuer::new(config.leaf_config(), OsFileSystem, SystemClock, OsRng);
    let material = issuer.issue(&Context::background(), ca, &request)?;

    println!("Server certificate: {}", paths.leaf_certificate.display());
    println!("Server key:         {}", paths.leaf_key.display());
    println!(
        "Valid until:        {}",
        format_timestamp(material.certificate.not_after_timestamp)
    );
    Ok(())
}

fn cmd_setup(paths: &Paths, config: &Config, hosts: Vec<String>, no_trust: bool) -> Result<()> {
    let ca = ensure_ca(paths, config)?;
    println!("CA certificate:     {}", paths.ca_certificate.display());
    issue_leaf(paths, config, &ca, hosts)?;

    if no_trust {
        println!("Trust installation skipped; clients must trust the CA manually.");
        return Ok(());
    }

    let store = new_trust_store(OsCommandRunner, OsFileSystem, TrustConfig::default())?;
    let ctx = Context::with_timeout(TRUST_COMMAND_TIMEOUT);
    store.install(&ctx, &paths.ca_certificate)?;
    println!("CA trusted via:     {}", store.name());
    Ok(())
}

fn cmd_uninstall(paths: &Paths) -> Result<()> {
    let store = match new_trust_store(OsCommandRunner, OsFileSystem, TrustConfig::default()) {
        Ok(store) => Some(store),
        Err(Error::UnsupportedPlatform(os)) => {
            warn!(os, "no trust store on this platform, removing files only");
            None
        }
        Err(e) => return Err(e),
    };

    let ctx = Context::with_timeout(TRUST_COMMAND_TIMEOUT);
    let targets: Vec<PathBuf> = vec![
        paths.ca_certificate.clone(),
        paths.ca_key.clone(),
        paths.leaf_certificate.clone(),
        paths.leaf_key.clone(),
    ];
    teardown::uninstall(&ctx, store.as_deref(), &OsFileSystem, &targets)?;
    println!("Removed certificate material from {}", paths.base.display());
    Ok(())
}

fn cmd_status(paths: &Paths) -> Result<()> {
    print_certificate_status("CA certificate", &paths.ca_certificate);
    print_certificate_status("Server certificate", &paths.leaf_certificate);
    Ok(())
}

fn print_certificate_status(label: &str, path: &std::path::Path) {
    if !path.exists() {
        println!("{label}: not present ({})", path.display());
        return;
    }
    match std::fs::read(path) {
        Ok(pem) => match devca::x509::parse_certificate_pem(&pem) {
            Ok(summary) => {
                let expired = !summary.valid_at(OffsetDateTime::now_utc());
                println!(
                    "{label}: {} (expires {}{})",
                    path.display(),
                    format_timestamp(summary.not_after_timestamp),
                    if expired { ", EXPIRED" } else { "" },
                );
            }
            Err(e) => println!("{label}: unreadable ({e})"),
        },
        Err(e) => println!("{label}: unreadable ({e})"),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map(|t| t.to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
