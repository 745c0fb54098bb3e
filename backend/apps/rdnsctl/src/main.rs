//! rdnsctl Entry Point
//!
//! Builds the registration service from the environment and runs a single
//! verb against it. Uses `anyhow` for startup errors; verb failures are
//! reported as `kernel::error::AppError`.

use clap::{Parser, Subcommand, ValueEnum};
use kernel::error::{
    app_error::{AppError, AppResult, ResultExt},
    kind::ErrorKind,
};
use platform::config::env_or;
use rdns::domain::repository::KeyValueStore;
use rdns::{
    DomainOptions, DomainService, EtcdConfig, EtcdStore, MemoryStore, RdnsConfig, RdnsError,
};
use serde_json::{Value, json};
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Manage dynamic domain registrations.
#[derive(Parser, Debug)]
#[command(name = "rdnsctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Key-value store backend (defaults to RDNS_BACKEND, then etcd)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// etcd v2 keys API at RDNS_ETCD_ENDPOINTS
    Etcd,
    /// Process-local store, gone when the command exits
    Memory,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new name under the root domain
    Create {
        /// Address to bind (repeatable)
        #[arg(long = "host", required = true)]
        hosts: Vec<String>,
    },
    /// Show the hosts of a registration
    Get { fqdn: String },
    /// Replace the hosts of a registration, creating it if absent
    Update {
        fqdn: String,
        /// Address to bind (repeatable)
        #[arg(long = "host")]
        hosts: Vec<String>,
    },
    /// Extend a registration, its token and its ACME entries
    Renew { fqdn: String },
    /// Remove a registration and its hosts
    Delete { fqdn: String },
    /// Create a text record
    CreateText { fqdn: String, text: String },
    /// Show a text record
    GetText { fqdn: String },
    /// Replace the value of a text record
    UpdateText { fqdn: String, text: String },
    /// Remove a text record
    DeleteText { fqdn: String },
    /// Print the token origin of a registration
    Token { fqdn: String },
    /// Check a token against the token origin of a registration
    Authorize { fqdn: String, token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rdns=info,rdnsctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let backend = match cli.backend {
        Some(backend) => backend,
        None => Backend::from_str(&env_or("RDNS_BACKEND", "etcd"), true)
            .map_err(|e| anyhow::anyhow!("RDNS_BACKEND: {e}"))?,
    };
    let config = RdnsConfig::from_env()?;

    tracing::debug!(
        backend = ?backend,
        root_domain = %config.root_domain,
        prefix = %config.prefix,
        "Configuration loaded"
    );

    let outcome = match backend {
        Backend::Etcd => {
            let store = EtcdStore::new(EtcdConfig::from_env()?)?;
            run(DomainService::new(store, config)?, cli.command).await
        }
        Backend::Memory => run(DomainService::new(MemoryStore::new(), config)?, cli.command).await,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{e}");
            Ok(if e.is_server_error() {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            })
        }
    }
}

async fn run<S>(service: DomainService<S>, command: Command) -> AppResult<()>
where
    S: KeyValueStore,
{
    let output: Value = match command {
        Command::Create { hosts } => {
            let opts = DomainOptions::with_hosts("", hosts);
            serde_json::to_value(service.create_host(&opts).await.map_err(report)?)?
        }
        Command::Get { fqdn } => {
            let opts = DomainOptions::named(fqdn);
            serde_json::to_value(service.get_host(&opts).await.map_err(report)?)?
        }
        Command::Update { fqdn, hosts } => {
            let opts = DomainOptions::with_hosts(fqdn, hosts);
            serde_json::to_value(service.update_host(&opts).await.map_err(report)?)?
        }
        Command::Renew { fqdn } => {
            let opts = DomainOptions::named(fqdn);
            serde_json::to_value(service.renew_host(&opts).await.map_err(report)?)?
        }
        Command::Delete { fqdn } => {
            let opts = DomainOptions::named(fqdn.as_str());
            service.delete_host(&opts).await.map_err(report)?;
            json!({ "fqdn": fqdn, "deleted": true })
        }
        Command::CreateText { fqdn, text } => {
            let opts = DomainOptions::with_text(fqdn, text);
            serde_json::to_value(service.create_text(&opts).await.map_err(report)?)?
        }
        Command::GetText { fqdn } => {
            let opts = DomainOptions::named(fqdn);
            serde_json::to_value(service.get_text(&opts).await.map_err(report)?)?
        }
        Command::UpdateText { fqdn, text } => {
            let opts = DomainOptions::with_text(fqdn, text);
            serde_json::to_value(service.update_text(&opts).await.map_err(report)?)?
        }
        Command::DeleteText { fqdn } => {
            let opts = DomainOptions::named(fqdn.as_str());
            service.delete_text(&opts).await.map_err(report)?;
            json!({ "fqdn": fqdn, "deleted": true })
        }
        Command::Token { fqdn } => {
            let token = service.get_token_origin(&fqdn).await.map_err(report)?;
            json!({ "fqdn": fqdn, "token": token })
        }
        Command::Authorize { fqdn, token } => {
            service.authorize(&fqdn, &token).await.map_err(report)?;
            json!({ "fqdn": fqdn, "authorized": true })
        }
    };

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)
        .map_app_err(ErrorKind::InternalServerError, "Failed to write output")?;
    writeln!(stdout)?;
    Ok(())
}

/// Log a verb failure and convert it for display
fn report(err: RdnsError) -> AppError {
    err.log();
    err.into()
}
