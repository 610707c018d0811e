//! paygate-cli — Command-line front end for the wallet orchestrator.
//!
//! Lists the wallet backends available in a sandbox environment and runs
//! single payment attempts through the backend the user picks. Defaults come
//! from `PAYGATE_*` environment variables; flags override them.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paygate_core::outcome::Severity;
use paygate_core::types::{BackendId, PaymentRequest};
use paygate_wallet::WalletOrchestrator;
use paygate_wallet::sandbox::SandboxEnvironment;
use tracing::info;

use crate::config::Config;

/// Pay with whichever wallet is at hand.
#[derive(Parser)]
#[command(name = "paygate-cli")]
#[command(version, about = "Multi-wallet payment orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wallet backends and whether each is available.
    Backends(BackendsArgs),
    /// Send one payment through the chosen backend.
    Pay(PayArgs),
    /// Print a sandbox environment file with every wallet approving.
    SandboxTemplate(TemplateArgs),
}

#[derive(Args)]
struct SandboxArgs {
    /// Sandbox environment file (default: ~/.paygate/sandbox.json).
    #[arg(short, long)]
    sandbox: Option<PathBuf>,
}

#[derive(Args)]
struct BackendsArgs {
    #[command(flatten)]
    sandbox: SandboxArgs,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PayArgs {
    /// Backend: injected, sdk-hosted or relay (metamask, coinbase and walletconnect also work).
    #[arg(short, long)]
    backend: BackendId,

    /// Recipient address (overrides PAYGATE_RECIPIENT).
    #[arg(short, long)]
    to: Option<String>,

    /// Amount in whole units (overrides PAYGATE_AMOUNT).
    #[arg(short, long)]
    amount: Option<String>,

    /// Asset decimal places (overrides PAYGATE_ASSET_DECIMALS).
    #[arg(long)]
    decimals: Option<u8>,

    /// Relay access credential (overrides PAYGATE_RELAY_CREDENTIAL).
    #[arg(long)]
    relay_credential: Option<String>,

    #[command(flatten)]
    sandbox: SandboxArgs,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TemplateArgs {
    /// Start from an environment with no wallets installed.
    #[arg(long)]
    bare: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backends(args) => list_backends(load_config()?, args).await,
        Commands::Pay(args) => pay(load_config()?, args).await,
        Commands::SandboxTemplate(args) => sandbox_template(args),
    }
}

fn load_config() -> Result<Config> {
    Config::from_env().context("Invalid PAYGATE_* environment")
}

/// Probe every backend and print the result.
async fn list_backends(config: Config, args: BackendsArgs) -> Result<()> {
    let orchestrator = build_orchestrator(config, &args.sandbox)?;
    let entries = orchestrator.list_backends().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in entries {
        let status = if entry.available { "available" } else { "unavailable" };
        println!(
            "{:<16} {:<11} {:<16} {}",
            entry.descriptor.display_name, entry.descriptor.id, status, entry.descriptor.icon.0
        );
    }
    Ok(())
}

/// Run one payment attempt and report its outcome.
async fn pay(mut config: Config, args: PayArgs) -> Result<()> {
    if let Some(credential) = args.relay_credential {
        config.orchestrator.relay.access_credential = credential;
    }
    let recipient = args
        .to
        .or_else(|| config.recipient.clone())
        .context("No recipient: pass --to or set PAYGATE_RECIPIENT")?;
    let amount = args.amount.unwrap_or_else(|| config.amount.clone());
    let decimals = args.decimals.unwrap_or(config.asset_decimals);
    let request = PaymentRequest::new(recipient, amount, decimals);

    let orchestrator = build_orchestrator(config, &args.sandbox)?;
    info!(backend = %args.backend, to = %request.recipient, amount = %request.amount, "starting payment");
    let outcome = orchestrator.pay(args.backend, request).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.message());
    }

    if outcome.severity() == Severity::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn sandbox_template(args: TemplateArgs) -> Result<()> {
    println!("{}", render_template(&args)?);
    Ok(())
}

/// Needs no configuration, so it works even with a broken environment.
fn render_template(args: &TemplateArgs) -> Result<String> {
    let env = if args.bare {
        SandboxEnvironment::bare()
    } else {
        SandboxEnvironment::default()
    };
    Ok(serde_json::to_string_pretty(&env)?)
}

fn build_orchestrator(config: Config, args: &SandboxArgs) -> Result<WalletOrchestrator> {
    let env = load_sandbox(args.sandbox.as_deref())?;
    let (backends, _) = env.into_backends();
    Ok(WalletOrchestrator::new(config.orchestrator, backends))
}

/// Load the sandbox environment. An explicit path must exist; a missing
/// default file means every wallet is installed and approves.
fn load_sandbox(path: Option<&Path>) -> Result<SandboxEnvironment> {
    if let Some(p) = path {
        return SandboxEnvironment::load(p)
            .with_context(|| format!("Failed to load sandbox from {}", p.display()));
    }

    let default = default_sandbox_path()?;
    if !default.exists() {
        info!(path = %default.display(), "no sandbox file, using default environment");
        return Ok(SandboxEnvironment::default());
    }
    SandboxEnvironment::load(&default)
        .with_context(|| format!("Failed to load sandbox from {}", default.display()))
}

fn default_sandbox_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".paygate").join("sandbox.json"))
}
