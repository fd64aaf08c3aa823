//! wallet-cli: command-line access to the wallet service.
//!
//! Every command prints its result as JSON on stdout. Logs go to stderr.
//! Key material is read from the environment so it stays out of shell
//! history.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bitcoin::{Amount, Denomination};
use chain_btc::address::AddressKind;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;
use wallet_core::config::{Settings, DEFAULT_CONFIG_PATH};
use wallet_core::deriver::Deriver;
use wallet_core::logging::init_logging;
use wallet_core::WalletService;

#[derive(Parser)]
#[command(name = "wallet-cli")]
#[command(version, about = "Non-custodial Bitcoin wallet")]
struct Cli {
    /// YAML settings file; `WALLET__...` environment variables override it.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new 12-word wallet.
    Create(TypeArgs),
    /// Re-derive a wallet from its recovery phrase.
    Import(ImportArgs),
    /// Show the address type and balance of an address.
    Show { address: String },
    /// Verbose transaction history, newest first.
    History { address: String },
    /// Draft an unsigned transaction.
    Prepare(PaymentArgs),
    /// Broadcast a signed raw transaction.
    Broadcast { raw_hex: String },
    /// Draft, sign and broadcast in one step. The WIF key controlling
    /// `--from` is read from `WALLET_PRIVATE_KEY`.
    Send(PaymentArgs),
}

#[derive(Args)]
struct TypeArgs {
    /// p2pkh, p2sh or p2wpkh. Defaults to p2wpkh.
    #[arg(short = 't', long = "type")]
    address_type: Option<AddressKind>,
}

#[derive(Args)]
struct ImportArgs {
    #[command(flatten)]
    kind: TypeArgs,

    #[arg(long, env = "WALLET_RECOVERY_PHRASE", hide_env_values = true)]
    phrase: String,
}

#[derive(Args)]
struct PaymentArgs {
    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    /// Amount in BTC, e.g. 0.0003.
    #[arg(short, long, value_parser = parse_btc)]
    amount: Amount,

    /// Change destination. Defaults to the source address.
    #[arg(long)]
    change: Option<String>,
}

const PRIVATE_KEY_VAR: &str = "WALLET_PRIVATE_KEY";

fn parse_btc(value: &str) -> Result<Amount, String> {
    Amount::from_str_in(value, Denomination::Bitcoin).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;
    init_logging(settings.debug);
    debug!(env = %settings.env, network = %settings.btc.network, "settings loaded");

    match cli.command {
        Commands::Create(args) => {
            let deriver = offline_deriver(&settings)?;
            print_json(&deriver.generate(args.address_type)?)
        }
        Commands::Import(args) => {
            let deriver = offline_deriver(&settings)?;
            print_json(&deriver.derive(&args.phrase, args.kind.address_type)?)
        }
        Commands::Show { address } => {
            let summary = connect(&settings)?.get_wallet(&address).await?;
            print_json(&summary)
        }
        Commands::History { address } => {
            let history = connect(&settings)?.get_history(&address).await?;
            print_json(&history)
        }
        Commands::Prepare(args) => {
            let draft = connect(&settings)?
                .prepare_transaction(&args.from, &args.to, args.change.as_deref(), args.amount)
                .await?;
            print_json(&draft)
        }
        Commands::Broadcast { raw_hex } => {
            let ack = connect(&settings)?.broadcast_transaction(&raw_hex).await?;
            print_json(&ack)
        }
        Commands::Send(payment) => {
            let key = private_key_from_env()?;
            let result = connect(&settings)?
                .send(
                    &key,
                    &payment.from,
                    &payment.to,
                    payment.change.as_deref(),
                    payment.amount,
                )
                .await?;
            print_json(&result)
        }
    }
}

/// Derivation needs no backends, so create/import work offline.
fn offline_deriver(settings: &Settings) -> Result<Deriver> {
    let registry = settings.btc.registry().context("Invalid address type table")?;
    Ok(Deriver::new(Arc::new(registry)))
}

fn private_key_from_env() -> Result<SecretString> {
    let wif = std::env::var(PRIVATE_KEY_VAR).with_context(|| format!("{PRIVATE_KEY_VAR} is not set"))?;
    Ok(SecretString::from(wif))
}

fn connect(settings: &Settings) -> Result<WalletService> {
    WalletService::connect(&settings.btc).context("Failed to reach the chain backends")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
