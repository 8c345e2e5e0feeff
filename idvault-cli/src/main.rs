//! `idvault`: developer CLI for the local identity vault.
//!
//! The wallet signature is produced outside this tool (any EIP-191 signer
//! over the message printed by `idvault message`) and passed in with
//! `--signature` or `IDVAULT_SIGNATURE`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use idvault_core::identity::did_for_address;
use idvault_core::storage::FileStore;
use idvault_core::{
    Environment, IdentityController, IdentityRecord, SessionKeyCache, StaticSigner, VaultConfig,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

/// Optional overrides for [`VaultConfig`], read from the vault home.
const CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(
    name = "idvault",
    version,
    about = "Local identity vault keyed by a wallet signature"
)]
struct Cli {
    /// Directory holding the vault and an optional `config.json`.
    #[arg(long, env = "IDVAULT_HOME")]
    home: Option<PathBuf>,

    /// Environment used for configuration defaults.
    #[arg(long = "env", env = "IDVAULT_ENV", default_value = "development")]
    environment: Environment,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SignatureArgs {
    /// Wallet signature over the vault signing message.
    #[arg(long, env = "IDVAULT_SIGNATURE", hide_env_values = true)]
    signature: String,
}

#[derive(Subcommand)]
enum Command {
    /// Seal a new identity into the vault.
    Create {
        /// Date of birth as `YYYYMMDD`.
        #[arg(long)]
        dob: u32,
        /// Numeric country code.
        #[arg(long)]
        nationality: u16,
        /// Numeric university code.
        #[arg(long)]
        university: u32,
        /// Student id, if enrolled.
        #[arg(long)]
        student_id: Option<u64>,
        #[command(flatten)]
        signer: SignatureArgs,
    },
    /// Check that the signature opens the vault.
    Unlock {
        #[command(flatten)]
        signer: SignatureArgs,
    },
    /// Print the lifecycle state without decrypting.
    Status,
    /// Delete the vault.
    Purge {
        /// Confirm deletion. The identity cannot be recovered afterwards.
        #[arg(long)]
        yes: bool,
    },
    /// Print the identity commitment and, given an address, its DID.
    Commitment {
        /// Wallet address to derive the DID for.
        #[arg(long)]
        address: Option<String>,
        #[command(flatten)]
        signer: SignatureArgs,
    },
    /// Print the message the wallet must sign.
    Message,
}

impl Command {
    fn signature(&self) -> Option<&str> {
        match self {
            Self::Create { signer, .. } | Self::Unlock { signer } | Self::Commitment { signer, .. } => {
                Some(&signer.signature)
            }
            Self::Status | Self::Purge { .. } | Self::Message => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let home = resolve_home(cli.home)?;
    let config = load_config(&home, cli.environment)?;
    run(cli.command, &home, config).await
}

/// Routes both `tracing` events and the core's `log` records to stderr.
fn init_tracing() -> Result<()> {
    tracing_log::LogTracer::init().wrap_err("failed to capture log records")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("failed to install tracing subscriber")?;
    Ok(())
}

fn resolve_home(home: Option<PathBuf>) -> Result<PathBuf> {
    home.or_else(|| dirs::data_dir().map(|dir| dir.join("idvault")))
        .ok_or_else(|| eyre!("no data directory on this platform; pass --home"))
}

/// Environment defaults overlaid with the keys present in `config.json`.
fn load_config(home: &Path, environment: Environment) -> Result<VaultConfig> {
    let defaults = VaultConfig::from_environment(environment);
    let path = home.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(defaults);
    }

    let raw = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let overrides: Map<String, Value> =
        serde_json::from_str(&raw).wrap_err("config.json must be a JSON object")?;
    let mut merged = serde_json::to_value(defaults)?;
    if let Some(object) = merged.as_object_mut() {
        object.extend(overrides);
    }
    serde_json::from_value(merged).wrap_err("invalid config.json")
}

async fn run(command: Command, home: &Path, config: VaultConfig) -> Result<()> {
    // Read-only commands never prompt, so they get a signer that always fails.
    let signer = StaticSigner::new(command.signature().unwrap_or_default());
    let store = FileStore::open(home)?;
    let mut controller =
        IdentityController::new(store, signer, Arc::new(SessionKeyCache::new()), config)?;
    tracing::debug!(home = %home.display(), state = %controller.state(), "opened vault");

    match command {
        Command::Create {
            dob,
            nationality,
            university,
            student_id,
            ..
        } => {
            let record = IdentityRecord::new(dob, nationality, university, student_id)?;
            controller.create(record).await?;
            let commitment = controller.record()?.identity_hash();
            print_json(&json!({
                "state": controller.state().to_string(),
                "commitment": commitment.map(|c| c.to_hex_string()),
            }))?;
            controller.logout()?;
        }
        Command::Unlock { .. } => {
            controller.unlock().await?;
            let (age, nationality, student) = controller.record()?.verification_hints();
            print_json(&json!({
                "state": controller.state().to_string(),
                "hints": { "age": age, "nationality": nationality, "student": student },
            }))?;
            controller.logout()?;
        }
        Command::Status => {
            let config = controller.config();
            print_json(&json!({
                "state": controller.state().to_string(),
                "home": home.display().to_string(),
                "storageKey": config.storage_key,
                "expectedChainId": config.expected_chain_id,
                "registryAddress": config.registry_address,
            }))?;
        }
        Command::Purge { yes } => {
            if !yes {
                return Err(eyre!("refusing to purge without --yes"));
            }
            controller.purge()?;
            tracing::info!("vault purged");
        }
        Command::Commitment { address, .. } => {
            controller.unlock().await?;
            let record = controller.record()?;
            let commitment = record
                .identity_hash()
                .unwrap_or_else(|| record.compute_commitment());
            let did = address.as_deref().map(did_for_address).transpose()?;
            print_json(&json!({
                "commitment": commitment.to_hex_string(),
                "matchesRecord": record.commitment_matches(),
                "did": did,
            }))?;
            controller.logout()?;
        }
        Command::Message => {
            println!("{}", controller.config().signing_message);
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
