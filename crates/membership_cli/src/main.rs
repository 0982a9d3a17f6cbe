//! Membership Registry Command Line Interface
//!
//! Runs operation scripts against an in-memory registry and exposes the
//! username codec for inspection.

mod script;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use membership_types::{FixedText, FIXED_TEXT_CAPACITY};
use script::{parse_script, ScriptRunner};
use settings::CliConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "membership-cli")]
#[command(about = "Membership Registry Command Line Interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON operation script and print one outcome per line
    Run {
        /// Script file (JSON array of operations)
        script: PathBuf,
    },
    /// Show the 32-byte encoded form of a username
    Encode {
        username: String,
    },
    /// Decode a hex-encoded 32-byte username
    Decode {
        hex: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { script } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            init_logging(&config);
            run_script(&config, &script)
        }
        Commands::Encode { username } => {
            let encoded = FixedText::encode(&username)?;
            println!("0x{}", hex::encode(encoded.as_bytes()));
            Ok(())
        }
        Commands::Decode { hex } => {
            println!("{}", decode_hex(&hex)?.decode());
            Ok(())
        }
    }
}

fn run_script(config: &CliConfig, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let operations = parse_script(&raw)?;
    info!(path = %path.display(), operations = operations.len(), "running script");

    let runner = ScriptRunner::new(config)?;
    let mut failures = 0usize;
    for outcome in runner.run(operations) {
        if !outcome.is_ok() {
            failures += 1;
        }
        println!("{}", serde_json::to_string(&outcome)?);
    }
    info!(failures, "script finished");
    Ok(())
}

fn decode_hex(value: &str) -> Result<FixedText> {
    let payload = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(payload).context("username must be hex encoded")?;
    if bytes.len() > FIXED_TEXT_CAPACITY {
        anyhow::bail!(
            "encoded username is {} bytes, at most {} allowed",
            bytes.len(),
            FIXED_TEXT_CAPACITY
        );
    }
    Ok(FixedText::from_bytes_truncating(&bytes))
}

fn init_logging(config: &CliConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "compact" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
