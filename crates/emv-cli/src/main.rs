use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use emv_ca_keys::KeyRegistry;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod dump_file;
mod formatters;
use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "emv-verify")]
#[command(about = "EMV Offline Data Authentication - Verify certificate chains and signatures from card dumps")]
#[command(version)]
struct Args {
    /// CA public key table to use instead of the built-in one
    #[arg(long, global = true, value_name = "FILE")]
    ca_keys: Option<PathBuf>,

    /// Output format mode
    #[arg(short, long, global = true, value_enum, default_value_t = FormatMode::Human)]
    format: FormatMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the offline data authentication of one or more card dumps
    Verify {
        #[arg(required = true, value_name = "DUMP")]
        dumps: Vec<PathBuf>,
    },
    /// Print every data object of a card dump
    Dump {
        #[arg(value_name = "DUMP")]
        dump: PathBuf,
    },
    /// List the CA public keys
    Keys {
        /// Only list keys of this Registered Application Provider Identifier (hex)
        #[arg(long)]
        rid: Option<String>,
    },
}

fn main() -> ExitCode {
    // Initialize tracing subscriber with environment-based filtering
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=trace for very verbose
    // Default: info level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let registry = match &args.ca_keys {
        Some(path) => match KeyRegistry::load(path) {
            Ok(registry) => registry,
            Err(err) => {
                eprintln!("Failed to load CA public keys from {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => KeyRegistry::embedded(),
    };
    debug!(keys = registry.len(), "CA public key registry ready");

    let success = match args.command {
        Command::Verify { dumps } => commands::verify::run(&dumps, &registry, args.format),
        Command::Dump { dump } => commands::dump::run(&dump, args.format),
        Command::Keys { rid } => commands::keys::run(&registry, rid.as_deref(), args.format),
    };

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
