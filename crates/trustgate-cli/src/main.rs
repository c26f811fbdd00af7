// crates/trustgate-cli/src/main.rs
//
// CLI entrypoint for the Trustgate operator tools.
//
// Provides subcommands for managing the attestation authority key,
// computing canonical snapshot hashes, signing attestation updates, and
// calling the daemon's HTTP API.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::api::{SubmitCmd, VerifyCmd};
use commands::attest::SignCmd;
use commands::hash::SnapshotHashCmd;
use commands::keys::{AddressCmd, KeygenCmd};
use output::OutputFormat;

/// Trustgate CLI: authority and operator tools.
#[derive(Parser, Debug)]
#[command(
    name = "trustgate",
    version = "0.1.0",
    about = "Trustgate operator CLI: attestation keys, snapshot hashes, and API calls"
)]
struct Cli {
    /// Base URL of the trustgate-daemon API.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    api: String,

    /// Bearer token for API calls.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate an ed25519 authority key pair.
    Keygen(KeygenCmd),

    /// Derive the registry address of a public key.
    Address(AddressCmd),

    /// Compute the canonical hash of a trust snapshot.
    SnapshotHash(SnapshotHashCmd),

    /// Sign an attestation update and print the request body.
    Sign(SignCmd),

    /// Submit a signed attestation to the daemon.
    Submit(SubmitCmd),

    /// Ask the daemon to reconcile a user's snapshot with its anchor.
    Verify(VerifyCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Keygen(cmd) => commands::keys::keygen(cmd)?,
        Commands::Address(cmd) => commands::keys::address(cmd)?,
        Commands::SnapshotHash(cmd) => commands::hash::run(cmd, &cli.format)?,
        Commands::Sign(cmd) => commands::attest::run(cmd)?,
        Commands::Submit(cmd) => {
            commands::api::submit(&cli.api, cli.token.as_deref(), cmd, &cli.format).await?
        }
        Commands::Verify(cmd) => {
            commands::api::verify(&cli.api, cli.token.as_deref(), cmd, &cli.format).await?
        }
    }

    Ok(())
}
