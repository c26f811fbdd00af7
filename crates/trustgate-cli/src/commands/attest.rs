// crates/trustgate-cli/src/commands/attest.rs
//
// `trustgate sign`: produce a signed `{update, signature}` body for
// `POST /api/registry/attestations`.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde::Serialize;

use trustgate_core::address::Address;
use trustgate_core::attestation::{AttestationSignature, AttestationUpdate, RegistryDomain};
use trustgate_core::crypto::Keypair;
use trustgate_core::encoding::decode_fixed;
use trustgate_core::snapshot::Tier;

use crate::commands::keys::load_keypair;
use crate::output::format_json;

#[derive(Debug, Args)]
pub struct SignCmd {
    /// Authority secret key file written by `keygen`.
    #[arg(long)]
    pub key: PathBuf,
    /// Wallet address the tier applies to.
    #[arg(long)]
    pub subject: Address,
    #[arg(long)]
    pub tier: u8,
    /// Hex canonical snapshot hash (see `snapshot-hash`).
    #[arg(long)]
    pub snapshot_hash: String,
    /// Seconds from now until the anchor expires.
    #[arg(long, default_value_t = 86_400)]
    pub expires_in: i64,
    /// Must exceed the subject's currently anchored nonce.
    #[arg(long)]
    pub nonce: u64,
    #[arg(long, default_value_t = 31337)]
    pub chain_id: u64,
    /// Registry address the signature is bound to.
    #[arg(long)]
    pub registry: Address,
}

#[derive(Debug, Serialize)]
struct SignedAttestation {
    update: AttestationUpdate,
    signature: AttestationSignature,
}

fn sign(cmd: &SignCmd, keypair: &Keypair, now_unix: i64) -> Result<SignedAttestation, Box<dyn std::error::Error>> {
    if cmd.expires_in <= 0 {
        return Err("--expires-in must be positive".into());
    }
    let update = AttestationUpdate {
        subject: cmd.subject,
        tier: Tier::new(cmd.tier),
        snapshot_hash: decode_fixed::<32>(&cmd.snapshot_hash)?,
        expires_at: now_unix.saturating_add(cmd.expires_in),
        nonce: cmd.nonce,
    };
    let domain = RegistryDomain {
        registry_address: cmd.registry,
        chain_id: cmd.chain_id,
    };
    let signature = update.sign(&domain, keypair);
    Ok(SignedAttestation { update, signature })
}

pub fn run(cmd: &SignCmd) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = load_keypair(&cmd.key)?;
    let signed = sign(cmd, &keypair, Utc::now().timestamp())?;
    println!("{}", format_json(&signed));
    Ok(())
}
