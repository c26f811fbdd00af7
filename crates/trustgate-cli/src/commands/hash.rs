// crates/trustgate-cli/src/commands/hash.rs
//
// `trustgate snapshot-hash`: the canonical hash the authority anchors.

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use trustgate_core::encoding::decode_fixed;
use trustgate_core::snapshot::{Tier, TrustSnapshot};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SnapshotHashCmd {
    #[arg(long)]
    pub score: u8,
    #[arg(long)]
    pub tier: u8,
    #[arg(long)]
    pub model_version: String,
    /// Hex SHA-256 of the feature vector.
    #[arg(long)]
    pub feature_vector_hash: String,
    /// RFC 3339 timestamp; truncated to milliseconds.
    #[arg(long)]
    pub snapshot_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct SnapshotHashRow {
    snapshot_hash: String,
    snapshot_time: String,
}

fn compute(cmd: &SnapshotHashCmd) -> Result<TrustSnapshot, Box<dyn std::error::Error>> {
    let feature_vector_hash = decode_fixed::<32>(&cmd.feature_vector_hash)?;
    // The subject is not part of the hash.
    let snapshot = TrustSnapshot::new(
        Uuid::nil(),
        cmd.score,
        Tier::new(cmd.tier),
        cmd.model_version.clone(),
        feature_vector_hash,
        cmd.snapshot_time,
    )?;
    Ok(snapshot)
}

pub fn run(cmd: &SnapshotHashCmd, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = compute(cmd)?;
    let row = SnapshotHashRow {
        snapshot_hash: hex::encode(snapshot.snapshot_hash),
        snapshot_time: snapshot.snapshot_time.to_rfc3339(),
    };
    output::print(format, &row, |r| vec![r.clone()]);
    Ok(())
}
