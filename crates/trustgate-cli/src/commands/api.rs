// crates/trustgate-cli/src/commands/api.rs
//
// `trustgate submit` and `trustgate verify`: calls against the daemon API.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use crate::rpc_client::ApiClient;

#[derive(Debug, Args)]
pub struct SubmitCmd {
    /// JSON file produced by `trustgate sign`.
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct VerifyCmd {
    /// User id (UUID).
    #[arg(long)]
    pub user: String,
}

#[derive(Debug, Tabled)]
struct FieldRow {
    field: String,
    value: String,
}

/// Flatten a JSON object into field/value rows.
fn rows(value: &serde_json::Value) -> Vec<FieldRow> {
    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| FieldRow {
                field: k.clone(),
                value: match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => "-".to_string(),
                    other => other.to_string(),
                },
            })
            .collect(),
        None => vec![FieldRow {
            field: "result".to_string(),
            value: value.to_string(),
        }],
    }
}

pub async fn submit(
    api: &str,
    token: Option<&str>,
    cmd: &SubmitCmd,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let body: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cmd.file)?)?;
    let client = ApiClient::new(api, token);
    let event = client.post("/api/registry/attestations", &body).await?;
    output::print(format, &event, rows);
    Ok(())
}

pub async fn verify(
    api: &str,
    token: Option<&str>,
    cmd: &VerifyCmd,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(api, token);
    let verdict = client
        .get(&format!("/api/verification/user/{}", cmd.user))
        .await?;
    output::print(format, &verdict, rows);
    Ok(())
}
