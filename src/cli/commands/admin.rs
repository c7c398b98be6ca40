use anyhow::Context;
use clap::Subcommand;
use reqwest::Method;
use serde_json::{json, Value};

use crate::auth::SERVICE_KEY_HEADER;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

const CLAIM_PATH: &str = "/api/admin/claim";

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Mark a user as admin")]
    Grant {
        #[arg(help = "User id")]
        uid: String,
    },

    #[command(about = "Remove the admin mark from a user")]
    Revoke {
        #[arg(help = "User id")]
        uid: String,
    },
}

pub async fn handle(cmd: AdminCommands, server: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let (method, uid, verb) = match cmd {
        AdminCommands::Grant { uid } => (Method::POST, uid, "granted"),
        AdminCommands::Revoke { uid } => (Method::DELETE, uid, "revoked"),
    };

    let service_key = std::env::var("ADMIN_SERVICE_KEY")
        .context("ADMIN_SERVICE_KEY must be set to change admin claims")?;

    let response = reqwest::Client::new()
        .request(method, format!("{}{}", server, CLAIM_PATH))
        .header(SERVICE_KEY_HEADER, service_key)
        .json(&json!({ "uid": uid }))
        .send()
        .await
        .with_context(|| format!("failed to reach {}", server))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("claim request failed")
            .to_string();
        output_error(&output_format, &message, body.get("code").and_then(Value::as_str))?;
        anyhow::bail!("server responded with {}", status);
    }

    output_success(
        &output_format,
        &format!("Admin claim {} for {}", verb, uid),
        body.get("data").cloned(),
    )
}
