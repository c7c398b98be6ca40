use clap::Args;
use std::path::PathBuf;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::upload::{UploadClient, UploadFile};

#[derive(Args)]
pub struct UploadArgs {
    #[arg(help = "File to upload")]
    pub path: PathBuf,

    #[arg(long, help = "Destination folder (defaults to receipts)")]
    pub folder: Option<String>,

    #[arg(long, env = "COPYTRADE_TOKEN", help = "Session token to authenticate the upload")]
    pub token: Option<String>,
}

pub async fn handle(args: UploadArgs, server: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut client = UploadClient::new(server)?;
    if let Some(token) = args.token {
        client = client.with_session_token(token);
    }

    let file = UploadFile::from_path(&args.path).await?;
    let uploaded = client.upload_file(&file, args.folder.as_deref()).await?;

    let message = format!("Uploaded {} to {}", args.path.display(), uploaded.url());
    output_success(&output_format, &message, Some(uploaded.into_value()))
}
