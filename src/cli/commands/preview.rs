use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::upload::read_as_base64;

#[derive(Args)]
pub struct PreviewArgs {
    #[arg(help = "File to encode")]
    pub path: PathBuf,
}

pub async fn handle(args: PreviewArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let data_url = read_as_base64(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    output_value(&output_format, "dataUrl", &data_url)
}
