use clap::Args;

use crate::auth::TokenVerifier;
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(help = "User id to put in the token subject")]
    pub uid: String,

    #[arg(long, help = "Set the admin hint in the claims")]
    pub admin: bool,

    #[arg(long, help = "Lifetime in hours (defaults to SESSION_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = &config().session;
    if session.secret.is_empty() {
        anyhow::bail!("SESSION_SECRET is not configured");
    }

    let verifier = TokenVerifier::new(session.secret.clone(), args.hours.unwrap_or(session.expiry_hours));
    let token = verifier.issue(&args.uid, args.admin)?;
    output_value(&output_format, "token", &token)
}
