use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Map};

use crate::auth::{AuthenticationInfo, TokenIssuer};
use crate::cli::{utils, OutputFormat};
use crate::crypto::{PrivateKey, PublicKey};

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token with the configured public key")]
    Issue {
        #[arg(long, help = "Value of the uniqueIdentifier claim")]
        unique_identifier: String,
        #[arg(long = "claim", value_parser = utils::parse_claim, help = "Extra claim as key=value (repeatable)")]
        claims: Vec<(String, serde_json::Value)>,
    },

    #[command(about = "Decrypt a bearer token with the configured private key")]
    Inspect {
        #[arg(help = "Token, with or without the 'Bearer ' prefix")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let settings = utils::load_settings()?;
    let key_pair = utils::default_key_pair(&settings)?;

    match cmd {
        TokenCommands::Issue { unique_identifier, claims } => {
            let key = PublicKey::from_material(&key_pair.public_key)?;
            let issuer = TokenIssuer::new(key, settings.authentication_token.expires_in_secs);
            let extra: Map<String, serde_json::Value> = claims.into_iter().collect();

            let grant = issuer.issue(&unique_identifier, extra)?;
            let text = format!("{} {}", grant.token_type, grant.access_token);
            utils::output(output_format, &text, &grant)
        }
        TokenCommands::Inspect { token } => {
            let key = PrivateKey::from_material(&key_pair.private_key)?;
            let token = token.trim();
            let token = token.strip_prefix("Bearer ").unwrap_or(token);

            let info = AuthenticationInfo::decrypt(token, &key)?;
            let expires_in = settings.authentication_token.expires_in_secs as i64;
            let expired = info
                .time_stamp()
                .map(|issued| (Utc::now() - issued).num_seconds() >= expires_in)
                .ok();

            let report = json!({
                "claims": info.claims(),
                "expired": expired,
            });
            let text = serde_json::to_string_pretty(&report)?;
            utils::output(output_format, &text, &report)
        }
    }
}
