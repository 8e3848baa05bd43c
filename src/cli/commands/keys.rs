use std::collections::BTreeMap;

use clap::Subcommand;
use serde::Serialize;

use crate::cli::{utils, OutputFormat};
use crate::config::{KeyPairConfig, DEFAULT_KEY_NAME};
use crate::crypto::generate_key_pair;

#[derive(Subcommand)]
pub enum KeysCommands {
    #[command(about = "Generate an RSA key pair as settings YAML")]
    Generate {
        #[arg(long, default_value_t = 2048, help = "Modulus size in bits")]
        bits: usize,
    },
}

#[derive(Serialize)]
struct KeySettings {
    asymmetric_encryption: BTreeMap<&'static str, KeyPairConfig>,
}

pub async fn handle(cmd: KeysCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        KeysCommands::Generate { bits } => {
            if bits < 1024 {
                anyhow::bail!("refusing to generate a {}-bit key; use at least 1024", bits);
            }

            // RSA generation is CPU bound
            let (private_key, public_key) = tokio::task::spawn_blocking(move || generate_key_pair(bits)).await??;
            tracing::debug!(bits, "key pair generated");

            let mut asymmetric_encryption = BTreeMap::new();
            asymmetric_encryption.insert(DEFAULT_KEY_NAME, KeyPairConfig { private_key, public_key });
            let settings = KeySettings { asymmetric_encryption };

            let yaml = serde_yaml::to_string(&settings)?;
            utils::output(output_format, yaml.trim_end(), &settings)
        }
    }
}
