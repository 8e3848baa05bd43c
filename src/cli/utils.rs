use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::config::{AppConfig, KeyPairConfig, DEFAULT_KEY_NAME};

/// Print `value` as pretty JSON, or `text` in text mode
pub fn output<T: Serialize>(output_format: OutputFormat, text: &str, value: &T) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text),
    }
    Ok(())
}

/// Settings as the server would load them, with `.env` honoured
pub fn load_settings() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();
    AppConfig::from_env().context("failed to load settings")
}

/// The `default` key pair, or an error naming the settings that supply it
pub fn default_key_pair(settings: &AppConfig) -> anyhow::Result<&KeyPairConfig> {
    settings.key_pair(DEFAULT_KEY_NAME).with_context(|| {
        format!(
            "no '{}' key pair configured (set asymmetric_encryption.{} or ASYMMETRIC_PRIVATE_KEY / ASYMMETRIC_PUBLIC_KEY)",
            DEFAULT_KEY_NAME, DEFAULT_KEY_NAME
        )
    })
}

/// Parse `key=value`; the value is read as JSON when it parses, otherwise kept as a string
pub fn parse_claim(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("claim name missing in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
