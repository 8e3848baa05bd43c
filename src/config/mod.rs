use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Name of the key pair used to decrypt bearer tokens
pub const DEFAULT_KEY_NAME: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    /// Include raw errors and call arguments in failure envelopes
    pub debug: bool,
    pub server: ServerConfig,
    pub authentication_token: AuthenticationTokenConfig,
    pub asymmetric_encryption: HashMap<String, KeyPairConfig>,
    pub security: SecurityConfig,
    /// YAML list of identities served by the built-in user directory
    pub users_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationTokenConfig {
    /// Token lifetime, measured in seconds from the token's embedded timeStamp
    pub expires_in_secs: u64,
}

/// Key material as stored in settings: either full PEM or the bare base64 body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyPairConfig {
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins; empty or "*" allows any origin
    pub cors_origins: Vec<String>,
}

impl Environment {
    /// `APP_ENV` value; unknown names fall back to Development
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// Environment defaults, then the optional YAML settings file, then env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_env = env::var("APP_ENV").ok().map(|v| Environment::from_name(&v));

        let mut config = match env::var("API_HOST_SETTINGS") {
            Ok(path) => {
                let mut config = Self::from_yaml_file(PathBuf::from(path))?;
                if let Some(environment) = app_env {
                    config.environment = environment;
                }
                config
            }
            Err(_) => Self::for_environment(app_env.unwrap_or(Environment::Development)),
        };

        config.apply_env_overrides()?;
        // the Test environment always runs in debug mode
        config.debug |= config.environment == Environment::Test;
        Ok(config)
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Test => Self::test(),
            Environment::Development => Self::development(),
        }
    }

    pub fn from_yaml_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value: v.clone() })?;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_BODY_SIZE") {
            self.server.max_request_body_size = parse_byte_size(&v).ok_or(ConfigError::InvalidValue {
                name: "API_MAX_REQUEST_BODY_SIZE",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = env::var("AUTH_TOKEN_EXPIRES_IN") {
            self.authentication_token.expires_in_secs = v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "AUTH_TOKEN_EXPIRES_IN",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = env::var("DEBUG") {
            self.debug = v.parse().unwrap_or(self.debug);
        }
        if let Ok(v) = env::var("ASYMMETRIC_PRIVATE_KEY") {
            self.asymmetric_encryption
                .entry(DEFAULT_KEY_NAME.to_string())
                .or_default()
                .private_key = v;
        }
        if let Ok(v) = env::var("ASYMMETRIC_PUBLIC_KEY") {
            self.asymmetric_encryption
                .entry(DEFAULT_KEY_NAME.to_string())
                .or_default()
                .public_key = v;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("API_HOST_USERS_FILE") {
            self.users_file = Some(PathBuf::from(v));
        }

        Ok(())
    }

    pub fn key_pair(&self, name: &str) -> Option<&KeyPairConfig> {
        self.asymmetric_encryption.get(name)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            debug: false,
            server: ServerConfig {
                port: 4000,
                max_request_body_size: 50 * 1024 * 1024, // 50MB
            },
            authentication_token: AuthenticationTokenConfig { expires_in_secs: 3600 },
            asymmetric_encryption: HashMap::new(),
            security: SecurityConfig { cors_origins: Vec::new() },
            users_file: None,
        }
    }

    fn test() -> Self {
        Self {
            environment: Environment::Test,
            debug: true,
            ..Self::development()
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            debug: false,
            server: ServerConfig {
                port: 4000,
                max_request_body_size: 10 * 1024 * 1024, // 10MB
            },
            authentication_token: AuthenticationTokenConfig { expires_in_secs: 3600 },
            asymmetric_encryption: HashMap::new(),
            security: SecurityConfig { cors_origins: Vec::new() },
            users_file: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            debug: false,
            server: ServerConfig {
                port: 4000,
                max_request_body_size: 2 * 1024 * 1024, // 2MB
            },
            authentication_token: AuthenticationTokenConfig { expires_in_secs: 3600 },
            asymmetric_encryption: HashMap::new(),
            security: SecurityConfig { cors_origins: Vec::new() },
            users_file: None,
        }
    }
}

/// Parse sizes such as "50mb", "512kb", "1gb" or a plain byte count
pub fn parse_byte_size(raw: &str) -> Option<usize> {
    let raw = raw.trim().to_ascii_lowercase();
    let digits_end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (number, unit) = raw.split_at(digits_end);
    let number: usize = number.parse().ok()?;

    let multiplier = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };

    number.checked_mul(multiplier)
}
