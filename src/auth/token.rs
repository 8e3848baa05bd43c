use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::crypto::{CryptoError, PrivateKey, PublicKey};

/// Separator between independently encrypted token chunks
pub const CHUNK_SEPARATOR: char = ';';

pub const TIME_STAMP_CLAIM: &str = "timeStamp";
pub const UNIQUE_IDENTIFIER_CLAIM: &str = "uniqueIdentifier";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,

    #[error("Token chunk {index} could not be decrypted: {source}")]
    Decrypt {
        index: usize,
        #[source]
        source: CryptoError,
    },

    #[error("Token chunk {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("Token chunk {index} is not valid JSON: {source}")]
    Json {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("Invalid claim '{claim}': {reason}")]
    InvalidClaim { claim: &'static str, reason: String },

    #[error("Encrypting claim '{claim}' failed: {source}")]
    Encrypt {
        claim: String,
        #[source]
        source: CryptoError,
    },
}

/// Claims recovered from a bearer token, merged across all of its chunks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticationInfo {
    claims: Map<String, Value>,
}

impl AuthenticationInfo {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// Decrypt every `;`-separated chunk and merge the resulting objects left to right
    pub fn decrypt(token: &str, key: &PrivateKey) -> Result<Self, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        let mut info = Self::default();
        for (index, chunk) in token.split(CHUNK_SEPARATOR).enumerate() {
            let plaintext = key
                .decrypt(chunk)
                .map_err(|source| TokenError::Decrypt { index, source })?;
            let value: Value = serde_json::from_str(&plaintext)
                .map_err(|source| TokenError::Json { index, source })?;
            match value {
                Value::Object(claims) => info.merge(claims),
                _ => return Err(TokenError::NotAnObject { index }),
            }
        }

        Ok(info)
    }

    /// Later claims overwrite earlier ones
    pub fn merge(&mut self, claims: Map<String, Value>) {
        self.claims.extend(claims);
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }

    pub fn unique_identifier(&self) -> Result<&str, TokenError> {
        match self.claims.get(UNIQUE_IDENTIFIER_CLAIM) {
            Some(Value::String(id)) => Ok(id),
            Some(other) => Err(TokenError::InvalidClaim {
                claim: UNIQUE_IDENTIFIER_CLAIM,
                reason: format!("expected a string, found {}", other),
            }),
            None => Err(TokenError::MissingClaim(UNIQUE_IDENTIFIER_CLAIM)),
        }
    }

    /// Issue time of the token. Accepts RFC 3339, naive ISO-8601 (read as UTC)
    /// or epoch milliseconds.
    pub fn time_stamp(&self) -> Result<DateTime<Utc>, TokenError> {
        let invalid = |reason: String| TokenError::InvalidClaim { claim: TIME_STAMP_CLAIM, reason };

        match self.claims.get(TIME_STAMP_CLAIM) {
            Some(Value::String(raw)) => parse_time_stamp(raw).ok_or_else(|| invalid(format!("unparseable date '{}'", raw))),
            Some(Value::Number(millis)) => millis
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .ok_or_else(|| invalid(format!("out of range epoch value {}", millis))),
            Some(other) => Err(invalid(format!("expected a date, found {}", other))),
            None => Err(TokenError::MissingClaim(TIME_STAMP_CLAIM)),
        }
    }
}

fn parse_time_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    // date-only strings are midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    // `Wed, 01 May 2024 12:30:00 GMT`
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // `Wed May 01 2024 14:30:00 GMT+0200 (Central European Summer Time)`
    let without_zone_name = raw.split(" (").next().unwrap_or(raw);
    DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Grant returned to clients that request an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Builds bearer tokens by encrypting each claim as its own chunk, which keeps
/// every chunk under the RSA plaintext size limit.
pub struct TokenIssuer {
    key: PublicKey,
    expires_in_secs: u64,
}

impl TokenIssuer {
    pub fn new(key: PublicKey, expires_in_secs: u64) -> Self {
        Self { key, expires_in_secs }
    }

    /// Token for `unique_identifier` stamped with the current time, plus extra claims
    pub fn issue(&self, unique_identifier: &str, extra: Map<String, Value>) -> Result<AuthorizationToken, TokenError> {
        let mut claims = Map::new();
        claims.insert(TIME_STAMP_CLAIM.to_string(), Value::String(Utc::now().to_rfc3339()));
        claims.insert(UNIQUE_IDENTIFIER_CLAIM.to_string(), Value::String(unique_identifier.to_string()));
        claims.extend(extra);

        Ok(AuthorizationToken {
            access_token: self.encrypt_claims(&claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.expires_in_secs,
        })
    }

    /// Encrypt an arbitrary claim map, one chunk per claim
    pub fn encrypt_claims(&self, claims: &Map<String, Value>) -> Result<String, TokenError> {
        let chunks = claims
            .iter()
            .map(|(claim, value)| {
                let mut single = Map::new();
                single.insert(claim.clone(), value.clone());
                let plaintext = Value::Object(single).to_string();
                self.key
                    .encrypt(&plaintext)
                    .map_err(|source| TokenError::Encrypt { claim: claim.clone(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if chunks.is_empty() {
            return Err(TokenError::Empty);
        }

        Ok(chunks.join(&CHUNK_SEPARATOR.to_string()))
    }
}
