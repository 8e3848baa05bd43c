//! Bearer-token authentication.
//!
//! A protected request carries `Authorization: Bearer <chunk>;<chunk>...`. Every
//! chunk is decrypted with the deployment's private key, the claims are merged,
//! the `timeStamp` claim is checked against the configured lifetime and the
//! `uniqueIdentifier` claim is confirmed through the authorize service. Every
//! failure collapses to "unauthorized"; the tagged [`AuthOutcome`] only feeds
//! logging and tests.

pub mod token;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::crypto::PrivateKey;
use crate::services::AuthorizeService;
use crate::types::{AuthorizationLevel, UserIdentity};
pub use token::{AuthenticationInfo, AuthorizationToken, TokenError, TokenIssuer};

const BEARER_PREFIX: &str = "Bearer ";

/// Why an authentication attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    /// Endpoint allows anonymous access
    Anonymous,
    Authenticated,
    MissingHeader,
    MalformedHeader,
    DecryptFailure,
    InvalidClaims,
    Expired,
    LookupFailure,
    IdentityMismatch,
    /// Protected endpoint but no key or authorize service configured
    Unconfigured,
}

impl AuthOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthOutcome::Anonymous => "anonymous",
            AuthOutcome::Authenticated => "authenticated",
            AuthOutcome::MissingHeader => "missing_header",
            AuthOutcome::MalformedHeader => "malformed_header",
            AuthOutcome::DecryptFailure => "decrypt_failure",
            AuthOutcome::InvalidClaims => "invalid_claims",
            AuthOutcome::Expired => "expired",
            AuthOutcome::LookupFailure => "lookup_failure",
            AuthOutcome::IdentityMismatch => "identity_mismatch",
            AuthOutcome::Unconfigured => "unconfigured",
        }
    }
}

impl std::fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one authentication attempt
#[derive(Debug, Clone)]
pub struct Authentication {
    pub authorized: bool,
    pub user: Option<UserIdentity>,
    pub outcome: AuthOutcome,
}

impl Authentication {
    fn granted(user: Option<UserIdentity>, outcome: AuthOutcome) -> Self {
        Self { authorized: true, user, outcome }
    }

    fn denied(outcome: AuthOutcome) -> Self {
        Self { authorized: false, user: None, outcome }
    }
}

pub struct Authenticator {
    key: Option<PrivateKey>,
    authorize: Option<Arc<dyn AuthorizeService>>,
    expires_in: Duration,
}

impl Authenticator {
    pub fn new(
        key: Option<PrivateKey>,
        authorize: Option<Arc<dyn AuthorizeService>>,
        expires_in_secs: u64,
    ) -> Self {
        let secs = i64::try_from(expires_in_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        let expires_in = Duration::seconds(secs);
        Self { key, authorize, expires_in }
    }

    pub async fn authenticate(&self, level: AuthorizationLevel, header: Option<&str>) -> Authentication {
        self.authenticate_at(level, header, Utc::now()).await
    }

    pub(crate) async fn authenticate_at(
        &self,
        level: AuthorizationLevel,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Authentication {
        let started = Instant::now();
        let result = match level {
            AuthorizationLevel::AllowAnonymous => Authentication::granted(None, AuthOutcome::Anonymous),
            AuthorizationLevel::RequireAuthorization => self.verify_bearer(header, now).await,
        };

        tracing::debug!(
            level = ?level,
            authorized = result.authorized,
            outcome = %result.outcome,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "authentication completed"
        );
        result
    }

    async fn verify_bearer(&self, header: Option<&str>, now: DateTime<Utc>) -> Authentication {
        let header = match header {
            Some(header) => header,
            None => return Authentication::denied(AuthOutcome::MissingHeader),
        };
        let token = match header.strip_prefix(BEARER_PREFIX) {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Authentication::denied(AuthOutcome::MalformedHeader),
        };

        let (key, authorize) = match (&self.key, &self.authorize) {
            (Some(key), Some(authorize)) => (key, authorize),
            _ => {
                tracing::error!("protected endpoint reached without a private key or authorize service");
                return Authentication::denied(AuthOutcome::Unconfigured);
            }
        };

        let info = match AuthenticationInfo::decrypt(token, key) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "bearer token rejected");
                return Authentication::denied(AuthOutcome::DecryptFailure);
            }
        };

        let (time_stamp, unique_identifier) = match (info.time_stamp(), info.unique_identifier()) {
            (Ok(ts), Ok(id)) => (ts, id),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "bearer token claims rejected");
                return Authentication::denied(AuthOutcome::InvalidClaims);
            }
        };

        let elapsed = now - time_stamp;
        if elapsed >= self.expires_in {
            tracing::warn!(
                elapsed_secs = elapsed.num_seconds(),
                expires_in_secs = self.expires_in.num_seconds(),
                "bearer token expired"
            );
            return Authentication::denied(AuthOutcome::Expired);
        }

        tracing::debug!(unique_identifier = %unique_identifier, "authorize");
        let user = match authorize.authorize(unique_identifier).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "authorize service failed");
                return Authentication::denied(AuthOutcome::LookupFailure);
            }
        };

        match user {
            Some(user) if user.unique_identifier == unique_identifier => {
                Authentication::granted(Some(user), AuthOutcome::Authenticated)
            }
            _ => {
                tracing::warn!(unique_identifier = %unique_identifier, "user authentication failed");
                Authentication::denied(AuthOutcome::IdentityMismatch)
            }
        }
    }
}
