//! Shared types used across the codebase

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// HTTP verbs an endpoint can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }

    /// Map an HTTP method onto a routable verb; anything other than GET/POST is unroutable
    pub fn from_method(method: &Method) -> Option<Self> {
        if *method == Method::GET {
            Some(Verb::Get)
        } else if *method == Method::POST {
            Some(Verb::Post)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization requirement attached to every endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorizationLevel {
    #[default]
    RequireAuthorization,
    AllowAnonymous,
}

/// Identity resolved by the authorize service from a token's unique identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    pub unique_identifier: String,
}

/// Classification of entries held by the service locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    DataContext,
    DataService,
    AuthorizeService,
}

/// Last path segment of a type name, with generic arguments removed
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
