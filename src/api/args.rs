use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::services::ServiceCollection;
use crate::types::{AuthorizationLevel, UserIdentity};

const REDACTED: &str = "[...]";

/// Arguments handed to a service method: merged query and body fields plus the call context
#[derive(Clone)]
pub struct Args {
    pub fields: Map<String, Value>,
    pub context: CallContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthenticationState {
    pub level: AuthorizationLevel,
    pub authorized: bool,
}

/// Per-request context: caller identity plus handles to the request, the
/// response and the host's services and settings
#[derive(Clone)]
pub struct CallContext {
    pub domain: Option<String>,
    pub user: Option<UserIdentity>,
    pub authentication: AuthenticationState,
    pub request: RequestInfo,
    pub response: ResponseHandle,
    pub services: Arc<ServiceCollection>,
    pub settings: Arc<AppConfig>,
}

/// Read-only view of the inbound request
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Lets a handler attach headers to the outgoing response
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    headers: Arc<Mutex<HeaderMap>>,
}

impl ResponseHandle {
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        let mut headers = self.headers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.insert(name, value);
    }

    pub fn headers(&self) -> HeaderMap {
        self.headers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Args {
    /// Required field, deserialized into `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ServiceError> {
        match self.fields.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ServiceError::invalid_argument(key, e.to_string())),
            None => Err(ServiceError::MissingArgument(key.to_string())),
        }
    }

    /// Optional field; present-but-null counts as absent
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ServiceError::invalid_argument(key, e.to_string())),
        }
    }

    /// Deserialize all fields into a typed argument struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ServiceError::invalid_argument("arguments", e.to_string()))
    }

    /// Fields and context with the request, response and host handles blanked out
    pub fn redacted(&self) -> Value {
        let mut value = Value::Object(self.fields.clone());
        value["context"] = json!({
            "domain": self.context.domain,
            "user": self.context.user,
            "authentication": self.context.authentication,
            "request": REDACTED,
            "response": REDACTED,
        });
        value
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.redacted())
    }
}
