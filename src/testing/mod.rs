//! Fixtures shared by the unit tests: a key pair generated once per test
//! binary, token helpers and small in-memory services.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::api::{
    Args, AuthenticationState, CallContext, DispatchRequest, Dispatcher, EndpointDescriptor, RequestInfo,
    ResponseHandle, RouteRegistry,
};
use crate::auth::{Authenticator, TokenIssuer};
use crate::config::{AppConfig, Environment};
use crate::crypto::{generate_key_pair, PrivateKey, PublicKey};
use crate::error::ServiceError;
use crate::services::{AuthorizeService, DataContext, DataService, ServiceCollection, ServiceEntry};
use crate::types::{AuthorizationLevel, UserIdentity};

pub struct TestKeys {
    pub private: PrivateKey,
    pub public: PublicKey,
    pub private_material: String,
    pub public_material: String,
}

static KEYS: Lazy<TestKeys> = Lazy::new(|| {
    // 1024 bits keeps key generation fast in debug builds
    let (private_material, public_material) = generate_key_pair(1024).expect("generate test key pair");
    TestKeys {
        private: PrivateKey::from_material(&private_material).expect("parse test private key"),
        public: PublicKey::from_material(&public_material).expect("parse test public key"),
        private_material,
        public_material,
    }
});

pub fn test_keys() -> &'static TestKeys {
    &KEYS
}

/// `Bearer <chunks>` carrying `claims`, one encrypted chunk per claim
pub fn bearer(claims: &Value) -> String {
    let claims = claims.as_object().cloned().unwrap_or_default();
    let token = TokenIssuer::new(test_keys().public.clone(), 3600)
        .encrypt_claims(&claims)
        .expect("encrypt test claims");
    format!("Bearer {}", token)
}

pub enum StaticAuthorize {
    /// Knows exactly one user
    User(UserIdentity),
    /// Returns the same identity whatever it is asked
    Answering(UserIdentity),
    Failing,
}

impl StaticAuthorize {
    pub fn with_user(id: i64, name: &str, unique_identifier: &str) -> Self {
        StaticAuthorize::User(UserIdentity {
            id,
            name: name.to_string(),
            unique_identifier: unique_identifier.to_string(),
        })
    }

    pub fn answering(user: UserIdentity) -> Self {
        StaticAuthorize::Answering(user)
    }

    pub fn failing() -> Self {
        StaticAuthorize::Failing
    }
}

#[async_trait]
impl AuthorizeService for StaticAuthorize {
    async fn authorize(&self, unique_identifier: &str) -> Result<Option<UserIdentity>, ServiceError> {
        match self {
            StaticAuthorize::User(user) if user.unique_identifier == unique_identifier => Ok(Some(user.clone())),
            StaticAuthorize::User(_) => Ok(None),
            StaticAuthorize::Answering(user) => Ok(Some(user.clone())),
            StaticAuthorize::Failing => Err(ServiceError::Data("directory offline".to_string())),
        }
    }
}

/// Data service that reports what it was called with
pub struct Echo {
    name: String,
    endpoints: Vec<EndpointDescriptor>,
}

impl Echo {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoints: vec![
                EndpointDescriptor::get("list").allow_anonymous(),
                EndpointDescriptor::post("create"),
                EndpointDescriptor::get("fail").allow_anonymous(),
            ],
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<EndpointDescriptor>) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[async_trait]
impl DataService for Echo {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        self.endpoints.clone()
    }

    async fn invoke(&self, method: &str, args: Args) -> Result<Value, ServiceError> {
        match method {
            "fail" => Err(ServiceError::message("echo failure")),
            _ => {
                if method == "tagged" {
                    args.context
                        .response
                        .insert_header(HeaderName::from_static("x-echo"), HeaderValue::from_static("tagged"));
                }
                Ok(json!({
                    "method": method,
                    "fields": args.fields,
                    "authorized": args.context.authentication.authorized,
                    "user": args.context.user,
                    "domain": args.context.domain,
                }))
            }
        }
    }
}

/// Endpoints shared by every auditable service
fn audit_endpoints() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::get("audit"),
        EndpointDescriptor::get("ping").allow_anonymous(),
    ]
}

/// Service that declares one endpoint of its own on top of the audit set
pub struct Inherited;

#[async_trait]
impl DataService for Inherited {
    fn name(&self) -> &str {
        "InheritedV1"
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let mut endpoints = vec![EndpointDescriptor::get("own")];
        endpoints.extend(audit_endpoints());
        endpoints
    }

    async fn invoke(&self, method: &str, _args: Args) -> Result<Value, ServiceError> {
        Ok(json!({ "method": method }))
    }
}

#[derive(Default)]
pub struct MemoryContext {
    pub rows: Vec<Value>,
}

#[async_trait]
impl DataContext for MemoryContext {
    async fn get_data(&self, _query: &str) -> Result<Vec<Value>, ServiceError> {
        Ok(self.rows.clone())
    }
}

fn test_settings(debug: bool) -> AppConfig {
    let mut settings = AppConfig::for_environment(Environment::Test);
    settings.debug = debug;
    settings
}

/// Arguments for a direct handler call from an authorized anonymous caller
pub fn args_with(fields: Value) -> Args {
    Args {
        fields: fields.as_object().cloned().unwrap_or_default(),
        context: CallContext {
            domain: None,
            user: None,
            authentication: AuthenticationState {
                level: AuthorizationLevel::AllowAnonymous,
                authorized: true,
            },
            request: RequestInfo {
                method: Method::GET,
                uri: Uri::from_static("/"),
                headers: HeaderMap::new(),
            },
            response: ResponseHandle::default(),
            services: Arc::new(ServiceCollection::new()),
            settings: Arc::new(test_settings(false)),
        },
    }
}

/// Dispatcher hosting `service`, with Ada (`ada-1`) as the only known user
pub fn dispatcher_with<S: DataService + 'static>(service: S, debug: bool) -> Dispatcher {
    let mut registry = RouteRegistry::new();
    registry.register(&service).expect("register test service");

    let mut services = ServiceCollection::new();
    services.register(None, ServiceEntry::data_service(service));

    let authenticator = Authenticator::new(
        Some(test_keys().private.clone()),
        Some(Arc::new(StaticAuthorize::with_user(1, "Ada", "ada-1"))),
        3600,
    );

    Dispatcher::new(registry, authenticator, Arc::new(services), Arc::new(test_settings(debug)))
}

/// Bodyless request for `uri`, with query fields parsed and an optional Authorization header
pub fn request(method: Method, uri: &str, authorization: Option<&str>) -> DispatchRequest {
    let mut headers = HeaderMap::new();
    if let Some(value) = authorization {
        headers.insert(header::AUTHORIZATION, value.parse().expect("header value"));
    }
    DispatchRequest::from_http(method, uri.parse().expect("uri"), headers, &[]).expect("request")
}
