#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use api_host::api::{Args, EndpointDescriptor};
use api_host::auth::TokenIssuer;
use api_host::config::{AppConfig, Environment, KeyPairConfig, DEFAULT_KEY_NAME};
use api_host::crypto::{generate_key_pair, PublicKey};
use api_host::error::ServiceError;
use api_host::host::{Application, Host};
use api_host::services::{DataService, HealthV1, UserDirectory};
use api_host::types::UserIdentity;

/// (private, public) bare-body key material, generated once per test binary
static KEYS: Lazy<(String, String)> = Lazy::new(|| generate_key_pair(1024).expect("generate key pair"));

pub fn ada() -> UserIdentity {
    UserIdentity {
        id: 1,
        name: "Ada".to_string(),
        unique_identifier: "ada-1".to_string(),
    }
}

pub struct OrdersV2;

#[async_trait]
impl DataService for OrdersV2 {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::get("list").allow_anonymous(),
            EndpointDescriptor::get("explode").allow_anonymous(),
        ]
    }

    async fn invoke(&self, method: &str, args: Args) -> Result<Value, ServiceError> {
        match method {
            "list" => {
                let limit = args.get_opt::<String>("limit")?;
                Ok(json!({ "orders": [{ "id": 1 }, { "id": 2 }], "limit": limit }))
            }
            "explode" => Err(ServiceError::Data("connection reset".to_string())),
            other => Err(ServiceError::UnknownMethod(other.to_string())),
        }
    }
}

pub struct UsersV1;

#[async_trait]
impl DataService for UsersV1 {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::post("create")]
    }

    async fn invoke(&self, method: &str, args: Args) -> Result<Value, ServiceError> {
        match method {
            "create" => {
                let name: String = args.get("name")?;
                Ok(json!({
                    "created": name,
                    "authentication": args.context.authentication,
                    "user": args.context.user,
                }))
            }
            other => Err(ServiceError::UnknownMethod(other.to_string())),
        }
    }
}

pub fn settings(debug: bool) -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Test);
    config.debug = debug;
    config.asymmetric_encryption.insert(
        DEFAULT_KEY_NAME.to_string(),
        KeyPairConfig {
            private_key: KEYS.0.clone(),
            public_key: KEYS.1.clone(),
        },
    );
    config
}

pub fn app_with(config: AppConfig) -> Result<Application> {
    Host::new(config)
        .use_authorize(UserDirectory::new([ada()]))
        .use_service(HealthV1)
        .use_service(OrdersV2)
        .use_service(UsersV1)
        .build()
        .context("failed to build test host")
}

pub fn app() -> Result<Application> {
    app_with(settings(false))
}

/// Bearer header carrying `claims`, one chunk per claim
pub fn bearer_with(claims: Map<String, Value>) -> Result<String> {
    let key = PublicKey::from_material(&KEYS.1)?;
    let token = TokenIssuer::new(key, 3600).encrypt_claims(&claims)?;
    Ok(format!("Bearer {}", token))
}

pub fn bearer(unique_identifier: &str, time_stamp: DateTime<Utc>) -> Result<String> {
    let mut claims = Map::new();
    claims.insert("uniqueIdentifier".to_string(), json!(unique_identifier));
    claims.insert("timeStamp".to_string(), json!(time_stamp.to_rfc3339()));
    bearer_with(claims)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn post_json(uri: &str, body: Value, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Run one request through the router in-process and decode the JSON body
pub async fn send(app: &Application, request: Request<Body>) -> Result<TestResponse> {
    let response = app.router().oneshot(request).await.context("router failed")?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
    };
    Ok(TestResponse { status, headers, body })
}
