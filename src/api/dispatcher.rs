use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Uri};
use serde_json::{json, Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::args::{Args, AuthenticationState, CallContext, RequestInfo, ResponseHandle};
use super::format::Envelope;
use super::registry::RouteRegistry;
use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::error::DispatchError;
use crate::services::{DataService, ServiceCollection};
use crate::types::Verb;

/// One inbound request, reduced to what dispatching needs
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Query string and body fields merged, body winning on conflicts
    pub fields: Map<String, Value>,
}

impl DispatchRequest {
    /// Parse the query string and a JSON or form-encoded body into one field map
    pub fn from_http(method: Method, uri: Uri, headers: HeaderMap, body: &[u8]) -> Result<Self, DispatchError> {
        let mut fields = uri.query().map(parse_form).unwrap_or_default();

        if !body.iter().all(u8::is_ascii_whitespace) {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_ascii_lowercase();

            let body_fields = if content_type.starts_with("application/x-www-form-urlencoded") {
                parse_form(&String::from_utf8_lossy(body))
            } else if content_type.starts_with("application/json") || content_type.contains("+json") {
                match serde_json::from_slice::<Value>(body) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => return Err(DispatchError::BadRequest("JSON body must be an object".to_string())),
                    Err(e) => return Err(DispatchError::BadRequest(format!("invalid JSON body: {}", e))),
                }
            } else {
                tracing::debug!(content_type = %content_type, "ignoring body with unsupported content type");
                Map::new()
            };
            fields.extend(body_fields);
        }

        Ok(Self { method, uri, headers, fields })
    }

    fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Form/query decoding; a key repeated N times becomes an array of N strings
fn parse_form(raw: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }
    fields
}

/// Host (and port) named by an `Origin` header
fn origin_domain(origin: &str) -> Option<String> {
    let url = url::Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Single entry point for every request: route, authenticate, invoke, envelope
pub struct Dispatcher {
    registry: RouteRegistry,
    authenticator: Authenticator,
    services: Arc<ServiceCollection>,
    settings: Arc<AppConfig>,
}

impl Dispatcher {
    pub fn new(
        registry: RouteRegistry,
        authenticator: Authenticator,
        services: Arc<ServiceCollection>,
        settings: Arc<AppConfig>,
    ) -> Self {
        Self { registry, authenticator, services, settings }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub async fn handle(&self, request: DispatchRequest) -> Envelope {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %Uuid::new_v4(),
            verb = %request.method,
            path = %request.uri.path(),
        );

        async move {
            let started = Instant::now();
            let response = ResponseHandle::default();
            let envelope = match self.dispatch(request, response.clone()).await {
                Ok(data) => Envelope::ok(data).with_headers(response.headers()),
                Err(err) => {
                    match &err {
                        DispatchError::Handler { error, .. } => tracing::error!(error = %error, "handler failed"),
                        DispatchError::Configuration(e) => tracing::error!(error = %e, "service resolution failed"),
                        other => tracing::debug!(code = other.error_code(), reason = %other, "request rejected"),
                    }
                    err.into_envelope()
                }
            };

            tracing::debug!(
                status = envelope.status_code.as_u16(),
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "dispatch completed"
            );
            envelope
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: DispatchRequest, response: ResponseHandle) -> Result<Value, DispatchError> {
        let verb = Verb::from_method(&request.method).ok_or(DispatchError::NotFound)?;
        let endpoint = self
            .registry
            .resolve(verb, request.uri.path())
            .ok_or(DispatchError::NotFound)?;

        let authentication = self
            .authenticator
            .authenticate(endpoint.authorization_level, request.header(header::AUTHORIZATION))
            .await;
        if !authentication.authorized {
            return Err(DispatchError::Unauthorized(authentication.outcome));
        }

        let service: Arc<dyn DataService> = self
            .services
            .get(&endpoint.service_name)
            .map_err(DispatchError::Configuration)?;

        let domain = request.header(header::ORIGIN).and_then(origin_domain);
        let DispatchRequest { method, uri, headers, fields } = request;
        let args = Args {
            fields,
            context: CallContext {
                domain,
                user: authentication.user,
                authentication: AuthenticationState {
                    level: endpoint.authorization_level,
                    authorized: authentication.authorized,
                },
                request: RequestInfo { method, uri, headers },
                response,
                services: self.services.clone(),
                settings: self.settings.clone(),
            },
        };

        tracing::debug!(service = %endpoint.service_name, method = %endpoint.method_name, "invoke");
        let detail = self.settings.debug.then(|| {
            json!({
                "endpoint": endpoint,
                "args": args.redacted(),
            })
        });

        service
            .invoke(&endpoint.method_name, args)
            .await
            .map_err(|error| DispatchError::Handler {
                detail: detail.map(|mut detail| {
                    detail["error"] = Value::String(error.to_string());
                    detail
                }),
                error,
            })
    }
}

/// Axum fallback handler that feeds every request through the dispatcher
pub async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Envelope {
    match DispatchRequest::from_http(method, uri, headers, &body) {
        Ok(request) => dispatcher.handle(request).await,
        Err(err) => {
            tracing::debug!(reason = %err, "request body rejected");
            err.into_envelope()
        }
    }
}
