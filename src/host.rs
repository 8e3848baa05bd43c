//! Boot sequence: collect services, validate the configuration against the
//! declared routes, then assemble the axum application.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::Router;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{dispatch_handler, Dispatcher, RegistryError, RouteRegistry};
use crate::auth::Authenticator;
use crate::config::{AppConfig, DEFAULT_KEY_NAME};
use crate::crypto::{CryptoError, PrivateKey};
use crate::services::{
    AuthorizeService, DataContext, DataService, ServiceCollection, ServiceEntry, AUTHORIZE_SERVICE_KEY,
    DEFAULT_DATA_CONTEXT_KEY,
};
use crate::types::ServiceKind;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{routes} protected route(s) registered but no authorize service is configured")]
    MissingAuthorizeService { routes: usize },

    #[error("{routes} protected route(s) registered but no '{name}' private key is configured")]
    MissingKey { name: &'static str, routes: usize },

    #[error("Invalid '{name}' key pair: {source}")]
    Crypto {
        name: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Collects services at boot; `build` freezes them into an [`Application`]
pub struct Host {
    config: AppConfig,
    services: ServiceCollection,
}

impl Host {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            services: ServiceCollection::new(),
        }
    }

    /// Register a data context, under `DataContext` unless a key is given
    pub fn use_data_context<C: DataContext + 'static>(mut self, key: Option<&str>, context: C) -> Self {
        let key = key.unwrap_or(DEFAULT_DATA_CONTEXT_KEY);
        self.services.register(Some(key), ServiceEntry::data_context(context));
        self
    }

    /// Register a data service under its declared name; its endpoints become routes
    pub fn use_service<S: DataService + 'static>(mut self, service: S) -> Self {
        self.services.register(None, ServiceEntry::data_service(service));
        self
    }

    pub fn use_authorize<A: AuthorizeService + 'static>(mut self, authorize: A) -> Self {
        self.services
            .register(Some(AUTHORIZE_SERVICE_KEY), ServiceEntry::authorize_service(authorize));
        self
    }

    pub fn build(self) -> Result<Application, HostError> {
        let Host { config, services } = self;

        let mut registry = RouteRegistry::new();
        for (key, entry) in services.get_by_kind(ServiceKind::DataService) {
            if let ServiceEntry::DataService(service) = entry {
                let added = registry.register(service.as_ref())?;
                tracing::debug!(key = %key, routes = added, "service routes registered");
            }
        }

        let key = match config.key_pair(DEFAULT_KEY_NAME) {
            Some(pair) if !pair.private_key.trim().is_empty() => Some(
                PrivateKey::from_material(&pair.private_key)
                    .map_err(|source| HostError::Crypto { name: DEFAULT_KEY_NAME, source })?,
            ),
            _ => None,
        };
        let authorize: Option<Arc<dyn AuthorizeService>> = services.get(AUTHORIZE_SERVICE_KEY).ok();

        if registry.requires_authorization() {
            let protected = registry.protected_routes();
            if authorize.is_none() {
                return Err(HostError::MissingAuthorizeService { routes: protected });
            }
            if key.is_none() {
                return Err(HostError::MissingKey { name: DEFAULT_KEY_NAME, routes: protected });
            }
        }

        registry.log_routes();

        let authenticator = Authenticator::new(key, authorize, config.authentication_token.expires_in_secs);
        let settings = Arc::new(config);
        let dispatcher = Dispatcher::new(registry, authenticator, Arc::new(services), settings.clone());

        Ok(Application {
            dispatcher: Arc::new(dispatcher),
            settings,
        })
    }
}

/// A validated host ready to serve
pub struct Application {
    dispatcher: Arc<Dispatcher>,
    settings: Arc<AppConfig>,
}

impl Application {
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    /// Every path falls through to the dispatcher, which owns routing
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
            .layer(DefaultBodyLimit::max(self.settings.server.max_request_body_size));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(self.dispatcher.clone())
            .layer(middleware)
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins = &self.settings.security.cors_origins;
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            return CorsLayer::permissive();
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    }

    pub async fn run(self) -> Result<(), HostError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.server.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| HostError::Bind { addr, source })?;

        tracing::info!(
            addr = %addr,
            environment = ?self.settings.environment,
            routes = self.dispatcher.registry().len(),
            "api host listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(HostError::Serve)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
