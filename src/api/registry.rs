use thiserror::Error;

use super::endpoint::Endpoint;
use crate::services::DataService;
use crate::types::{AuthorizationLevel, Verb};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("{verb} {route_path} declared by {service}.{method} is already bound to {existing_service}.{existing_method}")]
    Conflict {
        verb: Verb,
        route_path: String,
        service: String,
        method: String,
        existing_service: String,
        existing_method: String,
    },
}

/// Ordered route table, built once at boot and read-only afterwards
#[derive(Debug, Default)]
pub struct RouteRegistry {
    endpoints: Vec<Endpoint>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every endpoint declared by `service`.
    ///
    /// A second endpoint on the same verb and (case-insensitive) path would be
    /// unreachable, so it is rejected and nothing from `service` is added.
    pub fn register(&mut self, service: &dyn DataService) -> Result<usize, RegistryError> {
        let service_name = service.name();
        let mut pending: Vec<Endpoint> = Vec::new();

        for descriptor in service.endpoints() {
            let endpoint = Endpoint::from_descriptor(service_name, &descriptor);
            let existing = self
                .endpoints
                .iter()
                .chain(pending.iter())
                .find(|e| e.verb == endpoint.verb && e.match_key == endpoint.match_key);

            if let Some(existing) = existing {
                return Err(RegistryError::Conflict {
                    verb: endpoint.verb,
                    route_path: endpoint.route_path,
                    service: endpoint.service_name,
                    method: endpoint.method_name,
                    existing_service: existing.service_name.clone(),
                    existing_method: existing.method_name.clone(),
                });
            }
            pending.push(endpoint);
        }

        let added = pending.len();
        self.endpoints.extend(pending);
        Ok(added)
    }

    /// First endpoint whose path matches case-insensitively and whose verb matches exactly
    pub fn resolve(&self, verb: Verb, path: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| endpoint.matches(verb, path))
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn requires_authorization(&self) -> bool {
        self.protected_routes() > 0
    }

    pub fn protected_routes(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|e| e.authorization_level == AuthorizationLevel::RequireAuthorization)
            .count()
    }

    pub fn log_routes(&self) {
        for endpoint in &self.endpoints {
            let access = match endpoint.authorization_level {
                AuthorizationLevel::AllowAnonymous => "anonymous",
                AuthorizationLevel::RequireAuthorization => "protected",
            };
            tracing::debug!("{:>9} {:>4}: {}", access, endpoint.verb.as_str(), endpoint.route_path);
        }
        tracing::info!(routes = self.endpoints.len(), "route table ready");
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
