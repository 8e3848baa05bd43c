use serde::Serialize;

use crate::types::{AuthorizationLevel, Verb};

/// Endpoint declaration made by a data service, the typed replacement for a
/// method decorator. The route segment defaults to the method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub verb: Verb,
    pub method: String,
    pub authorization_level: AuthorizationLevel,
    pub route: Option<String>,
}

impl EndpointDescriptor {
    pub fn new(verb: Verb, method: impl Into<String>) -> Self {
        Self {
            verb,
            method: method.into(),
            authorization_level: AuthorizationLevel::default(),
            route: None,
        }
    }

    pub fn get(method: impl Into<String>) -> Self {
        Self::new(Verb::Get, method)
    }

    pub fn post(method: impl Into<String>) -> Self {
        Self::new(Verb::Post, method)
    }

    pub fn allow_anonymous(mut self) -> Self {
        self.authorization_level = AuthorizationLevel::AllowAnonymous;
        self
    }

    pub fn require_authorization(mut self) -> Self {
        self.authorization_level = AuthorizationLevel::RequireAuthorization;
        self
    }

    /// Override the route segment; one leading `/` is dropped
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    fn route_segment(&self) -> &str {
        match &self.route {
            Some(route) => route.strip_prefix('/').unwrap_or(route),
            None => &self.method,
        }
    }
}

/// A resolved route bound to a service method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub authorization_level: AuthorizationLevel,
    pub verb: Verb,
    pub route_path: String,
    pub service_name: String,
    pub method_name: String,
    #[serde(skip)]
    pub(crate) match_key: String,
}

impl Endpoint {
    pub fn from_descriptor(service_name: &str, descriptor: &EndpointDescriptor) -> Self {
        let route_path = route_path(service_name, descriptor.route_segment());
        Self {
            authorization_level: descriptor.authorization_level,
            verb: descriptor.verb,
            match_key: route_path.to_lowercase(),
            route_path,
            service_name: service_name.to_string(),
            method_name: descriptor.method.clone(),
        }
    }

    pub fn matches(&self, verb: Verb, path: &str) -> bool {
        self.verb == verb && self.match_key == path.to_lowercase()
    }
}

/// Split a declared service name into its base name and version suffix.
///
/// The suffix starts at the last `V` and must be followed by digits only:
/// `OrdersV2` -> (`Orders`, `V2`). Names without such a suffix are unversioned.
pub fn split_version(service_name: &str) -> (&str, Option<&str>) {
    if let Some(index) = service_name.rfind('V') {
        let digits = &service_name[index + 1..];
        if index > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return (&service_name[..index], Some(&service_name[index..]));
        }
    }
    (service_name, None)
}

/// `/<base>/<version>/<segment>`, or `/<base>/<segment>` for unversioned names
pub fn route_path(service_name: &str, segment: &str) -> String {
    match split_version(service_name) {
        (base, Some(version)) => format!("/{}/{}/{}", base, version.to_lowercase(), segment),
        (base, None) => format!("/{}/{}", base, segment),
    }
}
