//! Service contracts and the process-wide service locator.
//!
//! Three kinds of services live in the locator: data contexts (opaque access to
//! a data store), data services (the classes whose endpoints become the HTTP
//! API) and the authorize service (resolves a token's unique identifier to a
//! user).

pub mod health;
pub mod locator;
pub mod user_directory;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{Args, EndpointDescriptor};
use crate::error::ServiceError;
use crate::types::{short_type_name, UserIdentity};

pub use health::HealthV1;
pub use locator::{FromServiceEntry, LocatorError, ServiceCollection, ServiceEntry};
pub use user_directory::UserDirectory;

/// Locator key under which the authorize service is registered
pub const AUTHORIZE_SERVICE_KEY: &str = "AuthorizeService";

/// Locator key data services use for their data context unless told otherwise
pub const DEFAULT_DATA_CONTEXT_KEY: &str = "DataContext";

/// A service whose declared endpoints are exposed over HTTP.
///
/// `name` is the declared service name (for example `OrdersV2`) and drives both
/// the locator key and the route prefix `/Orders/v2/...`. `endpoints` lists the
/// service's own endpoints first, followed by any it inherits from shared base
/// definitions. `invoke` runs the handler bound to a declared method name.
#[async_trait]
pub trait DataService: Send + Sync {
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn endpoints(&self) -> Vec<EndpointDescriptor>;

    async fn invoke(&self, method: &str, args: Args) -> Result<Value, ServiceError>;
}

/// Resolves the user behind a bearer token
#[async_trait]
pub trait AuthorizeService: Send + Sync {
    async fn authorize(&self, unique_identifier: &str) -> Result<Option<UserIdentity>, ServiceError>;
}

/// Opaque pass-through to a relational store
#[async_trait]
pub trait DataContext: Send + Sync {
    async fn get_data(&self, query: &str) -> Result<Vec<Value>, ServiceError>;
}
