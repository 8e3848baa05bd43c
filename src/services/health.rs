use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::DataService;
use crate::api::{Args, EndpointDescriptor};
use crate::error::ServiceError;

/// Built-in liveness and identity probes, served under `/Health/v1/...`
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthV1;

#[async_trait]
impl DataService for HealthV1 {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::get("status").allow_anonymous(),
            EndpointDescriptor::get("whoami"),
        ]
    }

    async fn invoke(&self, method: &str, args: Args) -> Result<Value, ServiceError> {
        match method {
            "status" => Ok(json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "environment": args.context.settings.environment,
                "timestamp": Utc::now().to_rfc3339(),
            })),
            "whoami" => Ok(json!({
                "user": args.context.user,
                "domain": args.context.domain,
            })),
            other => Err(ServiceError::UnknownMethod(other.to_string())),
        }
    }
}
