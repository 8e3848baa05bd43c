//! Route discovery, request dispatch and the response envelope.

pub mod args;
pub mod dispatcher;
pub mod endpoint;
pub mod format;
pub mod registry;

pub use args::{Args, AuthenticationState, CallContext, RequestInfo, ResponseHandle};
pub use dispatcher::{dispatch_handler, DispatchRequest, Dispatcher};
pub use endpoint::{Endpoint, EndpointDescriptor};
pub use format::Envelope;
pub use registry::{RegistryError, RouteRegistry};
