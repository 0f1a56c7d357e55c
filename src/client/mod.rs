//! Resilient outbound `ServiceClient` abstraction: one closed error type
//! and one interceptor chain shared by the HTTP, RPC, and SDK-wrapper
//! variants (§4.6).

pub mod error;
pub mod http;
pub mod interceptor;
pub mod rpc;
pub mod sdk;
pub mod spec;

pub use error::ClientError;
pub use http::{HttpRequest, HttpResponse, HttpServiceClient};
pub use interceptor::{Interceptor, InterceptorChain, InterceptorOutcome};
pub use rpc::{RpcOperation, RpcServiceClient, RpcStreamOperation};
pub use sdk::{SdkServiceClient, Shutdownable};
pub use spec::{ServiceClientSpec, ServiceKind};
