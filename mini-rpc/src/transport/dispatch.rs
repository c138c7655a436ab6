use mini_rpc_protocol::{service_key, RpcException, RpcRequest, RpcResponse};

use crate::error::RpcError;
use crate::registry::LocalRegistry;

/// Default `serviceVersion` when a request doesn't carry one, matching
/// `ServiceMetaInfo`'s own default (`spec.md` §3).
const DEFAULT_SERVICE_VERSION: &str = "1.0";

/// Looks up `"{service_name}:{service_version}"` in the local registry and
/// invokes the handler, turning "no such service" and handler-level failures
/// into an `RpcResponse` rather than an `RpcError` — only a protocol- or
/// transport-level problem should ever reach the caller as an `Err` here
/// (`spec.md` §4.3/§7). The key must be built the same way `ServerHandle::expose`
/// builds it (`framework.rs`), since that's what the handler was registered under.
pub fn dispatch(registry: &LocalRegistry, request: &RpcRequest) -> RpcResponse {
    let version = request.service_version.as_deref().unwrap_or(DEFAULT_SERVICE_VERSION);
    let key = service_key(&request.service_name, version);

    let Some(handler) = registry.get(&key) else {
        return RpcResponse::failed(RpcException {
            kind: "ServiceNotFoundError".to_string(),
            message: format!("no service registered under '{key}'"),
        });
    };

    match handler.invoke(&request.method_name, request.args.clone()) {
        Ok(response) => response,
        Err(RpcError::Dispatch(message)) => RpcResponse::failed(RpcException {
            kind: "MethodInvocationError".to_string(),
            message,
        }),
        Err(other) => RpcResponse::failed(RpcException {
            kind: "InternalError".to_string(),
            message: other.to_string(),
        }),
    }
}
