//! Consumer-side call pipeline: discover -> select -> retry(send) -> on
//! exhaustion, tolerate -> return (`spec.md` §4.10).
//!
//! Rust has no runtime interception of a typed method call, so the
//! "intercepted proxy" becomes an explicit two-part API: `Framework::client`
//! returns a [`ClientHandle`](crate::framework::ClientHandle) whose `proxy`
//! method hands back a `ServiceProxy`, and a per-service typed wrapper (hand-
//! or macro-generated, see [`ServiceClient`]) packs arguments into an
//! `RpcRequest` and calls [`ServiceProxy::call`].

use std::sync::{Arc, Mutex};

use mini_rpc_protocol::{RpcRequest, RpcResponse, RpcValue, ServiceMetaInfo, TypeDescriptor};

use crate::balance;
use crate::config::Config;
use crate::error::RpcError;
use crate::registry::RemoteRegistry;
use crate::resilience::{retry, tolerance};
use crate::transport;

/// One consumer-side handle to a discovered service, bound to a fixed
/// `serviceName:serviceVersion`. Holds its own load balancer instance so a
/// round-robin counter survives across calls; no remote connection is kept
/// open between calls (`spec.md` §4.10, "no caching of remote connections
/// survives the call").
pub struct ServiceProxy {
    config: Config,
    remote_registry: Arc<dyn RemoteRegistry>,
    service_name: String,
    version: String,
    load_balancer: Box<dyn balance::LoadBalancer>,
}

impl ServiceProxy {
    pub(crate) fn new(config: Config, remote_registry: Arc<dyn RemoteRegistry>, service_name: String, version: String) -> Self {
        let load_balancer = balance::for_kind(config.load_balancer);
        Self {
            config,
            remote_registry,
            service_name,
            version,
            load_balancer,
        }
    }

    pub fn service_key(&self) -> String {
        mini_rpc_protocol::service_key(&self.service_name, &self.version)
    }

    /// Runs one full call: discover -> select -> retry(send) -> on
    /// exhaustion, tolerate -> return. Returns the server's `data` (or
    /// `RpcValue::Unit` for a degraded fail-safe/fail-back outcome that never
    /// produced one) or the server's structured `exception` translated into
    /// `RpcError::Dispatch`.
    pub fn call(&self, method_name: &str, parameter_types: Vec<TypeDescriptor>, args: Vec<RpcValue>) -> Result<RpcValue, RpcError> {
        let service_key = self.service_key();

        let candidates = self.remote_registry.discover(&service_key)?;
        if candidates.is_empty() {
            return Err(RpcError::NoEndpoints { service_key });
        }

        let call_key = format!("{service_key}#{method_name}");
        let endpoint = self
            .load_balancer
            .select(&call_key, &candidates)
            .cloned()
            .ok_or_else(|| RpcError::NoEndpoints { service_key: service_key.clone() })?;

        let request = RpcRequest {
            service_name: self.service_name.clone(),
            method_name: method_name.to_string(),
            parameter_types,
            args,
            service_version: Some(self.version.clone()),
        };

        let response_slot: Arc<Mutex<Option<RpcResponse>>> = Arc::new(Mutex::new(None));
        let serializer = self.config.serializer;
        let timeout = self.config.registry.timeout;

        let retry_strategy = retry::for_kind(self.config.retry_strategy);
        let primary_slot = response_slot.clone();
        let primary_request = request.clone();
        let primary_endpoint = endpoint.clone();

        let retry_result = retry_strategy.call(&mut || {
            let response = transport::client::call(&primary_endpoint.service_host, primary_endpoint.service_port, serializer, timeout, &primary_request)?;
            *primary_slot.lock().unwrap() = Some(response);
            Ok(())
        });

        if let Err(e) = retry_result {
            let tolerance_strategy = tolerance::for_kind(self.config.tolerant_strategy);
            let fallback_candidates: Vec<ServiceMetaInfo> = candidates
                .into_iter()
                .filter(|c| c.service_node_key() != endpoint.service_node_key())
                .collect();
            let fallback_endpoint = self.load_balancer.select(&call_key, &fallback_candidates).cloned();
            let fallback_slot = response_slot.clone();
            let fallback_request = request.clone();
            let fallback_service_key = service_key.clone();

            tolerance_strategy.handle(
                e,
                Box::new(move || {
                    let Some(target) = fallback_endpoint.clone() else {
                        return Err(RpcError::NoEndpoints {
                            service_key: fallback_service_key.clone(),
                        });
                    };
                    let response = transport::client::call(&target.service_host, target.service_port, serializer, timeout, &fallback_request)?;
                    *fallback_slot.lock().unwrap() = Some(response);
                    Ok(())
                }),
            )?;
        }

        match response_slot.lock().unwrap().take() {
            Some(response) => extract(response),
            // FailSafe and a still-pending FailBack both report success
            // without ever producing a response; there is no data to hand
            // back, only the degraded outcome the tolerance layer already
            // decided on.
            None => Ok(RpcValue::Unit),
        }
    }
}

fn extract(response: RpcResponse) -> Result<RpcValue, RpcError> {
    if let Some(exception) = response.exception {
        return Err(RpcError::Dispatch(format!("{}: {}", exception.kind, exception.message)));
    }
    Ok(response.data.unwrap_or(RpcValue::Unit))
}

/// Built on top of `ServiceProxy` by a generated dispatch stub per exposed
/// service trait, replacing reflective-by-name invocation with a typed
/// wrapper (`spec.md` §9, "Reflective dispatch" / "Typed generics over an
/// untyped wire"). A generated impl packs its method's arguments into
/// `RpcValue`s with the matching `TypeDescriptor`s, calls
/// `ServiceProxy::call`, and unpacks the result back into the method's
/// declared return type.
pub trait ServiceClient: Sized {
    /// The interface identifier used as `RpcRequest.service_name` and as the
    /// discovery `serviceKey`'s name component.
    const SERVICE_NAME: &'static str;

    fn from_proxy(proxy: ServiceProxy) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, SharedStore};
    use mini_rpc_protocol::TypeDescriptor;

    fn proxy_with(config: Config, store: Arc<SharedStore>, service_name: &str, version: &str) -> ServiceProxy {
        let registry: Arc<dyn RemoteRegistry> = Arc::new(InMemoryRegistry::new(store));
        ServiceProxy::new(config, registry, service_name.to_string(), version.to_string())
    }

    #[test]
    fn call_fails_fast_with_no_endpoints_when_nothing_is_registered() {
        let proxy = proxy_with(Config::default(), SharedStore::new(), "demo", "1.0");
        let err = proxy.call("ping", vec![], vec![]).unwrap_err();
        assert!(matches!(err, RpcError::NoEndpoints { .. }));
    }

    #[test]
    fn call_fails_fast_when_the_endpoint_is_unreachable() {
        let store = SharedStore::new();
        let registry: Arc<dyn RemoteRegistry> = Arc::new(InMemoryRegistry::new(store.clone()));
        registry
            .register(&ServiceMetaInfo::new("demo", "127.0.0.1", 1))
            .unwrap();

        let proxy = proxy_with(Config::default(), store, "demo", "1.0");
        let err = proxy.call("ping", vec![TypeDescriptor::Unit], vec![RpcValue::Unit]).unwrap_err();
        assert!(matches!(err, RpcError::TransportIo(_) | RpcError::TransportTimeout));
    }

    #[test]
    fn call_fails_safe_when_the_endpoint_is_unreachable() {
        let store = SharedStore::new();
        let registry: Arc<dyn RemoteRegistry> = Arc::new(InMemoryRegistry::new(store.clone()));
        registry
            .register(&ServiceMetaInfo::new("demo", "127.0.0.1", 1))
            .unwrap();

        let config = Config::default().with_tolerant_strategy(crate::config::TolerantStrategyKind::FailSafe);
        let proxy = proxy_with(config, store, "demo", "1.0");
        let result = proxy.call("ping", vec![], vec![]);
        assert_eq!(result.unwrap(), RpcValue::Unit);
    }
}
