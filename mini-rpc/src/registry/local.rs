use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use mini_rpc_protocol::{RpcResponse, RpcValue};

use crate::error::RpcError;

/// The dispatch target a server-side service registration resolves to: given
/// a method name and its already-reshaped arguments, produce a response.
/// Implemented by generated per-service dispatch stubs (see `SPEC_FULL.md`
/// §4.9/§4.10, "Reflective dispatch").
pub trait ServiceHandler: Send + Sync {
    fn invoke(&self, method_name: &str, args: Vec<RpcValue>) -> Result<RpcResponse, RpcError>;
}

/// Process-wide mapping `serviceName -> implementation handle`, used
/// server-side to locate the dispatch target (`spec.md` §4.3). A single
/// `RwLock` guards the map: concurrent readers never observe a partially
/// written binding, matching §5's "simple exclusive lock" guidance.
#[derive(Default)]
pub struct LocalRegistry {
    services: RwLock<HashMap<String, Arc<dyn ServiceHandler>>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn ServiceHandler>) {
        self.services.write().unwrap().insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.services.read().unwrap().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.services.write().unwrap().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mini_rpc_protocol::TypeDescriptor;

    struct Echo;

    impl ServiceHandler for Echo {
        fn invoke(&self, _method_name: &str, args: Vec<RpcValue>) -> Result<RpcResponse, RpcError> {
            Ok(RpcResponse::ok(args.into_iter().next().unwrap_or(RpcValue::Unit), TypeDescriptor::Unit))
        }
    }

    #[test]
    fn get_on_an_unregistered_name_returns_none() {
        let registry = LocalRegistry::new();
        assert!(registry.get("missing:1.0").is_none());
    }

    #[test]
    fn register_then_get_returns_the_same_handler() {
        let registry = LocalRegistry::new();
        registry.register("demo:1.0", Arc::new(Echo));
        assert!(registry.get("demo:1.0").is_some());
    }

    #[test]
    fn a_later_registration_replaces_the_earlier_one_under_the_same_name() {
        struct Other;
        impl ServiceHandler for Other {
            fn invoke(&self, _method_name: &str, _args: Vec<RpcValue>) -> Result<RpcResponse, RpcError> {
                Ok(RpcResponse::ok(RpcValue::Str("other".to_string()), TypeDescriptor::Str))
            }
        }

        let registry = LocalRegistry::new();
        registry.register("demo:1.0", Arc::new(Echo));
        registry.register("demo:1.0", Arc::new(Other));

        let response = registry.get("demo:1.0").unwrap().invoke("x", vec![]).unwrap();
        assert_eq!(response.data, Some(RpcValue::Str("other".to_string())));
    }

    #[test]
    fn remove_drops_the_binding_and_returns_the_removed_handler() {
        let registry = LocalRegistry::new();
        registry.register("demo:1.0", Arc::new(Echo));

        assert!(registry.remove("demo:1.0").is_some());
        assert!(registry.get("demo:1.0").is_none());
        assert!(registry.remove("demo:1.0").is_none());
    }
}
