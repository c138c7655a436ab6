use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mini_rpc::config::{Config, LoadBalancerKind};
use mini_rpc::error::RpcError;
use mini_rpc::registry::{ServiceHandler, SharedStore};
use mini_rpc::Framework;
use mini_rpc_protocol::{RpcResponse, RpcValue, TypeDescriptor};

struct Echo;

impl ServiceHandler for Echo {
    fn invoke(&self, method_name: &str, args: Vec<RpcValue>) -> Result<RpcResponse, RpcError> {
        match method_name {
            "echo" => Ok(RpcResponse::ok(args.into_iter().next().unwrap_or(RpcValue::Unit), TypeDescriptor::Str)),
            other => Err(RpcError::Dispatch(format!("no such method '{other}'"))),
        }
    }
}

struct NamedEcho {
    name: &'static str,
}

impl ServiceHandler for NamedEcho {
    fn invoke(&self, method_name: &str, _args: Vec<RpcValue>) -> Result<RpcResponse, RpcError> {
        match method_name {
            "which" => Ok(RpcResponse::ok(RpcValue::Str(self.name.to_string()), TypeDescriptor::Str)),
            other => Err(RpcError::Dispatch(format!("no such method '{other}'"))),
        }
    }
}

fn on_port(port: u16) -> Config {
    Config::default().with_server_port(port)
}

/// Matches `spec.md` §8 scenario 1: a provider exposes a service, a consumer
/// calls it over TCP, and gets back the value it sent.
#[test]
fn consumer_calls_a_provider_over_tcp_and_gets_back_the_echoed_value() {
    let store = SharedStore::new();

    let provider = Framework::with_in_memory_registry(on_port(18121), store.clone()).unwrap();
    provider.server().expose("demo", "1.0", Arc::new(Echo)).unwrap();
    thread::sleep(Duration::from_millis(50));

    let consumer = Framework::with_in_memory_registry(Config::default(), store).unwrap();
    let proxy = consumer.client().proxy("demo", "1.0");

    let result = proxy
        .call("echo", vec![TypeDescriptor::Str], vec![RpcValue::Str("mini-rpc".to_string())])
        .unwrap();

    assert_eq!(result, RpcValue::Str("mini-rpc".to_string()));

    provider.shutdown().unwrap();
    consumer.shutdown().unwrap();
}

/// Matches `spec.md` §8 scenario 3: two providers for the same service key,
/// ten consecutive round-robin calls split 5/5 between them.
#[test]
fn round_robin_splits_ten_calls_evenly_across_two_providers() {
    let store = SharedStore::new();

    let provider_a = Framework::with_in_memory_registry(on_port(18122), store.clone()).unwrap();
    provider_a.server().expose("demo", "1.0", Arc::new(NamedEcho { name: "a" })).unwrap();

    let provider_b = Framework::with_in_memory_registry(on_port(18123), store.clone()).unwrap();
    provider_b.server().expose("demo", "1.0", Arc::new(NamedEcho { name: "b" })).unwrap();

    thread::sleep(Duration::from_millis(50));

    let consumer_config = Config::default().with_load_balancer(LoadBalancerKind::RoundRobin);
    let consumer = Framework::with_in_memory_registry(consumer_config, store).unwrap();
    let proxy = consumer.client().proxy("demo", "1.0");

    let mut counts: HashMap<String, u32> = HashMap::new();
    for _ in 0..10 {
        match proxy.call("which", vec![], vec![]).unwrap() {
            RpcValue::Str(who) => *counts.entry(who).or_insert(0) += 1,
            other => panic!("unexpected response {other:?}"),
        }
    }

    assert_eq!(counts.get("a").copied().unwrap_or(0), 5);
    assert_eq!(counts.get("b").copied().unwrap_or(0), 5);

    provider_a.shutdown().unwrap();
    provider_b.shutdown().unwrap();
    consumer.shutdown().unwrap();
}

/// Matches `spec.md` §8: "discover on an unknown serviceKey returns an empty
/// list; consumer proxy translates this to NoEndpoints."
#[test]
fn calling_an_unregistered_service_fails_with_no_endpoints() {
    let store = SharedStore::new();
    let consumer = Framework::with_in_memory_registry(Config::default(), store).unwrap();
    let proxy = consumer.client().proxy("nobody-home", "1.0");

    let err = proxy.call("anything", vec![], vec![]).unwrap_err();
    assert!(matches!(err, RpcError::NoEndpoints { .. }));
}

/// Matches `spec.md` §4.9: a server-side lookup/invocation failure is
/// encoded in the response, not a protocol-level error; the client surfaces
/// it as a dispatch error rather than a transport failure.
#[test]
fn an_unknown_method_surfaces_as_a_dispatch_error_not_a_transport_failure() {
    let store = SharedStore::new();

    let provider = Framework::with_in_memory_registry(on_port(18124), store.clone()).unwrap();
    provider.server().expose("demo", "1.0", Arc::new(Echo)).unwrap();
    thread::sleep(Duration::from_millis(50));

    let consumer = Framework::with_in_memory_registry(Config::default(), store).unwrap();
    let proxy = consumer.client().proxy("demo", "1.0");

    let err = proxy.call("no_such_method", vec![], vec![]).unwrap_err();
    assert!(matches!(err, RpcError::Dispatch(_)));

    provider.shutdown().unwrap();
    consumer.shutdown().unwrap();
}

/// A provider that dies (its node is unregistered) disappears from discovery
/// for later calls, matching `spec.md` §8 scenario 2's lease-expiry
/// behavior at the discovery layer (the in-memory backend models lease
/// expiry directly rather than waiting out the real 30s TTL).
#[test]
fn a_provider_that_unregisters_disappears_from_later_discovery() {
    let store = SharedStore::new();

    let provider = Framework::with_in_memory_registry(on_port(18125), store.clone()).unwrap();
    provider.server().expose("demo", "1.0", Arc::new(Echo)).unwrap();
    thread::sleep(Duration::from_millis(50));

    let consumer = Framework::with_in_memory_registry(Config::default(), store).unwrap();
    let proxy = consumer.client().proxy("demo", "1.0");

    proxy.call("echo", vec![TypeDescriptor::Unit], vec![RpcValue::Unit]).unwrap();

    provider.shutdown().unwrap();

    let err = proxy.call("echo", vec![TypeDescriptor::Unit], vec![RpcValue::Unit]).unwrap_err();
    assert!(matches!(err, RpcError::NoEndpoints { .. }));

    consumer.shutdown().unwrap();
}
