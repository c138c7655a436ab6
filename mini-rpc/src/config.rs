use std::time::Duration;

use mini_rpc_protocol::SerializerKind;

/// Flat `rpc.*` configuration surface from `spec.md` §6. Reading this from a
/// file or environment is an external collaborator's job (see `SPEC_FULL.md`
/// §1); this type only holds the values and their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub version: String,
    pub server_host: String,
    pub server_port: u16,
    pub serializer: SerializerKind,
    pub load_balancer: LoadBalancerKind,
    pub retry_strategy: RetryStrategyKind,
    pub tolerant_strategy: TolerantStrategyKind,
    pub mock: bool,
    pub registry: RegistryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "mini-rpc".to_string(),
            version: "1.0".to_string(),
            server_host: "localhost".to_string(),
            server_port: 8121,
            serializer: SerializerKind::Jdk,
            load_balancer: LoadBalancerKind::RoundRobin,
            retry_strategy: RetryStrategyKind::No,
            tolerant_strategy: TolerantStrategyKind::FailFast,
            mock: false,
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    pub fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    pub fn with_serializer(mut self, kind: SerializerKind) -> Self {
        self.serializer = kind;
        self
    }

    pub fn with_load_balancer(mut self, kind: LoadBalancerKind) -> Self {
        self.load_balancer = kind;
        self
    }

    pub fn with_retry_strategy(mut self, kind: RetryStrategyKind) -> Self {
        self.retry_strategy = kind;
        self
    }

    pub fn with_tolerant_strategy(mut self, kind: TolerantStrategyKind) -> Self {
        self.tolerant_strategy = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerKind {
    RoundRobin,
    Random,
    ConsistentHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategyKind {
    No,
    FixedInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TolerantStrategyKind {
    FailFast,
    FailSafe,
    FailOver,
    FailBack,
}

/// `registryConfig.*` sub-table.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub registry: RegistryBackend,
    pub address: String,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry: RegistryBackend::Etcd,
            address: String::new(),
            timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackend {
    Etcd,
    /// In-process registry, useful for tests and single-binary deployments
    /// that haven't stood up etcd. Not part of the `spec.md` configuration
    /// table; an addition for testability.
    InMemory,
}

/// Registry key space root, fixed by `spec.md` §6.
pub const REGISTRY_ROOT: &str = "/rpc/";

/// Lease TTL for registered nodes, fixed by `spec.md` §6.
pub const LEASE_TTL: Duration = Duration::from_secs(30);

/// Heartbeat period, fixed by `spec.md` §6.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);
