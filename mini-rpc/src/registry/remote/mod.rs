pub mod etcd;
pub mod memory;

use std::collections::HashMap;
use std::sync::RwLock;

use mini_rpc_protocol::ServiceMetaInfo;

use crate::error::RegistryError;

/// Registration with lease-based expiry, discovery with client-side caching,
/// change notifications that invalidate the cache, and periodic heartbeat
/// renewal (`spec.md` §4.4). An equivalent implementation against a
/// different coordination service is permitted provided every operation
/// honors: ephemeral-on-process-death, atomic writes, prefix query, and
/// per-key change notification.
pub trait RemoteRegistry: Send + Sync {
    /// Creates an ephemeral node under `{root}/{serviceNodeKey}`, bound to a
    /// 30s lease. Records the node key locally for later renewal/teardown.
    fn register(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError>;

    /// Deletes the node and drops the local key.
    fn unregister(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError>;

    /// Returns the list of live `ServiceMetaInfo` under `{root}/{serviceKey}/`.
    /// Never fails with "not found" for an unknown key — an empty `Vec` is a
    /// legitimate, successful answer; only a backing-store failure surfaces
    /// as `RegistryError`.
    fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>, RegistryError>;

    /// Scheduled every 10s by the owning `Framework`: for each locally
    /// tracked node key, verify its presence and re-register (re-lease) it.
    /// A node missing from the store is considered already expired and is
    /// skipped, not resurrected.
    fn heartbeat(&self) -> Result<(), RegistryError>;

    /// Deletes all locally tracked nodes and releases the session.
    fn destroy(&self) -> Result<(), RegistryError>;
}

/// Per-consumer cache keyed by `serviceKey`. An entry holds either a definite
/// list (possibly empty) or is absent; it is invalidated whole on any
/// watched-node change (`spec.md` §3).
///
/// Both backing-store implementations model "a watch fired" as a bump of a
/// monotonic generation counter observed by this cache; when the observed
/// generation is stale the entire cache is cleared before the next lookup,
/// which is the same observable behavior as tracking one watch object per
/// node without the bookkeeping.
#[derive(Default)]
pub struct DiscoveryCache {
    entries: RwLock<HashMap<String, Vec<ServiceMetaInfo>>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_key: &str) -> Option<Vec<ServiceMetaInfo>> {
        self.entries.read().unwrap().get(service_key).cloned()
    }

    pub fn populate(&self, service_key: &str, services: Vec<ServiceMetaInfo>) {
        self.entries.write().unwrap().insert(service_key.to_string(), services);
    }

    /// Whole-cache invalidation: every entry is dropped, regardless of which
    /// key changed.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}
