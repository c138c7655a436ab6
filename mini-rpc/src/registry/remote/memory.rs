use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use mini_rpc_protocol::ServiceMetaInfo;

use crate::config::LEASE_TTL;
use crate::error::RegistryError;

use super::{DiscoveryCache, RemoteRegistry};

struct Node {
    meta: ServiceMetaInfo,
    expires_at: Instant,
}

/// The in-process backing store shared by every `InMemoryRegistry` handle
/// constructed from it, modeling one coordination-service cluster that many
/// client sessions talk to.
#[derive(Default)]
pub struct SharedStore {
    nodes: Mutex<HashMap<String, Node>>,
    generation: AtomicU64,
}

impl SharedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops any node whose lease has expired. Returns true if anything was
    /// removed, so the caller can decide whether to bump the generation.
    fn prune_expired(&self) -> bool {
        let now = Instant::now();
        let mut nodes = self.nodes.lock().unwrap();
        let before = nodes.len();
        nodes.retain(|_, node| node.expires_at > now);
        nodes.len() != before
    }
}

/// In-process registry backend used by tests and by hosts that haven't stood
/// up etcd. Models the same `register`/`unregister`/`discover` shape the
/// workspace's earlier standalone name-service demonstrated (set / unset /
/// getaddr / dump against a single shared service list), generalized from one
/// fixed program number to the spec's many-`serviceKey` model.
pub struct InMemoryRegistry {
    store: Arc<SharedStore>,
    cache: DiscoveryCache,
    last_seen_generation: AtomicU64,
    tracked: Mutex<HashSet<String>>,
}

impl InMemoryRegistry {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self {
            store,
            cache: DiscoveryCache::new(),
            last_seen_generation: AtomicU64::new(0),
            tracked: Mutex::new(HashSet::new()),
        }
    }

    fn refresh_cache_if_stale(&self) {
        let changed = self.store.prune_expired();
        if changed {
            self.store.bump();
        }

        let current = self.store.generation.load(Ordering::SeqCst);
        let last = self.last_seen_generation.swap(current, Ordering::SeqCst);
        if last != current {
            self.cache.clear();
        }
    }
}

impl RemoteRegistry for InMemoryRegistry {
    fn register(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError> {
        let node_key = meta.service_node_key();

        if meta.service_host.is_empty() {
            return Err(RegistryError::new(node_key, "service host must not be empty"));
        }

        self.store.nodes.lock().unwrap().insert(
            node_key.clone(),
            Node {
                meta: meta.clone(),
                expires_at: Instant::now() + LEASE_TTL,
            },
        );
        self.store.bump();
        self.tracked.lock().unwrap().insert(node_key);

        Ok(())
    }

    fn unregister(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError> {
        let node_key = meta.service_node_key();
        self.store.nodes.lock().unwrap().remove(&node_key);
        self.store.bump();
        self.tracked.lock().unwrap().remove(&node_key);
        Ok(())
    }

    fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>, RegistryError> {
        self.refresh_cache_if_stale();

        if let Some(cached) = self.cache.get(service_key) {
            return Ok(cached);
        }

        let prefix = format!("{service_key}/");
        let services: Vec<ServiceMetaInfo> = self
            .store
            .nodes
            .lock()
            .unwrap()
            .values()
            .filter(|node| node.meta.service_node_key().starts_with(&prefix))
            .map(|node| node.meta.clone())
            .collect();

        self.cache.populate(service_key, services.clone());
        Ok(services)
    }

    fn heartbeat(&self) -> Result<(), RegistryError> {
        let tracked = self.tracked.lock().unwrap().clone();
        let mut nodes = self.store.nodes.lock().unwrap();

        for key in &tracked {
            if let Some(node) = nodes.get_mut(key) {
                node.expires_at = Instant::now() + LEASE_TTL;
            }
            // A node missing from the store is considered already expired
            // and is skipped, not resurrected.
        }

        Ok(())
    }

    fn destroy(&self) -> Result<(), RegistryError> {
        let tracked = self.tracked.lock().unwrap().drain().collect::<Vec<_>>();
        let mut nodes = self.store.nodes.lock().unwrap();
        for key in tracked {
            nodes.remove(&key);
        }
        drop(nodes);
        self.store.bump();
        Ok(())
    }
}
