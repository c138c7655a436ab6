use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use etcd_client::{Client, GetOptions, PutOptions, WatchOptions};
use tokio::runtime::Runtime;

use mini_rpc_protocol::ServiceMetaInfo;

use crate::config::{LEASE_TTL, REGISTRY_ROOT};
use crate::error::RegistryError;

use super::{DiscoveryCache, RemoteRegistry};

/// Default backing store (`spec.md` §6, `registryConfig.registry = etcd`).
/// This workspace is otherwise synchronous; `etcd-client` is async, so this
/// type owns a small dedicated Tokio runtime and blocks on it rather than
/// exposing an async API to the rest of the crate — the same "own a blocking
/// handle to an async dependency" shape the reference crate uses for `nix`'s
/// raw syscalls.
pub struct EtcdRegistry {
    runtime: Runtime,
    client: Mutex<Client>,
    cache: DiscoveryCache,
    generation: Arc<AtomicU64>,
    last_seen_generation: AtomicU64,
    watched_keys: RwLock<HashSet<String>>,
    /// node key -> lease id, for renewal and teardown.
    tracked: Mutex<HashMap<String, i64>>,
}

impl EtcdRegistry {
    /// Establishes a session to the backing store. Fails if unreachable.
    pub fn connect(endpoints: &[String]) -> Result<Self, RegistryError> {
        let runtime = Runtime::new()
            .map_err(|e| RegistryError::new(endpoints.join(","), format!("failed to start runtime: {e}")))?;

        let client = runtime
            .block_on(Client::connect(endpoints, None))
            .map_err(|e| RegistryError::new(endpoints.join(","), format!("failed to connect to etcd: {e}")))?;

        Ok(Self {
            runtime,
            client: Mutex::new(client),
            cache: DiscoveryCache::new(),
            generation: Arc::new(AtomicU64::new(0)),
            last_seen_generation: AtomicU64::new(0),
            watched_keys: RwLock::new(HashSet::new()),
            tracked: Mutex::new(HashMap::new()),
        })
    }

    fn client(&self) -> Client {
        self.client.lock().unwrap().clone()
    }

    fn refresh_cache_if_stale(&self) {
        let current = self.generation.load(Ordering::SeqCst);
        let last = self.last_seen_generation.swap(current, Ordering::SeqCst);
        if last != current {
            self.cache.clear();
        }
    }

    /// Installs a watch on `{root}{service_key}/` the first time `discover`
    /// observes that key, so a later DELETE or PUT clears the whole cache
    /// (`spec.md` §4.4). Runs for the lifetime of the registry handle.
    fn ensure_watch(&self, service_key: &str) {
        {
            let watched = self.watched_keys.read().unwrap();
            if watched.contains(service_key) {
                return;
            }
        }

        let mut watched = self.watched_keys.write().unwrap();
        if !watched.insert(service_key.to_string()) {
            return;
        }
        drop(watched);

        let prefix = format!("{REGISTRY_ROOT}{service_key}/");
        let mut client = self.client();
        let generation = self.generation.clone();

        self.runtime.spawn(async move {
            let (_watcher, mut stream) = match client.watch(prefix.clone(), Some(WatchOptions::new().with_prefix())).await {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("failed to install watch on {prefix}: {e}");
                    return;
                }
            };

            loop {
                match stream.message().await {
                    Ok(Some(resp)) if !resp.events().is_empty() => {
                        generation.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!("watch stream for {prefix} ended with error: {e}");
                        break;
                    }
                }
            }
        });
    }
}

impl RemoteRegistry for EtcdRegistry {
    fn register(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError> {
        let node_key = meta.service_node_key();
        let path = format!("{REGISTRY_ROOT}{node_key}");
        let payload = serde_json::to_vec(meta).map_err(|e| RegistryError::new(&node_key, e.to_string()))?;

        let mut client = self.client();

        self.runtime.block_on(async move {
            let lease = client
                .lease_grant(LEASE_TTL.as_secs() as i64, None)
                .await
                .map_err(|e| RegistryError::new(&node_key, format!("lease_grant failed: {e}")))?;

            client
                .put(path, payload, Some(PutOptions::new().with_lease(lease.id())))
                .await
                .map_err(|e| RegistryError::new(&node_key, format!("put failed: {e}")))?;

            self.tracked.lock().unwrap().insert(node_key, lease.id());
            Ok(())
        })
    }

    fn unregister(&self, meta: &ServiceMetaInfo) -> Result<(), RegistryError> {
        let node_key = meta.service_node_key();
        let path = format!("{REGISTRY_ROOT}{node_key}");

        let mut client = self.client();
        self.runtime
            .block_on(async move { client.delete(path, None).await })
            .map_err(|e| RegistryError::new(&node_key, format!("delete failed: {e}")))?;

        self.tracked.lock().unwrap().remove(&node_key);
        Ok(())
    }

    fn discover(&self, service_key: &str) -> Result<Vec<ServiceMetaInfo>, RegistryError> {
        self.ensure_watch(service_key);
        self.refresh_cache_if_stale();

        if let Some(cached) = self.cache.get(service_key) {
            return Ok(cached);
        }

        let prefix = format!("{REGISTRY_ROOT}{service_key}/");
        let mut client = self.client();

        let resp = self
            .runtime
            .block_on(async move { client.get(prefix.clone(), Some(GetOptions::new().with_prefix())).await })
            .map_err(|e| RegistryError::new(service_key, format!("get failed: {e}")))?;

        let mut services = Vec::new();
        for kv in resp.kvs() {
            match serde_json::from_slice::<ServiceMetaInfo>(kv.value()) {
                Ok(meta) => services.push(meta),
                Err(e) => log::warn!("failed to decode registry node {}: {e}", kv.key_str().unwrap_or("<invalid utf8>")),
            }
        }

        self.cache.populate(service_key, services.clone());
        Ok(services)
    }

    fn heartbeat(&self) -> Result<(), RegistryError> {
        let tracked: Vec<(String, i64)> = self
            .tracked
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        let mut client = self.client();

        self.runtime.block_on(async {
            for (_, lease_id) in tracked {
                let (mut keeper, mut stream) = match client.lease_keep_alive(lease_id).await {
                    Ok(pair) => pair,
                    Err(_) => continue, // lease already expired; node considered gone, not resurrected.
                };

                if keeper.keep_alive().await.is_err() {
                    continue;
                }
                let _ = stream.message().await;
            }
        });

        Ok(())
    }

    fn destroy(&self) -> Result<(), RegistryError> {
        let tracked: Vec<String> = self.tracked.lock().unwrap().keys().cloned().collect();
        let mut client = self.client();

        self.runtime.block_on(async {
            for node_key in &tracked {
                let path = format!("{REGISTRY_ROOT}{node_key}");
                let _ = client.delete(path, None).await;
            }
        });

        self.tracked.lock().unwrap().clear();
        Ok(())
    }
}
