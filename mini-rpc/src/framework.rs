use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};

use log::{info, warn};

use mini_rpc_protocol::{service_key, ServiceMetaInfo};

use crate::config::{Config, RegistryBackend, HEARTBEAT_PERIOD};
use crate::error::RpcError;
use crate::plugin::PluginLoader;
use crate::registry::{EtcdRegistry, InMemoryRegistry, LocalRegistry, RemoteRegistry, ServiceHandler, SharedStore};
use crate::transport;

/// Owns everything a `spec.md`-style deployment used to reach through process
/// globals for: configuration, the plugin loader, the local dispatch table,
/// and (once `expose` is called at least once) a running TCP server. Passed
/// around explicitly rather than kept in `static`s (Design Notes, "Global
/// singletons").
pub struct Framework {
    config: Config,
    plugin_loader: Arc<PluginLoader>,
    local_registry: Arc<LocalRegistry>,
    remote_registry: Arc<dyn RemoteRegistry>,
    heartbeat_running: Arc<AtomicBool>,
    heartbeat_thread: Mutex<Option<JoinHandle<()>>>,
    listener_started: Once,
}

impl Framework {
    /// Builds the remote registry backend from `config.registry`, starts the
    /// background heartbeat worker, and returns the handle. Does not yet bind
    /// a TCP listener — that only happens once a service is exposed.
    pub fn new(config: Config) -> Result<Self, RpcError> {
        let remote_registry: Arc<dyn RemoteRegistry> = match config.registry.registry {
            RegistryBackend::Etcd => {
                let endpoints: Vec<String> = config
                    .registry
                    .address
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                Arc::new(EtcdRegistry::connect(&endpoints)?)
            }
            RegistryBackend::InMemory => Arc::new(InMemoryRegistry::new(SharedStore::new())),
        };

        let plugin_loader = Arc::new(PluginLoader::new());
        register_builtin_constructors(&plugin_loader);

        let heartbeat_running = Arc::new(AtomicBool::new(true));
        let heartbeat_thread = spawn_heartbeat_worker(remote_registry.clone(), heartbeat_running.clone());

        Ok(Self {
            config,
            plugin_loader,
            local_registry: Arc::new(LocalRegistry::new()),
            remote_registry,
            heartbeat_running,
            heartbeat_thread: Mutex::new(Some(heartbeat_thread)),
            listener_started: Once::new(),
        })
    }

    /// Builds a `Framework` backed by an already-constructed in-memory store,
    /// so several `Framework`s in one process (or one test) can discover each
    /// other without a real etcd cluster.
    pub fn with_in_memory_registry(mut config: Config, store: Arc<SharedStore>) -> Result<Self, RpcError> {
        config.registry.registry = RegistryBackend::InMemory;
        let remote_registry: Arc<dyn RemoteRegistry> = Arc::new(InMemoryRegistry::new(store));

        let plugin_loader = Arc::new(PluginLoader::new());
        register_builtin_constructors(&plugin_loader);

        let heartbeat_running = Arc::new(AtomicBool::new(true));
        let heartbeat_thread = spawn_heartbeat_worker(remote_registry.clone(), heartbeat_running.clone());

        Ok(Self {
            config,
            plugin_loader,
            local_registry: Arc::new(LocalRegistry::new()),
            remote_registry,
            heartbeat_running,
            heartbeat_thread: Mutex::new(Some(heartbeat_thread)),
            listener_started: Once::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plugin_loader(&self) -> &Arc<PluginLoader> {
        &self.plugin_loader
    }

    pub fn server(&self) -> ServerHandle<'_> {
        ServerHandle { framework: self }
    }

    pub fn client(&self) -> ClientHandle<'_> {
        ClientHandle { framework: self }
    }

    /// Unregisters every service this handle exposed and stops the heartbeat
    /// worker. The TCP accept thread (if a server was started) is left
    /// running for the remainder of the process — there is no clean way to
    /// interrupt a blocking `accept()` short of closing the listener, which
    /// this handle no longer holds once the accept thread owns it.
    pub fn shutdown(&self) -> Result<(), RpcError> {
        self.heartbeat_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.heartbeat_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.remote_registry.destroy()?;
        Ok(())
    }
}

fn spawn_heartbeat_worker(remote_registry: Arc<dyn RemoteRegistry>, running: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            thread::sleep(HEARTBEAT_PERIOD);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = remote_registry.heartbeat() {
                warn!("heartbeat failed: {e}");
            }
        }
    })
}

fn register_builtin_constructors(loader: &PluginLoader) {
    loader.register_constructor("load_balancer", "round_robin", crate::balance::RoundRobin::new);
    loader.register_constructor("load_balancer", "random", || crate::balance::Random);
    loader.register_constructor("load_balancer", "consistent_hash", || crate::balance::ConsistentHash);
}

/// Server-side half of the `Framework` builder API: `expose` is the Rust
/// substitute for an `@RpcService`-style annotation (`spec.md` §6, `SPEC_FULL.md`
/// §6's three explicit calls).
pub struct ServerHandle<'a> {
    framework: &'a Framework,
}

impl ServerHandle<'_> {
    /// Registers `handler` locally under `"{service_name}:{version}"` and
    /// advertises it on the remote registry. The first call to `expose` also
    /// binds and starts the TCP accept loop on `config.server_host:server_port`.
    pub fn expose(&self, service_name: &str, version: &str, handler: Arc<dyn ServiceHandler>) -> Result<(), RpcError> {
        let key = service_key(service_name, version);
        self.framework.local_registry.register(key.clone(), handler);

        let meta = ServiceMetaInfo::new(service_name, &self.framework.config.server_host, self.framework.config.server_port)
            .with_version(version);
        self.framework.remote_registry.register(&meta)?;

        self.ensure_listening()?;
        Ok(())
    }

    fn ensure_listening(&self) -> Result<(), RpcError> {
        let config = &self.framework.config;
        let local_registry = self.framework.local_registry.clone();
        let host = config.server_host.clone();
        let port = config.server_port;

        let mut start_err = None;
        self.framework.listener_started.call_once(|| match TcpListener::bind((host.as_str(), port)) {
            Ok(listener) => {
                info!("mini-rpc server listening on {host}:{port}");
                thread::spawn(move || transport::run_blocking_tcp_server(listener, local_registry));
            }
            Err(e) => start_err = Some(e),
        });

        if let Some(e) = start_err {
            return Err(RpcError::TransportIo(e));
        }
        Ok(())
    }
}

/// Client-side half of the `Framework` builder API: `proxy` is the Rust
/// substitute for an `@RpcReference`-style injected field.
pub struct ClientHandle<'a> {
    framework: &'a Framework,
}

impl ClientHandle<'_> {
    pub fn proxy(&self, service_name: &str, version: &str) -> crate::proxy::ServiceProxy {
        crate::proxy::ServiceProxy::new(
            self.framework.config.clone(),
            self.framework.remote_registry.clone(),
            service_name.to_string(),
            version.to_string(),
        )
    }
}
