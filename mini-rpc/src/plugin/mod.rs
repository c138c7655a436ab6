mod descriptor;

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::RpcError;

type Constructor = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// A named-implementation registry (SPI-style), the single extension point
/// used to resolve serializers, load balancers, registries, retry strategies,
/// and tolerance strategies by configuration string (`spec.md` §4.11).
///
/// Rust has no classpath or reflective class loading, so "fully qualified
/// implementation class" becomes a constructor closure registered ahead of
/// time via `register_constructor`; the descriptor files still do the same
/// *selection* job the Java version's classpath scan did — picking which
/// already-linked implementation answers to a given key — just resolved at
/// link time instead of at classload time (see `SPEC_FULL.md` §4.11).
pub struct PluginLoader {
    system_root: Option<PathBuf>,
    custom_root: Option<PathBuf>,
    constructors: Mutex<HashMap<(&'static str, String), Constructor>>,
    loaded: Mutex<HashMap<&'static str, HashMap<String, String>>>,
    instances: Mutex<HashMap<(&'static str, String), Arc<dyn Any + Send + Sync>>>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self {
            system_root: None,
            custom_root: None,
            constructors: Mutex::new(HashMap::new()),
            loaded: Mutex::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Framework-provided defaults. Scanned first; the custom root can
    /// override any key it also defines.
    pub fn with_system_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.system_root = Some(root.into());
        self
    }

    /// User-provided overrides. Scanned second; later writes win.
    pub fn with_custom_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.custom_root = Some(root.into());
        self
    }

    /// Links an implementation under `(interface, impl_name)` so that a
    /// descriptor entry naming `impl_name` for some key can be resolved.
    pub fn register_constructor<T: Any + Send + Sync>(
        &self,
        interface: &'static str,
        impl_name: impl Into<String>,
        ctor: impl Fn() -> T + Send + Sync + 'static,
    ) {
        let impl_name = impl_name.into();
        let boxed: Constructor = Arc::new(move || Arc::new(ctor()) as Arc<dyn Any + Send + Sync>);
        self.constructors
            .lock()
            .unwrap()
            .insert((interface, impl_name), boxed);
    }

    /// Reads all descriptor files for `interface` across both scan roots.
    /// Also usable directly with in-memory descriptor text via
    /// `load_from_str`, for hosts that don't keep descriptors on disk.
    pub fn load(&self, interface: &'static str) {
        let mut merged = HashMap::new();

        if let Some(root) = &self.system_root {
            merged.extend(descriptor::read_from_root(root, interface));
        }
        if let Some(root) = &self.custom_root {
            merged.extend(descriptor::read_from_root(root, interface));
        }

        self.loaded.lock().unwrap().insert(interface, merged);
    }

    /// Loads descriptor text directly (bypassing the filesystem), merging
    /// into whatever has already been loaded for `interface`; later calls
    /// override earlier ones for the same key, same as the custom root
    /// overriding the system root.
    pub fn load_from_str(&self, interface: &'static str, contents: &str) {
        let parsed = descriptor::parse(interface, contents);
        self.loaded
            .lock()
            .unwrap()
            .entry(interface)
            .or_default()
            .extend(parsed);
    }

    /// Returns the lazily-constructed singleton for `key` under `interface`.
    /// Calling this twice with the same arguments returns the same
    /// underlying instance (the `Arc` is cloned, not rebuilt).
    pub fn get_instance<T: Any + Send + Sync>(&self, interface: &'static str, key: &str) -> Result<Arc<T>, RpcError> {
        if let Some(existing) = self.instances.lock().unwrap().get(&(interface, key.to_string())) {
            return downcast(existing.clone(), interface, key);
        }

        if !self.loaded.lock().unwrap().contains_key(interface) {
            self.load(interface);
        }

        let impl_name = {
            let loaded = self.loaded.lock().unwrap();
            loaded
                .get(interface)
                .and_then(|m| m.get(key))
                .cloned()
                .ok_or_else(|| RpcError::PluginNotFound {
                    interface,
                    key: key.to_string(),
                })?
        };

        let ctor = self
            .constructors
            .lock()
            .unwrap()
            .get(&(interface, impl_name.clone()))
            .cloned()
            .ok_or_else(|| RpcError::PluginNotFound {
                interface,
                key: key.to_string(),
            })?;

        let instance = ctor();
        self.instances
            .lock()
            .unwrap()
            .insert((interface, key.to_string()), instance.clone());

        downcast(instance, interface, key)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Any + Send + Sync>(instance: Arc<dyn Any + Send + Sync>, interface: &'static str, key: &str) -> Result<Arc<T>, RpcError> {
    instance.downcast::<T>().map_err(|_| {
        RpcError::Dispatch(format!(
            "plugin '{key}' for interface '{interface}' was registered with a mismatched type"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn get_instance_returns_the_same_reference_across_calls() {
        let loader = PluginLoader::new();
        loader.register_constructor("greeter", "loud", || String::from("HELLO"));
        loader.load_from_str("greeter", "default=loud");

        let first = loader.get_instance::<String>("greeter", "default").unwrap();
        let second = loader.get_instance::<String>("greeter", "default").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn get_instance_constructs_lazily_and_only_once() {
        let builds = Arc::new(AtomicU32::new(0));
        let builds_in_ctor = builds.clone();

        let loader = PluginLoader::new();
        loader.register_constructor("counter", "impl", move || {
            builds_in_ctor.fetch_add(1, Ordering::SeqCst);
            42i32
        });
        loader.load_from_str("counter", "default=impl");

        assert_eq!(builds.load(Ordering::SeqCst), 0);
        loader.get_instance::<i32>("counter", "default").unwrap();
        loader.get_instance::<i32>("counter", "default").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_key_fails_with_plugin_not_found() {
        let loader = PluginLoader::new();
        loader.load_from_str("greeter", "default=loud");

        let err = loader.get_instance::<String>("greeter", "missing").unwrap_err();
        assert!(matches!(err, RpcError::PluginNotFound { .. }));
    }

    #[test]
    fn unknown_interface_fails_with_plugin_not_found() {
        let loader = PluginLoader::new();
        let err = loader.get_instance::<String>("never-loaded", "default").unwrap_err();
        assert!(matches!(err, RpcError::PluginNotFound { .. }));
    }

    #[test]
    fn custom_root_descriptor_overrides_the_system_root() {
        let system = tempdir();
        let custom = tempdir();
        std::fs::write(system.join("greeter"), "default=loud\n").unwrap();
        std::fs::write(custom.join("greeter"), "default=quiet\n").unwrap();

        let loader = PluginLoader::new().with_system_root(system.clone()).with_custom_root(custom.clone());
        loader.register_constructor("greeter", "loud", || String::from("HELLO"));
        loader.register_constructor("greeter", "quiet", || String::from("hi"));

        let resolved = loader.get_instance::<String>("greeter", "default").unwrap();
        assert_eq!(*resolved, "hi");

        let _ = std::fs::remove_dir_all(&system);
        let _ = std::fs::remove_dir_all(&custom);
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mini-rpc-plugin-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
