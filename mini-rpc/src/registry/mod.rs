pub mod local;
pub mod remote;

pub use local::{LocalRegistry, ServiceHandler};
pub use remote::{DiscoveryCache, RemoteRegistry};
pub use remote::etcd::EtcdRegistry;
pub use remote::memory::{InMemoryRegistry, SharedStore};
