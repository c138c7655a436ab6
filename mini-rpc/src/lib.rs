//! A small RPC framework: a service registry for discovery, a pluggable
//! wire serializer over the framing defined by `mini_rpc_protocol`, load
//! balancing, retry and fault-tolerance, and a blocking TCP transport tying
//! it all together.
//!
//! The entry point is [`Framework`]: it owns one [`plugin::PluginLoader`],
//! one [`config::Config`], and (once a service is exposed) a local dispatch
//! table and a running TCP accept loop. A provider calls
//! `framework.server().expose(name, version, handler)`; a consumer calls
//! `framework.client().proxy(name, version)` and invokes methods through the
//! returned [`proxy::ServiceProxy`]. Neither side reaches through a process
//! global to find the other's machinery.

pub mod balance;
pub mod codec;
pub mod config;
pub mod error;
pub mod framework;
pub mod plugin;
pub mod proxy;
pub mod registry;
pub mod resilience;
pub mod serialize;
pub mod transport;

pub use config::Config;
pub use error::{RegistryError, RpcError};
pub use framework::{ClientHandle, Framework, ServerHandle};
pub use plugin::PluginLoader;
pub use proxy::ServiceProxy;
pub use registry::{LocalRegistry, ServiceHandler};
