use std::fmt;

use mini_rpc_protocol::{ProtocolError, SerializationError};

/// Top-level error surfaced by the client pipeline, the server dispatcher, and
/// the plugin loader. Matches the error kinds enumerated in `spec.md` §7.
#[derive(Debug)]
pub enum RpcError {
    /// Bad magic, unknown serializer/type id, truncated frame. Not retried;
    /// closes the connection.
    Protocol(ProtocolError),

    /// Serializer-internal failure. Not retried by the transport layer;
    /// surfaces to the caller.
    Serialization(SerializationError),

    /// Discovery, registration, or watch failure against the remote registry.
    /// Fatal for the current call; retry policies MAY re-invoke.
    Registry(RegistryError),

    /// Discovery returned an empty list. Not retried (retry would not help);
    /// handed to the tolerance strategy.
    NoEndpoints { service_key: String },

    /// The per-call timeout elapsed before a response arrived.
    TransportTimeout,

    /// A transient transport failure (connect/read/write). Retried under any
    /// non-`no` retry strategy.
    TransportIo(std::io::Error),

    /// Server-side method lookup or invocation failure. Carried in the
    /// response's `exception` field; not a protocol-level failure, but
    /// surfaced here too when the client-side code needs to inspect it.
    Dispatch(String),

    /// Configuration-time: no implementation registered under the requested
    /// plugin key.
    PluginNotFound { interface: &'static str, key: String },

    /// All configured retry attempts were exhausted.
    RetryExhausted { attempts: u32, last: Box<RpcError> },
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Serialization(e) => write!(f, "{e}"),
            Self::Registry(e) => write!(f, "registry error: {e}"),
            Self::NoEndpoints { service_key } => {
                write!(f, "no endpoints available for service '{service_key}'")
            }
            Self::TransportTimeout => write!(f, "transport timed out waiting for a response"),
            Self::TransportIo(e) => write!(f, "transport I/O error: {e}"),
            Self::Dispatch(msg) => write!(f, "server dispatch error: {msg}"),
            Self::PluginNotFound { interface, key } => {
                write!(f, "no implementation registered for {interface} under key '{key}'")
            }
            Self::RetryExhausted { attempts, last } => {
                write!(f, "retry exhausted after {attempts} attempt(s): {last}")
            }
        }
    }
}

impl std::error::Error for RpcError {}

impl From<ProtocolError> for RpcError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<SerializationError> for RpcError {
    fn from(e: SerializationError) -> Self {
        Self::Serialization(e)
    }
}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        Self::TransportIo(e)
    }
}

impl From<mini_rpc_protocol::FrameError> for RpcError {
    fn from(e: mini_rpc_protocol::FrameError) -> Self {
        match e {
            mini_rpc_protocol::FrameError::Io(io) => Self::TransportIo(io),
            mini_rpc_protocol::FrameError::Protocol(p) => Self::Protocol(p),
        }
    }
}

impl From<RegistryError> for RpcError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

/// Discovery, registration, or watch failure against the remote registry.
#[derive(Debug)]
pub struct RegistryError {
    /// The registry key the failing operation was acting on, when known.
    pub key: String,
    pub message: String,
}

impl RegistryError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (key='{}')", self.message, self.key)
    }
}

impl std::error::Error for RegistryError {}
