use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A wire-level argument or return value.
///
/// Replaces the "opaque value" language of the framed spec with a closed
/// tagged union: every serializer can encode and decode every variant without
/// needing reflection, and the JSON serializer's per-argument reshape step
/// has a concrete target to coerce into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RpcValue {
    Unit,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<RpcValue>),
    /// Escape hatch for structured application types that don't map onto the
    /// tags above; carried as a parsed JSON document regardless of which wire
    /// serializer is configured.
    Json(serde_json::Value),
}

/// Static description of an `RpcValue`'s shape, attached to each argument
/// position and to a response's `data`, so that a loosely-typed serializer
/// (namely JSON) can re-coerce a decoded value into the statically expected
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Unit,
    Bool,
    I64,
    F64,
    Str,
    Bytes,
    List(Box<TypeDescriptor>),
    /// A named application type carried as JSON; the name is purely
    /// descriptive (used in log messages and `RpcResponse.dataType` echoes),
    /// it is not looked up anywhere.
    Named(String),
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Bool => write!(f, "bool"),
            Self::I64 => write!(f, "i64"),
            Self::F64 => write!(f, "f64"),
            Self::Str => write!(f, "str"),
            Self::Bytes => write!(f, "bytes"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Immutable request envelope. Created by the client proxy; consumed by the
/// server dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// The qualified interface identifier, e.g. `"com.example.UserService"`.
    pub service_name: String,
    pub method_name: String,
    /// Ordered, aligned 1:1 with `args`.
    pub parameter_types: Vec<TypeDescriptor>,
    pub args: Vec<RpcValue>,
    pub service_version: Option<String>,
}

/// Structured description of a server-side failure, carried in
/// `RpcResponse.exception` rather than as a protocol-level error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcException {
    pub kind: String,
    pub message: String,
}

/// Reply envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    pub data: Option<RpcValue>,
    /// Required whenever `data` is `Some`, so typed deserializers can
    /// reconstruct it.
    pub data_type: Option<TypeDescriptor>,
    pub message: String,
    pub exception: Option<RpcException>,
}

impl RpcResponse {
    pub fn ok(data: RpcValue, data_type: TypeDescriptor) -> Self {
        Self {
            data: Some(data),
            data_type: Some(data_type),
            message: "ok".to_string(),
            exception: None,
        }
    }

    pub fn failed(exception: RpcException) -> Self {
        Self {
            data: None,
            data_type: None,
            message: exception.message.clone(),
            exception: Some(exception),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            data: None,
            data_type: None,
            message: message.into(),
            exception: None,
        }
    }
}

/// Endpoint record discovered via (or registered with) the remote registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceMetaInfo {
    pub service_name: String,
    pub service_version: String,
    pub service_host: String,
    pub service_port: u16,
    pub service_group: String,
}

impl ServiceMetaInfo {
    pub fn new(service_name: impl Into<String>, service_host: impl Into<String>, service_port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: "1.0".to_string(),
            service_host: service_host.into(),
            service_port,
            service_group: "default".to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.service_group = group.into();
        self
    }

    /// `"{name}:{version}"` — discovery lookup key.
    pub fn service_key(&self) -> String {
        service_key(&self.service_name, &self.service_version)
    }

    /// `"{serviceKey}/{host}:{port}"` — unique registry node identity.
    pub fn service_node_key(&self) -> String {
        format!("{}/{}:{}", self.service_key(), self.service_host, self.service_port)
    }
}

/// `"{name}:{version}"`, computed the same way on the discovery request side
/// where there is no `ServiceMetaInfo` yet.
pub fn service_key(name: &str, version: &str) -> String {
    format!("{name}:{version}")
}

/// Monotonic-ish unique id per request (snowflake-style): the high 32 bits
/// are seconds since `UNIX_EPOCH` at process start-of-use, the low 32 bits an
/// atomic counter. Big-endian on the wire (see `Header`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let low = COUNTER.fetch_add(1, Ordering::Relaxed);
        RequestId(((seconds as u64) << 32) | low as u64)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
