mod hessian;
mod jdk;
mod json;
mod kryo;

use mini_rpc_protocol::{RpcRequest, RpcResponse, SerializationError, SerializerKind};

/// Converts `RpcRequest`/`RpcResponse` values to and from bytes. Four named
/// kinds exist (`spec.md` §4.2, §6); all of them must be safe to call from
/// many threads concurrently without external synchronization.
pub trait Serializer: Send + Sync {
    fn kind(&self) -> SerializerKind;

    fn serialize_request(&self, request: &RpcRequest) -> Result<Vec<u8>, SerializationError>;
    fn deserialize_request(&self, bytes: &[u8]) -> Result<RpcRequest, SerializationError>;

    fn serialize_response(&self, response: &RpcResponse) -> Result<Vec<u8>, SerializationError>;
    fn deserialize_response(&self, bytes: &[u8]) -> Result<RpcResponse, SerializationError>;
}

/// Returns the stateless singleton for a given wire kind. Each implementation
/// below is either intrinsically stateless (no interior mutability at all) or
/// manages its own per-thread resources, satisfying §4.2's concurrency
/// requirement without needing a lock here.
pub fn for_kind(kind: SerializerKind) -> &'static dyn Serializer {
    match kind {
        SerializerKind::Jdk => &jdk::JdkSerializer,
        SerializerKind::Json => &json::JsonSerializer,
        SerializerKind::Kryo => &kryo::KryoSerializer,
        SerializerKind::Hessian => &hessian::HessianSerializer,
    }
}
