use mini_rpc_protocol::{RpcRequest, RpcResponse, SerializationError, SerializerKind};

use super::Serializer;

/// Compact, schema-driven binary via `postcard`: the closest analogue in this
/// ecosystem to Kryo's reflective compact binary format. Like `jdk`, carries
/// types natively and needs no reshape.
pub struct KryoSerializer;

impl Serializer for KryoSerializer {
    fn kind(&self) -> SerializerKind {
        SerializerKind::Kryo
    }

    fn serialize_request(&self, request: &RpcRequest) -> Result<Vec<u8>, SerializationError> {
        postcard::to_allocvec(request).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_request(&self, bytes: &[u8]) -> Result<RpcRequest, SerializationError> {
        postcard::from_bytes(bytes).map_err(|e| SerializationError::Decode(e.to_string()))
    }

    fn serialize_response(&self, response: &RpcResponse) -> Result<Vec<u8>, SerializationError> {
        postcard::to_allocvec(response).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_response(&self, bytes: &[u8]) -> Result<RpcResponse, SerializationError> {
        postcard::from_bytes(bytes).map_err(|e| SerializationError::Decode(e.to_string()))
    }
}
