use mini_rpc_protocol::{RpcRequest, RpcResponse, SerializationError, SerializerKind};

use super::Serializer;

/// Native struct-graph serialization via `bincode`: the closest analogue in
/// this ecosystem to the JDK's built-in object serialization the name
/// `"jdk"` refers to. Carries `RpcValue`/`TypeDescriptor` natively, so no
/// reshape step is needed after decoding (unlike `json`).
pub struct JdkSerializer;

impl Serializer for JdkSerializer {
    fn kind(&self) -> SerializerKind {
        SerializerKind::Jdk
    }

    fn serialize_request(&self, request: &RpcRequest) -> Result<Vec<u8>, SerializationError> {
        bincode::serialize(request).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_request(&self, bytes: &[u8]) -> Result<RpcRequest, SerializationError> {
        bincode::deserialize(bytes).map_err(|e| SerializationError::Decode(e.to_string()))
    }

    fn serialize_response(&self, response: &RpcResponse) -> Result<Vec<u8>, SerializationError> {
        bincode::serialize(response).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_response(&self, bytes: &[u8]) -> Result<RpcResponse, SerializationError> {
        bincode::deserialize(bytes).map_err(|e| SerializationError::Decode(e.to_string()))
    }
}
