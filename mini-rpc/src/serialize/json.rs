use serde::{Deserialize, Serialize};
use serde_json::Value;

use mini_rpc_protocol::{RpcException, RpcRequest, RpcResponse, RpcValue, SerializationError, SerializerKind, TypeDescriptor};

use super::Serializer;

/// JSON erases static type: on the wire, args and response data are plain
/// JSON values (numbers, strings, arrays, objects), not the internally-tagged
/// `RpcValue` representation the other serializers use. Decoding therefore
/// must re-coerce each value into the shape its `TypeDescriptor` promises,
/// exactly as `spec.md` §4.2 requires.
pub struct JsonSerializer;

#[derive(Serialize, Deserialize)]
struct WireRequest {
    service_name: String,
    method_name: String,
    parameter_types: Vec<TypeDescriptor>,
    args: Vec<Value>,
    service_version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    data: Option<Value>,
    data_type: Option<TypeDescriptor>,
    message: String,
    exception: Option<RpcException>,
}

fn to_loose_json(value: &RpcValue) -> Value {
    match value {
        RpcValue::Unit => Value::Null,
        RpcValue::Bool(b) => Value::Bool(*b),
        RpcValue::I64(i) => Value::from(*i),
        RpcValue::F64(f) => Value::from(*f),
        RpcValue::Str(s) => Value::from(s.clone()),
        RpcValue::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        RpcValue::List(items) => Value::Array(items.iter().map(to_loose_json).collect()),
        RpcValue::Json(v) => v.clone(),
    }
}

/// Re-coerces a loose JSON value into the shape named by `target`, the JSON
/// reshape step mandated by `spec.md` §4.2.
fn reshape(value: Value, target: &TypeDescriptor) -> Result<RpcValue, SerializationError> {
    match target {
        TypeDescriptor::Unit => Ok(RpcValue::Unit),
        TypeDescriptor::Bool => value
            .as_bool()
            .map(RpcValue::Bool)
            .ok_or_else(|| SerializationError::Decode(format!("expected bool, got {value}"))),
        TypeDescriptor::I64 => value
            .as_i64()
            .map(RpcValue::I64)
            .ok_or_else(|| SerializationError::Decode(format!("expected i64, got {value}"))),
        TypeDescriptor::F64 => value
            .as_f64()
            .map(RpcValue::F64)
            .ok_or_else(|| SerializationError::Decode(format!("expected f64, got {value}"))),
        TypeDescriptor::Str => value
            .as_str()
            .map(|s| RpcValue::Str(s.to_string()))
            .ok_or_else(|| SerializationError::Decode(format!("expected string, got {value}"))),
        TypeDescriptor::Bytes => {
            let arr = value
                .as_array()
                .ok_or_else(|| SerializationError::Decode(format!("expected byte array, got {value}")))?;
            let bytes = arr
                .iter()
                .map(|b| {
                    b.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| SerializationError::Decode(format!("expected byte, got {b}")))
                })
                .collect::<Result<Vec<u8>, _>>()?;
            Ok(RpcValue::Bytes(bytes))
        }
        TypeDescriptor::List(inner) => {
            let arr = value
                .as_array()
                .ok_or_else(|| SerializationError::Decode(format!("expected array, got {value}")))?
                .clone();
            let items = arr
                .into_iter()
                .map(|v| reshape(v, inner))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RpcValue::List(items))
        }
        TypeDescriptor::Named(_) => Ok(RpcValue::Json(value)),
    }
}

impl Serializer for JsonSerializer {
    fn kind(&self) -> SerializerKind {
        SerializerKind::Json
    }

    fn serialize_request(&self, request: &RpcRequest) -> Result<Vec<u8>, SerializationError> {
        let wire = WireRequest {
            service_name: request.service_name.clone(),
            method_name: request.method_name.clone(),
            parameter_types: request.parameter_types.clone(),
            args: request.args.iter().map(to_loose_json).collect(),
            service_version: request.service_version.clone(),
        };
        serde_json::to_vec(&wire).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_request(&self, bytes: &[u8]) -> Result<RpcRequest, SerializationError> {
        let wire: WireRequest =
            serde_json::from_slice(bytes).map_err(|e| SerializationError::Decode(e.to_string()))?;

        if wire.args.len() != wire.parameter_types.len() {
            return Err(SerializationError::Decode(format!(
                "arg count {} does not match parameter type count {}",
                wire.args.len(),
                wire.parameter_types.len()
            )));
        }

        let args = wire
            .args
            .into_iter()
            .zip(wire.parameter_types.iter())
            .map(|(v, t)| reshape(v, t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RpcRequest {
            service_name: wire.service_name,
            method_name: wire.method_name,
            parameter_types: wire.parameter_types,
            args,
            service_version: wire.service_version,
        })
    }

    fn serialize_response(&self, response: &RpcResponse) -> Result<Vec<u8>, SerializationError> {
        let wire = WireResponse {
            data: response.data.as_ref().map(to_loose_json),
            data_type: response.data_type.clone(),
            message: response.message.clone(),
            exception: response.exception.clone(),
        };
        serde_json::to_vec(&wire).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn deserialize_response(&self, bytes: &[u8]) -> Result<RpcResponse, SerializationError> {
        let wire: WireResponse =
            serde_json::from_slice(bytes).map_err(|e| SerializationError::Decode(e.to_string()))?;

        let data = match (wire.data, &wire.data_type) {
            (Some(v), Some(t)) => Some(reshape(v, t)?),
            (None, _) => None,
            (Some(_), None) => {
                return Err(SerializationError::Decode(
                    "response carried data with no dataType".to_string(),
                ))
            }
        };

        Ok(RpcResponse {
            data,
            data_type: wire.data_type,
            message: wire.message,
            exception: wire.exception,
        })
    }
}
