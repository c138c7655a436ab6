//! Ties a `Header` to a chosen `Serializer` to implement the encode/decode
//! operation from `spec.md` §4.1.

use mini_rpc_protocol::{
    wire_ids, Frame, Header, MessageType, ProtocolError, RequestId, RpcRequest, RpcResponse,
    SerializerKind, Status,
};

use crate::error::RpcError;
use crate::serialize;

/// Encodes a request as `header (17 bytes) || body`, with `header.bodyLength`
/// set to the serialized body's length.
pub fn encode_request(serializer: SerializerKind, request_id: RequestId, request: &RpcRequest) -> Result<Vec<u8>, RpcError> {
    let body = serialize::for_kind(serializer).serialize_request(request)?;
    encode_frame(serializer, MessageType::Request, Status::Ok, request_id, &body)
}

/// Encodes a response the same way, with `type=RESPONSE`.
pub fn encode_response(serializer: SerializerKind, request_id: RequestId, response: &RpcResponse) -> Result<Vec<u8>, RpcError> {
    let body = serialize::for_kind(serializer).serialize_response(response)?;
    encode_frame(serializer, MessageType::Response, Status::Ok, request_id, &body)
}

fn encode_frame(
    serializer: SerializerKind,
    message_type: MessageType,
    status: Status,
    request_id: RequestId,
    body: &[u8],
) -> Result<Vec<u8>, RpcError> {
    let mut header = Header::new(serializer, message_type, request_id).with_status(status);
    header.body_length = body.len() as u32;

    let mut out = Vec::with_capacity(mini_rpc_protocol::HEADER_LEN + body.len());
    header.encode(&mut out);
    out.extend_from_slice(body);
    Ok(out)
}

/// Decodes a complete frame's body according to `(frame.header.type, frame.header.serializer)`.
pub enum DecodedBody {
    Request(RpcRequest),
    Response(RpcResponse),
}

pub fn decode_frame(frame: &Frame) -> Result<DecodedBody, RpcError> {
    let serializer = serialize::for_kind(frame.header.serializer);

    match frame.header.message_type {
        MessageType::Request => Ok(DecodedBody::Request(serializer.deserialize_request(&frame.body)?)),
        MessageType::Response => Ok(DecodedBody::Response(serializer.deserialize_response(&frame.body)?)),
        other => Err(RpcError::Protocol(ProtocolError::UnsupportedType { kind: other })),
    }
}

/// `"jdk"`, `"json"`, `"kryo"`, `"hessian"` — never derived from enum
/// discriminant order (see Design Notes).
pub fn serializer_name(kind: SerializerKind) -> &'static str {
    wire_ids::name(kind)
}

pub fn serializer_by_name(name: &str) -> Option<SerializerKind> {
    wire_ids::by_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mini_rpc_protocol::{RpcValue, TypeDescriptor, HEADER_LEN};

    fn sample_request() -> RpcRequest {
        RpcRequest {
            service_name: "demo".to_string(),
            method_name: "echo".to_string(),
            parameter_types: vec![TypeDescriptor::Str],
            args: vec![RpcValue::Str("hi".to_string())],
            service_version: Some("1.0".to_string()),
        }
    }

    #[test]
    fn encode_request_sets_body_length_and_total_size() {
        let bytes = encode_request(SerializerKind::Jdk, RequestId(1), &sample_request()).unwrap();
        let body_len = u32::from_be_bytes(bytes[13..17].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), HEADER_LEN + body_len);
    }

    #[test]
    fn encode_then_decode_round_trips_a_request_for_every_serializer() {
        for kind in [SerializerKind::Jdk, SerializerKind::Json, SerializerKind::Kryo, SerializerKind::Hessian] {
            let request = sample_request();
            let bytes = encode_request(kind, RequestId(7), &request).unwrap();
            let header = Header::decode(&bytes[..HEADER_LEN]).unwrap();
            let frame = Frame {
                header,
                body: bytes[HEADER_LEN..].to_vec(),
            };

            match decode_frame(&frame).unwrap() {
                DecodedBody::Request(decoded) => assert_eq!(decoded, request),
                DecodedBody::Response(_) => panic!("expected a request"),
            }
        }
    }

    #[test]
    fn decode_frame_rejects_heartbeat_as_unsupported() {
        let frame = Frame {
            header: Header::new(SerializerKind::Jdk, MessageType::Heartbeat, RequestId(1)),
            body: Vec::new(),
        };
        let err = decode_frame(&frame).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(ProtocolError::UnsupportedType { kind: MessageType::Heartbeat })));
    }

    #[test]
    fn serializer_name_and_by_name_round_trip_every_kind() {
        for kind in [SerializerKind::Jdk, SerializerKind::Json, SerializerKind::Kryo, SerializerKind::Hessian] {
            assert_eq!(serializer_by_name(serializer_name(kind)), Some(kind));
        }
    }
}
