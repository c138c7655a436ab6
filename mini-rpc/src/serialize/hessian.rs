use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use mini_rpc_protocol::{RpcException, RpcRequest, RpcResponse, RpcValue, SerializationError, SerializerKind, TypeDescriptor};

use super::Serializer;

/// A minimal length-prefixed tag/value binary, standing in for Hessian's
/// older compact wire format. Modeled on `onc-rpc`'s manual cursor-based
/// buffer reading (`bytes_ext.rs`): every read is bounds-checked and turned
/// into a `SerializationError` rather than panicking.
pub struct HessianSerializer;

const TAG_UNIT: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_I64: u8 = 2;
const TAG_F64: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_LIST: u8 = 6;
const TAG_JSON: u8 = 7;

const TYPE_UNIT: u8 = 0;
const TYPE_BOOL: u8 = 1;
const TYPE_I64: u8 = 2;
const TYPE_F64: u8 = 3;
const TYPE_STR: u8 = 4;
const TYPE_BYTES: u8 = 5;
const TYPE_LIST: u8 = 6;
const TYPE_NAMED: u8 = 7;

fn decode_err(e: std::io::Error) -> SerializationError {
    SerializationError::Decode(format!("truncated hessian buffer: {e}"))
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), SerializationError> {
    out.write_u32::<BigEndian>(bytes.len() as u32)
        .map_err(|e| SerializationError::Encode(e.to_string()))?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn read_len_prefixed(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, SerializationError> {
    let len = cursor.read_u32::<BigEndian>().map_err(decode_err)? as usize;
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf).map_err(decode_err)?;
    Ok(buf)
}

fn write_value(out: &mut Vec<u8>, value: &RpcValue) -> Result<(), SerializationError> {
    match value {
        RpcValue::Unit => out.push(TAG_UNIT),
        RpcValue::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        RpcValue::I64(i) => {
            out.push(TAG_I64);
            out.write_i64::<BigEndian>(*i)
                .map_err(|e| SerializationError::Encode(e.to_string()))?;
        }
        RpcValue::F64(f) => {
            out.push(TAG_F64);
            out.write_f64::<BigEndian>(*f)
                .map_err(|e| SerializationError::Encode(e.to_string()))?;
        }
        RpcValue::Str(s) => {
            out.push(TAG_STR);
            write_len_prefixed(out, s.as_bytes())?;
        }
        RpcValue::Bytes(bytes) => {
            out.push(TAG_BYTES);
            write_len_prefixed(out, bytes)?;
        }
        RpcValue::List(items) => {
            out.push(TAG_LIST);
            out.write_u32::<BigEndian>(items.len() as u32)
                .map_err(|e| SerializationError::Encode(e.to_string()))?;
            for item in items {
                write_value(out, item)?;
            }
        }
        RpcValue::Json(v) => {
            out.push(TAG_JSON);
            let s = serde_json::to_vec(v).map_err(|e| SerializationError::Encode(e.to_string()))?;
            write_len_prefixed(out, &s)?;
        }
    }
    Ok(())
}

fn read_value(cursor: &mut Cursor<&[u8]>) -> Result<RpcValue, SerializationError> {
    let tag = cursor.read_u8().map_err(decode_err)?;
    match tag {
        TAG_UNIT => Ok(RpcValue::Unit),
        TAG_BOOL => Ok(RpcValue::Bool(cursor.read_u8().map_err(decode_err)? != 0)),
        TAG_I64 => Ok(RpcValue::I64(cursor.read_i64::<BigEndian>().map_err(decode_err)?)),
        TAG_F64 => Ok(RpcValue::F64(cursor.read_f64::<BigEndian>().map_err(decode_err)?)),
        TAG_STR => {
            let bytes = read_len_prefixed(cursor)?;
            String::from_utf8(bytes)
                .map(RpcValue::Str)
                .map_err(|e| SerializationError::Decode(e.to_string()))
        }
        TAG_BYTES => Ok(RpcValue::Bytes(read_len_prefixed(cursor)?)),
        TAG_LIST => {
            let len = cursor.read_u32::<BigEndian>().map_err(decode_err)?;
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(read_value(cursor)?);
            }
            Ok(RpcValue::List(items))
        }
        TAG_JSON => {
            let bytes = read_len_prefixed(cursor)?;
            serde_json::from_slice(&bytes)
                .map(RpcValue::Json)
                .map_err(|e| SerializationError::Decode(e.to_string()))
        }
        other => Err(SerializationError::Decode(format!("unknown value tag {other}"))),
    }
}

fn write_type(out: &mut Vec<u8>, ty: &TypeDescriptor) -> Result<(), SerializationError> {
    match ty {
        TypeDescriptor::Unit => out.push(TYPE_UNIT),
        TypeDescriptor::Bool => out.push(TYPE_BOOL),
        TypeDescriptor::I64 => out.push(TYPE_I64),
        TypeDescriptor::F64 => out.push(TYPE_F64),
        TypeDescriptor::Str => out.push(TYPE_STR),
        TypeDescriptor::Bytes => out.push(TYPE_BYTES),
        TypeDescriptor::List(inner) => {
            out.push(TYPE_LIST);
            write_type(out, inner)?;
        }
        TypeDescriptor::Named(name) => {
            out.push(TYPE_NAMED);
            write_len_prefixed(out, name.as_bytes())?;
        }
    }
    Ok(())
}

fn read_type(cursor: &mut Cursor<&[u8]>) -> Result<TypeDescriptor, SerializationError> {
    let tag = cursor.read_u8().map_err(decode_err)?;
    match tag {
        TYPE_UNIT => Ok(TypeDescriptor::Unit),
        TYPE_BOOL => Ok(TypeDescriptor::Bool),
        TYPE_I64 => Ok(TypeDescriptor::I64),
        TYPE_F64 => Ok(TypeDescriptor::F64),
        TYPE_STR => Ok(TypeDescriptor::Str),
        TYPE_BYTES => Ok(TypeDescriptor::Bytes),
        TYPE_LIST => Ok(TypeDescriptor::List(Box::new(read_type(cursor)?))),
        TYPE_NAMED => {
            let bytes = read_len_prefixed(cursor)?;
            String::from_utf8(bytes)
                .map(TypeDescriptor::Named)
                .map_err(|e| SerializationError::Decode(e.to_string()))
        }
        other => Err(SerializationError::Decode(format!("unknown type tag {other}"))),
    }
}

fn write_option_str(out: &mut Vec<u8>, value: &Option<String>) -> Result<(), SerializationError> {
    match value {
        Some(s) => {
            out.push(1);
            write_len_prefixed(out, s.as_bytes())?;
        }
        None => out.push(0),
    }
    Ok(())
}

fn read_option_str(cursor: &mut Cursor<&[u8]>) -> Result<Option<String>, SerializationError> {
    match cursor.read_u8().map_err(decode_err)? {
        0 => Ok(None),
        _ => {
            let bytes = read_len_prefixed(cursor)?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| SerializationError::Decode(e.to_string()))
        }
    }
}

impl Serializer for HessianSerializer {
    fn kind(&self) -> SerializerKind {
        SerializerKind::Hessian
    }

    fn serialize_request(&self, request: &RpcRequest) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        write_len_prefixed(&mut out, request.service_name.as_bytes())?;
        write_len_prefixed(&mut out, request.method_name.as_bytes())?;

        out.write_u32::<BigEndian>(request.parameter_types.len() as u32)
            .map_err(|e| SerializationError::Encode(e.to_string()))?;
        for ty in &request.parameter_types {
            write_type(&mut out, ty)?;
        }

        out.write_u32::<BigEndian>(request.args.len() as u32)
            .map_err(|e| SerializationError::Encode(e.to_string()))?;
        for arg in &request.args {
            write_value(&mut out, arg)?;
        }

        write_option_str(&mut out, &request.service_version)?;

        Ok(out)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> Result<RpcRequest, SerializationError> {
        let mut cursor = Cursor::new(bytes);

        let service_name = String::from_utf8(read_len_prefixed(&mut cursor)?)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;
        let method_name = String::from_utf8(read_len_prefixed(&mut cursor)?)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;

        let type_count = cursor.read_u32::<BigEndian>().map_err(decode_err)?;
        let mut parameter_types = Vec::with_capacity(type_count as usize);
        for _ in 0..type_count {
            parameter_types.push(read_type(&mut cursor)?);
        }

        let arg_count = cursor.read_u32::<BigEndian>().map_err(decode_err)?;
        let mut args = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            args.push(read_value(&mut cursor)?);
        }

        let service_version = read_option_str(&mut cursor)?;

        Ok(RpcRequest {
            service_name,
            method_name,
            parameter_types,
            args,
            service_version,
        })
    }

    fn serialize_response(&self, response: &RpcResponse) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        match (&response.data, &response.data_type) {
            (Some(data), Some(ty)) => {
                out.push(1);
                write_value(&mut out, data)?;
                write_type(&mut out, ty)?;
            }
            _ => out.push(0),
        }
        write_len_prefixed(&mut out, response.message.as_bytes())?;
        match &response.exception {
            Some(exc) => {
                out.push(1);
                write_len_prefixed(&mut out, exc.kind.as_bytes())?;
                write_len_prefixed(&mut out, exc.message.as_bytes())?;
            }
            None => out.push(0),
        }
        Ok(out)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> Result<RpcResponse, SerializationError> {
        let mut cursor = Cursor::new(bytes);

        let (data, data_type) = if cursor.read_u8().map_err(decode_err)? == 1 {
            let value = read_value(&mut cursor)?;
            let ty = read_type(&mut cursor)?;
            (Some(value), Some(ty))
        } else {
            (None, None)
        };

        let message = String::from_utf8(read_len_prefixed(&mut cursor)?)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;

        let exception = if cursor.read_u8().map_err(decode_err)? == 1 {
            let kind = String::from_utf8(read_len_prefixed(&mut cursor)?)
                .map_err(|e| SerializationError::Decode(e.to_string()))?;
            let message = String::from_utf8(read_len_prefixed(&mut cursor)?)
                .map_err(|e| SerializationError::Decode(e.to_string()))?;
            Some(RpcException { kind, message })
        } else {
            None
        };

        Ok(RpcResponse {
            data,
            data_type,
            message,
            exception,
        })
    }
}
