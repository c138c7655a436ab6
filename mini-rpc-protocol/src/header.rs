use byteorder::{BigEndian, ByteOrder};

use crate::error::ProtocolError;
use crate::message::RequestId;

/// Fixed header size in bytes: 1 (magic) + 1 (version) + 1 (serializer) +
/// 1 (type) + 1 (status) + 8 (requestId) + 4 (bodyLength).
pub const HEADER_LEN: usize = 17;

pub const MAGIC: u8 = 0x01;
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Message kind, header byte 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    /// Reserved for future use; the decoder recognizes the id but refuses to
    /// decode a body for it today.
    Heartbeat,
    /// Reserved for future use; same as `Heartbeat`.
    Other,
}

impl MessageType {
    pub fn id(self) -> u8 {
        match self {
            Self::Request => 0,
            Self::Response => 1,
            Self::Heartbeat => 2,
            Self::Other => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, ProtocolError> {
        match id {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::Other),
            got => Err(ProtocolError::UnknownType { got }),
        }
    }
}

/// Protocol-level status, header byte 4. Distinct from the application-level
/// success/failure carried inside an `RpcResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    BadResponse,
}

impl Status {
    pub fn id(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::BadRequest => 20,
            Self::BadResponse => 50,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Ok),
            20 => Some(Self::BadRequest),
            50 => Some(Self::BadResponse),
            _ => None,
        }
    }
}

/// Serializer wire id <-> configuration name. The mapping is fixed by `spec.md`
/// §6 and MUST NOT be derived from enum discriminant order (see Design Notes,
/// "serializer id vs name").
pub mod wire_ids {
    use super::SerializerKind;

    pub fn name(kind: SerializerKind) -> &'static str {
        match kind {
            SerializerKind::Jdk => "jdk",
            SerializerKind::Json => "json",
            SerializerKind::Kryo => "kryo",
            SerializerKind::Hessian => "hessian",
        }
    }

    pub fn by_name(name: &str) -> Option<SerializerKind> {
        match name {
            "jdk" => Some(SerializerKind::Jdk),
            "json" => Some(SerializerKind::Json),
            "kryo" => Some(SerializerKind::Kryo),
            "hessian" => Some(SerializerKind::Hessian),
            _ => None,
        }
    }
}

/// Small-integer serializer kind, header byte 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerKind {
    Jdk,
    Json,
    Kryo,
    Hessian,
}

impl SerializerKind {
    pub fn id(self) -> u8 {
        match self {
            Self::Jdk => 0,
            Self::Json => 1,
            Self::Kryo => 2,
            Self::Hessian => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, ProtocolError> {
        match id {
            0 => Ok(Self::Jdk),
            1 => Ok(Self::Json),
            2 => Ok(Self::Kryo),
            3 => Ok(Self::Hessian),
            got => Err(ProtocolError::UnknownSerializer { got }),
        }
    }
}

/// The fixed 17-byte header, decoded/encoded exactly as laid out in `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub serializer: SerializerKind,
    pub message_type: MessageType,
    pub status: Status,
    pub request_id: RequestId,
    pub body_length: u32,
}

impl Header {
    pub fn new(serializer: SerializerKind, message_type: MessageType, request_id: RequestId) -> Self {
        Self {
            serializer,
            message_type,
            status: Status::Ok,
            request_id,
            body_length: 0,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(MAGIC);
        out.push(PROTOCOL_VERSION);
        out.push(self.serializer.id());
        out.push(self.message_type.id());
        out.push(self.status.id());

        let mut req_id = [0u8; 8];
        BigEndian::write_u64(&mut req_id, self.request_id.0);
        out.extend_from_slice(&req_id);

        let mut len = [0u8; 4];
        BigEndian::write_u32(&mut len, self.body_length);
        out.extend_from_slice(&len);
    }

    /// Decodes exactly `HEADER_LEN` bytes. The caller is responsible for
    /// ensuring `buf.len() >= HEADER_LEN`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        debug_assert!(buf.len() >= HEADER_LEN);

        let magic = buf[0];
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic { got: magic });
        }

        let version = buf[1];
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion { got: version });
        }

        let serializer = SerializerKind::from_id(buf[2])?;
        let message_type = MessageType::from_id(buf[3])?;
        let status = Status::from_id(buf[4]).unwrap_or(Status::Ok);
        let request_id = RequestId(BigEndian::read_u64(&buf[5..13]));
        let body_length = BigEndian::read_u32(&buf[13..17]);

        Ok(Self {
            serializer,
            message_type,
            status,
            request_id,
            body_length,
        })
    }

    /// Reads the `bodyLength` field (offset 13) out of a raw header buffer
    /// without fully decoding it, used by the reassembler to know how many
    /// more bytes to wait for.
    pub fn peek_body_length(buf: &[u8]) -> u32 {
        debug_assert!(buf.len() >= HEADER_LEN);
        BigEndian::read_u32(&buf[13..17])
    }
}
