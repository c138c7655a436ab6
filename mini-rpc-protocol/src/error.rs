use std::fmt;

/// Errors that can occur while encoding, decoding, or reassembling frames on
/// the wire. These are never retried by the transport layer; a `ProtocolError`
/// always closes the connection it was observed on.
#[derive(Debug)]
pub enum ProtocolError {
    /// Header byte 0 was not `0x01`.
    BadMagic { got: u8 },

    /// Header byte 1 was not `0x01`.
    UnsupportedVersion { got: u8 },

    /// Header byte 2 did not match a known serializer id.
    UnknownSerializer { got: u8 },

    /// Header byte 3 did not match a known message type id.
    UnknownType { got: u8 },

    /// The message kind is reserved but not yet implemented by this decoder
    /// (heartbeat, other).
    UnsupportedType { kind: super::MessageType },

    /// The buffer passed to `decode` was shorter than `17 + body_length`.
    Truncated { need: usize, have: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { got } => write!(f, "bad magic: expected 0x01, got {got:#04x}"),
            Self::UnsupportedVersion { got } => {
                write!(f, "unsupported protocol version: {got}")
            }
            Self::UnknownSerializer { got } => write!(f, "unknown serializer id: {got}"),
            Self::UnknownType { got } => write!(f, "unknown message type id: {got}"),
            Self::UnsupportedType { kind } => write!(f, "unsupported message type: {kind:?}"),
            Self::Truncated { need, have } => {
                write!(f, "truncated frame: need {need} bytes, have {have}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Errors raised by a serializer implementation. Not retried by the transport
/// layer; surfaces directly to the caller.
#[derive(Debug)]
pub enum SerializationError {
    Encode(String),
    Decode(String),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "serialization error: {msg}"),
            Self::Decode(msg) => write!(f, "deserialization error: {msg}"),
        }
    }
}

impl std::error::Error for SerializationError {}

/// Errors that can arise while reading frames off a live stream: either the
/// underlying transport failed, or a complete frame was read but it didn't
/// decode.
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    Protocol(ProtocolError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error reading frame: {e}"),
            Self::Protocol(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ProtocolError> for FrameError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}
