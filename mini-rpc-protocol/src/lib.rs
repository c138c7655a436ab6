//! Wire framing, the fixed 17-byte header, and the data model shared by every
//! other `mini-rpc` crate.
//!
//! This crate knows nothing about sockets, serializers, or service discovery;
//! it only knows how to turn a header + body into bytes and back, and how to
//! pull frames out of a byte stream that may deliver them split across many
//! reads or several at once.

mod error;
mod header;
mod message;
mod reassemble;

pub use error::{FrameError, ProtocolError, SerializationError};
pub use header::{wire_ids, Header, MessageType, SerializerKind, Status, HEADER_LEN, MAGIC, PROTOCOL_VERSION};
pub use message::{service_key, RequestId, RpcException, RpcRequest, RpcResponse, RpcValue, ServiceMetaInfo, TypeDescriptor};
pub use reassemble::{Frame, FrameAccumulator, FrameReader};
