use std::io::Read;

use crate::error::{FrameError, ProtocolError};
use crate::header::{Header, HEADER_LEN};

/// One decoded frame: a header plus its exact `bodyLength` bytes, not yet
/// interpreted as an `RpcRequest`/`RpcResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: Header,
    pub body: Vec<u8>,
}

/// Converts an arbitrary partition of a byte stream into a sequence of
/// frames, buffering across partial reads and splitting coalesced ones.
///
/// Conceptually this runs the two-state machine from `spec.md` §4.1
/// (`READ_HEADER` target 17, `READ_BODY` target `bodyLength`), but rather than
/// tracking an explicit state enum it keeps one growing buffer and re-checks
/// "do I have a full header yet / do I have a full body yet" on every push,
/// which is the same behavior with less bookkeeping.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends newly-read bytes. Does not itself try to decode anything;
    /// call `try_next` after pushing.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the next complete frame if one is buffered, draining it from
    /// the internal buffer. Call in a loop: a single `push` can make more
    /// than one frame available at once.
    pub fn try_next(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let body_len = Header::peek_body_length(&self.buf) as usize;
        let total = HEADER_LEN + body_len;
        if self.buf.len() < total {
            return Ok(None);
        }

        let header = Header::decode(&self.buf[..HEADER_LEN])?;
        let body = self.buf[HEADER_LEN..total].to_vec();
        self.buf.drain(..total);

        Ok(Some(Frame { header, body }))
    }
}

/// Feeds a blocking `Read` stream through a `FrameAccumulator`, blocking until
/// a full frame is available.
pub struct FrameReader<R> {
    inner: R,
    acc: FrameAccumulator,
    read_buf: [u8; 8192],
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            acc: FrameAccumulator::new(),
            read_buf: [0u8; 8192],
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Blocks until one complete frame has been read, decoded, and returned.
    /// Any bytes belonging to the next frame are retained for the next call.
    pub fn read_frame(&mut self) -> Result<Frame, FrameError> {
        loop {
            if let Some(frame) = self.acc.try_next()? {
                return Ok(frame);
            }

            let n = self.inner.read(&mut self.read_buf)?;
            if n == 0 {
                return Err(FrameError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream closed before a complete frame was read",
                )));
            }
            self.acc.push(&self.read_buf[..n]);
        }
    }
}
