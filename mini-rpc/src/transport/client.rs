use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use mini_rpc_protocol::{FrameReader, RequestId, RpcRequest, RpcResponse, SerializerKind};

use crate::codec::{self, DecodedBody};
use crate::error::RpcError;

/// One blocking round trip against a single endpoint: connect, write the
/// encoded request, block for the matching response (`spec.md` §4.8). A new
/// `TcpStream` is opened per call rather than pooled — matches the teacher's
/// plain `TcpStream::connect` call sites; connection pooling is an addition
/// the spec doesn't ask for.
pub fn call(
    host: &str,
    port: u16,
    serializer: SerializerKind,
    timeout: Duration,
    request: &RpcRequest,
) -> Result<RpcResponse, RpcError> {
    // `TcpStream::connect` has no bound on how long it blocks; resolving the
    // address ourselves lets us use `connect_timeout` so the whole call,
    // connect phase included, is bounded by `timeout` (`spec.md` §4.8).
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| RpcError::TransportIo(std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, format!("could not resolve {host}:{port}"))))?;

    let mut stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => RpcError::TransportTimeout,
        _ => RpcError::TransportIo(e),
    })?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request_id = RequestId::next();
    let encoded = codec::encode_request(serializer, request_id, request)?;
    stream.write_all(&encoded)?;

    let mut reader = FrameReader::new(stream);
    let frame = reader.read_frame().map_err(|e| match e {
        mini_rpc_protocol::FrameError::Io(io) if matches!(io.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
            RpcError::TransportTimeout
        }
        other => other.into(),
    })?;

    if frame.header.request_id != request_id {
        return Err(RpcError::Dispatch(format!(
            "response request id {} did not match request id {}",
            frame.header.request_id, request_id
        )));
    }

    match codec::decode_frame(&frame)? {
        DecodedBody::Response(response) => Ok(response),
        DecodedBody::Request(_) => Err(RpcError::Dispatch("server sent a request frame in reply to a call".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mini_rpc_protocol::{RpcValue, TypeDescriptor};
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn call_round_trips_through_a_loopback_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(socket.try_clone().unwrap());
            let frame = reader.read_frame().unwrap();
            let request_id = frame.header.request_id;

            let response = RpcResponse::ok(RpcValue::I64(42), TypeDescriptor::I64);
            let encoded = codec::encode_response(SerializerKind::Jdk, request_id, &response).unwrap();
            socket.write_all(&encoded).unwrap();

            let mut drain = [0u8; 1];
            let _ = socket.read(&mut drain);
        });

        let request = RpcRequest {
            service_name: "demo".to_string(),
            method_name: "ping".to_string(),
            parameter_types: vec![],
            args: vec![],
            service_version: Some("1.0".to_string()),
        };

        let response = call(
            &addr.ip().to_string(),
            addr.port(),
            SerializerKind::Jdk,
            Duration::from_secs(5),
            &request,
        )
        .unwrap();

        assert_eq!(response.data, Some(RpcValue::I64(42)));
        server.join().unwrap();
    }
}
