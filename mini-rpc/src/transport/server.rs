use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, trace, warn};

use mini_rpc_protocol::FrameReader;

use crate::codec::{self, DecodedBody};
use crate::registry::LocalRegistry;
use crate::transport::dispatch;

/// Accepts connections and spawns one thread per connection (`spec.md` §5: a
/// blocking accept loop handing each connection its own worker, rather than an
/// async event loop). Each connection thread runs its own request/response
/// loop until the peer disconnects or sends a malformed frame.
pub fn run_blocking_tcp_server(listener: TcpListener, registry: Arc<LocalRegistry>) {
    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let registry = registry.clone();
                thread::spawn(move || handle_connection(stream, &registry));
            }
            Err(e) => warn!("error accepting connection: {e}"),
        }
    }
}

/// Reads frames off `stream` until it closes, dispatching each one against
/// `registry` and writing the encoded response back before reading the next.
/// Pipelining (reading the next request before the previous response is
/// written) is not attempted — matches the strictly sequential per-connection
/// loop the reference server uses.
fn handle_connection(stream: TcpStream, registry: &LocalRegistry) {
    let peer = stream.peer_addr().ok();
    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            warn!("failed to clone connection for writing: {e}");
            return;
        }
    };
    let mut reader = FrameReader::new(stream);

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(mini_rpc_protocol::FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                trace!("connection {peer:?} closed");
                return;
            }
            Err(e) => {
                warn!("connection {peer:?} sent a malformed frame: {e}");
                return;
            }
        };

        let request_id = frame.header.request_id;
        let serializer = frame.header.serializer;

        let request = match codec::decode_frame(&frame) {
            Ok(DecodedBody::Request(request)) => request,
            Ok(DecodedBody::Response(_)) => {
                warn!("connection {peer:?} sent a response frame to a server socket");
                return;
            }
            Err(e) => {
                warn!("connection {peer:?} sent a request that failed to decode: {e}");
                return;
            }
        };

        debug!(
            "dispatching {}.{} (request {request_id})",
            request.service_name, request.method_name
        );

        let response = dispatch::dispatch(registry, &request);

        let encoded = match codec::encode_response(serializer, request_id, &response) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode response for request {request_id}: {e}");
                return;
            }
        };

        if let Err(e) = writer.write_all(&encoded) {
            warn!("failed to write response for request {request_id}: {e}");
            return;
        }
    }
}
