use mini_rpc_protocol::{
    Frame, FrameAccumulator, Header, MessageType, RequestId, SerializerKind, HEADER_LEN,
};
use proptest::prelude::*;

fn encode_frame(body: &[u8], request_id: u64) -> Vec<u8> {
    let header = Header::new(SerializerKind::Json, MessageType::Request, RequestId(request_id));
    let mut out = Vec::new();
    let mut h = header;
    h.body_length = body.len() as u32;
    h.encode(&mut out);
    out.extend_from_slice(body);
    out
}

#[test]
fn header_roundtrips() {
    let header = Header::new(SerializerKind::Kryo, MessageType::Response, RequestId(42))
        .with_status(mini_rpc_protocol::Status::Ok);
    let mut header = header;
    header.body_length = 7;

    let mut buf = Vec::new();
    header.encode(&mut buf);
    assert_eq!(buf.len(), HEADER_LEN);

    let decoded = Header::decode(&buf).unwrap();
    assert_eq!(decoded, header);
}

#[test]
fn header_bytes_match_exact_layout() {
    let mut header = Header::new(SerializerKind::Jdk, MessageType::Request, RequestId(0x0102030405060708));
    header.body_length = 0x0000_0010;

    let mut buf = Vec::new();
    header.encode(&mut buf);

    assert_eq!(buf[0], 0x01, "magic");
    assert_eq!(buf[1], 0x01, "version");
    assert_eq!(buf[2], 0, "jdk serializer id");
    assert_eq!(buf[3], 0, "request type id");
    assert_eq!(buf[4], 0, "ok status");
    assert_eq!(&buf[5..13], &0x0102030405060708u64.to_be_bytes());
    assert_eq!(&buf[13..17], &0x10u32.to_be_bytes());
}

#[test]
fn decode_rejects_bad_magic() {
    let mut buf = vec![0u8; HEADER_LEN];
    buf[0] = 0x02;
    buf[1] = 0x01;
    let err = Header::decode(&buf).unwrap_err();
    assert!(matches!(err, mini_rpc_protocol::ProtocolError::BadMagic { got: 0x02 }));
}

#[test]
fn decode_rejects_unknown_serializer() {
    let mut buf = vec![0u8; HEADER_LEN];
    buf[0] = 0x01;
    buf[1] = 0x01;
    buf[2] = 99;
    let err = Header::decode(&buf).unwrap_err();
    assert!(matches!(err, mini_rpc_protocol::ProtocolError::UnknownSerializer { got: 99 }));
}

#[test]
fn accumulator_waits_for_a_full_header_before_reading_body_length() {
    let frame_bytes = encode_frame(b"hello world", 1);

    let mut acc = FrameAccumulator::new();
    acc.push(&frame_bytes[..HEADER_LEN - 1]);
    assert!(acc.try_next().unwrap().is_none());

    acc.push(&frame_bytes[HEADER_LEN - 1..HEADER_LEN]);
    assert!(acc.try_next().unwrap().is_none(), "header complete but body still missing");

    acc.push(&frame_bytes[HEADER_LEN..]);
    let frame = acc.try_next().unwrap().expect("frame should now be complete");
    assert_eq!(frame.body, b"hello world");
}

#[test]
fn accumulator_splits_coalesced_frames_from_one_push() {
    let mut combined = encode_frame(b"first", 1);
    combined.extend(encode_frame(b"second-longer", 2));
    combined.extend(encode_frame(b"", 3));

    let mut acc = FrameAccumulator::new();
    acc.push(&combined);

    let mut frames = Vec::new();
    while let Some(frame) = acc.try_next().unwrap() {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].body, b"first");
    assert_eq!(frames[1].body, b"second-longer");
    assert_eq!(frames[2].body, b"");
    assert_eq!(frames[2].header.request_id, RequestId(3));
}

proptest! {
    /// For any stream of frames split into an arbitrary partition of reads,
    /// the reassembler must emit exactly those frames in order.
    #[test]
    fn reassembler_emits_frames_in_order_regardless_of_read_partition(
        bodies in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..8),
        split_points in proptest::collection::vec(1usize..37, 0..20),
    ) {
        let mut stream = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            stream.extend(encode_frame(body, i as u64));
        }

        let mut acc = FrameAccumulator::new();
        let mut collected: Vec<Frame> = Vec::new();
        let mut offset = 0;

        let mut chunk_sizes: Vec<usize> = split_points.iter().map(|n| *n % 23 + 1).collect();
        chunk_sizes.push(stream.len().saturating_sub(offset).max(1));

        for size in chunk_sizes {
            if offset >= stream.len() {
                break;
            }
            let end = (offset + size).min(stream.len());
            acc.push(&stream[offset..end]);
            offset = end;

            while let Some(frame) = acc.try_next().unwrap() {
                collected.push(frame);
            }
        }

        // Flush anything left (covers the case where split_points ran out early).
        if offset < stream.len() {
            acc.push(&stream[offset..]);
            while let Some(frame) = acc.try_next().unwrap() {
                collected.push(frame);
            }
        }

        prop_assert_eq!(collected.len(), bodies.len());
        for (i, body) in bodies.iter().enumerate() {
            prop_assert_eq!(&collected[i].body, body);
            prop_assert_eq!(collected[i].header.request_id, RequestId(i as u64));
        }
    }
}
