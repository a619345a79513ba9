// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;
use serde::Deserialize;
use std::io::Cursor;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sample {
    id: String,
    value: u32,
}

#[test]
fn encode_then_decode_matches_original() {
    let sample = Sample { id: "a".into(), value: 7 };
    let frame = encode(&sample).expect("encode");
    let decoded: Sample = decode(&frame).expect("decode");
    assert_eq!(sample, decoded);
}

#[test]
fn encode_prefixes_big_endian_payload_length() {
    let sample = Sample { id: "x".into(), value: 1 };
    let payload = serde_json::to_vec(&sample).expect("json");
    let frame = encode(&sample).expect("encode");
    assert_eq!(&frame[..4], &(payload.len() as u32).to_be_bytes());
    assert_eq!(&frame[4..], &payload[..]);
}

#[test]
fn decode_rejects_truncated_frame() {
    let sample = Sample { id: "a".into(), value: 1 };
    let mut frame = encode(&sample).expect("encode");
    frame.truncate(frame.len() - 1);
    assert!(matches!(decode::<Sample>(&frame), Err(ProtocolError::Eof)));
}

#[tokio::test]
async fn read_message_roundtrips_over_async_reader() {
    let sample = Sample { id: "b".into(), value: 99 };
    let frame = encode(&sample).expect("encode");
    let mut cursor = Cursor::new(frame);
    let decoded: Sample = read_message(&mut cursor).await.expect("read");
    assert_eq!(sample, decoded);
}

#[tokio::test]
async fn read_message_reports_eof_on_short_read() {
    let mut cursor = Cursor::new(vec![0u8, 0, 0]);
    let result: Result<Sample, _> = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::Eof)));
}

#[tokio::test]
async fn write_message_then_read_message_roundtrips() {
    let sample = Sample { id: "c".into(), value: 5 };
    let mut buf = Vec::new();
    write_message(&mut buf, &sample).await.expect("write");
    let mut cursor = Cursor::new(buf);
    let decoded: Sample = read_message(&mut cursor).await.expect("read");
    assert_eq!(sample, decoded);
}

#[tokio::test]
async fn read_message_rejects_oversize_length_prefix() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
    let mut cursor = Cursor::new(buf);
    let result: Result<Sample, _> = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::FrameTooLarge(_))));
}
