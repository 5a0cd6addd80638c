// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::StreamExt;
use tokio_util::codec::FramedRead;

fn decode_all(codec: &mut OutputLineCodec, input: &[u8]) -> Vec<String> {
    let mut buf = BytesMut::from(input);
    let mut lines = Vec::new();
    while let Some(line) = codec.decode(&mut buf).unwrap() {
        lines.push(line);
    }
    while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
        lines.push(line);
    }
    lines
}

#[yare::parameterized(
    single        = { b"hello\n".as_slice(), &["hello"] },
    crlf          = { b"a\r\nb\r\n".as_slice(), &["a", "b"] },
    no_trailing   = { b"a\nb".as_slice(), &["a", "b"] },
    empty_lines   = { b"\n\nx\n".as_slice(), &["", "", "x"] },
    empty_input   = { b"".as_slice(), &[] },
)]
fn splits_lines(input: &[u8], expected: &[&str]) {
    assert_eq!(decode_all(&mut OutputLineCodec::new(), input), expected);
}

#[test]
fn invalid_utf8_is_replaced() {
    let lines = decode_all(&mut OutputLineCodec::new(), b"ok \xff\xfe done\n");
    assert_eq!(lines, vec!["ok \u{fffd}\u{fffd} done"]);
}

#[test]
fn partial_line_waits_for_more_input() {
    let mut codec = OutputLineCodec::new();
    let mut buf = BytesMut::from(&b"hel"[..]);
    assert!(codec.decode(&mut buf).unwrap().is_none());
    buf.extend_from_slice(b"lo\nwor");
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("hello"));
    assert!(codec.decode(&mut buf).unwrap().is_none());
    assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("wor"));
}

#[test]
fn oversized_line_with_newline_is_skipped() {
    let mut codec = OutputLineCodec::with_max_len(4);
    assert_eq!(decode_all(&mut codec, b"toolong\nok\n"), vec!["ok"]);
}

#[test]
fn oversized_line_across_chunks_is_skipped() {
    let mut codec = OutputLineCodec::with_max_len(4);
    let mut buf = BytesMut::from(&b"abcdefgh"[..]);
    assert!(codec.decode(&mut buf).unwrap().is_none());
    assert!(buf.is_empty());
    buf.extend_from_slice(b"ijk\nnext\n");
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("next"));
}

#[test]
fn oversized_tail_at_eof_is_dropped() {
    let mut codec = OutputLineCodec::with_max_len(4);
    assert_eq!(decode_all(&mut codec, b"ok\nabcdefgh"), vec!["ok"]);
}

#[tokio::test]
async fn frames_async_reader() {
    let input: &[u8] = b"{\"type\":\"assistant\"}\n{\"type\":\"result\"}\n";
    let lines: Vec<String> = FramedRead::new(input, OutputLineCodec::new())
        .map(|line| line.unwrap())
        .collect()
        .await;
    assert_eq!(lines, vec![r#"{"type":"assistant"}"#, r#"{"type":"result"}"#]);
}
