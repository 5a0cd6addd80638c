// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line framing for child process output.
//!
//! Splits on `\n`, strips a trailing `\r` and decodes lossily, so a tool that
//! prints invalid UTF-8 never ends the stream. Lines longer than the limit are
//! discarded up to the next newline instead of failing the reader.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Longest line kept before it is discarded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct OutputLineCodec {
    max_len: usize,
    /// Bytes already scanned for a newline in the pending buffer
    scanned: usize,
    /// Inside an oversized line; drop everything up to the next newline
    discarding: bool,
}

impl OutputLineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_BYTES)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self { max_len: max_len.max(1), scanned: 0, discarding: false }
    }

    fn take_line(buf: &mut BytesMut, end: usize) -> String {
        let line = buf.split_to(end);
        let bytes = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Default for OutputLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            let newline = buf[self.scanned..].iter().position(|b| *b == b'\n');
            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.scanned + offset + 1);
                    self.scanned = 0;
                    self.discarding = false;
                }
                (true, None) => {
                    buf.clear();
                    self.scanned = 0;
                    return Ok(None);
                }
                (false, Some(offset)) => {
                    let end = self.scanned + offset;
                    self.scanned = 0;
                    if end > self.max_len {
                        tracing::warn!(len = end, max = self.max_len, "discarding oversized output line");
                        buf.advance(end + 1);
                        continue;
                    }
                    let line = Self::take_line(buf, end);
                    buf.advance(1);
                    return Ok(Some(line));
                }
                (false, None) if buf.len() > self.max_len => {
                    tracing::warn!(max = self.max_len, "discarding oversized output line");
                    buf.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Ok(None);
                }
                (false, None) => {
                    self.scanned = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.scanned = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let end = buf.len();
        Ok(Some(Self::take_line(buf, end)))
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
