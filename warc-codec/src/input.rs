// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Buffered byte input with look-ahead and absolute offset tracking.

use std::io::{self, BufRead, Read};

pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Magic prefix of every WARC record.
pub const RECORD_MAGIC: &[u8] = b"WARC/";

/// Whether `bytes` start with the (case-sensitive) WARC record magic.
pub fn is_record_start(bytes: &[u8]) -> bool {
    bytes.starts_with(RECORD_MAGIC)
}

/// Buffered input the record parser reads from.
pub trait ByteSource: BufRead {
    /// Look at the next `n` bytes without consuming them.
    ///
    /// Returns fewer than `n` bytes only at the end of the input.
    fn peek(&mut self, n: usize) -> io::Result<&[u8]>;

    /// Absolute position of the next unconsumed byte.
    fn offset(&self) -> u64;
}

/// Read buffer that counts consumed bytes and can look ahead an arbitrary
/// number of bytes.
#[derive(Debug)]
pub struct InputBuffer<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    offset: u64,
    chunk_size: usize,
}

impl<R: Read> InputBuffer<R> {
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0, DEFAULT_BUFFER_SIZE)
    }

    /// Wrap a reader whose next byte is at absolute position `offset`.
    ///
    /// # Arguments
    ///
    /// * `inner` - Underlying reader
    /// * `offset` - Absolute position of the reader
    /// * `buffer_size` - Initial buffer size and minimum read size
    pub fn with_offset(inner: R, offset: u64, buffer_size: usize) -> Self {
        let chunk_size = buffer_size.max(16);
        InputBuffer {
            inner,
            buf: vec![0; chunk_size],
            pos: 0,
            end: 0,
            offset,
            chunk_size,
        }
    }

    /// Number of buffered bytes not consumed yet.
    pub fn buffered(&self) -> usize {
        self.end - self.pos
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read one more chunk into the buffer. Returns the number of new bytes.
    fn fill_more(&mut self, want: usize) -> io::Result<usize> {
        if self.pos > 0 && self.buf.len() - self.end < self.chunk_size {
            self.buf.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }
        let needed = (self.end + want.max(self.chunk_size)).max(self.buf.len());
        if needed > self.buf.len() {
            self.buf.resize(needed, 0);
        }
        loop {
            match self.inner.read(&mut self.buf[self.end..]) {
                Ok(n) => {
                    self.end += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for InputBuffer<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for InputBuffer<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos == self.end {
            self.pos = 0;
            self.end = 0;
            self.fill_more(self.chunk_size)?;
        }
        Ok(&self.buf[self.pos..self.end])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.end - self.pos);
        self.pos += amt;
        self.offset += amt as u64;
    }
}

impl<R: Read> ByteSource for InputBuffer<R> {
    fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buffered() < n {
            if self.fill_more(n - self.buffered())? == 0 {
                break;
            }
        }
        let n = n.min(self.buffered());
        Ok(&self.buf[self.pos..self.pos + n])
    }

    fn offset(&self) -> u64 {
        self.offset
    }
}

/// Read a line into `line` (without the line ending), storing at most `limit` bytes.
///
/// Returns the number of bytes consumed from `source` and whether the line was
/// terminated by a newline (as opposed to the end of input).
pub fn read_line_limited(source: &mut dyn ByteSource, line: &mut Vec<u8>, limit: usize) -> io::Result<(u64, bool)> {
    let mut consumed = 0u64;
    loop {
        let available = source.fill_buf()?;
        if available.is_empty() {
            strip_cr(line);
            return Ok((consumed, false));
        }
        let (chunk, found) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..i], true),
            None => (available, false),
        };
        let room = limit.saturating_sub(line.len());
        line.extend_from_slice(&chunk[..chunk.len().min(room)]);
        let used = chunk.len() + found as usize;
        source.consume(used);
        consumed += used as u64;
        if found {
            strip_cr(line);
            return Ok((consumed, true));
        }
    }
}

fn strip_cr(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// Consume a run of CRLF or LF line endings. Returns how many were consumed.
pub fn consume_newlines(source: &mut dyn ByteSource) -> io::Result<usize> {
    let mut count = 0;
    loop {
        let ahead = source.peek(2)?;
        let len = match ahead {
            [b'\r', b'\n', ..] => 2,
            [b'\n', ..] => 1,
            _ => return Ok(count),
        };
        source.consume(len);
        count += 1;
    }
}

/// Consume and discard up to `n` bytes. Returns the number of bytes skipped.
pub fn skip_bytes(source: &mut dyn ByteSource, mut n: u64) -> io::Result<u64> {
    let mut skipped = 0;
    while n > 0 {
        let available = source.fill_buf()?.len();
        if available == 0 {
            break;
        }
        let amt = available.min(usize::try_from(n).unwrap_or(usize::MAX));
        source.consume(amt);
        n -= amt as u64;
        skipped += amt as u64;
    }
    Ok(skipped)
}
