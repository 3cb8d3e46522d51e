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

//! HTTP message header embedded in `application/http` record blocks.

use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};

/// Position right after the empty line terminating an HTTP header block, if any.
pub fn find_header_end(bytes: &[u8]) -> Option<usize> {
    let mut i = 0;
    while let Some(nl) = bytes[i..].iter().position(|&b| b == b'\n') {
        let next = i + nl + 1;
        match bytes.get(next..) {
            Some([b'\r', b'\n', ..]) => return Some(next + 2),
            Some([b'\n', ..]) => return Some(next + 1),
            _ => i = next,
        }
    }
    None
}

/// Parsed HTTP request or response header.
#[derive(Debug, Clone, Default)]
pub struct HttpHeader {
    status_line: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    length: usize,
}

impl HttpHeader {
    /// Parse the header block at the start of `bytes`.
    ///
    /// Returns `None` if `bytes` contains no complete header block or the first
    /// line does not look like an HTTP request or status line.
    pub fn parse(bytes: &[u8]) -> Option<HttpHeader> {
        let length = find_header_end(bytes)?;
        let mut lines = bytes[..length]
            .split(|&b| b == b'\n')
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .take_while(|l| !l.is_empty());

        let status_line = lines.next()?;
        let is_response = status_line.starts_with(b"HTTP/");
        let is_request = status_line.windows(6).any(|w| w == b" HTTP/");
        if !is_response && !is_request {
            return None;
        }

        let mut header = HttpHeader {
            status_line: status_line.to_vec(),
            headers: Vec::new(),
            length,
        };
        for line in lines {
            if line[0] == b' ' || line[0] == b'\t' {
                header.add_continuation(line.trim_ascii());
                continue;
            }
            match line.iter().position(|&b| b == b':') {
                Some(colon) => header
                    .headers
                    .push((line[..colon].trim_ascii().to_vec(), line[colon + 1..].trim_ascii().to_vec())),
                None => header.add_continuation(line.trim_ascii()),
            }
        }
        Some(header)
    }

    fn add_continuation(&mut self, value: &[u8]) {
        if let Some(last) = self.headers.last_mut() {
            last.1.push(b' ');
            last.1.extend_from_slice(value);
        } else {
            self.headers.push((Vec::new(), value.to_vec()));
        }
    }

    fn decode(byte_str: &[u8]) -> String {
        WINDOWS_1252
            .decode(byte_str, DecoderTrap::Ignore)
            .unwrap_or_default()
    }

    /// Length of the header block in bytes, including the terminating empty line.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn status_line(&self) -> String {
        Self::decode(&self.status_line)
    }

    /// HTTP status code (unset for requests).
    pub fn status_code(&self) -> Option<u16> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        let mut parts = self.status_line.splitn(3, |&b| b == b' ');
        parts.next()?;
        String::from_utf8_lossy(parts.next()?).parse::<u16>().ok()
    }

    /// HTTP reason phrase, `None` for requests or if no reason phrase was given.
    pub fn reason_phrase(&self) -> Option<String> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        let mut parts = self.status_line.splitn(3, |&b| b == b' ');
        parts.next()?;
        parts.next()?;
        Some(Self::decode(parts.next()?))
    }

    /// Value of a (case-insensitive) header.
    /// Duplicate headers are returned as a single value joined with `","`.
    pub fn get(&self, key: &str) -> Option<String> {
        let values: Vec<&[u8]> = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key.as_bytes()))
            .map(|(_, v)| v.as_slice())
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(Self::decode(&values.join(b",".as_slice())))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(key.as_bytes()))
    }

    pub fn items(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.headers.iter().map(|(k, v)| (Self::decode(k), Self::decode(v)))
    }
}
