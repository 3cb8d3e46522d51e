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

//! Records returned by the readers.

use std::io::{self, Read};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{Digest, DigestAccumulator, DigestAlgorithm, DigestEncoding, DigestRegistry};
use crate::error::Result;
use crate::header::WarcHeader;
use crate::http::HttpHeader;
use crate::input::{consume_newlines, ByteSource};

/// Number of line endings that must follow a record block.
pub const EXPECTED_TRAILING_NEWLINES: usize = 2;

const DRAIN_CHUNK_SIZE: usize = 16 * 1024;

/// Read state of the record a reader has handed out last.
#[derive(Debug, Default)]
pub(crate) struct RecordCursor {
    /// Record was returned, but not closed yet.
    pub open: bool,
    /// Block bytes not consumed yet.
    pub remaining: u64,
}

/// Which of the two record digests a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestTarget {
    Block,
    Payload,
}

impl DigestTarget {
    fn scheme_label(&self) -> &'static str {
        match self {
            DigestTarget::Block => "Block digest encoding scheme",
            DigestTarget::Payload => "Payload digest encoding scheme",
        }
    }

    fn mismatch_label(&self) -> &'static str {
        match self {
            DigestTarget::Block => "Incorrect block digest",
            DigestTarget::Payload => "Incorrect payload digest",
        }
    }
}

/// A digest being computed over the record block and the header value it is checked against.
pub(crate) struct DigestJob {
    target: DigestTarget,
    algorithm: Arc<dyn DigestAlgorithm>,
    name: String,
    accumulator: Box<dyn DigestAccumulator>,
    declared: Option<Digest>,
    encoding: DigestEncoding,
}

impl DigestJob {
    /// Prepare a digest computation.
    ///
    /// The declared algorithm is used if the registry knows it, otherwise `default_algorithm`.
    /// Returns `None` if neither is available.
    pub fn new(
        target: DigestTarget,
        declared: Option<&Digest>,
        registry: &DigestRegistry,
        default_algorithm: &str,
        encoding: DigestEncoding,
    ) -> Option<DigestJob> {
        let (name, algorithm) = declared
            .and_then(|d| Some((d.algorithm().to_string(), registry.get(d.algorithm())?)))
            .or_else(|| Some((default_algorithm.to_lowercase(), registry.get(default_algorithm)?)))?;
        Some(DigestJob {
            target,
            accumulator: algorithm.accumulator(),
            algorithm,
            name,
            declared: declared.cloned(),
            encoding,
        })
    }

    fn update(&mut self, data: &[u8]) {
        self.accumulator.update(data);
    }

    /// Finalize the computation and verify it against the declared value.
    ///
    /// Returns the computed digest and whether it matches (`None` if that cannot be decided).
    fn finish(self, diagnostics: &mut Diagnostics) -> (Option<Digest>, Option<bool>) {
        let bytes = self.accumulator.finish();
        let computed = Digest::encode(&self.name, &bytes, self.encoding).ok();

        let Some(mut declared) = self.declared else {
            return (computed, None);
        };
        if declared.algorithm() != self.name {
            debug!(declared = declared.algorithm(), computed = %self.name, "digest algorithm not supported");
            diagnostics.add_error(Diagnosis::with_info(
                DiagnosisType::Unknown,
                self.target.scheme_label(),
                [declared.algorithm()],
            ));
            return (computed, None);
        }
        let Some(encoding) = declared.resolve(self.algorithm.output_len()) else {
            diagnostics.add_error(Diagnosis::with_info(
                DiagnosisType::Unknown,
                self.target.scheme_label(),
                [declared.digest_string()],
            ));
            return (computed, None);
        };

        let computed = Digest::encode(&self.name, &bytes, encoding).ok();
        if declared.digest_bytes() == Some(bytes.as_slice()) {
            return (computed, Some(true));
        }
        warn!(target_kind = ?self.target, declared = %declared, "digest mismatch");
        diagnostics.add_error(Diagnosis::with_info(
            DiagnosisType::InvalidExpected,
            self.target.mismatch_label(),
            [declared.digest_string().to_string(), encoding.encode(&bytes)],
        ));
        (computed, Some(false))
    }
}

/// Block of the current record as a finite byte stream.
///
/// Reading past the declared `Content-Length` returns end of stream, and so
/// does reading after the record was closed.
pub struct Payload<'a> {
    source: &'a mut dyn ByteSource,
    cursor: &'a mut RecordCursor,
    length: u64,
    position: u64,
    payload_skip: u64,
    block_digest: Option<DigestJob>,
    payload_digest: Option<DigestJob>,
}

impl<'a> Payload<'a> {
    pub(crate) fn new(
        source: &'a mut dyn ByteSource,
        cursor: &'a mut RecordCursor,
        length: u64,
        payload_skip: u64,
        block_digest: Option<DigestJob>,
        payload_digest: Option<DigestJob>,
    ) -> Self {
        cursor.open = true;
        cursor.remaining = length;
        Payload {
            source,
            cursor,
            length,
            position: 0,
            payload_skip,
            block_digest,
            payload_digest,
        }
    }

    /// Declared block length.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left until the end of the block.
    pub fn remaining(&self) -> u64 {
        self.cursor.remaining
    }

    fn update_digests(&mut self, data: &[u8]) {
        if let Some(job) = &mut self.block_digest {
            job.update(data);
        }
        if let Some(job) = &mut self.payload_digest {
            let skip = self.payload_skip.min(data.len() as u64) as usize;
            self.payload_skip -= skip as u64;
            job.update(&data[skip..]);
        }
    }
}

impl Read for Payload<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.cursor.open || self.cursor.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = self.cursor.remaining.min(buf.len() as u64) as usize;
        let n = self.source.read(&mut buf[..max])?;
        self.update_digests(&buf[..n]);
        self.cursor.remaining -= n as u64;
        self.position += n as u64;
        Ok(n)
    }
}

/// A WARC record read from a stream.
///
/// The record borrows its reader until it is dropped. Calling [`WarcRecord::close`]
/// finishes reading it and verifies digests; a record dropped without closing is
/// skipped by the reader's next call.
pub struct WarcRecord<'a> {
    header: WarcHeader,
    diagnostics: Diagnostics,
    http_header: Option<HttpHeader>,
    start_offset: u64,
    local_start: u64,
    header_length: u64,
    payload: Payload<'a>,
    consumed: Option<u64>,
    trailing_newlines: Option<usize>,
    block_digest: Option<Digest>,
    payload_digest: Option<Digest>,
    block_digest_valid: Option<bool>,
    payload_digest_valid: Option<bool>,
    closed: bool,
}

impl<'a> WarcRecord<'a> {
    pub(crate) fn new(
        header: WarcHeader,
        http_header: Option<HttpHeader>,
        start_offset: u64,
        local_start: u64,
        header_length: u64,
        payload: Payload<'a>,
    ) -> Self {
        WarcRecord {
            diagnostics: header.diagnostics().clone(),
            header,
            http_header,
            start_offset,
            local_start,
            header_length,
            payload,
            consumed: None,
            trailing_newlines: None,
            block_digest: None,
            payload_digest: None,
            block_digest_valid: None,
            payload_digest_valid: None,
            closed: false,
        }
    }

    pub fn header(&self) -> &WarcHeader {
        &self.header
    }

    /// Embedded HTTP header of `application/http` records, if it was parsed.
    pub fn http_header(&self) -> Option<&HttpHeader> {
        self.http_header.as_ref()
    }

    /// All findings for this record, header diagnoses first.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_compliant(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Position of the record in the input.
    ///
    /// For gzip input this is the compressed offset of the record's member.
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Length of the version line and header block in bytes.
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Declared block length.
    pub fn content_length(&self) -> u64 {
        self.payload.len()
    }

    /// Block stream. Also covers an embedded HTTP header.
    pub fn payload(&mut self) -> &mut Payload<'a> {
        &mut self.payload
    }

    /// Read the rest of the block into a vector.
    pub fn read_payload(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.payload.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Uncompressed bytes the record occupied, including trailing newlines. Known after closing.
    pub fn consumed(&self) -> Option<u64> {
        self.consumed
    }

    /// Line endings found after the block. Known after closing.
    pub fn trailing_newlines(&self) -> Option<usize> {
        self.trailing_newlines
    }

    /// Block digest computed while reading. Known after closing.
    pub fn computed_block_digest(&self) -> Option<&Digest> {
        self.block_digest.as_ref()
    }

    /// Payload digest computed while reading. Known after closing.
    pub fn computed_payload_digest(&self) -> Option<&Digest> {
        self.payload_digest.as_ref()
    }

    /// Whether the declared block digest matches. `None` if not checked or undecidable.
    pub fn is_valid_block_digest(&self) -> Option<bool> {
        self.block_digest_valid
    }

    /// Whether the declared payload digest matches. `None` if not checked or undecidable.
    pub fn is_valid_payload_digest(&self) -> Option<bool> {
        self.payload_digest_valid
    }

    /// Skip the unread part of the block, consume the trailing newlines and verify digests.
    ///
    /// Closing an already closed record does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let mut scratch = vec![0u8; DRAIN_CHUNK_SIZE];
        while self.payload.read(&mut scratch)? > 0 {}

        if self.payload.cursor.remaining > 0 {
            self.diagnostics.add_error(Diagnosis::with_info(
                DiagnosisType::InvalidExpected,
                "Payload length",
                [self.payload.position.to_string(), self.payload.length.to_string()],
            ));
            self.payload.cursor.remaining = 0;
        }

        let newlines = consume_newlines(self.payload.source)?;
        if newlines != EXPECTED_TRAILING_NEWLINES {
            self.diagnostics.add_error(trailing_newlines_diagnosis(newlines));
        }
        self.trailing_newlines = Some(newlines);
        self.consumed = Some(self.payload.source.offset() - self.local_start);
        self.payload.cursor.open = false;
        self.closed = true;

        if let Some(job) = self.payload.block_digest.take() {
            (self.block_digest, self.block_digest_valid) = job.finish(&mut self.diagnostics);
        }
        if let Some(job) = self.payload.payload_digest.take() {
            (self.payload_digest, self.payload_digest_valid) = job.finish(&mut self.diagnostics);
        }
        Ok(())
    }
}

pub(crate) fn trailing_newlines_diagnosis(count: usize) -> Diagnosis {
    Diagnosis::with_info(
        DiagnosisType::InvalidExpected,
        "Trailing newlines",
        [count.to_string(), EXPECTED_TRAILING_NEWLINES.to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{WarcHeaderBuilder, WarcVersion};
    use crate::input::InputBuffer;

    fn header(block_digest: Option<&str>) -> WarcHeader {
        let mut b = WarcHeaderBuilder::new(WarcVersion::V1_0);
        b.add_header("WARC-Type", "resource");
        b.add_header("Content-Length", "5");
        if let Some(d) = block_digest {
            b.add_header("WARC-Block-Digest", d);
        }
        b.build()
    }

    fn job(target: DigestTarget, declared: Option<&Digest>) -> Option<DigestJob> {
        DigestJob::new(target, declared, &DigestRegistry::with_defaults(), "sha1", DigestEncoding::Base32)
    }

    #[test]
    fn close_verifies_and_consumes_newlines() {
        // sha1("hello")
        let declared = "sha1:aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
        let header = header(Some(declared));
        let digest = header.block_digest().cloned();

        let mut input = InputBuffer::new(&b"hello\r\n\r\nWARC/1.0"[..]);
        let mut cursor = RecordCursor::default();
        let block = job(DigestTarget::Block, digest.as_ref());
        let payload = Payload::new(&mut input, &mut cursor, 5, 0, block, None);
        let mut record = WarcRecord::new(header, None, 0, 0, 0, payload);

        let mut first = [0u8; 2];
        record.payload().read_exact(&mut first).unwrap();
        record.close().unwrap();
        record.close().unwrap();

        assert!(record.diagnostics().is_empty(), "{:?}", record.diagnostics());
        assert_eq!(record.trailing_newlines(), Some(2));
        assert_eq!(record.consumed(), Some(9));
        assert_eq!(record.is_valid_block_digest(), Some(true));
        assert_eq!(record.computed_block_digest().unwrap().to_string(), declared);
        assert_eq!(record.payload().read(&mut first).unwrap(), 0);
        drop(record);
        assert!(!cursor.open);
        assert_eq!(input.peek(5).unwrap(), b"WARC/");
    }

    #[test]
    fn mismatching_digest() {
        let header = header(Some("sha1:3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ"));
        let digest = header.block_digest().cloned();
        let mut input = InputBuffer::new(&b"hello\n"[..]);
        let mut cursor = RecordCursor::default();
        let payload = Payload::new(&mut input, &mut cursor, 5, 0, job(DigestTarget::Block, digest.as_ref()), None);
        let mut record = WarcRecord::new(header, None, 0, 0, 0, payload);
        record.close().unwrap();

        assert_eq!(record.is_valid_block_digest(), Some(false));
        let errors = record.diagnostics().errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].entity, "Trailing newlines");
        assert_eq!(errors[0].information, ["1", "2"]);
        assert_eq!(errors[1].entity, "Incorrect block digest");
        assert_eq!(errors[1].information[0], "3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ");
        assert_eq!(errors[1].information[1], "VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N");
    }

    #[test]
    fn unknown_algorithm_is_undecided() {
        let header = header(Some("md5:XUFAKrxLKna5cZ2REBfFkg=="));
        let digest = header.block_digest().cloned();
        let mut input = InputBuffer::new(&b"hello\r\n\r\n"[..]);
        let mut cursor = RecordCursor::default();
        let payload = Payload::new(&mut input, &mut cursor, 5, 0, job(DigestTarget::Block, digest.as_ref()), None);
        let mut record = WarcRecord::new(header, None, 0, 0, 0, payload);
        record.close().unwrap();

        assert_eq!(record.is_valid_block_digest(), None);
        assert_eq!(record.computed_block_digest().unwrap().algorithm(), "sha1");
        let errors = record.diagnostics().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DiagnosisType::Unknown);
        assert_eq!(errors[0].entity, "Block digest encoding scheme");
    }

    #[test]
    fn payload_digest_skips_leading_bytes() {
        let header = header(None);
        let mut input = InputBuffer::new(&b"HEAD:hello\r\n\r\n"[..]);
        let mut cursor = RecordCursor::default();
        let payload = Payload::new(&mut input, &mut cursor, 10, 5, None, job(DigestTarget::Payload, None));
        let mut record = WarcRecord::new(header, None, 0, 0, 0, payload);
        assert_eq!(record.read_payload().unwrap(), b"HEAD:hello");
        record.close().unwrap();
        assert_eq!(record.is_valid_payload_digest(), None);
        assert_eq!(
            record.computed_payload_digest().unwrap().to_string(),
            "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N"
        );
    }

    #[test]
    fn truncated_block() {
        let header = header(None);
        let mut input = InputBuffer::new(&b"hel"[..]);
        let mut cursor = RecordCursor::default();
        let payload = Payload::new(&mut input, &mut cursor, 5, 0, None, None);
        let mut record = WarcRecord::new(header, None, 0, 0, 0, payload);
        record.close().unwrap();
        let errors = record.diagnostics().errors();
        assert_eq!(errors[0].entity, "Payload length");
        assert_eq!(errors[0].information, ["3", "5"]);
        assert_eq!(errors[1].information, ["0", "2"]);
    }
}
