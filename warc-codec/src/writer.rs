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

//! WARC writers for flat and per-record gzip framed output.

use std::io::{self, Read, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, trace, warn};

use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::error::{Result, WarcError};
use crate::field::FieldName;
use crate::header::WarcHeader;

/// Bytes terminating every record block.
pub const RECORD_TRAILER: &[u8] = b"\r\n\r\n";

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Return [`WarcError::ContentLengthMismatch`] from `close_record` if the payload
    /// length differs from the declared `Content-Length`
    pub exception_on_content_length_mismatch: bool,
    /// Gzip compression level (0-9)
    pub compression_level: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            exception_on_content_length_mismatch: true,
            compression_level: 6,
        }
    }
}

impl WriterConfig {
    pub fn with_exception_on_content_length_mismatch(mut self, enabled: bool) -> Self {
        self.exception_on_content_length_mismatch = enabled;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}

/// Position of a writer in the record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Init,
    HeaderWritten,
    PayloadWritten,
    RecordClosed,
}

impl WriterState {
    /// State after writing a header.
    pub fn on_header(self) -> Result<WriterState> {
        match self {
            WriterState::Init | WriterState::RecordClosed => Ok(WriterState::HeaderWritten),
            WriterState::HeaderWritten => Err(WarcError::IllegalState("headers written back to back")),
            WriterState::PayloadWritten => Err(WarcError::IllegalState("previous record not closed")),
        }
    }

    /// State after writing payload bytes.
    pub fn on_payload(self) -> Result<WriterState> {
        match self {
            WriterState::HeaderWritten | WriterState::PayloadWritten => Ok(WriterState::PayloadWritten),
            WriterState::Init | WriterState::RecordClosed => Err(WarcError::IllegalState("payload written without header")),
        }
    }

    /// Whether a record was started and not closed yet.
    pub fn is_record_open(self) -> bool {
        matches!(self, WriterState::HeaderWritten | WriterState::PayloadWritten)
    }
}

/// Byte sink counting the bytes written through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        CountingWriter { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// How records are laid out in the output stream.
pub trait Framing {
    type Inner;

    fn is_compressed(&self) -> bool;

    /// Prepare the output for a new record.
    fn begin_record(&mut self) -> io::Result<()>;

    /// Sink for the bytes of the current record.
    fn sink(&mut self) -> io::Result<&mut dyn Write>;

    /// Finish the current record after its trailer was written.
    fn end_record(&mut self) -> io::Result<()>;

    /// Bytes written to the underlying output so far.
    fn offset(&self) -> u64;

    fn flush(&mut self) -> io::Result<()>;

    fn into_inner(self) -> Self::Inner;
}

/// Records written back to back.
#[derive(Debug)]
pub struct FlatFraming<W> {
    out: CountingWriter<W>,
}

impl<W: Write> Framing for FlatFraming<W> {
    type Inner = W;

    fn is_compressed(&self) -> bool {
        false
    }

    fn begin_record(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn sink(&mut self) -> io::Result<&mut dyn Write> {
        Ok(&mut self.out)
    }

    fn end_record(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn offset(&self) -> u64 {
        self.out.count()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[derive(Debug)]
enum Member<W: Write> {
    Idle(CountingWriter<W>),
    Open(GzEncoder<CountingWriter<W>>),
    Poisoned,
}

/// One gzip member per record.
#[derive(Debug)]
pub struct GzipFraming<W: Write> {
    member: Member<W>,
    level: Compression,
    offset: u64,
}

impl<W: Write> Framing for GzipFraming<W> {
    type Inner = Option<W>;

    fn is_compressed(&self) -> bool {
        true
    }

    fn begin_record(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.member, Member::Poisoned) {
            Member::Idle(out) => {
                self.offset = out.count();
                self.member = Member::Open(GzEncoder::new(out, self.level));
                Ok(())
            }
            other => {
                self.member = other;
                Ok(())
            }
        }
    }

    fn sink(&mut self) -> io::Result<&mut dyn Write> {
        match &mut self.member {
            Member::Open(encoder) => Ok(encoder),
            _ => Err(io::Error::other("no gzip member open")),
        }
    }

    fn end_record(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.member, Member::Poisoned) {
            Member::Open(encoder) => {
                let out = encoder.finish()?;
                self.offset = out.count();
                self.member = Member::Idle(out);
                Ok(())
            }
            other => {
                self.member = other;
                Ok(())
            }
        }
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.member {
            Member::Idle(out) => out.flush(),
            Member::Open(encoder) => encoder.flush(),
            Member::Poisoned => Ok(()),
        }
    }

    fn into_inner(self) -> Option<W> {
        match self.member {
            Member::Idle(out) => Some(out.into_inner()),
            _ => None,
        }
    }
}

/// Common interface of both framing variants.
pub trait WarcWriter {
    fn is_compressed(&self) -> bool;

    /// Write a record header. Implicitly closes a record whose payload was written.
    fn write_header(&mut self, header: &WarcHeader) -> Result<()>;

    /// Write a serialized header block as is.
    ///
    /// # Arguments
    ///
    /// * `header` - Header bytes including version line and terminating empty line
    /// * `content_length` - Declared block length to check the payload against
    fn write_raw_header(&mut self, header: &[u8], content_length: Option<u64>) -> Result<()>;

    /// Append bytes to the block of the current record.
    fn write_payload(&mut self, data: &[u8]) -> Result<()>;

    /// Append everything `source` yields to the block of the current record.
    fn stream_payload(&mut self, source: &mut dyn Read) -> Result<u64>;

    /// Terminate the current record and check its length.
    ///
    /// Does nothing if no record is open.
    fn close_record(&mut self) -> Result<()>;

    /// Close the current record and flush the output.
    fn close(&mut self) -> Result<()>;

    fn state(&self) -> WriterState;

    /// Findings recorded while writing.
    fn diagnostics(&self) -> &Diagnostics;

    fn is_compliant(&self) -> bool {
        !self.diagnostics().has_errors()
    }

    /// Output position at which the next record starts (compressed bytes for gzip output).
    fn offset(&self) -> u64;

    /// Number of records closed so far.
    fn records(&self) -> u64;
}

/// WARC writer generic over the record framing.
#[derive(Debug)]
pub struct Writer<F> {
    framing: F,
    config: WriterConfig,
    state: WriterState,
    declared_length: Option<u64>,
    written: u64,
    diagnostics: Diagnostics,
    records: u64,
}

/// Writer for flat WARC output.
pub type WarcWriterUncompressed<W> = Writer<FlatFraming<W>>;

/// Writer for WARC output with one gzip member per record.
pub type WarcWriterCompressed<W> = Writer<GzipFraming<W>>;

impl<W: Write> Writer<FlatFraming<W>> {
    pub fn new(out: W, config: WriterConfig) -> Self {
        Self::with_framing(FlatFraming { out: CountingWriter::new(out) }, config)
    }
}

impl<W: Write> Writer<GzipFraming<W>> {
    pub fn new(out: W, config: WriterConfig) -> Self {
        let framing = GzipFraming {
            member: Member::Idle(CountingWriter::new(out)),
            level: Compression::new(config.compression_level),
            offset: 0,
        };
        Self::with_framing(framing, config)
    }
}

impl<F: Framing> Writer<F> {
    fn with_framing(framing: F, config: WriterConfig) -> Self {
        Writer {
            framing,
            config,
            state: WriterState::Init,
            declared_length: None,
            written: 0,
            diagnostics: Diagnostics::new(),
            records: 0,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Close the current record, flush and return the underlying output.
    ///
    /// For gzip output, the output is only returned if the last member could be finished.
    pub fn into_inner(mut self) -> Result<F::Inner> {
        WarcWriter::close(&mut self)?;
        Ok(self.framing.into_inner())
    }

    fn begin(&mut self, bytes: &[u8], declared_length: Option<u64>) -> Result<()> {
        if self.state == WriterState::PayloadWritten {
            self.close_record()?;
        }
        let next = self.state.on_header()?;
        self.framing.begin_record()?;
        self.framing.sink()?.write_all(bytes)?;
        trace!(from = ?self.state, to = ?next, "writer state");
        self.state = next;
        self.declared_length = declared_length;
        self.written = 0;
        Ok(())
    }

    fn check_length(&mut self) -> Result<()> {
        let written = self.written;
        let declared = self.declared_length;
        let diagnosis = match declared {
            None => Diagnosis::with_info(
                DiagnosisType::ErrorExpected,
                format!("'{}' header", FieldName::ContentLength),
                [written.to_string()],
            ),
            Some(length) if length != written => Diagnosis::with_info(
                DiagnosisType::InvalidExpected,
                format!("'{}' header", FieldName::ContentLength),
                [written.to_string(), length.to_string()],
            ),
            Some(_) => return Ok(()),
        };
        warn!(written, declared = ?declared, "content length mismatch");
        self.diagnostics.add_error(diagnosis);
        if self.config.exception_on_content_length_mismatch {
            return Err(WarcError::ContentLengthMismatch { written, declared });
        }
        Ok(())
    }
}

impl<F: Framing> WarcWriter for Writer<F> {
    fn is_compressed(&self) -> bool {
        self.framing.is_compressed()
    }

    fn write_header(&mut self, header: &WarcHeader) -> Result<()> {
        self.begin(&header.to_bytes(), header.content_length())
    }

    fn write_raw_header(&mut self, header: &[u8], content_length: Option<u64>) -> Result<()> {
        if header.is_empty() {
            return Err(WarcError::InvalidArgument("header is empty".into()));
        }
        self.begin(header, content_length)
    }

    fn write_payload(&mut self, data: &[u8]) -> Result<()> {
        let next = self.state.on_payload()?;
        self.framing.sink()?.write_all(data)?;
        self.written += data.len() as u64;
        self.state = next;
        Ok(())
    }

    fn stream_payload(&mut self, source: &mut dyn Read) -> Result<u64> {
        let next = self.state.on_payload()?;
        let n = io::copy(source, self.framing.sink()?)?;
        self.written += n;
        self.state = next;
        Ok(n)
    }

    fn close_record(&mut self) -> Result<()> {
        if !self.state.is_record_open() {
            return Ok(());
        }
        self.framing.sink()?.write_all(RECORD_TRAILER)?;
        self.framing.end_record()?;
        trace!(from = ?self.state, to = ?WriterState::RecordClosed, "writer state");
        self.state = WriterState::RecordClosed;
        self.records += 1;
        debug!(bytes = self.written, offset = self.framing.offset(), "record written");
        self.check_length()
    }

    fn close(&mut self) -> Result<()> {
        let closed = self.close_record();
        self.framing.flush()?;
        closed
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn offset(&self) -> u64 {
        self.framing.offset()
    }

    fn records(&self) -> u64 {
        self.records
    }
}
