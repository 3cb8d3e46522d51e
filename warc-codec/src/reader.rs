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

//! WARC readers for flat and per-record gzip framed input.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};
use tracing::{debug, trace, warn};

use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::{DigestEncoding, DigestRegistry};
use crate::error::{Result, WarcError};
use crate::gzip::{GzipMembers, GZIP_MAGIC};
use crate::header::{WarcHeader, WarcHeaderBuilder, WarcVersion};
use crate::http::HttpHeader;
use crate::input::{
    consume_newlines, is_record_start, read_line_limited, skip_bytes, ByteSource, InputBuffer, DEFAULT_BUFFER_SIZE,
    RECORD_MAGIC,
};
use crate::record::{trailing_newlines_diagnosis, DigestJob, DigestTarget, Payload, RecordCursor, WarcRecord};
use crate::uri::UriProfile;

pub const DEFAULT_MAX_HEADER_SIZE: usize = 32 * 1024;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Compute and verify block digests
    pub compute_block_digest: bool,
    /// Compute and verify payload digests
    pub compute_payload_digest: bool,
    /// Algorithm used when a record declares none or one the registry does not know
    pub digest_algorithm: String,
    /// Encoding of computed digests for records without a declared digest
    pub digest_encoding: DigestEncoding,
    /// URI validation profile for header fields
    pub uri_profile: UriProfile,
    /// Parse the HTTP header of `application/http` blocks
    pub parse_http: bool,
    /// Maximum size of a header block (and of an embedded HTTP header) in bytes
    pub max_header_size: usize,
    /// Input buffer size in bytes
    pub buffer_size: usize,
    /// Digest algorithms available for computation
    pub registry: Arc<DigestRegistry>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            compute_block_digest: true,
            compute_payload_digest: true,
            digest_algorithm: "sha1".to_string(),
            digest_encoding: DigestEncoding::Base32,
            uri_profile: UriProfile::Lax,
            parse_http: true,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            registry: Arc::new(DigestRegistry::with_defaults()),
        }
    }
}

impl ReaderConfig {
    pub fn with_block_digest(mut self, enabled: bool) -> Self {
        self.compute_block_digest = enabled;
        self
    }

    pub fn with_payload_digest(mut self, enabled: bool) -> Self {
        self.compute_payload_digest = enabled;
        self
    }

    pub fn with_digest_algorithm(mut self, algorithm: &str, encoding: DigestEncoding) -> Self {
        self.digest_algorithm = algorithm.to_lowercase();
        self.digest_encoding = encoding;
        self
    }

    pub fn with_uri_profile(mut self, profile: UriProfile) -> Self {
        self.uri_profile = profile;
        self
    }

    pub fn with_parse_http(mut self, enabled: bool) -> Self {
        self.parse_http = enabled;
        self
    }

    pub fn with_max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_registry(mut self, registry: Arc<DigestRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Common interface of both framing variants.
pub trait WarcReader {
    /// Whether the input is gzip framed.
    fn is_compressed(&self) -> bool;

    /// Read the next record of a bound input.
    ///
    /// A previous record that was not closed is skipped first.
    /// Returns `Ok(None)` at the end of the input.
    fn next_record(&mut self) -> Result<Option<WarcRecord<'_>>>;

    /// Findings that do not belong to a single record.
    fn diagnostics(&self) -> &Diagnostics;

    /// Whether no reader-level errors were recorded.
    fn is_compliant(&self) -> bool {
        !self.diagnostics().has_errors()
    }

    /// Input bytes consumed so far (compressed bytes for gzip input).
    fn consumed(&self) -> u64;

    /// Number of records returned so far.
    fn records(&self) -> u64;

    fn config(&self) -> &ReaderConfig;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Unbound,
    Sequential,
    RandomAccess,
}

impl AccessMode {
    fn check_sequential(self) -> Result<()> {
        match self {
            AccessMode::Sequential => Ok(()),
            AccessMode::Unbound => Err(WarcError::IllegalState("no input bound to reader")),
            AccessMode::RandomAccess => Err(WarcError::IllegalState("reader is used for random access")),
        }
    }

    fn check_random_access(self) -> Result<()> {
        match self {
            AccessMode::Sequential => Err(WarcError::IllegalState("reader is bound to a sequential input")),
            _ => Ok(()),
        }
    }
}

fn decode_line(bytes: &[u8], diagnostics: &mut Diagnostics) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let text = WINDOWS_1252
                .decode(bytes, DecoderTrap::Replace)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
            diagnostics.add_warning(Diagnosis::with_info(DiagnosisType::InvalidEncoding, "Header line", [&text]));
            text
        }
    }
}

/// Skip input up to the next line starting with the record magic.
///
/// Returns whether a record start was found.
fn skip_to_record(source: &mut dyn ByteSource, diagnostics: &mut Diagnostics) -> io::Result<bool> {
    let mut skipped = 0u64;
    let mut discard = Vec::new();
    let found = loop {
        let ahead = source.peek(RECORD_MAGIC.len())?;
        if ahead.is_empty() {
            break false;
        }
        if is_record_start(ahead) {
            break true;
        }
        discard.clear();
        skipped += read_line_limited(source, &mut discard, 0)?.0;
    };
    if skipped > 0 {
        warn!(skipped, offset = source.offset(), "skipped data before record");
        diagnostics.add_error(Diagnosis::with_info(
            DiagnosisType::Error,
            "Data before WARC version",
            [skipped.to_string()],
        ));
    }
    Ok(found)
}

/// Skip whatever is left of a record that was dropped without closing it.
fn finish_open_record(
    source: &mut dyn ByteSource,
    cursor: &mut RecordCursor,
    diagnostics: &mut Diagnostics,
) -> io::Result<()> {
    if !cursor.open {
        return Ok(());
    }
    let skipped = skip_bytes(source, cursor.remaining)?;
    trace!(skipped, "skipped unread record block");
    cursor.remaining = 0;
    cursor.open = false;
    let newlines = consume_newlines(source)?;
    if newlines != crate::record::EXPECTED_TRAILING_NEWLINES {
        diagnostics.add_error(trailing_newlines_diagnosis(newlines));
    }
    Ok(())
}

enum RawLine {
    Field(String, String),
    Other(String),
}

/// Read the version line and header block. The source must be positioned at a record start.
fn read_header(source: &mut dyn ByteSource, config: &ReaderConfig) -> io::Result<WarcHeader> {
    let mut builder = WarcHeaderBuilder::new(WarcVersion::V1_0).with_uri_profile(config.uri_profile);
    let mut line = Vec::new();
    let (mut header_size, _) = read_line_limited(source, &mut line, config.max_header_size)?;

    let version_text = decode_line(&line, builder.diagnostics_mut());
    match WarcVersion::parse(&version_text) {
        Some(version) => {
            builder.set_version(version);
            if !version.is_supported() {
                builder.diagnostics_mut().add_error(Diagnosis::with_info(
                    DiagnosisType::Unknown,
                    "WARC version",
                    [&version_text],
                ));
            }
        }
        None => builder.diagnostics_mut().add_error(Diagnosis::with_info(
            DiagnosisType::Invalid,
            "WARC version",
            [&version_text],
        )),
    }

    let mut lines: Vec<RawLine> = Vec::new();
    let mut complete = false;
    let mut oversized = false;
    loop {
        line.clear();
        let budget = config.max_header_size.saturating_sub(header_size as usize);
        let (n, newline) = read_line_limited(source, &mut line, budget)?;
        header_size += n;
        if n == 0 {
            break;
        }
        if newline && line.is_empty() && n <= 2 {
            complete = true;
            break;
        }
        if header_size as usize > config.max_header_size && !oversized {
            oversized = true;
            builder.diagnostics_mut().add_error(Diagnosis::with_info(
                DiagnosisType::Error,
                "Header block",
                [format!("Exceeds {} bytes", config.max_header_size)],
            ));
        }
        if !oversized {
            let text = decode_line(&line, builder.diagnostics_mut());
            if text.starts_with(&[' ', '\t'][..]) {
                match lines.last_mut() {
                    Some(RawLine::Field(_, value)) => {
                        value.push(' ');
                        value.push_str(text.trim());
                    }
                    _ => lines.push(RawLine::Other(text)),
                }
            } else {
                match text.split_once(':') {
                    Some((name, value)) => lines.push(RawLine::Field(name.to_string(), value.to_string())),
                    None => lines.push(RawLine::Other(text)),
                }
            }
        }
        if !newline {
            break;
        }
    }
    if !complete {
        builder.diagnostics_mut().add_error(Diagnosis::with_info(
            DiagnosisType::Error,
            "Header block",
            ["Unexpected end of input"],
        ));
    }

    for raw in lines {
        match raw {
            RawLine::Field(name, value) => builder.add_header(&name, &value),
            RawLine::Other(text) => builder.add_line(&text),
        }
    }
    builder.check_fields();
    Ok(builder.build())
}

fn is_http_block(header: &WarcHeader) -> bool {
    header
        .content_type()
        .is_some_and(|ct| ct.essence().eq_ignore_ascii_case("application/http"))
}

/// Parse the record starting at the next record magic.
///
/// # Arguments
///
/// * `source` - Input positioned at or before a record
/// * `cursor` - Read state shared with the returned record
/// * `config` - Reader configuration
/// * `diagnostics` - Reader-level findings
/// * `start_offset` - Offset to report for the record, the source position if `None`
fn parse_record<'a>(
    source: &'a mut dyn ByteSource,
    cursor: &'a mut RecordCursor,
    config: &ReaderConfig,
    diagnostics: &mut Diagnostics,
    start_offset: Option<u64>,
) -> Result<Option<WarcRecord<'a>>> {
    if !skip_to_record(source, diagnostics)? {
        return Ok(None);
    }
    let local_start = source.offset();
    let start_offset = start_offset.unwrap_or(local_start);
    let header = read_header(source, config)?;
    let header_length = source.offset() - local_start;
    let content_length = header.content_length().unwrap_or(0);

    let mut http_header = None;
    if is_http_block(&header) && (config.parse_http || config.compute_payload_digest) && content_length > 0 {
        let window = content_length.min(config.max_header_size as u64) as usize;
        http_header = HttpHeader::parse(source.peek(window)?);
    }
    let payload_skip = http_header.as_ref().map_or(0, |h| h.len() as u64);
    if !config.parse_http {
        http_header = None;
    }

    let job = |enabled: bool, target: DigestTarget| {
        if !enabled {
            return None;
        }
        let declared = match target {
            DigestTarget::Block => header.block_digest(),
            DigestTarget::Payload => header.payload_digest(),
        };
        let job = DigestJob::new(target, declared, &config.registry, &config.digest_algorithm, config.digest_encoding);
        if job.is_none() {
            warn!(algorithm = %config.digest_algorithm, "digest algorithm not in registry");
        }
        job
    };
    let block_digest = job(config.compute_block_digest, DigestTarget::Block);
    let payload_digest = job(config.compute_payload_digest, DigestTarget::Payload);

    debug!(
        offset = start_offset,
        record_type = header.record_type().as_str(),
        content_length,
        "read record header"
    );
    let payload = Payload::new(source, cursor, content_length, payload_skip, block_digest, payload_digest);
    Ok(Some(WarcRecord::new(
        header,
        http_header,
        start_offset,
        local_start,
        header_length,
        payload,
    )))
}

/// Reader for flat (uncompressed) WARC input.
#[derive(Debug)]
pub struct WarcReaderUncompressed<R> {
    config: ReaderConfig,
    input: Option<InputBuffer<R>>,
    mode: AccessMode,
    cursor: RecordCursor,
    diagnostics: Diagnostics,
    records: u64,
}

impl<R: Read> WarcReaderUncompressed<R> {
    /// Create a reader without input. Use [`Self::bind`] or [`Self::next_record_from`].
    pub fn new(config: ReaderConfig) -> Self {
        WarcReaderUncompressed {
            config,
            input: None,
            mode: AccessMode::Unbound,
            cursor: RecordCursor::default(),
            diagnostics: Diagnostics::new(),
            records: 0,
        }
    }

    /// Create a reader for sequential access to `source`.
    pub fn from_reader(source: R, config: ReaderConfig) -> Self {
        let input = InputBuffer::with_offset(source, 0, config.buffer_size);
        Self::from_input(input, config)
    }

    pub(crate) fn from_input(input: InputBuffer<R>, config: ReaderConfig) -> Self {
        let mut reader = Self::new(config);
        reader.input = Some(input);
        reader.mode = AccessMode::Sequential;
        reader
    }

    /// Bind an input for sequential reading.
    ///
    /// Fails if the reader was already used for random access.
    pub fn bind(&mut self, source: R) -> Result<()> {
        if self.mode == AccessMode::RandomAccess {
            return Err(WarcError::IllegalState("reader is used for random access"));
        }
        self.input = Some(InputBuffer::with_offset(source, 0, self.config.buffer_size));
        self.cursor = RecordCursor::default();
        self.mode = AccessMode::Sequential;
        Ok(())
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> Option<R> {
        self.input.map(InputBuffer::into_inner)
    }

    fn read_next(&mut self) -> Result<Option<WarcRecord<'_>>> {
        let Some(input) = self.input.as_mut() else {
            return Err(WarcError::IllegalState("no input bound to reader"));
        };
        finish_open_record(input, &mut self.cursor, &mut self.diagnostics)?;
        let record = parse_record(input, &mut self.cursor, &self.config, &mut self.diagnostics, None)?;
        if record.is_some() {
            self.records += 1;
        }
        Ok(record)
    }
}

impl<R: Read + Seek> WarcReaderUncompressed<R> {
    /// Read the record at `offset` of `source`.
    pub fn next_record_from(&mut self, source: R, offset: u64) -> Result<Option<WarcRecord<'_>>> {
        let buffer_size = self.config.buffer_size;
        self.next_record_from_with_buffer(source, offset, buffer_size)
    }

    /// Read the record at `offset` of `source` using an input buffer of `buffer_size` bytes.
    pub fn next_record_from_with_buffer(
        &mut self,
        mut source: R,
        offset: u64,
        buffer_size: usize,
    ) -> Result<Option<WarcRecord<'_>>> {
        self.mode.check_random_access()?;
        if buffer_size == 0 {
            return Err(WarcError::InvalidArgument("buffer size must be positive".into()));
        }
        source.seek(SeekFrom::Start(offset))?;
        self.mode = AccessMode::RandomAccess;
        self.cursor = RecordCursor::default();
        self.input = Some(InputBuffer::with_offset(source, offset, buffer_size));
        self.read_next()
    }
}

impl<R: Read> WarcReader for WarcReaderUncompressed<R> {
    fn is_compressed(&self) -> bool {
        false
    }

    fn next_record(&mut self) -> Result<Option<WarcRecord<'_>>> {
        self.mode.check_sequential()?;
        self.read_next()
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn consumed(&self) -> u64 {
        self.input.as_ref().map_or(0, |input| input.offset())
    }

    fn records(&self) -> u64 {
        self.records
    }

    fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

/// Reader for WARC input with one gzip member per record.
#[derive(Debug)]
pub struct WarcReaderCompressed<R> {
    config: ReaderConfig,
    members: Option<GzipMembers<R>>,
    mode: AccessMode,
    cursor: RecordCursor,
    diagnostics: Diagnostics,
    records: u64,
}

impl<R: Read> WarcReaderCompressed<R> {
    /// Create a reader without input. Use [`Self::bind`] or [`Self::next_record_from`].
    pub fn new(config: ReaderConfig) -> Self {
        WarcReaderCompressed {
            config,
            members: None,
            mode: AccessMode::Unbound,
            cursor: RecordCursor::default(),
            diagnostics: Diagnostics::new(),
            records: 0,
        }
    }

    /// Create a reader for sequential access to `source`.
    pub fn from_reader(source: R, config: ReaderConfig) -> Self {
        let input = InputBuffer::with_offset(source, 0, config.buffer_size);
        Self::from_input(input, config)
    }

    pub(crate) fn from_input(input: InputBuffer<R>, config: ReaderConfig) -> Self {
        let mut reader = Self::new(config);
        reader.members = Some(GzipMembers::new(input, reader.config.buffer_size));
        reader.mode = AccessMode::Sequential;
        reader
    }

    /// Bind an input for sequential reading.
    ///
    /// Fails if the reader was already used for random access.
    pub fn bind(&mut self, source: R) -> Result<()> {
        if self.mode == AccessMode::RandomAccess {
            return Err(WarcError::IllegalState("reader is used for random access"));
        }
        let input = InputBuffer::with_offset(source, 0, self.config.buffer_size);
        self.members = Some(GzipMembers::new(input, self.config.buffer_size));
        self.cursor = RecordCursor::default();
        self.mode = AccessMode::Sequential;
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<WarcRecord<'_>>> {
        let Some(members) = self.members.as_mut() else {
            return Err(WarcError::IllegalState("no input bound to reader"));
        };

        if members.is_inside_member() {
            if let Some(member) = members.current() {
                finish_open_record(member, &mut self.cursor, &mut self.diagnostics)?;
            }
            let trailing = members.finish_member()?;
            if trailing > 0 {
                warn!(trailing, offset = members.member_offset(), "data after record in gzip member");
                self.diagnostics.add_error(Diagnosis::with_info(
                    DiagnosisType::UndesiredData,
                    "Trailing data in gzip member",
                    [trailing.to_string()],
                ));
            }
        }

        loop {
            let padding = members.skip_padding()?;
            if padding > 0 {
                debug!(padding, offset = members.offset(), "skipped zero padding between gzip members");
                self.diagnostics.add_warning(Diagnosis::with_info(
                    DiagnosisType::UndesiredData,
                    "Padding between gzip members",
                    [padding.to_string()],
                ));
            }
            if !members.has_next_member()? {
                return Ok(None);
            }
            members.next_member()?;
            let found = match members.current() {
                Some(member) => skip_to_record(member, &mut self.diagnostics)?,
                None => false,
            };
            if found {
                break;
            }
            trace!(offset = members.member_offset(), "skipping gzip member without record");
            members.finish_member()?;
        }

        let start_offset = members.member_offset();
        let Some(member) = members.current() else {
            return Ok(None);
        };
        let record = parse_record(member, &mut self.cursor, &self.config, &mut self.diagnostics, Some(start_offset))?;
        if record.is_some() {
            self.records += 1;
        }
        Ok(record)
    }
}

impl<R: Read + Seek> WarcReaderCompressed<R> {
    /// Read the record in the gzip member starting at `offset` of `source`.
    pub fn next_record_from(&mut self, source: R, offset: u64) -> Result<Option<WarcRecord<'_>>> {
        let buffer_size = self.config.buffer_size;
        self.next_record_from_with_buffer(source, offset, buffer_size)
    }

    /// Read the record in the gzip member starting at `offset` of `source` using
    /// input buffers of `buffer_size` bytes.
    pub fn next_record_from_with_buffer(
        &mut self,
        mut source: R,
        offset: u64,
        buffer_size: usize,
    ) -> Result<Option<WarcRecord<'_>>> {
        self.mode.check_random_access()?;
        if buffer_size == 0 {
            return Err(WarcError::InvalidArgument("buffer size must be positive".into()));
        }
        source.seek(SeekFrom::Start(offset))?;
        self.mode = AccessMode::RandomAccess;
        self.cursor = RecordCursor::default();
        let input = InputBuffer::with_offset(source, offset, buffer_size);
        self.members = Some(GzipMembers::new(input, buffer_size));
        self.read_next()
    }
}

impl<R: Read> WarcReader for WarcReaderCompressed<R> {
    fn is_compressed(&self) -> bool {
        true
    }

    fn next_record(&mut self) -> Result<Option<WarcRecord<'_>>> {
        self.mode.check_sequential()?;
        self.read_next()
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn consumed(&self) -> u64 {
        self.members.as_ref().map_or(0, |members| members.offset())
    }

    fn records(&self) -> u64 {
        self.records
    }

    fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

/// Open a sequential reader, detecting gzip framing from the first bytes of `source`.
pub fn open_reader<'a, R: Read + 'a>(source: R, config: ReaderConfig) -> Result<Box<dyn WarcReader + 'a>> {
    let mut input = InputBuffer::with_offset(source, 0, config.buffer_size);
    if input.peek(GZIP_MAGIC.len())? == GZIP_MAGIC {
        debug!("detected gzip framing");
        Ok(Box::new(WarcReaderCompressed::from_input(input, config)))
    } else {
        Ok(Box::new(WarcReaderUncompressed::from_input(input, config)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TWO_RECORDS: &[u8] = b"WARC/1.0\r\n\
WARC-Type: resource\r\n\
WARC-Record-ID: <urn:uuid:00000000-0000-0000-0000-000000000001>\r\n\
WARC-Date: 2020-01-01T00:00:00Z\r\n\
WARC-Target-URI: file:///a.txt\r\n\
Content-Type: text/plain\r\n\
Content-Length: 5\r\n\
\r\n\
hello\r\n\r\n\
WARC/1.0\r\n\
WARC-Type: resource\r\n\
WARC-Record-ID: <urn:uuid:00000000-0000-0000-0000-000000000002>\r\n\
WARC-Date: 2020-01-01T00:00:00Z\r\n\
WARC-Target-URI: file:///b.txt\r\n\
Content-Type: text/plain\r\n\
Content-Length: 3\r\n\
\r\n\
abc\r\n\r\n";

    #[test]
    fn sequential_reading() {
        let mut reader = WarcReaderUncompressed::from_reader(TWO_RECORDS, ReaderConfig::default());
        let mut record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.start_offset(), 0);
        assert_eq!(record.read_payload().unwrap(), b"hello");
        record.close().unwrap();
        assert!(record.is_compliant(), "{:?}", record.diagnostics());
        assert_eq!(record.is_valid_block_digest(), None);
        assert!(record.computed_block_digest().is_some());

        // Dropped without close.
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.header().target_uri().unwrap().as_str(), "file:///b.txt");
        drop(record);

        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.records(), 2);
        assert_eq!(reader.consumed(), TWO_RECORDS.len() as u64);
        assert!(reader.diagnostics().is_empty());
    }

    #[test]
    fn folded_and_latin1_headers() {
        let data = b"WARC/1.0\nWARC-Type: resource\nWARC-Record-ID: <urn:uuid:1>\nWARC-Date: 2020-01-01T00:00:00Z\nWARC-Target-URI: file:///x\nX-Note: caf\xe9\n  au lait\nContent-Length: 0\n\n\n\n";
        let mut reader = WarcReaderUncompressed::from_reader(&data[..], ReaderConfig::default());
        let mut record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.header().get("X-Note"), Some("café au lait"));
        record.close().unwrap();
        assert!(record.is_compliant(), "{:?}", record.diagnostics());
        let warnings = record.diagnostics().warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, DiagnosisType::InvalidEncoding);
    }

    #[test]
    fn garbage_before_record() {
        let mut data = b"garbage\r\nmore garbage\r\n".to_vec();
        data.extend_from_slice(TWO_RECORDS);
        let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.start_offset(), 23);
        drop(record);
        let errors = reader.diagnostics().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entity, "Data before WARC version");
        assert_eq!(errors[0].information, ["23"]);
    }

    #[test]
    fn truncated_header() {
        let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Len";
        let mut reader = WarcReaderUncompressed::from_reader(&data[..], ReaderConfig::default());
        let mut record = reader.next_record().unwrap().unwrap();
        record.close().unwrap();
        assert!(record
            .diagnostics()
            .errors()
            .iter()
            .any(|d| d.entity == "Header block" && d.information == ["Unexpected end of input"]));
        drop(record);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn unknown_version() {
        let data = b"WARC/2.0\r\nContent-Length: 0\r\n\r\n\r\n\r\n";
        let mut reader = WarcReaderUncompressed::from_reader(&data[..], ReaderConfig::default());
        let record = reader.next_record().unwrap().unwrap();
        let first = &record.diagnostics().errors()[0];
        assert_eq!(first.kind, DiagnosisType::Unknown);
        assert_eq!(first.information, ["WARC/2.0"]);
    }

    #[test]
    fn access_modes_do_not_mix() {
        let mut reader = WarcReaderUncompressed::from_reader(Cursor::new(TWO_RECORDS), ReaderConfig::default());
        assert!(matches!(
            reader.next_record_from(Cursor::new(TWO_RECORDS), 0),
            Err(WarcError::IllegalState(_))
        ));

        let mut reader = WarcReaderUncompressed::<Cursor<&[u8]>>::new(ReaderConfig::default());
        assert!(matches!(reader.next_record(), Err(WarcError::IllegalState(_))));
        assert!(reader.next_record_from(Cursor::new(TWO_RECORDS), 0).unwrap().is_some());
        assert!(matches!(reader.next_record(), Err(WarcError::IllegalState(_))));
        assert!(matches!(reader.bind(Cursor::new(TWO_RECORDS)), Err(WarcError::IllegalState(_))));
    }

    #[test]
    fn open_reader_detects_flat_input() {
        let mut reader = open_reader(TWO_RECORDS, ReaderConfig::default()).unwrap();
        assert!(!reader.is_compressed());
        let mut ids = Vec::new();
        while let Some(mut record) = reader.next_record().unwrap() {
            ids.push(record.header().record_id().unwrap().to_string());
            record.close().unwrap();
        }
        assert_eq!(ids.len(), 2);
        assert!(reader.is_compliant());
    }

    #[test]
    fn zero_padding_after_last_member() {
        use std::io::Write;

        let split = TWO_RECORDS.windows(9).position(|w| w == b"\r\n\r\nWARC/").unwrap() + 4;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&TWO_RECORDS[..split]).unwrap();
        let data = [encoder.finish().unwrap(), vec![0; 16]].concat();

        let mut reader = open_reader(data.as_slice(), ReaderConfig::default()).unwrap();
        assert!(reader.is_compressed());
        reader.next_record().unwrap().unwrap().close().unwrap();
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.is_compliant());
        let warnings = reader.diagnostics().warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, DiagnosisType::UndesiredData);
        assert_eq!(warnings[0].information, ["16"]);
        assert_eq!(reader.consumed(), data.len() as u64);
    }
}
