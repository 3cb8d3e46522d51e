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

//! WARC header blocks.
//!
//! A header is assembled with a [`WarcHeaderBuilder`], which parses and validates
//! fields as they are added and collects diagnoses, and then frozen into an
//! immutable [`WarcHeader`].

use std::fmt;
use std::io;
use std::net::IpAddr;

use uuid::Uuid;

use crate::content_type::ContentType;
use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::Digest;
use crate::field::{FieldKind, FieldName, FieldValue, TypedField};
use crate::field_parsers::{value_label, FieldParsers, EXPECTED_DATE};
use crate::policy::{check_field_policy, WarcRecordType};
use crate::timestamp::{Precision, Timestamp};
use crate::uri::{Uri, UriProfile};

/// WARC format version from the record's magic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WarcVersion {
    pub major: u32,
    pub minor: u32,
}

impl WarcVersion {
    pub const V1_0: WarcVersion = WarcVersion { major: 1, minor: 0 };
    pub const V1_1: WarcVersion = WarcVersion { major: 1, minor: 1 };

    /// Parse a magic line such as `WARC/1.0`.
    pub fn parse(line: &str) -> Option<WarcVersion> {
        let (major, minor) = line.trim().strip_prefix("WARC/")?.split_once('.')?;
        if major.is_empty() || minor.is_empty() || !(major.bytes().chain(minor.bytes()).all(|b| b.is_ascii_digit())) {
            return None;
        }
        Some(WarcVersion {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Whether this version is one this crate validates against.
    pub fn is_supported(&self) -> bool {
        *self == Self::V1_0 || *self == Self::V1_1
    }
}

impl Default for WarcVersion {
    fn default() -> Self {
        Self::V1_0
    }
}

impl fmt::Display for WarcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WARC/{}.{}", self.major, self.minor)
    }
}

/// One logical line of a header block, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLine {
    /// `Name: value` (folded continuation lines joined by a single space).
    Field { name: String, value: String },
    /// Line without a field separator, passed through verbatim.
    Other(String),
}

type Slots = [Option<TypedField>; FieldName::COUNT];

fn empty_slots() -> Slots {
    std::array::from_fn(|_| None)
}

/// Mutable header under construction.
#[derive(Debug, Clone)]
pub struct WarcHeaderBuilder {
    version: WarcVersion,
    lines: Vec<HeaderLine>,
    fields: Slots,
    concurrent_to: Vec<TypedField>,
    parsers: FieldParsers,
    diagnostics: Diagnostics,
}

impl Default for WarcHeaderBuilder {
    fn default() -> Self {
        Self::new(WarcVersion::default())
    }
}

impl WarcHeaderBuilder {
    pub fn new(version: WarcVersion) -> Self {
        WarcHeaderBuilder {
            version,
            lines: Vec::new(),
            fields: empty_slots(),
            concurrent_to: Vec::new(),
            parsers: FieldParsers::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Initialize mandatory headers for a fresh record.
    ///
    /// # Arguments
    ///
    /// * `record_type` - WARC-Type
    /// * `content_length` - WARC record block length in bytes
    pub fn init(record_type: WarcRecordType, content_length: u64) -> Self {
        let mut builder = Self::new(WarcVersion::V1_1);
        builder.add_header(FieldName::WarcType.as_str(), record_type.as_str());
        builder.add_typed_header(FieldName::WarcDate.as_str(), FieldValue::Timestamp(Timestamp::now()), None);
        builder.add_header(FieldName::WarcRecordId.as_str(), &format!("<urn:uuid:{}>", Uuid::new_v4()));
        builder.add_header(FieldName::ContentLength.as_str(), &content_length.to_string());
        builder
    }

    /// URI validation profile used by subsequent `add_header` calls.
    pub fn with_uri_profile(mut self, profile: UriProfile) -> Self {
        self.parsers.uri_profile = profile;
        self
    }

    pub fn set_version(&mut self, version: WarcVersion) {
        self.version = version;
    }

    pub fn version(&self) -> WarcVersion {
        self.version
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Findings of the enclosing reader that belong to this header (e.g. encoding problems).
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Append a header from its raw text.
    ///
    /// Known WARC fields are parsed into their typed form, anything else is kept
    /// as an extension header without validation.
    ///
    /// # Arguments
    ///
    /// * `name` - Header name
    /// * `value` - Raw header value
    pub fn add_header(&mut self, name: &str, value: &str) {
        let name = name.trim();
        let value = value.trim();
        self.lines.push(HeaderLine::Field {
            name: name.to_string(),
            value: value.to_string(),
        });

        let Some(field) = FieldName::from_name(name) else {
            return;
        };
        if self.is_duplicate(field, value) {
            return;
        }
        let parsed = self.parse_value(field, value);
        self.store(field, TypedField {
            raw: value.to_string(),
            value: parsed,
        });
    }

    /// Append a header from an already typed value.
    ///
    /// # Arguments
    ///
    /// * `name` - Header name
    /// * `value` - Typed value; must match the type of a known field
    /// * `raw` - Header text to write, rendered from `value` if `None`
    pub fn add_typed_header(&mut self, name: &str, value: FieldValue, raw: Option<&str>) {
        let name = name.trim();
        let field = FieldName::from_name(name);
        if let Some(field) = field {
            if field.kind() != value.kind() {
                self.diagnostics.add_error(Diagnosis::with_info(
                    DiagnosisType::InvalidData,
                    format!("'{}' header", field.as_str()),
                    ["Invalid datatype", format!("{:?}", value.kind()).as_str()],
                ));
                return;
            }
        }

        let text = match raw {
            Some(raw) => raw.trim().to_string(),
            None => value.render(field),
        };
        if text.is_empty() {
            self.diagnostics.add_warning(Diagnosis::new(
                DiagnosisType::Empty,
                crate::field_parsers::field_label(name),
            ));
        }
        self.lines.push(HeaderLine::Field {
            name: name.to_string(),
            value: text.clone(),
        });

        let Some(field) = field else {
            return;
        };
        if self.is_duplicate(field, &text) {
            return;
        }
        let value = match value {
            FieldValue::Long(n) => non_negative_long(field, n, &mut self.diagnostics),
            value => Some(value),
        };
        self.store(field, TypedField { raw: text, value });
    }

    /// Append a line that is not a `Name: value` pair.
    pub fn add_line(&mut self, line: &str) {
        self.lines.push(HeaderLine::Other(line.to_string()));
    }

    fn is_duplicate(&mut self, field: FieldName, value: &str) -> bool {
        if field.is_multi_valued() || self.fields[field.index()].is_none() {
            return false;
        }
        self.diagnostics.add_error(Diagnosis::with_info(
            DiagnosisType::Duplicate,
            format!("'{}' header", field.as_str()),
            [value],
        ));
        true
    }

    fn store(&mut self, field: FieldName, typed: TypedField) {
        if field.is_multi_valued() {
            self.concurrent_to.push(typed);
        } else {
            self.fields[field.index()] = Some(typed);
        }
    }

    fn parse_value(&mut self, field: FieldName, value: &str) -> Option<FieldValue> {
        let p = self.parsers;
        let d = &mut self.diagnostics;
        let label = field.as_str();
        let value = Some(value);
        match field.kind() {
            FieldKind::String => p.parse_string(value, label, d).map(FieldValue::String),
            FieldKind::Integer => p.parse_integer(value, label, d).map(FieldValue::Integer),
            FieldKind::Long => {
                let parsed = p.parse_long(value, label, d)?;
                non_negative_long(field, parsed, d)
            }
            FieldKind::Digest => p.parse_digest(value, label, d).map(FieldValue::Digest),
            FieldKind::ContentType => p.parse_content_type(value, label, d).map(FieldValue::ContentType),
            FieldKind::Uri => p.parse_uri(value, label, d).map(FieldValue::Uri),
            FieldKind::IpAddress => p.parse_ip_address(value, label, d).map(FieldValue::IpAddress),
            FieldKind::Timestamp => p.parse_timestamp(value, label, d).map(FieldValue::Timestamp),
        }
    }

    fn value(&self, field: FieldName) -> Option<&FieldValue> {
        self.fields[field.index()].as_ref()?.value.as_ref()
    }

    fn raw(&self, field: FieldName) -> Option<&str> {
        self.fields[field.index()].as_ref().map(|t| t.raw.as_str())
    }

    /// Declared record type ([`WarcRecordType::Unknown`] if missing or unrecognised).
    pub fn record_type(&self) -> WarcRecordType {
        match self.value(FieldName::WarcType) {
            Some(FieldValue::String(s)) => WarcRecordType::from_name(s),
            _ => WarcRecordType::Unknown,
        }
    }

    /// Validate all fields against the policy of the declared record type and
    /// the cross-field rules.
    pub fn check_fields(&mut self) {
        let record_type = self.record_type();
        let mut d = Diagnostics::new();

        if record_type == WarcRecordType::Unknown {
            if let Some(raw) = self.raw(FieldName::WarcType).filter(|r| !r.is_empty()) {
                d.add_warning(Diagnosis::with_info(
                    DiagnosisType::Unknown,
                    value_label(FieldName::WarcType.as_str()),
                    [raw],
                ));
            }
        }

        for field in FieldName::ALL {
            if field.is_multi_valued() {
                if self.concurrent_to.is_empty() {
                    check_field_policy(record_type, field, None, None, &mut d);
                }
                for typed in &self.concurrent_to {
                    check_field_policy(record_type, field, typed.value.as_ref(), Some(&typed.raw), &mut d);
                }
            } else {
                // A blank string does not count as present.
                let value = self
                    .value(field)
                    .filter(|v| !matches!(v, FieldValue::String(s) if s.trim().is_empty()));
                check_field_policy(record_type, field, value, self.raw(field), &mut d);
            }
        }

        if let Some(FieldValue::Integer(n)) = self.value(FieldName::WarcSegmentNumber) {
            let expected = if record_type == WarcRecordType::Continuation {
                (*n <= 1).then_some("> 1")
            } else {
                (*n != 1).then_some("1")
            };
            if let Some(expected) = expected {
                d.add_error(Diagnosis::with_info(
                    DiagnosisType::InvalidExpected,
                    value_label(FieldName::WarcSegmentNumber.as_str()),
                    [n.to_string().as_str(), expected],
                ));
            }
        }

        let content_length = match self.value(FieldName::ContentLength) {
            Some(FieldValue::Long(n)) => *n,
            _ => 0,
        };
        if record_type != WarcRecordType::Continuation
            && content_length > 0
            && self.value(FieldName::ContentType).is_none()
        {
            d.add_warning(Diagnosis::with_info(
                DiagnosisType::Recommended,
                value_label(FieldName::ContentType.as_str()),
                self.raw(FieldName::ContentType),
            ));
        }

        if self.version == WarcVersion::V1_0 {
            if let Some(FieldValue::Timestamp(ts)) = self.value(FieldName::WarcDate) {
                if ts.precision() != Precision::Second {
                    d.add_warning(Diagnosis::with_info(
                        DiagnosisType::InvalidExpected,
                        value_label(FieldName::WarcDate.as_str()),
                        [ts.to_string().as_str(), EXPECTED_DATE],
                    ));
                }
            }
        }

        self.diagnostics.extend(d);
    }

    /// Freeze the header.
    pub fn build(self) -> WarcHeader {
        WarcHeader {
            version: self.version,
            lines: self.lines,
            fields: self.fields,
            concurrent_to: self.concurrent_to,
            diagnostics: self.diagnostics,
        }
    }
}

fn non_negative_long(field: FieldName, n: i64, diagnostics: &mut Diagnostics) -> Option<FieldValue> {
    if n < 0 {
        diagnostics.add_error(Diagnosis::with_info(
            DiagnosisType::InvalidExpected,
            value_label(field.as_str()),
            [n.to_string().as_str(), "Non-negative number"],
        ));
        return None;
    }
    Some(FieldValue::Long(n))
}

fn put<W: io::Write>(writer: &mut W, bytes: &[u8], counter: &mut u64) -> io::Result<()> {
    writer.write_all(bytes)?;
    *counter += bytes.len() as u64;
    Ok(())
}

/// Immutable WARC header block.
#[derive(Debug, Clone)]
pub struct WarcHeader {
    version: WarcVersion,
    lines: Vec<HeaderLine>,
    fields: Slots,
    concurrent_to: Vec<TypedField>,
    diagnostics: Diagnostics,
}

impl WarcHeader {
    pub fn builder(version: WarcVersion) -> WarcHeaderBuilder {
        WarcHeaderBuilder::new(version)
    }

    pub fn version(&self) -> WarcVersion {
        self.version
    }

    /// All header lines in source order, including duplicates and extension headers.
    pub fn lines(&self) -> &[HeaderLine] {
        &self.lines
    }

    /// Name/value pairs of all field lines in source order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.lines.iter().filter_map(|l| match l {
            HeaderLine::Field { name, value } => Some((name.as_str(), value.as_str())),
            HeaderLine::Other(_) => None,
        })
    }

    /// Raw value of the first header with the (case-insensitive) name `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    /// Raw values of all headers with the (case-insensitive) name `name`.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.items().filter(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v).collect()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.items().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Typed slot of a single-valued field. For `WARC-Concurrent-To` this is the first value.
    pub fn field(&self, field: FieldName) -> Option<&TypedField> {
        if field.is_multi_valued() {
            self.concurrent_to.first()
        } else {
            self.fields[field.index()].as_ref()
        }
    }

    pub fn value(&self, field: FieldName) -> Option<&FieldValue> {
        self.field(field)?.value.as_ref()
    }

    /// Header-level findings.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_compliant(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    fn uri(&self, field: FieldName) -> Option<&Uri> {
        match self.value(field)? {
            FieldValue::Uri(uri) => Some(uri),
            _ => None,
        }
    }

    fn timestamp(&self, field: FieldName) -> Option<&Timestamp> {
        match self.value(field)? {
            FieldValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    fn string(&self, field: FieldName) -> Option<&str> {
        match self.value(field)? {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn digest(&self, field: FieldName) -> Option<&Digest> {
        match self.value(field)? {
            FieldValue::Digest(d) => Some(d),
            _ => None,
        }
    }

    fn content_type_of(&self, field: FieldName) -> Option<&ContentType> {
        match self.value(field)? {
            FieldValue::ContentType(ct) => Some(ct),
            _ => None,
        }
    }

    fn non_negative(&self, field: FieldName) -> Option<u64> {
        match self.value(field)? {
            FieldValue::Long(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Record type (same as `headers['WARC-Type']`).
    pub fn record_type(&self) -> WarcRecordType {
        self.string(FieldName::WarcType)
            .map(WarcRecordType::from_name)
            .unwrap_or(WarcRecordType::Unknown)
    }

    pub fn record_id(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcRecordId)
    }

    pub fn date(&self) -> Option<&Timestamp> {
        self.timestamp(FieldName::WarcDate)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.non_negative(FieldName::ContentLength)
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type_of(FieldName::ContentType)
    }

    pub fn truncated(&self) -> Option<&str> {
        self.string(FieldName::WarcTruncated)
    }

    pub fn target_uri(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcTargetUri)
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        match self.value(FieldName::WarcIpAddress)? {
            FieldValue::IpAddress(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn refers_to(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcRefersTo)
    }

    pub fn refers_to_target_uri(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcRefersToTargetUri)
    }

    pub fn refers_to_date(&self) -> Option<&Timestamp> {
        self.timestamp(FieldName::WarcRefersToDate)
    }

    /// All valid `WARC-Concurrent-To` URIs in header order.
    pub fn concurrent_to(&self) -> Vec<&Uri> {
        self.concurrent_to
            .iter()
            .filter_map(|t| match &t.value {
                Some(FieldValue::Uri(uri)) => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn warcinfo_id(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcWarcinfoId)
    }

    pub fn segment_number(&self) -> Option<i32> {
        match self.value(FieldName::WarcSegmentNumber)? {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn segment_total_length(&self) -> Option<u64> {
        self.non_negative(FieldName::WarcSegmentTotalLength)
    }

    pub fn segment_origin_id(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcSegmentOriginId)
    }

    pub fn block_digest(&self) -> Option<&Digest> {
        self.digest(FieldName::WarcBlockDigest)
    }

    pub fn payload_digest(&self) -> Option<&Digest> {
        self.digest(FieldName::WarcPayloadDigest)
    }

    pub fn identified_payload_type(&self) -> Option<&ContentType> {
        self.content_type_of(FieldName::WarcIdentifiedPayloadType)
    }

    pub fn filename(&self) -> Option<&str> {
        self.string(FieldName::WarcFilename)
    }

    pub fn profile(&self) -> Option<&Uri> {
        self.uri(FieldName::WarcProfile)
    }

    /// Write the header block including the version line and the terminating empty line.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<u64> {
        let mut bytes_written = 0u64;
        put(writer, self.version.to_string().as_bytes(), &mut bytes_written)?;
        put(writer, b"\r\n", &mut bytes_written)?;
        for line in &self.lines {
            match line {
                HeaderLine::Field { name, value } => {
                    put(writer, name.as_bytes(), &mut bytes_written)?;
                    put(writer, b": ", &mut bytes_written)?;
                    put(writer, value.as_bytes(), &mut bytes_written)?;
                }
                HeaderLine::Other(text) => put(writer, text.as_bytes(), &mut bytes_written)?,
            }
            put(writer, b"\r\n", &mut bytes_written)?;
        }
        put(writer, b"\r\n", &mut bytes_written)?;
        Ok(bytes_written)
    }

    /// Header block as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }
}
