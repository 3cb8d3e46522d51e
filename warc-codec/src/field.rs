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

//! Named WARC header fields and their typed values.

use std::fmt;
use std::net::IpAddr;

use crate::content_type::ContentType;
use crate::digest::Digest;
use crate::timestamp::Timestamp;
use crate::uri::Uri;

/// WARC header fields with a defined type.
///
/// Any other header name is kept as an untyped extension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    WarcType,
    WarcRecordId,
    WarcDate,
    ContentLength,
    ContentType,
    WarcTruncated,
    WarcTargetUri,
    WarcIpAddress,
    WarcRefersTo,
    WarcRefersToTargetUri,
    WarcRefersToDate,
    WarcConcurrentTo,
    WarcWarcinfoId,
    WarcSegmentNumber,
    WarcSegmentTotalLength,
    WarcSegmentOriginId,
    WarcBlockDigest,
    WarcPayloadDigest,
    WarcIdentifiedPayloadType,
    WarcFilename,
    WarcProfile,
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
    Long,
    Digest,
    ContentType,
    Uri,
    IpAddress,
    Timestamp,
}

impl FieldName {
    pub const COUNT: usize = 21;

    pub const ALL: [FieldName; FieldName::COUNT] = [
        FieldName::WarcType,
        FieldName::WarcRecordId,
        FieldName::WarcDate,
        FieldName::ContentLength,
        FieldName::ContentType,
        FieldName::WarcTruncated,
        FieldName::WarcTargetUri,
        FieldName::WarcIpAddress,
        FieldName::WarcRefersTo,
        FieldName::WarcRefersToTargetUri,
        FieldName::WarcRefersToDate,
        FieldName::WarcConcurrentTo,
        FieldName::WarcWarcinfoId,
        FieldName::WarcSegmentNumber,
        FieldName::WarcSegmentTotalLength,
        FieldName::WarcSegmentOriginId,
        FieldName::WarcBlockDigest,
        FieldName::WarcPayloadDigest,
        FieldName::WarcIdentifiedPayloadType,
        FieldName::WarcFilename,
        FieldName::WarcProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::WarcType => "WARC-Type",
            FieldName::WarcRecordId => "WARC-Record-ID",
            FieldName::WarcDate => "WARC-Date",
            FieldName::ContentLength => "Content-Length",
            FieldName::ContentType => "Content-Type",
            FieldName::WarcTruncated => "WARC-Truncated",
            FieldName::WarcTargetUri => "WARC-Target-URI",
            FieldName::WarcIpAddress => "WARC-IP-Address",
            FieldName::WarcRefersTo => "WARC-Refers-To",
            FieldName::WarcRefersToTargetUri => "WARC-Refers-To-Target-URI",
            FieldName::WarcRefersToDate => "WARC-Refers-To-Date",
            FieldName::WarcConcurrentTo => "WARC-Concurrent-To",
            FieldName::WarcWarcinfoId => "WARC-Warcinfo-ID",
            FieldName::WarcSegmentNumber => "WARC-Segment-Number",
            FieldName::WarcSegmentTotalLength => "WARC-Segment-Total-Length",
            FieldName::WarcSegmentOriginId => "WARC-Segment-Origin-ID",
            FieldName::WarcBlockDigest => "WARC-Block-Digest",
            FieldName::WarcPayloadDigest => "WARC-Payload-Digest",
            FieldName::WarcIdentifiedPayloadType => "WARC-Identified-Payload-Type",
            FieldName::WarcFilename => "WARC-Filename",
            FieldName::WarcProfile => "WARC-Profile",
        }
    }

    /// Look up a (case-insensitive) header name.
    pub fn from_name(name: &str) -> Option<FieldName> {
        let name = name.trim();
        FieldName::ALL.into_iter().find(|f| f.as_str().eq_ignore_ascii_case(name))
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldName::WarcType | FieldName::WarcTruncated | FieldName::WarcFilename => FieldKind::String,
            FieldName::WarcSegmentNumber => FieldKind::Integer,
            FieldName::ContentLength | FieldName::WarcSegmentTotalLength => FieldKind::Long,
            FieldName::WarcBlockDigest | FieldName::WarcPayloadDigest => FieldKind::Digest,
            FieldName::ContentType | FieldName::WarcIdentifiedPayloadType => FieldKind::ContentType,
            FieldName::WarcIpAddress => FieldKind::IpAddress,
            FieldName::WarcDate | FieldName::WarcRefersToDate => FieldKind::Timestamp,
            FieldName::WarcRecordId
            | FieldName::WarcTargetUri
            | FieldName::WarcRefersTo
            | FieldName::WarcRefersToTargetUri
            | FieldName::WarcConcurrentTo
            | FieldName::WarcWarcinfoId
            | FieldName::WarcSegmentOriginId
            | FieldName::WarcProfile => FieldKind::Uri,
        }
    }

    /// Whether the field holds a record identifier written as `<uri>`.
    pub fn is_identifier(&self) -> bool {
        matches!(
            self,
            FieldName::WarcRecordId
                | FieldName::WarcRefersTo
                | FieldName::WarcConcurrentTo
                | FieldName::WarcWarcinfoId
                | FieldName::WarcSegmentOriginId
        )
    }

    /// Whether the field may occur more than once.
    pub fn is_multi_valued(&self) -> bool {
        *self == FieldName::WarcConcurrentTo
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed value of a typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Integer(i32),
    Long(i64),
    Digest(Digest),
    ContentType(ContentType),
    Uri(Uri),
    IpAddress(IpAddr),
    Timestamp(Timestamp),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Long(_) => FieldKind::Long,
            FieldValue::Digest(_) => FieldKind::Digest,
            FieldValue::ContentType(_) => FieldKind::ContentType,
            FieldValue::Uri(_) => FieldKind::Uri,
            FieldValue::IpAddress(_) => FieldKind::IpAddress,
            FieldValue::Timestamp(_) => FieldKind::Timestamp,
        }
    }

    /// Header text for this value when written into `field`.
    pub fn render(&self, field: Option<FieldName>) -> String {
        match self {
            FieldValue::Uri(uri) if field.is_some_and(|f| f.is_identifier()) => uri.bracketed(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(v) => f.write_str(v),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Long(v) => write!(f, "{v}"),
            FieldValue::Digest(v) => write!(f, "{v}"),
            FieldValue::ContentType(v) => write!(f, "{v}"),
            FieldValue::Uri(v) => write!(f, "{v}"),
            FieldValue::IpAddress(v) => write!(f, "{v}"),
            FieldValue::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

/// A typed header slot: the raw header text and, if it could be parsed, its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedField {
    pub raw: String,
    pub value: Option<FieldValue>,
}
