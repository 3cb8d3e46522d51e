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

//! Record types and which header fields each of them requires or forbids.

use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::field::{FieldName, FieldValue};
use crate::field_parsers::value_label;

/// WARC record type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarcRecordType {
    WarcInfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    Unknown,
}

impl WarcRecordType {
    pub const COUNT: usize = 9;

    pub fn as_str(&self) -> &'static str {
        match self {
            WarcRecordType::WarcInfo => "warcinfo",
            WarcRecordType::Response => "response",
            WarcRecordType::Resource => "resource",
            WarcRecordType::Request => "request",
            WarcRecordType::Metadata => "metadata",
            WarcRecordType::Revisit => "revisit",
            WarcRecordType::Conversion => "conversion",
            WarcRecordType::Continuation => "continuation",
            WarcRecordType::Unknown => "unknown",
        }
    }

    /// Map a `WARC-Type` value, falling back to [`WarcRecordType::Unknown`].
    pub fn from_name(value: &str) -> WarcRecordType {
        WarcRecordType::try_from(value).unwrap_or(WarcRecordType::Unknown)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<&str> for WarcRecordType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "warcinfo" => Ok(WarcRecordType::WarcInfo),
            "response" => Ok(WarcRecordType::Response),
            "resource" => Ok(WarcRecordType::Resource),
            "request" => Ok(WarcRecordType::Request),
            "metadata" => Ok(WarcRecordType::Metadata),
            "revisit" => Ok(WarcRecordType::Revisit),
            "conversion" => Ok(WarcRecordType::Conversion),
            "continuation" => Ok(WarcRecordType::Continuation),
            _ => Err("Invalid enum value."),
        }
    }
}

impl From<WarcRecordType> for &'static str {
    fn from(value: WarcRecordType) -> Self {
        value.as_str()
    }
}

/// Presence rule of a field for a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPolicy {
    /// Must be present and valid in every record.
    Mandatory,
    /// Must be present and valid for this record type.
    Shall,
    /// Must not be present (error).
    ShallNot,
    /// Should not be present (warning).
    MayNot,
    /// Optional.
    May,
    /// Not checked by the policy (handled by a dedicated rule, if at all).
    Ignore,
}

use FieldPolicy::{Ignore as I, Mandatory as M, May as Y, MayNot as MN, Shall as S, ShallNot as SN};

// Columns follow `FieldName` declaration order:
//   Type RecId Date CLen CType Trunc Target IP RefTo RefToUri RefToDate
//   Concur Winfo SegNum SegTotal SegOrigin BlockDg PayloadDg IdentType Filename Profile
#[rustfmt::skip]
static POLICIES: [[FieldPolicy; FieldName::COUNT]; WarcRecordType::COUNT] = [
    // warcinfo
    [M, M, M, M, I,  Y, SN, MN, SN, SN, SN,  SN, SN, Y, SN, SN,  Y, MN, MN,  Y, SN],
    // response
    [M, M, M, M, I,  Y,  S,  Y, SN, SN, SN,   Y,  Y, Y, SN, SN,  Y,  Y,  Y, SN, SN],
    // resource
    [M, M, M, M, I,  Y,  S,  Y, SN, SN, SN,   Y,  Y, Y, SN, SN,  Y,  Y,  Y, SN, SN],
    // request
    [M, M, M, M, I,  Y,  S,  Y, SN, SN, SN,   Y,  Y, Y, SN, SN,  Y,  Y,  Y, SN, SN],
    // metadata
    [M, M, M, M, I,  Y,  Y,  Y,  Y, SN, SN,   Y,  Y, Y, SN, SN,  Y,  Y,  Y, SN, SN],
    // revisit
    [M, M, M, M, I,  Y,  S,  Y,  Y,  Y,  Y,   Y,  Y, Y, SN, SN,  Y,  Y,  Y, SN,  S],
    // conversion
    [M, M, M, M, I,  Y,  S, MN,  Y, SN, SN,  SN,  Y, Y, SN, SN,  Y,  Y,  Y, SN, SN],
    // continuation
    [M, M, M, M, MN, Y,  S, MN, SN, SN, SN,  SN,  Y, S,  Y,  S,  Y,  Y, MN, SN, SN],
    // unknown record types
    [M, M, M, M, I,  Y,  Y,  Y,  Y,  Y,  Y,   Y,  Y, Y,  Y,  Y,  Y,  Y,  Y,  Y,  Y],
];

/// Policy of `field` in records of type `record_type`.
pub fn field_policy(record_type: WarcRecordType, field: FieldName) -> FieldPolicy {
    POLICIES[record_type.index()][field.index()]
}

/// Check a single field against the policy matrix.
///
/// # Arguments
///
/// * `record_type` - Declared record type
/// * `field` - Field to check
/// * `value` - Parsed value, `None` if the field is absent or could not be parsed
/// * `raw` - Raw header text, if the field was given
/// * `diagnostics` - Accumulator for findings
pub fn check_field_policy(
    record_type: WarcRecordType,
    field: FieldName,
    value: Option<&FieldValue>,
    raw: Option<&str>,
    diagnostics: &mut Diagnostics,
) {
    let diagnosis = |kind| Diagnosis::with_info(kind, value_label(field.as_str()), raw);
    match field_policy(record_type, field) {
        FieldPolicy::Mandatory | FieldPolicy::Shall if value.is_none() => {
            diagnostics.add_error(diagnosis(DiagnosisType::RequiredInvalid));
        }
        FieldPolicy::ShallNot if value.is_some() => {
            diagnostics.add_error(diagnosis(DiagnosisType::UndesiredData));
        }
        FieldPolicy::MayNot if value.is_some() => {
            diagnostics.add_warning(diagnosis(DiagnosisType::UndesiredData));
        }
        _ => {}
    }
}
