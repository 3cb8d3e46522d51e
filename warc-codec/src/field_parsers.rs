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

//! Conversion of raw header values into typed values.
//!
//! Every parser takes the raw value (`None` if the field was not given at all)
//! and the field name used for labelling diagnoses. A missing or empty value
//! yields an `EMPTY` warning, an invalid one an `INVALID_EXPECTED` error with the
//! offending text and the expected format as information.

use std::net::IpAddr;

use crate::content_type::ContentType;
use crate::diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
use crate::digest::Digest;
use crate::timestamp::Timestamp;
use crate::uri::{Uri, UriProfile};

pub const EXPECTED_NUMERIC: &str = "Numeric format";
pub const EXPECTED_CONTENT_TYPE: &str = "<type>/<sub-type>(; <argument>=<value>)*";
pub const EXPECTED_DATE: &str = "yyyy-MM-dd'T'HH:mm:ss'Z'";
pub const EXPECTED_IP_ADDRESS: &str = "IPv4 or IPv6 format";
pub const EXPECTED_URI: &str = "URI format";
pub const EXPECTED_DIGEST: &str = "<algorithm>:<digest>";

/// Entity label for a field's value.
pub fn value_label(field: &str) -> String {
    format!("'{field}' value")
}

/// Entity label for a field as a whole.
pub fn field_label(field: &str) -> String {
    format!("'{field}' field")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldParsers {
    pub uri_profile: UriProfile,
}

impl FieldParsers {
    pub fn new(uri_profile: UriProfile) -> Self {
        FieldParsers { uri_profile }
    }

    /// Return the non-empty value or record an `EMPTY` warning.
    fn non_empty<'a>(value: Option<&'a str>, field: &str, diagnostics: &mut Diagnostics) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                diagnostics.add_warning(Diagnosis::new(DiagnosisType::Empty, field_label(field)));
                None
            }
        }
    }

    fn invalid(value: &str, field: &str, expected: &str, diagnostics: &mut Diagnostics) {
        diagnostics.add_error(Diagnosis::with_info(
            DiagnosisType::InvalidExpected,
            value_label(field),
            [value, expected],
        ));
    }

    fn parse_with<T>(
        value: Option<&str>,
        field: &str,
        expected: &str,
        diagnostics: &mut Diagnostics,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let value = Self::non_empty(value, field, diagnostics)?;
        let parsed = parse(value);
        if parsed.is_none() {
            Self::invalid(value, field, expected, diagnostics);
        }
        parsed
    }

    pub fn parse_integer(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<i32> {
        Self::parse_with(value, field, EXPECTED_NUMERIC, diagnostics, |v| v.parse().ok())
    }

    pub fn parse_long(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<i64> {
        Self::parse_with(value, field, EXPECTED_NUMERIC, diagnostics, |v| v.parse().ok())
    }

    pub fn parse_content_type(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<ContentType> {
        Self::parse_with(value, field, EXPECTED_CONTENT_TYPE, diagnostics, ContentType::parse)
    }

    pub fn parse_ip_address(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<IpAddr> {
        Self::parse_with(value, field, EXPECTED_IP_ADDRESS, diagnostics, |v| v.parse().ok())
    }

    pub fn parse_timestamp(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<Timestamp> {
        Self::parse_with(value, field, EXPECTED_DATE, diagnostics, Timestamp::parse)
    }

    pub fn parse_digest(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<Digest> {
        Self::parse_with(value, field, EXPECTED_DIGEST, diagnostics, Digest::parse)
    }

    /// Parse a URI in bare or `<angle-bracket>` form according to the configured profile.
    pub fn parse_uri(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<Uri> {
        let profile = self.uri_profile;
        Self::parse_with(value, field, EXPECTED_URI, diagnostics, |v| {
            Uri::parse_any(v, profile).map(|(uri, _)| uri)
        })
    }

    /// Strings never fail to parse. Empty strings are returned, but still warned about.
    pub fn parse_string(&self, value: Option<&str>, field: &str, diagnostics: &mut Diagnostics) -> Option<String> {
        if value.map_or(true, |v| v.trim().is_empty()) {
            diagnostics.add_warning(Diagnosis::new(DiagnosisType::Empty, field_label(field)));
        }
        value.map(str::to_string)
    }
}
