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

//! Non-fatal findings collected while reading or writing records.

use std::fmt;

/// Diagnosis type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosisType {
    /// Field is present, but has no value.
    Empty,
    /// Generic invalid data.
    Invalid,
    /// Data has the wrong type or shape for where it is used.
    InvalidData,
    /// Bytes could not be decoded in the expected character encoding.
    InvalidEncoding,
    /// Value does not match the expected format. Information: actual, expected.
    InvalidExpected,
    /// Value is syntactically fine, but not recognised.
    Unknown,
    /// Single-valued field occurs more than once.
    Duplicate,
    /// Required field is missing or could not be parsed.
    RequiredInvalid,
    /// Field is present where it must not or should not be.
    UndesiredData,
    /// Recommended field is missing.
    Recommended,
    /// Something expected was not there.
    ErrorExpected,
    /// Generic error.
    Error,
}

impl DiagnosisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisType::Empty => "EMPTY",
            DiagnosisType::Invalid => "INVALID",
            DiagnosisType::InvalidData => "INVALID_DATA",
            DiagnosisType::InvalidEncoding => "INVALID_ENCODING",
            DiagnosisType::InvalidExpected => "INVALID_EXPECTED",
            DiagnosisType::Unknown => "UNKNOWN",
            DiagnosisType::Duplicate => "DUPLICATE",
            DiagnosisType::RequiredInvalid => "REQUIRED_INVALID",
            DiagnosisType::UndesiredData => "UNDESIRED_DATA",
            DiagnosisType::Recommended => "RECOMMENDED",
            DiagnosisType::ErrorExpected => "ERROR_EXPECTED",
            DiagnosisType::Error => "ERROR",
        }
    }
}

impl fmt::Display for DiagnosisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding: what kind, where, and optional supporting details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub kind: DiagnosisType,
    pub entity: String,
    pub information: Vec<String>,
}

impl Diagnosis {
    pub fn new(kind: DiagnosisType, entity: impl Into<String>) -> Self {
        Diagnosis {
            kind,
            entity: entity.into(),
            information: Vec::new(),
        }
    }

    /// Create a diagnosis with additional information items.
    ///
    /// # Arguments
    ///
    /// * `kind` - Diagnosis type
    /// * `entity` - Label of the offending entity, e.g. `'WARC-Date' value`
    /// * `information` - Supporting details, e.g. actual and expected value
    pub fn with_info<I, S>(kind: DiagnosisType, entity: impl Into<String>, information: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Diagnosis {
            kind,
            entity: entity.into(),
            information: information.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.entity)?;
        if !self.information.is_empty() {
            write!(f, " ({})", self.information.join(", "))?;
        }
        Ok(())
    }
}

/// Append-only collection of errors and warnings.
///
/// Insertion order is preserved within each partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<Diagnosis>,
    warnings: Vec<Diagnosis>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, diagnosis: Diagnosis) {
        tracing::trace!(%diagnosis, "error diagnosis");
        self.errors.push(diagnosis);
    }

    pub fn add_warning(&mut self, diagnosis: Diagnosis) {
        tracing::trace!(%diagnosis, "warning diagnosis");
        self.warnings.push(diagnosis);
    }

    pub fn errors(&self) -> &[Diagnosis] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnosis] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Total number of errors and warnings.
    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Append all diagnoses of `other`, keeping their order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.warnings.clear();
    }
}
