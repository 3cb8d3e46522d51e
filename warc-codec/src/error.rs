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

//! Fatal errors.
//!
//! Malformed archive data is never reported through [`WarcError`]. Format problems
//! are collected as [`Diagnosis`](crate::diagnosis::Diagnosis) values instead and
//! parsing continues. This type is reserved for I/O failures and API misuse.

use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WarcError>;

#[derive(Debug, thiserror::Error)]
pub enum WarcError {
    /// The underlying byte source or sink failed (including corrupt gzip data).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An operation was called in a state that does not allow it.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// A required argument was empty or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The payload written for a record does not match its declared `Content-Length`.
    #[error("content length mismatch: {written} payload bytes written, {declared:?} declared")]
    ContentLengthMismatch {
        written: u64,
        declared: Option<u64>,
    },
}

impl WarcError {
    /// Whether this error originates from the byte source or sink.
    pub fn is_io(&self) -> bool {
        matches!(self, WarcError::Io(_))
    }
}
